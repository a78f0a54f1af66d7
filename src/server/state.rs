//! Application state management

use polars::prelude::*;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::training::Session;
use crate::utils::column_names;

use super::ServerConfig;

/// Application state shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    /// Most recently uploaded dataset; a new upload replaces it
    dataset: RwLock<Option<Arc<DataFrame>>>,
    pub session: Arc<Session>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            dataset: RwLock::new(None),
            session: Arc::new(Session::new()),
        }
    }

    /// Cache a dataset and return its column names
    pub async fn store_dataset(&self, df: DataFrame) -> Vec<String> {
        let columns = column_names(&df);
        *self.dataset.write().await = Some(Arc::new(df));
        columns
    }

    pub async fn dataset(&self) -> Option<Arc<DataFrame>> {
        self.dataset.read().await.clone()
    }
}
