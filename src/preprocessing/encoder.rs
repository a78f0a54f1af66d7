//! Label encoding for categorical targets

use crate::error::{ForgeError, Result};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Bijection between string labels and integer codes.
///
/// Codes are assigned in sorted (lexicographic) label order, so `{"yes", "no"}`
/// always encodes as `no = 0, yes = 1` regardless of row order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    /// Labels indexed by their code
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit the encoder on a string column
    pub fn fit(series: &Series) -> Result<Self> {
        let values = series.str()?;
        let labels: BTreeSet<String> = values
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect();

        Ok(Self {
            classes: labels.into_iter().collect(),
        })
    }

    /// Build an encoder from an explicit label set
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = labels.into_iter().map(Into::into).collect();
        Self {
            classes: set.into_iter().collect(),
        }
    }

    /// Encode a string column into codes
    pub fn transform(&self, series: &Series) -> Result<Array1<f64>> {
        let values = series.str()?;
        values
            .into_iter()
            .map(|value| {
                let label = value.ok_or_else(|| ForgeError::MissingValues {
                    column: series.name().to_string(),
                    count: series.null_count(),
                })?;
                self.code_of(label)
                    .map(|code| code as f64)
                    .ok_or_else(|| {
                        ForgeError::InvalidInputFormat(format!("unseen label '{}'", label))
                    })
            })
            .collect()
    }

    /// Code for a label, if known
    pub fn code_of(&self, label: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(label)).ok()
    }

    /// Label for a code
    pub fn decode(&self, code: i64) -> Result<&str> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| self.classes.get(idx))
            .map(String::as_str)
            .ok_or(ForgeError::UnknownClassCode(code))
    }

    /// Labels in code order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Label to code mapping
    pub fn mapping(&self) -> BTreeMap<String, usize> {
        self.classes
            .iter()
            .enumerate()
            .map(|(code, label)| (label.clone(), code))
            .collect()
    }
}
