//! Utility functions and types

pub mod data_loader;

pub use data_loader::{column_names, columns_to_array2, single_row_frame, DataLoader};
