//! Data loading utilities
//!
//! CSV parsing into a [`DataFrame`] and conversion of named numeric columns into
//! row-major `ndarray` matrices.

use crate::error::{ForgeError, Result};
use ndarray::Array2;
use polars::prelude::*;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// CSV loader
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows scanned to infer column types
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: Some(1000),
        }
    }

    /// Set how many rows are scanned for type inference (None = whole file)
    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    fn options(&self) -> CsvReadOptions {
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
    }

    /// Load a CSV file from disk
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ForgeError::InvalidInputFormat(format!("cannot open {}: {}", path.display(), e))
        })?;

        let start = Instant::now();
        let df = self
            .options()
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| ForgeError::InvalidInputFormat(e.to_string()))?;
        debug!(path = %path.display(), rows = df.height(), cols = df.width(), elapsed = ?start.elapsed(), "Loaded CSV");

        ensure_not_empty(df)
    }

    /// Parse CSV content held in memory (e.g. an uploaded file)
    pub fn read_csv_bytes(&self, bytes: &[u8]) -> Result<DataFrame> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(ForgeError::InvalidInputFormat("CSV content is empty".to_string()));
        }

        let df = self
            .options()
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()
            .map_err(|e| ForgeError::InvalidInputFormat(e.to_string()))?;

        ensure_not_empty(df)
    }
}

fn ensure_not_empty(df: DataFrame) -> Result<DataFrame> {
    if df.width() == 0 {
        return Err(ForgeError::InvalidInputFormat("CSV has no columns".to_string()));
    }
    Ok(df)
}

/// Column names of a frame in order
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

/// Whether a dtype can be used directly as a model input
pub fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Boolean
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Extract named numeric columns into a row-major `Array2<f64>`.
///
/// Fails on unknown names, non-numeric dtypes, nulls and non-finite values; nothing is silently
/// filled in.
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|col_name| {
            let column = df
                .column(col_name)
                .map_err(|_| ForgeError::UnknownColumn(col_name.clone()))?;
            column_to_vec(col_name, column)
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]))
}

/// Numeric column as `f64` values, rejecting other dtypes, nulls, NaN and infinity
pub fn column_to_vec(name: &str, column: &Column) -> Result<Vec<f64>> {
    if !is_numeric(column.dtype()) {
        return Err(ForgeError::NonNumericFeature {
            column: name.to_string(),
            dtype: column.dtype().to_string(),
        });
    }

    let nulls = column.null_count();
    if nulls > 0 {
        return Err(ForgeError::MissingValues {
            column: name.to_string(),
            count: nulls,
        });
    }

    let as_f64 = column.cast(&DataType::Float64)?;
    let values: Vec<f64> = as_f64.f64()?.into_no_null_iter().collect();
    let non_finite = values.iter().filter(|v| !v.is_finite()).count();
    if non_finite > 0 {
        return Err(ForgeError::NonFiniteValues {
            column: name.to_string(),
            count: non_finite,
        });
    }
    Ok(values)
}

/// One-row frame zipping `names` with `values`
pub fn single_row_frame(names: &[String], values: &[f64]) -> Result<DataFrame> {
    if names.len() != values.len() {
        return Err(ForgeError::FeatureCountMismatch {
            expected: names.len(),
            actual: values.len(),
        });
    }

    let columns: Vec<Column> = names
        .iter()
        .zip(values)
        .map(|(name, value)| Column::new(name.as_str().into(), &[*value]))
        .collect();

    Ok(DataFrame::new(columns)?)
}
