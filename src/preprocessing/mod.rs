//! Data preprocessing module
//!
//! Label encoding for categorical targets and standardization used by the
//! scale-sensitive estimators.

mod encoder;
mod scaler;

pub use encoder::LabelEncoder;
pub use scaler::{StandardScaler, TargetScaler};
