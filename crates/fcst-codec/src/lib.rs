//! # fcst-codec
//!
//! Converts prediction elements between their tabular and structured forms.
//!
//! - [`TabularCodec`]: the row-oriented CSV format, one row per payload fragment
//! - [`QuantileCsv`]: the narrower `location,target,type,quantile,value` dialect
//! - [`CdcCsv`]: the CDC FluSight point and bin dialect
//! - [`exchange`]: the JSON exchange document and (unit, target) export grouping
//!
//! Nothing here consults a project. Output is a candidate element set for the
//! validator.

pub mod cdc;
pub mod columns;
mod error;
pub mod exchange;
pub mod quantile;
pub mod tabular;

pub use cdc::CdcCsv;
pub use columns::{Column, optional_columns, required_columns};
pub use error::{CodecError, RowError};
pub use quantile::{QuantileCsv, QuantileRow, RowValidator};
pub use tabular::{Row, TabularCodec};
