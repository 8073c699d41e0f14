//! brightpath-export: Pure tabular serializers (sans-IO)
//!
//! Converts wavefront selections into text formats and back. Currently
//! supports CSV.

pub mod csv;

pub use csv::{ExportError, HEADER, parse_csv, to_csv};
