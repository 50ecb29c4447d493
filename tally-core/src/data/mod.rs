//! Tabular Data
//!
//! The data layer behind the dashboards: typed tables, delimited text
//! ingestion and the descriptive statistics computed over table columns.

pub mod csv;
pub mod stats;
mod table;

pub use csv::CsvOptions;
pub use stats::Summary;
pub use table::{Agg, Column, Predicate, Table};
