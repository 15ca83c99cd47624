//! Tabular data helpers: dataset model, quality checks and time-series merge

pub mod dataset;
pub mod merge;
pub mod quality;

pub use dataset::{Column, DataType, Dataset, Value, ValueKind};
pub use merge::merge_and_sort;
pub use quality::{
    check_data_types, check_duplicates, check_missing_data, check_numeric_anomalies,
    get_numeric_columns, get_total_missing_percentage, inspect, CheckOutcome, QualityReport,
};
