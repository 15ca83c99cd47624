//! Type definitions for the fraud detection service

pub mod features;
pub mod transaction;

pub use features::{Feature, FeatureVector, FEATURE_COUNT};
pub use transaction::RawTransaction;
