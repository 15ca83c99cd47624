//! Categorical encoding and min-max scaling of model features.
//!
//! Two strategies are available:
//!
//! * [`Preprocessor::Fitted`] uses a table fit on the training corpus and
//!   loaded once at startup (category lists plus per-column `{min, max}`).
//!   A category missing from the table gets the reserved code
//!   `classes.len()` unless the table was set to reject unknown values.
//! * [`Preprocessor::SingleRow`] fits an encoder and a scaler on the single
//!   request row. A single row has one category per column and
//!   `min == max` for every column, so every code is `0` and every scaled
//!   value is `0.0`. Only useful for models trained against that output.

use crate::error::{Error, Result};
use crate::types::Feature;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Maps category strings to their rank among the sorted known classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit on observed values; classes are sorted and de-duplicated.
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut classes: Vec<String> = values.into_iter().map(Into::into).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Code of `value`, or `None` for a category not seen during fitting.
    pub fn transform(&self, value: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
    }

    /// Code reserved for categories not seen during fitting, one past the
    /// last known class.
    pub fn unknown_code(&self) -> usize {
        self.classes.len()
    }
}

/// Observed bounds of one column, used for min-max scaling into `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRange {
    pub min: f64,
    pub max: f64,
}

impl FeatureRange {
    /// Bounds of `values`; `None` when empty.
    pub fn fit(values: &[f64]) -> Option<Self> {
        let first = *values.first()?;
        let (min, max) = values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        Some(Self { min, max })
    }

    /// `(x - min) / (max - min)`. A zero-width range scales by 1, so the
    /// result is `x - min`.
    pub fn scale(&self, x: f64) -> f64 {
        let range = self.max - self.min;
        let range = if range == 0.0 { 1.0 } else { range };
        (x - self.min) / range
    }
}

/// On-disk form of a pre-fit preprocessing table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreprocessingTable {
    /// Known classes for each categorical column
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
    /// Scaling bounds for every model column
    #[serde(default)]
    pub ranges: BTreeMap<String, FeatureRange>,
}

impl PreprocessingTable {
    /// Load a table from a JSON file
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read preprocessing table {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse preprocessing table {}", path.display()))
    }
}

/// Validated pre-fit encoders and scalers, indexed by feature.
#[derive(Debug, Clone)]
pub struct FittedPreprocessing {
    encoders: HashMap<Feature, LabelEncoder>,
    ranges: HashMap<Feature, FeatureRange>,
    reject_unknown: bool,
}

impl FittedPreprocessing {
    /// Fail with `InvalidInput` on unseen categories instead of using the
    /// reserved code.
    pub fn reject_unknown(mut self, reject: bool) -> Self {
        self.reject_unknown = reject;
        self
    }

    pub fn rejects_unknown(&self) -> bool {
        self.reject_unknown
    }

    pub fn encoder(&self, feature: Feature) -> Option<&LabelEncoder> {
        self.encoders.get(&feature)
    }

    pub fn range(&self, feature: Feature) -> Option<FeatureRange> {
        self.ranges.get(&feature).copied()
    }
}

impl TryFrom<PreprocessingTable> for FittedPreprocessing {
    type Error = Error;

    fn try_from(table: PreprocessingTable) -> Result<Self> {
        for name in table.categories.keys().chain(table.ranges.keys()) {
            if Feature::from_name(name).is_none() {
                return Err(Error::InvalidPreprocessing(format!(
                    "unknown column `{name}`"
                )));
            }
        }

        let mut encoders = HashMap::new();
        for feature in Feature::CATEGORICAL {
            let classes = table.categories.get(feature.name()).ok_or_else(|| {
                Error::InvalidPreprocessing(format!("no categories for `{feature}`"))
            })?;
            if classes.is_empty() {
                return Err(Error::InvalidPreprocessing(format!(
                    "empty category list for `{feature}`"
                )));
            }
            encoders.insert(feature, LabelEncoder::fit(classes.iter().cloned()));
        }

        let mut ranges = HashMap::new();
        for feature in Feature::ALL {
            let range = table.ranges.get(feature.name()).ok_or_else(|| {
                Error::InvalidPreprocessing(format!("no scaling range for `{feature}`"))
            })?;
            if !range.min.is_finite() || !range.max.is_finite() || range.min > range.max {
                return Err(Error::InvalidPreprocessing(format!(
                    "bad range for `{feature}`: min {} max {}",
                    range.min, range.max
                )));
            }
            ranges.insert(feature, *range);
        }

        Ok(Self {
            encoders,
            ranges,
            reject_unknown: false,
        })
    }
}

/// Strategy used to map categories and raw values into model space.
#[derive(Debug, Clone)]
pub enum Preprocessor {
    /// Fit on the request row itself (always yields 0 / 0.0)
    SingleRow,
    /// Pre-fit table loaded at startup
    Fitted(FittedPreprocessing),
}

impl Preprocessor {
    /// Load and validate a pre-fit table.
    pub fn fitted_from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let table = PreprocessingTable::from_path(path)?;
        Ok(Preprocessor::Fitted(table.try_into()?))
    }

    /// Toggle rejection of unseen categories. No effect on `SingleRow`,
    /// which never sees an unknown value.
    pub fn reject_unknown_categories(self, reject: bool) -> Self {
        match self {
            Preprocessor::Fitted(fitted) => Preprocessor::Fitted(fitted.reject_unknown(reject)),
            single => single,
        }
    }

    pub fn mode_name(&self) -> &'static str {
        match self {
            Preprocessor::SingleRow => "single_row",
            Preprocessor::Fitted(_) => "fitted",
        }
    }

    /// Integer code for a categorical value.
    pub fn encode(&self, feature: Feature, value: &str) -> Result<f64> {
        let code = match self {
            Preprocessor::SingleRow => LabelEncoder::fit([value]).transform(value),
            Preprocessor::Fitted(fitted) => fitted.encoder(feature).and_then(|encoder| {
                match encoder.transform(value) {
                    Some(code) => Some(code),
                    None if fitted.reject_unknown => None,
                    None => Some(encoder.unknown_code()),
                }
            }),
        };

        code.map(|c| c as f64).ok_or_else(|| {
            Error::invalid_input(format!("unknown category `{value}` for `{feature}`"))
        })
    }

    /// Min-max scaled value of one column.
    pub fn scale(&self, feature: Feature, value: f64) -> f64 {
        let range = match self {
            Preprocessor::SingleRow => FeatureRange::fit(&[value]),
            Preprocessor::Fitted(fitted) => fitted.range(feature),
        };
        range.map_or(value, |r| r.scale(value))
    }
}
