//! Feature derivation for fraud model inference.
//!
//! Turns one raw transaction into the 15-column vector the classifier was
//! trained on: IP packing, placeholder velocity features, time-of-day /
//! day-of-week extraction, categorical encoding and min-max scaling.

use crate::convert::{ip_to_int, parse_timestamp};
use crate::error::Result;
use crate::preprocessing::Preprocessor;
use crate::types::{Feature, FeatureVector, RawTransaction, FEATURE_COUNT};
use chrono::{Datelike, NaiveDateTime, Timelike};

/// Placeholder until per-user transaction history is available.
pub const TRANSACTION_FREQUENCY: f64 = 1.0;
/// Placeholder until per-user transaction history is available.
pub const TRANSACTION_VELOCITY: f64 = 0.0;

/// A record after parsing, before encoding and scaling.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeatures {
    pub user_id: f64,
    pub purchase_value: f64,
    pub device_id: String,
    pub source: String,
    pub browser: String,
    pub sex: String,
    pub age: f64,
    pub ip_address: u32,
    pub country: String,
    pub transaction_frequency: f64,
    pub transaction_velocity: f64,
    pub signup_hour_of_day: u32,
    pub signup_day_of_week: u32,
    pub purchase_hour_of_day: u32,
    pub purchase_day_of_week: u32,
}

impl RawFeatures {
    fn categorical(&self, feature: Feature) -> Option<&str> {
        match feature {
            Feature::DeviceId => Some(&self.device_id),
            Feature::Source => Some(&self.source),
            Feature::Browser => Some(&self.browser),
            Feature::Sex => Some(&self.sex),
            Feature::Country => Some(&self.country),
            _ => None,
        }
    }

    fn numeric(&self, feature: Feature) -> Option<f64> {
        let value = match feature {
            Feature::UserId => self.user_id,
            Feature::PurchaseValue => self.purchase_value,
            Feature::Age => self.age,
            Feature::IpAddress => self.ip_address as f64,
            Feature::TransactionFrequency => self.transaction_frequency,
            Feature::TransactionVelocity => self.transaction_velocity,
            Feature::SignupHourOfDay => self.signup_hour_of_day as f64,
            Feature::SignupDayOfWeek => self.signup_day_of_week as f64,
            Feature::PurchaseHourOfDay => self.purchase_hour_of_day as f64,
            Feature::PurchaseDayOfWeek => self.purchase_day_of_week as f64,
            _ => return None,
        };
        Some(value)
    }
}

/// Hour of day (0-23) and ISO day of week (0 = Monday).
fn time_parts(dt: &NaiveDateTime) -> (u32, u32) {
    (dt.hour(), dt.weekday().num_days_from_monday())
}

/// Feature extractor that transforms transactions into model input features.
///
/// Holds the preprocessing strategy chosen at startup; derivation itself is
/// a pure function of the record.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    preprocessor: Preprocessor,
}

impl FeatureExtractor {
    pub fn new(preprocessor: Preprocessor) -> Self {
        Self { preprocessor }
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    /// Number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Feature names in model order.
    pub fn feature_names(&self) -> Vec<&'static str> {
        Feature::ALL.iter().map(|f| f.name()).collect()
    }

    /// Parse IP and timestamps and attach the placeholder features.
    pub fn parse(&self, tx: &RawTransaction) -> Result<RawFeatures> {
        let ip_address = ip_to_int(&tx.ip_address)?;
        let (signup_hour_of_day, signup_day_of_week) = time_parts(&parse_timestamp(&tx.signup_time)?);
        let (purchase_hour_of_day, purchase_day_of_week) =
            time_parts(&parse_timestamp(&tx.purchase_time)?);

        Ok(RawFeatures {
            user_id: tx.user_id as f64,
            purchase_value: tx.purchase_value,
            device_id: tx.device_id.clone(),
            source: tx.source.clone(),
            browser: tx.browser.clone(),
            sex: tx.sex.clone(),
            age: tx.age as f64,
            ip_address,
            country: tx.country.clone(),
            transaction_frequency: TRANSACTION_FREQUENCY,
            transaction_velocity: TRANSACTION_VELOCITY,
            signup_hour_of_day,
            signup_day_of_week,
            purchase_hour_of_day,
            purchase_day_of_week,
        })
    }

    /// Derive the scaled model input for a transaction.
    pub fn derive(&self, tx: &RawTransaction) -> Result<FeatureVector> {
        let raw = self.parse(tx)?;
        let mut values = [0.0; FEATURE_COUNT];

        for feature in Feature::ALL {
            let unscaled = match raw.categorical(feature) {
                Some(category) => self.preprocessor.encode(feature, category)?,
                None => raw.numeric(feature).unwrap_or_default(),
            };
            values[feature.index()] = self.preprocessor.scale(feature, unscaled);
        }

        Ok(FeatureVector::new(values))
    }

    /// Derive from an untyped JSON mapping.
    pub fn derive_json(&self, value: serde_json::Value) -> Result<FeatureVector> {
        self.derive(&RawTransaction::from_json(value)?)
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(Preprocessor::SingleRow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::test_support::{sample_json, sample_table};

    fn sample_tx() -> RawTransaction {
        RawTransaction::from_json(sample_json()).unwrap()
    }

    fn fitted_extractor() -> FeatureExtractor {
        FeatureExtractor::new(Preprocessor::Fitted(sample_table().try_into().unwrap()))
    }

    #[test]
    fn test_parse_intermediate_features() {
        let raw = FeatureExtractor::default().parse(&sample_tx()).unwrap();

        assert_eq!(raw.ip_address, 732758448);
        assert_eq!(raw.transaction_frequency, 1.0);
        assert_eq!(raw.transaction_velocity, 0.0);
        // 2015-02-24 22:55:49 is a Tuesday
        assert_eq!((raw.signup_hour_of_day, raw.signup_day_of_week), (22, 1));
        // 2015-04-18 02:47:11 is a Saturday
        assert_eq!((raw.purchase_hour_of_day, raw.purchase_day_of_week), (2, 5));
    }

    #[test]
    fn test_feature_count() {
        let extractor = FeatureExtractor::default();
        assert_eq!(extractor.feature_count(), 15);
        assert_eq!(extractor.feature_names().len(), 15);
        assert_eq!(extractor.feature_names()[7], "ip_address");
    }

    #[test]
    fn test_single_row_derivation_is_all_zero() {
        let features = FeatureExtractor::default().derive(&sample_tx()).unwrap();
        assert!(features.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_derivation_is_deterministic() {
        for extractor in [FeatureExtractor::default(), fitted_extractor()] {
            let first = extractor.derive(&sample_tx()).unwrap();
            let second = extractor.derive(&sample_tx()).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_fitted_derivation() {
        let features = fitted_extractor().derive(&sample_tx()).unwrap();

        assert!((features.get(Feature::UserId) - 0.22058).abs() < 1e-12);
        assert!((features.get(Feature::PurchaseValue) - 0.17).abs() < 1e-12);
        // QVPSPJUOCKZAR is class 1 of 3, scaled over [0, 2]
        assert_eq!(features.get(Feature::DeviceId), 0.5);
        // SEO sorts last among Ads / Direct / SEO
        assert_eq!(features.get(Feature::Source), 1.0);
        assert_eq!(features.get(Feature::Browser), 0.0);
        assert_eq!(features.get(Feature::Sex), 1.0);
        assert_eq!(features.get(Feature::Age), 0.35);
        assert_eq!(features.get(Feature::Country), 0.0);
        assert_eq!(features.get(Feature::TransactionFrequency), 0.0);
        assert_eq!(features.get(Feature::TransactionVelocity), 0.0);
        assert!((features.get(Feature::SignupHourOfDay) - 22.0 / 23.0).abs() < 1e-12);
        assert!((features.get(Feature::PurchaseDayOfWeek) - 5.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_bad_ip_is_invalid_input() {
        let mut value = sample_json();
        value["ip_address"] = serde_json::json!("300.1.1.1");
        let err = FeatureExtractor::default().derive_json(value).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_bad_timestamp_is_invalid_input() {
        let mut value = sample_json();
        value["purchase_time"] = serde_json::json!("not a time");
        let err = FeatureExtractor::default().derive_json(value).unwrap_err();
        assert!(err.to_string().contains("not a time"));
    }

    #[test]
    fn test_unknown_category_with_fitted_table() {
        let mut value = sample_json();
        value["browser"] = serde_json::json!("Netscape");
        let features = fitted_extractor().derive_json(value.clone()).unwrap();
        // reserved code 3 scaled over [0, 2]
        assert_eq!(features.get(Feature::Browser), 1.5);

        let strict = FeatureExtractor::new(
            Preprocessor::Fitted(sample_table().try_into().unwrap()).reject_unknown_categories(true),
        );
        let err = strict.derive_json(value).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_unseen_device_with_shipped_table() {
        let table = concat!(env!("CARGO_MANIFEST_DIR"), "/config/preprocessing.json");
        let extractor = FeatureExtractor::new(Preprocessor::fitted_from_path(table).unwrap());

        let mut value = sample_json();
        value["device_id"] = serde_json::json!("ZZNEWDEVICE01");
        let features = extractor.derive_json(value).unwrap();
        // eight known devices, so the reserved code is 8, scaled over [0, 7]
        assert!((features.get(Feature::DeviceId) - 8.0 / 7.0).abs() < 1e-12);

        let known = extractor.derive_json(sample_json()).unwrap();
        assert!(known.get(Feature::DeviceId) <= 1.0);
    }
}
