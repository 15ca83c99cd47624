//! Model input columns and the feature vector handed to the classifier

use serde::{Serialize, Serializer};
use std::fmt;

/// Number of model input features.
pub const FEATURE_COUNT: usize = 15;

/// One model input column. Discriminants are the column positions the
/// classifier was trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    UserId = 0,
    PurchaseValue,
    DeviceId,
    Source,
    Browser,
    Sex,
    Age,
    IpAddress,
    Country,
    TransactionFrequency,
    TransactionVelocity,
    SignupHourOfDay,
    SignupDayOfWeek,
    PurchaseHourOfDay,
    PurchaseDayOfWeek,
}

impl Feature {
    /// All features in model order.
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::UserId,
        Feature::PurchaseValue,
        Feature::DeviceId,
        Feature::Source,
        Feature::Browser,
        Feature::Sex,
        Feature::Age,
        Feature::IpAddress,
        Feature::Country,
        Feature::TransactionFrequency,
        Feature::TransactionVelocity,
        Feature::SignupHourOfDay,
        Feature::SignupDayOfWeek,
        Feature::PurchaseHourOfDay,
        Feature::PurchaseDayOfWeek,
    ];

    /// Columns that are label-encoded before scaling.
    pub const CATEGORICAL: [Feature; 5] = [
        Feature::DeviceId,
        Feature::Source,
        Feature::Browser,
        Feature::Sex,
        Feature::Country,
    ];

    /// Position in the feature vector.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column name as used in training data and preprocessing tables.
    pub fn name(self) -> &'static str {
        match self {
            Feature::UserId => "user_id",
            Feature::PurchaseValue => "purchase_value",
            Feature::DeviceId => "device_id",
            Feature::Source => "source",
            Feature::Browser => "browser",
            Feature::Sex => "sex",
            Feature::Age => "age",
            Feature::IpAddress => "ip_address",
            Feature::Country => "country",
            Feature::TransactionFrequency => "transaction_frequency",
            Feature::TransactionVelocity => "transaction_velocity",
            Feature::SignupHourOfDay => "signup_hour_of_day",
            Feature::SignupDayOfWeek => "signup_day_of_week",
            Feature::PurchaseHourOfDay => "purchase_hour_of_day",
            Feature::PurchaseDayOfWeek => "purchase_day_of_week",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn is_categorical(self) -> bool {
        Self::CATEGORICAL.contains(&self)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered model input. Length and column order are fixed by the type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.0[feature.index()]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Single-precision copy for ONNX tensors.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        self.0.iter().map(|&v| v as f32).collect()
    }

    /// `(column name, value)` pairs in model order.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        Feature::ALL.iter().map(move |f| (f.name(), self.get(*f)))
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for (name, value) in self.named() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_order() {
        let names: Vec<&str> = Feature::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(
            names,
            vec![
                "user_id",
                "purchase_value",
                "device_id",
                "source",
                "browser",
                "sex",
                "age",
                "ip_address",
                "country",
                "transaction_frequency",
                "transaction_velocity",
                "signup_hour_of_day",
                "signup_day_of_week",
                "purchase_hour_of_day",
                "purchase_day_of_week",
            ]
        );
        for (i, f) in Feature::ALL.iter().enumerate() {
            assert_eq!(f.index(), i);
        }
    }

    #[test]
    fn test_from_name_round_trips() {
        for f in Feature::ALL {
            assert_eq!(Feature::from_name(f.name()), Some(f));
        }
        assert_eq!(Feature::from_name("signup_time"), None);
    }

    #[test]
    fn test_categorical_subset() {
        assert!(Feature::Country.is_categorical());
        assert!(!Feature::Age.is_categorical());
    }

    #[test]
    fn test_vector_serializes_in_order() {
        let mut values = [0.0; FEATURE_COUNT];
        values[Feature::Age.index()] = 0.5;
        let json = serde_json::to_string(&FeatureVector::new(values)).unwrap();
        assert!(json.starts_with("{\"user_id\":0.0,\"purchase_value\""));
        assert!(json.contains("\"age\":0.5"));
    }
}
