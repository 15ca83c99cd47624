//! Shared fixtures for unit tests

use crate::preprocessing::{FeatureRange, PreprocessingTable};
use crate::types::Feature;
use serde_json::json;
use std::collections::BTreeMap;

/// A record shaped like a row of the training dataset.
pub(crate) fn sample_json() -> serde_json::Value {
    json!({
        "user_id": 22058,
        "signup_time": "2015-02-24 22:55:49",
        "purchase_time": "2015-04-18 02:47:11",
        "purchase_value": 34,
        "device_id": "QVPSPJUOCKZAR",
        "source": "SEO",
        "browser": "Chrome",
        "sex": "M",
        "age": 39,
        "ip_address": "43.173.1.176",
        "country": "Japan"
    })
}

/// A complete table with small, hand-checkable bounds.
pub(crate) fn sample_table() -> PreprocessingTable {
    let mut categories = BTreeMap::new();
    categories.insert(
        "device_id".to_string(),
        vec!["AAA".to_string(), "QVPSPJUOCKZAR".to_string(), "ZZZ".to_string()],
    );
    categories.insert(
        "source".to_string(),
        vec!["SEO".to_string(), "Ads".to_string(), "Direct".to_string()],
    );
    categories.insert(
        "browser".to_string(),
        vec!["Chrome".to_string(), "FireFox".to_string(), "Safari".to_string()],
    );
    categories.insert("sex".to_string(), vec!["F".to_string(), "M".to_string()]);
    categories.insert(
        "country".to_string(),
        vec!["Japan".to_string(), "United States".to_string()],
    );

    let bounds: [(Feature, f64, f64); 15] = [
        (Feature::UserId, 0.0, 100_000.0),
        (Feature::PurchaseValue, 0.0, 200.0),
        (Feature::DeviceId, 0.0, 2.0),
        (Feature::Source, 0.0, 2.0),
        (Feature::Browser, 0.0, 2.0),
        (Feature::Sex, 0.0, 1.0),
        (Feature::Age, 18.0, 78.0),
        (Feature::IpAddress, 0.0, u32::MAX as f64),
        (Feature::Country, 0.0, 1.0),
        (Feature::TransactionFrequency, 1.0, 1.0),
        (Feature::TransactionVelocity, 0.0, 0.0),
        (Feature::SignupHourOfDay, 0.0, 23.0),
        (Feature::SignupDayOfWeek, 0.0, 6.0),
        (Feature::PurchaseHourOfDay, 0.0, 23.0),
        (Feature::PurchaseDayOfWeek, 0.0, 6.0),
    ];
    let ranges = bounds
        .into_iter()
        .map(|(f, min, max)| (f.name().to_string(), FeatureRange { min, max }))
        .collect();

    PreprocessingTable { categories, ranges }
}

