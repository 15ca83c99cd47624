//! Raw transaction record received by the inference endpoint

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// A single transaction as submitted for scoring.
///
/// Field names follow the e-commerce fraud dataset the model was trained on.
/// Unknown fields (e.g. `purchase_id`, `class`) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    /// Account identifier
    #[serde(deserialize_with = "numeric")]
    pub user_id: i64,

    /// Purchase amount
    #[serde(deserialize_with = "numeric")]
    pub purchase_value: f64,

    /// Device fingerprint
    #[serde(deserialize_with = "categorical")]
    pub device_id: String,

    /// Acquisition channel (SEO, Ads, Direct)
    #[serde(deserialize_with = "categorical")]
    pub source: String,

    /// Browser family
    #[serde(deserialize_with = "categorical")]
    pub browser: String,

    /// Sex (M / F)
    #[serde(deserialize_with = "categorical")]
    pub sex: String,

    /// Age in years
    #[serde(deserialize_with = "numeric")]
    pub age: i64,

    /// Dotted-quad IPv4 address
    pub ip_address: String,

    /// Country resolved from the IP address
    #[serde(deserialize_with = "categorical")]
    pub country: String,

    /// Account creation time
    pub signup_time: String,

    /// Purchase time
    pub purchase_time: String,
}

impl RawTransaction {
    /// Build a record from an untyped JSON mapping.
    ///
    /// Absent or mistyped fields surface as [`Error::InvalidInput`] with the
    /// offending field named in the message.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::invalid_input("transaction must be a JSON object"));
        }
        serde_json::from_value(value).map_err(|e| Error::invalid_input(e.to_string()))
    }
}

/// Accept a JSON number or a string holding one, as form clients post
/// every field as a string.
fn numeric<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    use serde::de::Error as _;

    let number = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n,
        serde_json::Value::String(s) => s
            .trim()
            .parse::<serde_json::Number>()
            .map_err(|_| D::Error::custom(format!("expected a number, found \"{s}\"")))?,
        other => {
            return Err(D::Error::custom(format!(
                "expected a number, found {other}"
            )))
        }
    };
    serde_json::from_value(serde_json::Value::Number(number)).map_err(D::Error::custom)
}

/// Accept any non-null JSON scalar for a categorical field and keep its
/// string form, so `"country": 1` and `"country": "1"` encode identically.
fn categorical<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(D::Error::custom(format!(
            "expected a categorical scalar, found {other}"
        ))),
    }
}
