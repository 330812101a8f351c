//! Request and response bodies of the HTTP API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use binli_core::BinRecord;

/// Body of `POST /bins`.
///
/// Fields are kept loosely typed so that a wrong type is reported as a
/// validation failure of that field rather than a generic decode error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestRequest {
    /// Expected to be `"dry"`, `"wet"` or `"metal"`.
    #[serde(default)]
    pub bin_type: Option<Value>,
    /// Expected to be a non-negative number.
    #[serde(default)]
    pub distance_cm: Option<Value>,
    /// Optional positive number.
    #[serde(default)]
    pub bin_height_cm: Option<Value>,
}

/// Raw values handed to the ingestion processor.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingParts {
    /// Bin type as sent, or its JSON text when it was not a string.
    pub bin_type: String,
    /// Distance, `None` when missing or not a number.
    pub distance_cm: Option<f64>,
    /// Bin height, `None` when missing. A value that is not a number becomes
    /// NaN, which reading validation rejects after checking the other fields.
    pub bin_height_cm: Option<f64>,
}

impl IngestRequest {
    /// Unwrap the JSON values into plain request parts.
    #[must_use]
    pub fn into_parts(self) -> ReadingParts {
        let bin_type = match self.bin_type {
            Some(Value::String(raw)) => raw,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        let distance_cm = self.distance_cm.as_ref().and_then(Value::as_f64);

        let bin_height_cm = match self.bin_height_cm {
            Some(Value::Null) | None => None,
            Some(value) => Some(value.as_f64().unwrap_or(f64::NAN)),
        };

        ReadingParts {
            bin_type,
            distance_cm,
            bin_height_cm,
        }
    }
}

/// Answer to a successful ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    /// Always `true`.
    pub success: bool,
    /// The stored record.
    pub data: BinRecord,
    /// Summary such as `"dry bin updated: 50% full (medium)"`.
    pub message: String,
}

/// Answer to `GET /bins`.
#[derive(Debug, Clone, Serialize)]
pub struct BinsResponse {
    /// Always `true`.
    pub success: bool,
    /// Every record ordered by bin type.
    pub data: Vec<BinRecord>,
}

/// Answer to `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"`.
    pub status: &'static str,
    /// Crate version.
    pub version: &'static str,
}
