//! Domain data structures for bins, readings, and stored bin state.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ingest::ValidationError;

/// Waste fractions that have a monitored bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinType {
    /// Dry/residual waste.
    Dry,
    /// Wet/organic waste.
    Wet,
    /// Metal scrap.
    Metal,
}

impl BinType {
    /// Every known bin type, in the order the hardware is labelled.
    pub const ALL: [BinType; 3] = [BinType::Dry, BinType::Wet, BinType::Metal];

    /// Lowercase slug used on the wire and as the storage key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BinType::Dry => "dry",
            BinType::Wet => "wet",
            BinType::Metal => "metal",
        }
    }

    /// Human-friendly label for dashboards.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            BinType::Dry => "Dry Waste",
            BinType::Wet => "Wet Waste",
            BinType::Metal => "Metal Waste",
        }
    }
}

// Records are listed by slug, so "metal" sorts before "wet".
impl Ord for BinType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for BinType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BinType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for BinType {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "dry" => Ok(BinType::Dry),
            "wet" => Ok(BinType::Wet),
            "metal" => Ok(BinType::Metal),
            other => Err(ValidationError::UnknownBinType(other.to_owned())),
        }
    }
}

/// Storage-side severity of a bin, derived from its fill level at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionStatus {
    /// At most 10 % full.
    Empty,
    /// At most 30 % full.
    Low,
    /// At most 60 % full.
    Medium,
    /// At most 85 % full.
    High,
    /// Above 85 %.
    Full,
}

impl IngestionStatus {
    /// Lowercase name as stored.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            IngestionStatus::Empty => "empty",
            IngestionStatus::Low => "low",
            IngestionStatus::Medium => "medium",
            IngestionStatus::High => "high",
            IngestionStatus::Full => "full",
        }
    }
}

impl fmt::Display for IngestionStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A validated distance measurement for one bin.
///
/// Build it with [`BinReading::new`], which applies the default bin height and
/// rejects out-of-range values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinReading {
    pub(crate) bin_type: BinType,
    pub(crate) distance_cm: f64,
    pub(crate) bin_height_cm: f64,
}

impl BinReading {
    /// Bin the sensor is mounted on.
    #[must_use]
    pub fn bin_type(&self) -> BinType {
        self.bin_type
    }

    /// Gap between the sensor and the waste surface, in centimetres.
    #[must_use]
    pub fn distance_cm(&self) -> f64 {
        self.distance_cm
    }

    /// Inner height of the bin, in centimetres.
    #[must_use]
    pub fn bin_height_cm(&self) -> f64 {
        self.bin_height_cm
    }
}

/// Persisted state of a single bin. There is at most one per [`BinType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinRecord {
    /// Unique key of the record.
    pub bin_type: BinType,
    /// Fill percentage in `[0, 100]`, two decimals.
    pub fill_level: f64,
    /// Ingestion-side classification of `fill_level`.
    pub status: IngestionStatus,
    /// Distance reported by the sensor.
    pub distance_cm: f64,
    /// Bin height used for the computation.
    pub bin_height_cm: f64,
    /// Time the record was written.
    pub last_updated: DateTime<Utc>,
}

impl BinRecord {
    /// One-line summary sent back to the sensor after an update.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} bin updated: {}% full ({})",
            self.bin_type, self.fill_level, self.status
        )
    }
}

/// Event emitted by a change feed whenever the stored bin set changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BinChange {
    /// The record for `bin_type` was created or replaced.
    Upserted {
        /// Key of the written record.
        bin_type: BinType,
    },
    /// The subscriber missed events and should reload everything.
    Resync,
}
