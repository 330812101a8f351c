//! Sensor-to-status pipeline: validate a reading, compute the fill level,
//! classify it and upsert the resulting record.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::model::{BinReading, BinRecord, BinType, IngestionStatus};
use crate::ports::{BinStore, PortError};

/// Bin height assumed when a reading does not carry one.
pub const DEFAULT_BIN_HEIGHT_CM: f64 = 30.0;

/// Upper fill bounds (inclusive) of the empty, low, medium and high tiers.
const EMPTY_MAX: f64 = 10.0;
const LOW_MAX: f64 = 30.0;
const MEDIUM_MAX: f64 = 60.0;
const HIGH_MAX: f64 = 85.0;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
/// A reading was rejected before anything was written.
pub enum ValidationError {
    /// `bin_type` is not one of dry, wet or metal.
    #[error("Invalid bin_type {0:?}. Must be dry, wet, or metal")]
    UnknownBinType(String),
    /// `distance_cm` is missing, not a number, or negative.
    #[error("Invalid distance_cm. Must be a non-negative number")]
    InvalidDistance,
    /// `bin_height_cm` is not a positive number.
    #[error("Invalid bin_height_cm. Must be a positive number")]
    InvalidBinHeight,
}

impl ValidationError {
    /// Name of the request field that failed validation.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::UnknownBinType(_) => "bin_type",
            ValidationError::InvalidDistance => "distance_cm",
            ValidationError::InvalidBinHeight => "bin_height_cm",
        }
    }
}

#[derive(thiserror::Error, Debug)]
/// Failure of an ingestion or read-all call.
pub enum IngestError {
    /// The reading was invalid; storage was not touched.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The store failed. Not retried here.
    #[error("Failed to access bin store: {0}")]
    Storage(#[source] PortError),
}

impl BinReading {
    /// Validate raw request values into a reading.
    ///
    /// `bin_height_cm` falls back to [`DEFAULT_BIN_HEIGHT_CM`].
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first offending field.
    pub fn new(
        bin_type: &str,
        distance_cm: Option<f64>,
        bin_height_cm: Option<f64>,
    ) -> Result<Self, ValidationError> {
        let bin_type = bin_type.parse::<BinType>()?;

        let distance_cm = distance_cm
            .filter(|distance| distance.is_finite() && *distance >= 0.0)
            .ok_or(ValidationError::InvalidDistance)?;

        let bin_height_cm = bin_height_cm.unwrap_or(DEFAULT_BIN_HEIGHT_CM);
        if !bin_height_cm.is_finite() || bin_height_cm <= 0.0 {
            return Err(ValidationError::InvalidBinHeight);
        }

        Ok(Self {
            bin_type,
            distance_cm,
            bin_height_cm,
        })
    }
}

/// Percentage of the bin that is full, clamped to `[0, 100]` and rounded to two decimals.
///
/// The sensor measures the empty gap above the waste, so a smaller distance
/// means a fuller bin. Distances beyond the bin height clamp to 0, and so
/// does any input that has no meaningful ratio (zero height, NaN).
#[must_use]
pub fn calculate_fill_level(distance_cm: f64, bin_height_cm: f64) -> f64 {
    let raw = (bin_height_cm - distance_cm) / bin_height_cm * 100.0;
    if raw.is_nan() {
        return 0.0;
    }
    round_to_hundredths(raw.clamp(0.0, 100.0))
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Ingestion-side classification of a fill level.
#[must_use]
pub fn classify_ingestion_status(fill_level: f64) -> IngestionStatus {
    if fill_level <= EMPTY_MAX {
        IngestionStatus::Empty
    } else if fill_level <= LOW_MAX {
        IngestionStatus::Low
    } else if fill_level <= MEDIUM_MAX {
        IngestionStatus::Medium
    } else if fill_level <= HIGH_MAX {
        IngestionStatus::High
    } else {
        IngestionStatus::Full
    }
}

/// Source of `last_updated` timestamps.
pub type Clock = fn() -> DateTime<Utc>;

/// Entry point used by request handlers to ingest sensor readings.
pub struct IngestionProcessor {
    store: Arc<dyn BinStore>,
    clock: Clock,
}

impl IngestionProcessor {
    /// Create a processor writing into the given store.
    #[must_use]
    pub fn new(store: Arc<dyn BinStore>) -> Self {
        Self {
            store,
            clock: Utc::now,
        }
    }

    /// Replace the wall clock, mostly for deterministic tests.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Compute the record a reading produces at `now` without storing it.
    #[must_use]
    pub fn build_record(reading: &BinReading, now: DateTime<Utc>) -> BinRecord {
        let fill_level = calculate_fill_level(reading.distance_cm, reading.bin_height_cm);
        BinRecord {
            bin_type: reading.bin_type,
            fill_level,
            status: classify_ingestion_status(fill_level),
            distance_cm: reading.distance_cm,
            bin_height_cm: reading.bin_height_cm,
            last_updated: now,
        }
    }

    /// Validate raw request values, then ingest them.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Validation`] without touching the store when the
    /// values are invalid, or [`IngestError::Storage`] when the upsert fails.
    pub async fn ingest(
        &self,
        bin_type: &str,
        distance_cm: Option<f64>,
        bin_height_cm: Option<f64>,
    ) -> Result<BinRecord, IngestError> {
        let reading = BinReading::new(bin_type, distance_cm, bin_height_cm).inspect_err(|err| {
            warn!(field = err.field(), %err, "rejected bin reading");
        })?;
        self.ingest_reading(&reading).await
    }

    /// Compute and upsert an already validated reading.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Storage`] when the upsert fails.
    pub async fn ingest_reading(&self, reading: &BinReading) -> Result<BinRecord, IngestError> {
        let record = Self::build_record(reading, (self.clock)());

        let stored = self.store.upsert(record).await.map_err(|err| {
            error!(bin_type = %reading.bin_type, %err, "failed to upsert bin record");
            IngestError::Storage(err)
        })?;

        info!(
            bin_type = %stored.bin_type,
            fill_level = stored.fill_level,
            status = %stored.status,
            "bin reading ingested"
        );
        Ok(stored)
    }

    /// Every stored record ordered by bin type.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Storage`] when the store cannot be read.
    pub async fn bins(&self) -> Result<Vec<BinRecord>, IngestError> {
        self.store.fetch_all().await.map_err(|err| {
            error!(%err, "failed to fetch bin records");
            IngestError::Storage(err)
        })
    }
}
