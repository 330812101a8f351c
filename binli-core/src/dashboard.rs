//! Dashboard view model: display statuses, the compliance score, and the
//! update stream that keeps them in sync with the store.
//!
//! Display statuses are a separate three-tier taxonomy with their own
//! thresholds. They are never stored and never derived from
//! [`IngestionStatus`](crate::model::IngestionStatus).

use std::fmt;
use std::sync::Arc;

use async_stream::stream;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::model::{BinRecord, BinType};
use crate::ports::{BinSource, ChangeFeed, PortError};

const DISPLAY_FULL_MIN: f64 = 95.0;
const DISPLAY_WARNING_MIN: f64 = 80.0;

const EXCELLENT_MIN_SCORE: u8 = 80;
const GOOD_MIN_SCORE: u8 = 60;

/// Display-side severity of a bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    /// Below 80 %.
    Normal,
    /// 80 % up to, but excluding, 95 %.
    Warning,
    /// 95 % and above.
    Full,
}

impl DisplayStatus {
    /// Points this bin contributes to the compliance score.
    #[must_use]
    pub fn compliance_points(self) -> u32 {
        match self {
            DisplayStatus::Full => 30,
            DisplayStatus::Warning => 70,
            DisplayStatus::Normal => 95,
        }
    }

    /// Badge text shown on a bin card.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            DisplayStatus::Full => "Full",
            DisplayStatus::Warning => "Nearly Full",
            DisplayStatus::Normal => "Good",
        }
    }
}

/// Display-side classification of a fill level.
#[must_use]
pub fn derive_display_status(fill_level: f64) -> DisplayStatus {
    if fill_level >= DISPLAY_FULL_MIN {
        DisplayStatus::Full
    } else if fill_level >= DISPLAY_WARNING_MIN {
        DisplayStatus::Warning
    } else {
        DisplayStatus::Normal
    }
}

/// Mean of the per-bin compliance points, rounded half-up. `0` when there are no bins.
#[must_use]
pub fn compute_compliance_score<I>(statuses: I) -> u8
where
    I: IntoIterator<Item = DisplayStatus>,
{
    let (total, count) = statuses
        .into_iter()
        .fold((0_u64, 0_u64), |(total, count), status| {
            (
                total.saturating_add(u64::from(status.compliance_points())),
                count.saturating_add(1),
            )
        });

    if count == 0 {
        return 0;
    }

    // (2 * total + count) / (2 * count) == floor(total / count + 0.5)
    let rounded = (2 * total + count) / (2 * count);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}

/// Qualitative band of a compliance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceRating {
    /// 80 and above.
    Excellent,
    /// 60 to 79.
    Good,
    /// Below 60.
    NeedsAttention,
}

impl ComplianceRating {
    /// Band for the given score.
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        if score >= EXCELLENT_MIN_SCORE {
            ComplianceRating::Excellent
        } else if score >= GOOD_MIN_SCORE {
            ComplianceRating::Good
        } else {
            ComplianceRating::NeedsAttention
        }
    }
}

impl fmt::Display for ComplianceRating {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ComplianceRating::Excellent => "Excellent",
            ComplianceRating::Good => "Good",
            ComplianceRating::NeedsAttention => "Needs Attention",
        };
        formatter.write_str(text)
    }
}

/// What the renderer needs to draw one bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinCard {
    /// Bin shown on the card.
    pub bin_type: BinType,
    /// Fill percentage as stored.
    pub fill_level: f64,
    /// Display-side severity.
    pub status: DisplayStatus,
}

impl From<&BinRecord> for BinCard {
    fn from(record: &BinRecord) -> Self {
        Self {
            bin_type: record.bin_type,
            fill_level: record.fill_level,
            status: derive_display_status(record.fill_level),
        }
    }
}

/// Link state between the dashboard and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No snapshot received yet.
    #[default]
    Connecting,
    /// The last fetch succeeded.
    Connected,
    /// A fetch or the change feed failed.
    Disconnected(String),
}

/// Everything the dashboard renders.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    /// One card per known bin, ordered by bin type.
    pub cards: Vec<BinCard>,
    /// Overall compliance score of `cards`.
    pub compliance_score: u8,
    /// Link state shown as a badge.
    pub connection: ConnectionState,
    /// Time the last snapshot was applied.
    pub last_update: Option<DateTime<Utc>>,
}

impl DashboardState {
    /// Replace the displayed bins with a fresh snapshot and recompute the score.
    pub fn apply_snapshot(&mut self, records: &[BinRecord], now: DateTime<Utc>) {
        let mut cards: Vec<BinCard> = records.iter().map(BinCard::from).collect();
        cards.sort_by_key(|card| card.bin_type);

        self.compliance_score = compute_compliance_score(cards.iter().map(|card| card.status));
        self.cards = cards;
        self.connection = ConnectionState::Connected;
        self.last_update = Some(now);
    }

    /// Record a transport failure. Last known cards and score stay visible.
    pub fn mark_disconnected(&mut self, reason: impl Into<String>) {
        self.connection = ConnectionState::Disconnected(reason.into());
    }

    /// Apply one update from [`DashboardModel::updates`].
    pub fn apply(&mut self, update: DashboardUpdate, now: DateTime<Utc>) {
        match update {
            DashboardUpdate::Snapshot(records) => self.apply_snapshot(&records, now),
            DashboardUpdate::Disconnected(reason) => self.mark_disconnected(reason),
        }
    }

    /// Qualitative band of the current score.
    #[must_use]
    pub fn rating(&self) -> ComplianceRating {
        ComplianceRating::from_score(self.compliance_score)
    }
}

/// Item of the dashboard update stream.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardUpdate {
    /// The full current set of records.
    Snapshot(Vec<BinRecord>),
    /// Fetching or listening failed.
    Disconnected(String),
}

/// View model bound to a record source and a change feed.
pub struct DashboardModel {
    source: Arc<dyn BinSource>,
    feed: Arc<dyn ChangeFeed>,
    state: DashboardState,
}

impl DashboardModel {
    /// Bind a view model to its collaborators.
    #[must_use]
    pub fn new(source: Arc<dyn BinSource>, feed: Arc<dyn ChangeFeed>) -> Self {
        Self {
            source,
            feed,
            state: DashboardState::default(),
        }
    }

    /// Current render state.
    #[must_use]
    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Apply an update received from [`Self::updates`].
    pub fn apply(&mut self, update: DashboardUpdate, now: DateTime<Utc>) {
        self.state.apply(update, now);
    }

    /// Fetch all records now and recompute (manual refresh).
    ///
    /// # Errors
    ///
    /// Returns the [`PortError`] of a failed fetch after marking the state disconnected.
    pub async fn refresh(&mut self, now: DateTime<Utc>) -> Result<(), PortError> {
        match self.source.fetch_all().await {
            Ok(records) => {
                self.state.apply_snapshot(&records, now);
                Ok(())
            }
            Err(err) => {
                self.state.mark_disconnected(err.to_string());
                Err(err)
            }
        }
    }

    /// Subscribe to the change feed and yield a snapshot for the initial load
    /// and after every notification.
    ///
    /// A failed fetch yields [`DashboardUpdate::Disconnected`] and listening
    /// continues. A failed or closed feed yields one final
    /// [`DashboardUpdate::Disconnected`]. Dropping the stream drops the subscription.
    #[must_use]
    pub fn updates(&self) -> BoxStream<'static, DashboardUpdate> {
        let source = Arc::clone(&self.source);
        let feed = Arc::clone(&self.feed);

        Box::pin(stream! {
            // Subscribe before the first fetch so nothing written in between is missed.
            let mut changes = match feed.subscribe().await {
                Ok(changes) => changes,
                Err(err) => {
                    yield DashboardUpdate::Disconnected(err.to_string());
                    return;
                }
            };

            yield snapshot(source.as_ref()).await;

            while let Some(change) = changes.next().await {
                match change {
                    Ok(_) => {
                        yield snapshot(source.as_ref()).await;
                    }
                    Err(err) => {
                        yield DashboardUpdate::Disconnected(err.to_string());
                        return;
                    }
                }
            }

            yield DashboardUpdate::Disconnected(PortError::FeedClosed.to_string());
        })
    }
}

async fn snapshot(source: &dyn BinSource) -> DashboardUpdate {
    match source.fetch_all().await {
        Ok(records) => DashboardUpdate::Snapshot(records),
        Err(err) => DashboardUpdate::Disconnected(err.to_string()),
    }
}
