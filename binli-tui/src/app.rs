use std::sync::Arc;

use binli_client::BinliClient;
use binli_core::{
    BinType, ConnectionState, DEFAULT_BIN_HEIGHT_CM, DashboardModel, DashboardState,
    DashboardUpdate,
};
use chrono::Utc;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Fill percentage added to every bin by one simulated sensor tick.
const SIMULATED_FILL_STEP: f64 = 2.5;

/// Background task relaying dashboard updates. Aborted when dropped, so the
/// change-feed subscription never outlives the view.
pub(crate) struct Watcher {
    handle: JoinHandle<()>,
}

impl Watcher {
    pub(crate) fn spawn(model: &DashboardModel, updates_tx: mpsc::UnboundedSender<DashboardUpdate>) -> Self {
        let mut updates = model.updates();
        let handle = tokio::spawn(async move {
            while let Some(update) = updates.next().await {
                if updates_tx.send(update).is_err() {
                    break;
                }
            }
        });
        Self { handle }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub(crate) struct App {
    pub client: Arc<BinliClient>,
    pub model: DashboardModel,

    pub selected: usize,

    pub is_loading: bool,
    pub info_message: Option<String>,
    pub error_message: Option<String>,
}

impl App {
    pub(crate) fn new(client: Arc<BinliClient>) -> Self {
        let model = DashboardModel::new(
            Arc::<BinliClient>::clone(&client),
            Arc::<BinliClient>::clone(&client),
        );
        Self {
            client,
            model,
            selected: 0,
            is_loading: false,
            info_message: None,
            error_message: None,
        }
    }

    pub(crate) fn state(&self) -> &DashboardState {
        self.model.state()
    }

    pub(crate) fn apply(&mut self, update: DashboardUpdate) {
        if let DashboardUpdate::Disconnected(reason) = &update {
            self.error_message = Some(format!("Disconnected: {reason}"));
        } else if matches!(self.state().connection, ConnectionState::Disconnected(_)) {
            self.error_message = None;
        }
        self.model.apply(update, Utc::now());
        self.clamp_selection();
    }

    pub(crate) fn is_disconnected(&self) -> bool {
        matches!(self.state().connection, ConnectionState::Disconnected(_))
    }

    pub(crate) fn select_next(&mut self) {
        if self.selected + 1 < self.state().cards.len() {
            self.selected += 1;
        }
    }

    pub(crate) fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub(crate) fn selected_bin(&self) -> Option<BinType> {
        self.state().cards.get(self.selected).map(|card| card.bin_type)
    }

    /// Readings for one simulated sensor tick: every bin fills a little and
    /// wraps back to empty once full. Unknown bins start empty.
    pub(crate) fn simulated_readings(&self) -> Vec<(BinType, f64)> {
        BinType::ALL
            .into_iter()
            .map(|bin_type| {
                let current = self
                    .state()
                    .cards
                    .iter()
                    .find(|card| card.bin_type == bin_type)
                    .map(|card| card.fill_level);
                let next = match current {
                    None => 0.0,
                    Some(fill) if fill >= 100.0 => 0.0,
                    Some(fill) => (fill + SIMULATED_FILL_STEP).min(100.0),
                };
                (bin_type, distance_for_fill(next))
            })
            .collect()
    }

    fn clamp_selection(&mut self) {
        let len = self.state().cards.len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }
}

/// Distance a sensor in a default-height bin reports at the given fill level.
pub(crate) fn distance_for_fill(fill_level: f64) -> f64 {
    DEFAULT_BIN_HEIGHT_CM * (100.0 - fill_level) / 100.0
}
