// Poll coordinator - latest-reading polling with stale response suppression
use crate::domain::error::DashboardError;
use crate::domain::reading::Reading;
use crate::domain::series::SeriesStore;

/// Identifies one issued request. Values are never reused within a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Fetching(Generation),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Superseded by a newer request or a restart; nothing changed.
    Stale,
    /// Newer than anything seen; `merged` tells whether the series grew.
    Applied { reading: Reading, merged: bool },
    /// Duplicate or regressed timestamp.
    Unchanged,
    /// The source has no reading for the device.
    Empty,
    Failed(DashboardError),
}

#[derive(Debug, Clone)]
pub struct PollCoordinator {
    counter: u64,
    state: PollState,
    last_seen: Option<i64>,
}

impl Default for PollCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl PollCoordinator {
    pub fn new() -> Self {
        Self {
            counter: 0,
            state: PollState::Idle,
            last_seen: None,
        }
    }

    /// Issue a new request token unless one is already in flight.
    pub fn begin(&mut self) -> Option<Generation> {
        if self.is_fetching() {
            return None;
        }
        self.counter += 1;
        let token = Generation(self.counter);
        self.state = PollState::Fetching(token);
        Some(token)
    }

    pub fn complete(
        &mut self,
        token: Generation,
        result: Result<Option<Reading>, DashboardError>,
        series: &mut SeriesStore,
    ) -> PollOutcome {
        if self.state != PollState::Fetching(token) {
            tracing::debug!(
                "Discarding stale poll response {} (current {})",
                token.value(),
                self.counter
            );
            return PollOutcome::Stale;
        }
        self.state = PollState::Idle;

        let reading = match result {
            Ok(Some(reading)) => reading,
            Ok(None) => return PollOutcome::Empty,
            Err(e) => return PollOutcome::Failed(e),
        };

        if self.last_seen.is_some_and(|seen| reading.timestamp <= seen) {
            return PollOutcome::Unchanged;
        }

        self.last_seen = Some(reading.timestamp);
        let merged = series.merge(reading.clone());
        PollOutcome::Applied { reading, merged }
    }

    /// Forget the in-flight request and last-seen timestamp.
    pub fn restart(&mut self) {
        self.state = PollState::Idle;
        self.last_seen = None;
    }

    pub fn is_fetching(&self) -> bool {
        matches!(self.state, PollState::Fetching(_))
    }

    /// Timestamp of the last reading applied since the last restart.
    pub fn last_seen(&self) -> Option<i64> {
        self.last_seen
    }
}
