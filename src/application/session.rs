// Dashboard session - state owned by one selected device
use crate::application::pagination::{FetchedHistory, PageSettings};
use crate::application::poll_coordinator::{Generation, PollCoordinator, PollOutcome};
use crate::domain::error::DashboardError;
use crate::domain::range::{self, RangeKind, ResolvedRange};
use crate::domain::reading::{DeviceStatus, Reading};
use crate::domain::series::SeriesStore;
use crate::domain::window::{Window, WindowSelector};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub poll_interval: Duration,
    pub pages: PageSettings,
    /// Maximum number of readings retained per device.
    pub history_capacity: usize,
    pub default_range: RangeKind,
    pub alert_temperature: f64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            pages: PageSettings::default(),
            history_capacity: 5000,
            default_range: RangeKind::preset(86_400),
            alert_temperature: 32.0,
        }
    }
}

/// Work the caller must perform: fetch history for `device` over `range`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub token: u64,
    pub device: String,
    pub range: ResolvedRange,
}

/// Work the caller must perform: fetch the latest reading of `device`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRequest {
    pub token: Generation,
    pub device: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStatus {
    pub is_fetching_history: bool,
    pub is_polling: bool,
    pub last_error: Option<String>,
    /// Advisory, e.g. a truncated history.
    pub notice: Option<String>,
}

/// Everything a renderer needs, already windowed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub device: Option<String>,
    pub range_kind: RangeKind,
    pub range: Option<ResolvedRange>,
    pub latest: Option<Reading>,
    pub history: Vec<Reading>,
    pub window: Window,
    /// Drag selection in progress, as `(anchor, cursor)`.
    pub zoom_selection: Option<(i64, i64)>,
    pub status: SessionStatus,
    pub device_status: DeviceStatus,
}

pub struct DashboardSession {
    settings: SessionSettings,
    device: Option<String>,
    range_kind: RangeKind,
    range: Option<ResolvedRange>,
    series: SeriesStore,
    poll: PollCoordinator,
    window: WindowSelector,
    latest: Option<Reading>,
    history_counter: u64,
    history_in_flight: Option<u64>,
    last_error: Option<DashboardError>,
    notice: Option<String>,
}

impl DashboardSession {
    pub fn new(settings: SessionSettings) -> Self {
        let series = SeriesStore::new(settings.history_capacity);
        let range_kind = settings.default_range.clone();
        Self {
            settings,
            device: None,
            range_kind,
            range: None,
            series,
            poll: PollCoordinator::new(),
            window: WindowSelector::new(),
            latest: None,
            history_counter: 0,
            history_in_flight: None,
            last_error: None,
            notice: None,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Switch to another device. Its series starts empty; nothing of the
    /// previous device survives.
    pub fn select_device(
        &mut self,
        device: &str,
        now: i64,
    ) -> Result<HistoryRequest, DashboardError> {
        let resolved = range::resolve(now, &self.range_kind)?;

        tracing::info!("Selecting device {}", device);
        self.device = Some(device.to_string());
        self.series = SeriesStore::new(self.settings.history_capacity);
        self.latest = None;
        self.last_error = None;
        self.restart(resolved);

        Ok(self.issue_history(device.to_string(), resolved))
    }

    /// Change the range. An invalid range leaves the session untouched.
    /// Returns `None` while no device is selected.
    pub fn select_range(
        &mut self,
        kind: RangeKind,
        now: i64,
    ) -> Result<Option<HistoryRequest>, DashboardError> {
        let resolved = range::resolve(now, &kind)?;

        tracing::info!("Selecting range {:?} ({} - {})", kind, resolved.from, resolved.to);
        self.range_kind = kind;
        self.last_error = None;
        self.restart(resolved);

        Ok(self
            .device
            .clone()
            .map(|device| self.issue_history(device, resolved)))
    }

    fn restart(&mut self, resolved: ResolvedRange) {
        self.range = Some(resolved);
        self.poll.restart();
        self.window.reset();
        self.notice = None;
    }

    fn issue_history(&mut self, device: String, range: ResolvedRange) -> HistoryRequest {
        self.history_counter += 1;
        self.history_in_flight = Some(self.history_counter);
        HistoryRequest {
            token: self.history_counter,
            device,
            range,
        }
    }

    /// Returns whether the history was applied.
    pub fn complete_history(
        &mut self,
        token: u64,
        result: Result<FetchedHistory, DashboardError>,
    ) -> bool {
        if self.history_in_flight != Some(token) {
            tracing::debug!("Discarding stale history response {}", token);
            return false;
        }
        self.history_in_flight = None;

        match result {
            Ok(history) => {
                if history.truncated {
                    self.notice = Some(format!(
                        "History truncated after {} pages; results may be incomplete",
                        history.pages
                    ));
                }
                self.series.replace(history.readings);
                // Only a poll applied since the last restart belongs to this history.
                if self.poll.last_seen().is_some() {
                    if let Some(latest) = self.latest.clone() {
                        let in_range = self.range.is_some_and(|r| r.contains(latest.timestamp));
                        if in_range && self.device.as_deref() == Some(latest.device.as_str()) {
                            self.series.merge(latest);
                        }
                    }
                }
                tracing::debug!(
                    "Series for {:?} holds {} of {} readings",
                    self.device,
                    self.series.len(),
                    self.series.capacity()
                );
                true
            }
            Err(e) => {
                tracing::error!("History fetch failed: {}", e);
                self.last_error = Some(e);
                false
            }
        }
    }

    /// Start a latest-reading request unless one is already running.
    pub fn begin_poll(&mut self) -> Option<PollRequest> {
        let device = self.device.clone()?;
        let token = self.poll.begin()?;
        Some(PollRequest { token, device })
    }

    pub fn complete_poll(
        &mut self,
        token: Generation,
        result: Result<Option<Reading>, DashboardError>,
    ) -> PollOutcome {
        let outcome = self.poll.complete(token, result, &mut self.series);
        match &outcome {
            PollOutcome::Applied { reading, .. } => {
                // A history that arrived meanwhile may already hold newer points.
                if self
                    .series
                    .max_timestamp()
                    .is_none_or(|max| reading.timestamp >= max)
                {
                    self.latest = Some(reading.clone());
                }
                self.last_error = None;
            }
            PollOutcome::Unchanged => self.last_error = None,
            PollOutcome::Empty => {
                tracing::debug!("No reading available for {:?}", self.device);
            }
            PollOutcome::Failed(e) => {
                if e.is_retryable() {
                    tracing::warn!("Latest reading fetch failed, retrying next tick: {}", e);
                } else {
                    tracing::error!("Latest reading fetch failed: {}", e);
                }
                self.last_error = Some(e.clone());
            }
            PollOutcome::Stale => {}
        }
        outcome
    }

    pub fn begin_zoom(&mut self, x: i64) {
        self.window.begin(x);
    }

    pub fn extend_zoom(&mut self, x: i64) {
        self.window.extend(x);
    }

    pub fn commit_zoom(&mut self) -> bool {
        self.window.commit()
    }

    pub fn reset_zoom(&mut self) {
        self.window.reset();
    }

    pub fn current_latest(&self) -> Option<&Reading> {
        self.latest.as_ref()
    }

    pub fn current_history(&self) -> Vec<Reading> {
        match self.window.window() {
            Window::Auto => self.series.snapshot(),
            Window::Explicit { left, right } => self.series.between(left, right),
        }
    }

    pub fn current_window(&self) -> Window {
        self.window.window()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            is_fetching_history: self.history_in_flight.is_some(),
            is_polling: self.poll.is_fetching(),
            last_error: self.last_error.as_ref().map(|e| e.to_string()),
            notice: self.notice.clone(),
        }
    }

    pub fn device_status(&self) -> DeviceStatus {
        DeviceStatus::evaluate(self.latest.as_ref(), self.settings.alert_temperature)
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            device: self.device.clone(),
            range_kind: self.range_kind.clone(),
            range: self.range,
            latest: self.current_latest().cloned(),
            history: self.current_history(),
            window: self.current_window(),
            zoom_selection: self.window.provisional(),
            status: self.status(),
            device_status: self.device_status(),
        }
    }
}
