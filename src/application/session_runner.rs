// Session runner - drives one dashboard session on a tokio task
use crate::application::pagination::{FetchedHistory, fetch_all};
use crate::application::poll_coordinator::Generation;
use crate::application::reading_source::ReadingSource;
use crate::application::session::{
    DashboardSession, DashboardView, HistoryRequest, PollRequest, SessionSettings, SessionStatus,
};
use crate::domain::error::DashboardError;
use crate::domain::range::RangeKind;
use crate::domain::reading::Reading;
use crate::domain::window::Window;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Interval, MissedTickBehavior};

type Reply = oneshot::Sender<Result<(), DashboardError>>;

enum Command {
    SelectDevice(String, Reply),
    SelectRange(RangeKind, Reply),
    Refresh,
    BeginZoom(i64),
    ExtendZoom(i64),
    CommitZoom,
    ResetZoom,
}

enum Completion {
    Poll(Generation, Result<Option<Reading>, DashboardError>),
    History(u64, Result<FetchedHistory, DashboardError>),
}

/// Cloneable handle to a running session. The session stops once every
/// handle is dropped.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<DashboardView>,
}

pub fn spawn_session(source: Arc<dyn ReadingSource>, settings: SessionSettings) -> SessionHandle {
    let (command_tx, command_rx) = mpsc::channel(32);
    let (done_tx, done_rx) = mpsc::channel(32);
    let session = DashboardSession::new(settings);
    let (view_tx, view_rx) = watch::channel(session.view());

    let runner = SessionRunner {
        session,
        source,
        ticker: None,
        done_tx,
        view_tx,
    };
    tokio::spawn(runner.run(command_rx, done_rx));

    SessionHandle {
        commands: command_tx,
        view: view_rx,
    }
}

impl SessionHandle {
    pub async fn select_device(&self, device: &str) -> Result<(), DashboardError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::SelectDevice(device.to_string(), tx)).await?;
        rx.await.map_err(|_| DashboardError::SessionClosed)?
    }

    pub async fn select_range(&self, kind: RangeKind) -> Result<(), DashboardError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::SelectRange(kind, tx)).await?;
        rx.await.map_err(|_| DashboardError::SessionClosed)?
    }

    /// Poll now instead of waiting for the next tick.
    pub async fn refresh(&self) -> Result<(), DashboardError> {
        self.send(Command::Refresh).await
    }

    pub async fn begin_zoom(&self, x: i64) -> Result<(), DashboardError> {
        self.send(Command::BeginZoom(x)).await
    }

    pub async fn extend_zoom(&self, x: i64) -> Result<(), DashboardError> {
        self.send(Command::ExtendZoom(x)).await
    }

    pub async fn commit_zoom(&self) -> Result<(), DashboardError> {
        self.send(Command::CommitZoom).await
    }

    pub async fn reset_zoom(&self) -> Result<(), DashboardError> {
        self.send(Command::ResetZoom).await
    }

    pub fn view(&self) -> DashboardView {
        self.view.borrow().clone()
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<DashboardView> {
        self.view.clone()
    }

    pub fn current_latest(&self) -> Option<Reading> {
        self.view.borrow().latest.clone()
    }

    pub fn current_history(&self) -> Vec<Reading> {
        self.view.borrow().history.clone()
    }

    pub fn current_window(&self) -> Window {
        self.view.borrow().window
    }

    pub fn status(&self) -> SessionStatus {
        self.view.borrow().status.clone()
    }

    async fn send(&self, command: Command) -> Result<(), DashboardError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| DashboardError::SessionClosed)
    }
}

struct SessionRunner {
    session: DashboardSession,
    source: Arc<dyn ReadingSource>,
    /// Present only while a device is selected.
    ticker: Option<Interval>,
    done_tx: mpsc::Sender<Completion>,
    view_tx: watch::Sender<DashboardView>,
}

impl SessionRunner {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut done: mpsc::Receiver<Completion>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(completion) = done.recv() => self.handle_completion(completion),
                _ = next_tick(&mut self.ticker) => self.start_poll(),
            }
            self.view_tx.send_replace(self.session.view());
        }
        tracing::debug!("Dashboard session stopped");
    }

    fn handle_command(&mut self, command: Command) {
        let now = chrono::Utc::now().timestamp();
        match command {
            Command::SelectDevice(device, reply) => {
                let result = self.session.select_device(&device, now).map(|request| {
                    self.restart_ticker();
                    self.start_history(request);
                });
                let _ = reply.send(result);
            }
            Command::SelectRange(kind, reply) => {
                let result = self.session.select_range(kind, now).map(|request| {
                    if let Some(request) = request {
                        self.restart_ticker();
                        self.start_history(request);
                    }
                });
                let _ = reply.send(result);
            }
            Command::Refresh => self.start_poll(),
            Command::BeginZoom(x) => self.session.begin_zoom(x),
            Command::ExtendZoom(x) => self.session.extend_zoom(x),
            Command::CommitZoom => {
                self.session.commit_zoom();
            }
            Command::ResetZoom => self.session.reset_zoom(),
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Poll(token, result) => {
                self.session.complete_poll(token, result);
            }
            Completion::History(token, result) => {
                self.session.complete_history(token, result);
            }
        }
    }

    /// Drop the previous timer before arming a new one; its first tick fires immediately.
    fn restart_ticker(&mut self) {
        self.ticker = None;
        let mut ticker = tokio::time::interval(self.session.settings().poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
    }

    fn start_poll(&mut self) {
        let Some(PollRequest { token, device }) = self.session.begin_poll() else {
            return;
        };
        let source = self.source.clone();
        let done = self.done_tx.clone();
        tokio::spawn(async move {
            let result = source.get_latest(&device).await;
            let _ = done.send(Completion::Poll(token, result)).await;
        });
    }

    fn start_history(&mut self, request: HistoryRequest) {
        let HistoryRequest { token, device, range } = request;
        let pages = self.session.settings().pages;
        let source = self.source.clone();
        let done = self.done_tx.clone();
        tracing::info!("Fetching history for {} from {} to {}", device, range.from, range.to);
        tokio::spawn(async move {
            let result = fetch_all(source.as_ref(), &device, range, pages).await;
            let _ = done.send(Completion::History(token, result)).await;
        });
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::reading_source::testing::{ScriptedSource, raw, reading};
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    fn settings() -> SessionSettings {
        SessionSettings {
            poll_interval: Duration::from_secs(3600),
            default_range: RangeKind::All,
            ..Default::default()
        }
    }

    async fn wait_for<F>(handle: &SessionHandle, condition: F) -> DashboardView
    where
        F: Fn(&DashboardView) -> bool,
    {
        let mut rx = handle.subscribe();
        tokio::time::timeout(WAIT, rx.wait_for(|view| condition(view)))
            .await
            .expect("condition not reached in time")
            .expect("session stopped")
            .clone()
    }

    fn timestamps(view: &DashboardView) -> Vec<i64> {
        view.history.iter().map(|r| r.timestamp).collect()
    }

    #[tokio::test]
    async fn test_select_device_loads_history_and_polls() {
        let source = Arc::new(
            ScriptedSource::new()
                .with_page("B2", None, vec![raw(10, 1.0), raw(20, 2.0)], Some("next"))
                .with_page("B2", Some("next"), vec![raw(30, 3.0)], None)
                .with_latest(reading("B2", 40)),
        );
        let handle = spawn_session(source.clone(), settings());

        handle.select_device("B2").await.unwrap();
        let view = wait_for(&handle, |v| v.history.len() == 4).await;

        assert_eq!(timestamps(&view), vec![10, 20, 30, 40]);
        assert_eq!(view.latest.unwrap().timestamp, 40);
        assert_eq!(source.range_calls(), 2);
    }

    #[tokio::test]
    async fn test_slow_response_from_previous_device_is_ignored() {
        let source = Arc::new(
            ScriptedSource::new()
                .with_latest(reading("B1", 999))
                .with_latest(reading("B2", 50))
                .with_latest_delay("B1", Duration::from_millis(200)),
        );
        let handle = spawn_session(source.clone(), settings());

        handle.select_device("B1").await.unwrap();
        handle.select_device("B2").await.unwrap();

        wait_for(&handle, |v| v.latest.is_some()).await;
        tokio::time::sleep(Duration::from_millis(400)).await;

        let view = handle.view();
        assert_eq!(view.device.as_deref(), Some("B2"));
        assert_eq!(view.latest.unwrap().device, "B2");
        assert!(view.history.iter().all(|r| r.device == "B2"));
    }

    #[tokio::test]
    async fn test_invalid_range_is_reported_to_caller() {
        let source = Arc::new(ScriptedSource::new());
        let handle = spawn_session(source, settings());

        let result = handle
            .select_range(RangeKind::explicit("2024-05-02", "2024-05-01"))
            .await;

        assert!(matches!(result, Err(DashboardError::InvalidRange(_))));
        assert_eq!(handle.view().range_kind, RangeKind::All);
    }

    #[tokio::test]
    async fn test_zoom_commands_update_view() {
        let source = Arc::new(ScriptedSource::new().with_page(
            "B3",
            None,
            (1..=5).map(|i| raw(i * 100, 0.0)).collect(),
            None,
        ));
        let handle = spawn_session(source, settings());
        handle.select_device("B3").await.unwrap();
        wait_for(&handle, |v| v.history.len() == 5).await;

        handle.begin_zoom(400).await.unwrap();
        handle.extend_zoom(200).await.unwrap();
        handle.commit_zoom().await.unwrap();
        let view = wait_for(&handle, |v| v.window != Window::Auto).await;

        assert_eq!(view.window, Window::Explicit { left: 200, right: 400 });
        assert_eq!(timestamps(&view), vec![200, 300, 400]);

        handle.reset_zoom().await.unwrap();
        let view = wait_for(&handle, |v| v.window == Window::Auto).await;
        assert_eq!(view.history.len(), 5);
    }

    #[tokio::test]
    async fn test_refresh_appends_new_reading() {
        let source = Arc::new(ScriptedSource::new().with_latest(reading("B1", 100)));
        let handle = spawn_session(source.clone(), settings());
        handle.select_device("B1").await.unwrap();
        wait_for(&handle, |v| {
            v.latest.is_some() && !v.status.is_polling && !v.status.is_fetching_history
        })
        .await;

        source.set_latest(reading("B1", 110));
        handle.refresh().await.unwrap();
        let view = wait_for(&handle, |v| v.history.len() == 2).await;

        assert_eq!(timestamps(&view), vec![100, 110]);
        assert_eq!(handle.current_latest().unwrap().timestamp, 110);
    }

    #[tokio::test]
    async fn test_source_failure_keeps_previous_series() {
        let source = Arc::new(
            ScriptedSource::new().with_page("B2", None, vec![raw(10, 1.0), raw(20, 2.0)], None),
        );
        let handle = spawn_session(source.clone(), settings());
        handle.select_device("B2").await.unwrap();
        wait_for(&handle, |v| v.history.len() == 2 && !v.status.is_polling).await;

        source.fail_with(Some(DashboardError::SourceUnavailable("down".to_string())));
        handle.select_range(RangeKind::preset(3_600)).await.unwrap();
        let view = wait_for(&handle, |v| v.status.last_error.is_some()).await;

        assert_eq!(timestamps(&view), vec![10, 20]);
        assert_eq!(handle.current_history().len(), 2);
    }
}
