// Application state for HTTP handlers
use crate::application::session_runner::SessionHandle;

#[derive(Clone)]
pub struct AppState {
    pub session: SessionHandle,
    pub devices: Vec<String>,
}
