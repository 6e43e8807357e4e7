// Error taxonomy shared by the acquisition engine
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashboardError {
    /// Bad explicit date bounds. Correctable by the user, never mutates state.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("reading source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("dashboard session is closed")]
    SessionClosed,
}

impl DashboardError {
    /// Transport and auth failures can be retried on the next cycle.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DashboardError::SourceUnavailable(_) | DashboardError::Unauthorized(_)
        )
    }
}
