// Application layer - acquisition use cases and session orchestration
pub mod pagination;
pub mod poll_coordinator;
pub mod reading_source;
pub mod session;
pub mod session_runner;
