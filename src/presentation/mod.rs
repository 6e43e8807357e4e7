// Presentation layer - HTTP command and query surface
pub mod app_state;
pub mod handlers;
