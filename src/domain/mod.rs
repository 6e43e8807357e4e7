// Domain layer - readings, ranges, series and zoom window
pub mod error;
pub mod range;
pub mod reading;
pub mod series;
pub mod window;
