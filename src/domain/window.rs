// Window selector - interactive zoom over the loaded series
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Window {
    /// Follow the full extent of the series.
    #[default]
    Auto,
    Explicit { left: i64, right: i64 },
}

/// Tracks a provisional drag selection and the committed window.
#[derive(Debug, Clone, Default)]
pub struct WindowSelector {
    window: Window,
    anchor: Option<i64>,
    cursor: Option<i64>,
}

impl WindowSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, x: i64) {
        self.anchor = Some(x);
        self.cursor = None;
    }

    /// Ignored unless a selection has begun.
    pub fn extend(&mut self, x: i64) {
        if self.anchor.is_some() {
            self.cursor = Some(x);
        }
    }

    /// Returns whether the window changed.
    pub fn commit(&mut self) -> bool {
        let selection = (self.anchor.take(), self.cursor.take());
        match selection {
            (Some(a), Some(b)) if a != b => {
                self.window = Window::Explicit {
                    left: a.min(b),
                    right: a.max(b),
                };
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.window = Window::Auto;
        self.anchor = None;
        self.cursor = None;
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn provisional(&self) -> Option<(i64, i64)> {
        match (self.anchor, self.cursor) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }
}
