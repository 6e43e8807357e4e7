// Range resolution - logical range selection to concrete timestamps
use super::error::DashboardError;
use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Lower bound used for the "all" range.
pub const EPOCH_FLOOR: i64 = 0;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RangeKind {
    Preset { seconds: i64 },
    All,
    /// Calendar dates (`YYYY-MM-DD`) interpreted in local time.
    Explicit {
        from: Option<String>,
        to: Option<String>,
    },
}

impl RangeKind {
    pub fn preset(seconds: i64) -> Self {
        RangeKind::Preset { seconds }
    }

    #[cfg(test)]
    pub fn explicit(from: &str, to: &str) -> Self {
        RangeKind::Explicit {
            from: Some(from.to_string()),
            to: Some(to.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedRange {
    pub from: i64,
    pub to: i64,
}

impl ResolvedRange {
    pub fn contains(&self, timestamp: i64) -> bool {
        self.from <= timestamp && timestamp <= self.to
    }
}

/// Resolve a range against the local time zone.
pub fn resolve(now: i64, kind: &RangeKind) -> Result<ResolvedRange, DashboardError> {
    resolve_in(now, kind, &Local)
}

pub fn resolve_in<Tz: TimeZone>(
    now: i64,
    kind: &RangeKind,
    tz: &Tz,
) -> Result<ResolvedRange, DashboardError> {
    let (from, to) = match kind {
        RangeKind::Preset { seconds } => {
            if *seconds < 0 {
                return Err(DashboardError::InvalidRange(format!(
                    "preset duration must not be negative, got {}",
                    seconds
                )));
            }
            (now.saturating_sub(*seconds), now)
        }
        RangeKind::All => (EPOCH_FLOOR, now),
        RangeKind::Explicit { from, to } => {
            let (Some(from), Some(to)) = (from.as_deref(), to.as_deref()) else {
                return Err(DashboardError::InvalidRange(
                    "both start and end dates are required".to_string(),
                ));
            };
            let start = parse_date(from)?;
            let end = parse_date(to)?;
            (
                local_timestamp(tz, start.and_hms_opt(0, 0, 0), true)?,
                local_timestamp(tz, end.and_hms_opt(23, 59, 59), false)?,
            )
        }
    };

    if from > to {
        return Err(DashboardError::InvalidRange(format!(
            "start {} is after end {}",
            from, to
        )));
    }

    Ok(ResolvedRange { from, to })
}

fn parse_date(value: &str) -> Result<NaiveDate, DashboardError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| DashboardError::InvalidRange(format!("bad date '{}': {}", value, e)))
}

fn local_timestamp<Tz: TimeZone>(
    tz: &Tz,
    naive: Option<NaiveDateTime>,
    earliest: bool,
) -> Result<i64, DashboardError> {
    let naive = naive.ok_or_else(|| DashboardError::InvalidRange("bad time of day".to_string()))?;
    let local = tz.from_local_datetime(&naive);
    // DST folds have two candidates; gaps have none.
    let resolved = if earliest { local.earliest() } else { local.latest() };
    resolved
        .map(|dt| dt.timestamp())
        .ok_or_else(|| DashboardError::InvalidRange(format!("{} does not exist locally", naive)))
}
