// Pagination driver - follows continuation cursors to assemble a history
use crate::application::reading_source::ReadingSource;
use crate::domain::error::DashboardError;
use crate::domain::range::ResolvedRange;
use crate::domain::reading::Reading;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSettings {
    pub page_limit: u32,
    /// Safety bound on the number of pages requested per fetch.
    pub max_pages: usize,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            page_limit: 500,
            max_pages: 50,
        }
    }
}

/// Result of walking all pages of a range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedHistory {
    pub readings: Vec<Reading>,
    pub pages: usize,
    /// The page bound was reached while the source still had a cursor.
    pub truncated: bool,
}

/// Fetch every page of `range`, then normalise, filter, sort and deduplicate.
pub async fn fetch_all(
    source: &dyn ReadingSource,
    device: &str,
    range: ResolvedRange,
    settings: PageSettings,
) -> Result<FetchedHistory, DashboardError> {
    let mut raw = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0;
    let mut exhausted = false;

    while pages < settings.max_pages {
        let page = source
            .get_range(device, range.from, range.to, settings.page_limit, cursor.as_deref())
            .await?;
        pages += 1;
        tracing::debug!(
            "Fetched page {} for {} with {} items",
            pages,
            device,
            page.items.len()
        );
        raw.extend(page.items);

        match page.next_cursor.filter(|c| !c.is_empty()) {
            Some(next) => cursor = Some(next),
            None => {
                exhausted = true;
                break;
            }
        }
    }

    let truncated = !exhausted;
    if truncated {
        tracing::warn!(
            "History for {} truncated after {} pages; results may be incomplete",
            device,
            pages
        );
    }

    let fetched = raw.len();
    let mut readings: Vec<Reading> = raw
        .into_iter()
        .filter_map(|item| item.normalize(device))
        .filter(|reading| range.contains(reading.timestamp))
        .collect();

    // Stable sort: the first occurrence of a timestamp survives dedup.
    readings.sort_by_key(|r| r.timestamp);
    readings.dedup_by_key(|r| r.timestamp);

    tracing::info!(
        "Loaded {} readings for {} ({} raw items, {} pages)",
        readings.len(),
        device,
        fetched,
        pages
    );

    Ok(FetchedHistory {
        readings,
        pages,
        truncated,
    })
}
