use chrono::NaiveDate;
use scraper::ElementRef;

use crate::error::ScrapeResult;
use crate::extract::PageExtractor;
use crate::html::{attr, parse, selector};
use crate::pagination::{self, Pagination};
use crate::types::{DiaryEntry, FetchResult};

/// Diary pages. Entries come back with a slug only; `film` is filled by the enhancer.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiaryExtractor;

impl PageExtractor for DiaryExtractor {
    type Item = DiaryEntry;

    fn extract(&self, body: &[u8]) -> ScrapeResult<FetchResult<DiaryEntry>> {
        let doc = parse(body);
        let entries: Vec<DiaryEntry> = doc
            .select(&selector(".diary-entry-edit"))
            .filter_map(|cell| cell.select(&selector("a")).next())
            .map(entry_from_link)
            .collect();
        let pagination = pagination::detect(&doc).unwrap_or_else(Pagination::single_page);
        Ok(FetchResult::new(entries, Some(pagination)))
    }
}

fn entry_from_link(link: ElementRef<'_>) -> DiaryEntry {
    let flag = |name: &str| attr(link, name) == Some("true");
    let watched = attr(link, "data-viewing-date").and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
    let rating = attr(link, "data-rating").and_then(|r| match r.parse::<u8>() {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(rating = r, error = %e, "unreadable diary rating");
            None
        }
    });
    DiaryEntry {
        watched,
        rating,
        rewatch: flag("data-rewatch"),
        specified_date: flag("data-specified-date"),
        film: None,
        slug: attr(link, "data-film-poster").and_then(slug_from_poster_path),
    }
}

/// `/film/cure/image-150/` -> `cure`
fn slug_from_poster_path(path: &str) -> Option<String> {
    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() != 5 || parts[2].is_empty() {
        tracing::warn!(path, "unexpected film poster path");
        return None;
    }
    Some(parts[2].to_string())
}
