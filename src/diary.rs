use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::DiaryEntry;

/// Optional constraints on diary entries. An unset bound always passes, and so does
/// an entry that lacks the field a bound compares against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
pub struct DiaryFilter {
    /// Only entries watched on or after this date (YYYY-MM-DD)
    #[arg(long)]
    pub earliest: Option<NaiveDate>,
    /// Only entries watched on or before this date (YYYY-MM-DD)
    #[arg(long)]
    pub latest: Option<NaiveDate>,
    /// Only rewatches (true) or only first watches (false)
    #[arg(long)]
    pub rewatch: Option<bool>,
    /// Only entries whose date was explicitly specified (true) or not (false)
    #[arg(long)]
    pub specified_date: Option<bool>,
    /// Minimum rating, in half stars (0-10)
    #[arg(long)]
    pub min_rating: Option<u8>,
    /// Maximum rating, in half stars (0-10)
    #[arg(long)]
    pub max_rating: Option<u8>,
}

impl DiaryFilter {
    pub fn is_empty(&self) -> bool { self == &Self::default() }

    pub fn matches(&self, entry: &DiaryEntry) -> bool {
        let watched = |ok: fn(NaiveDate, NaiveDate) -> bool, bound: Option<NaiveDate>| match (entry.watched, bound) {
            (Some(w), Some(b)) => ok(w, b),
            _ => true,
        };
        let rated = |ok: fn(u8, u8) -> bool, bound: Option<u8>| match (entry.rating, bound) {
            (Some(r), Some(b)) => ok(r, b),
            _ => true,
        };
        watched(|w, b| w >= b, self.earliest)
            && watched(|w, b| w <= b, self.latest)
            && self.rewatch.map_or(true, |want| entry.rewatch == want)
            && self.specified_date.map_or(true, |want| entry.specified_date == want)
            && rated(|r, b| r >= b, self.min_rating)
            && rated(|r, b| r <= b, self.max_rating)
    }

    pub fn apply(&self, entries: Vec<DiaryEntry>) -> Vec<DiaryEntry> {
        entries.into_iter().filter(|e| self.matches(e)).collect()
    }
}

/// Most recent watch first; undated entries go last.
pub fn sort_most_recent_first(entries: &mut [DiaryEntry]) {
    entries.sort_by(|a, b| b.watched.cmp(&a.watched));
}
