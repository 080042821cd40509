use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{ScrapeError, ScrapeResult};

/// Owner and slug, enough to find any list on the site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListId {
    pub owner: String,
    pub slug: String,
}

impl ListId {
    pub fn new(owner: impl Into<String>, slug: impl Into<String>) -> Self {
        Self { owner: owner.into(), slug: slug.into() }
    }

    /// `dave/official-top-250-narrative-feature-films`
    pub fn parse(raw: &str) -> ScrapeResult<Self> {
        let (owner, slug) = raw
            .trim()
            .trim_matches('/')
            .split_once('/')
            .ok_or_else(|| ScrapeError::Validation(format!("list must look like owner/list-slug, got {raw:?}")))?;
        if owner.is_empty() || slug.is_empty() || slug.contains('/') {
            return Err(ScrapeError::Validation(format!("list must look like owner/list-slug, got {raw:?}")));
        }
        Ok(Self::new(owner, slug))
    }
}

impl FromStr for ListId {
    type Err = ScrapeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}/{}", self.owner, self.slug) }
}

pub fn parse_list_args<S: AsRef<str>>(args: &[S]) -> ScrapeResult<Vec<ListId>> {
    args.iter().map(|a| ListId::parse(a.as_ref())).collect()
}

/// The site's well-known curated lists.
pub fn official_lists() -> Vec<ListId> {
    [
        ("dave", "official-top-250-narrative-feature-films"),
        ("dave", "letterboxd-top-250-films-history-collected"),
        ("jake_ziegler", "academy-award-winners-for-best-picture"),
        ("dave", "imdb-top-250"),
        ("matthew", "box-office-mojo-all-time-worldwide"),
        ("bfi", "sight-and-sounds-greatest-films-of-all-time"),
        ("moseschan", "afi-100-years-100-movies"),
        ("crew", "edgar-wrights-1000-favorite-movies"),
        ("gubarenko", "1001-movies-you-must-see-before-you-die-2021"),
        ("jack", "official-top-250-documentary-films"),
        ("darrencb", "letterboxds-top-250-horror-films"),
        ("jack", "women-directors-the-official-top-250-narrative"),
        ("lifeasfiction", "letterboxd-100-animation"),
    ]
    .into_iter()
    .map(|(owner, slug)| ListId::new(owner, slug))
    .collect()
}

/// Official lists keyed by slug, valued by owner.
pub fn official_list_map() -> HashMap<String, String> {
    official_lists().into_iter().map(|l| (l.slug, l.owner)).collect()
}
