//! Per-entity page extractors. Each turns one fetched page into typed items plus
//! whatever pagination the page renders.

pub mod diary;
pub mod film_page;
pub mod films;
pub mod people;
pub mod profile;

use crate::error::ScrapeResult;
use crate::types::FetchResult;

pub use diary::DiaryExtractor;
pub use film_page::FilmPageExtractor;
pub use films::FilmListExtractor;
pub use people::PeopleExtractor;
pub use profile::ProfileExtractor;

pub trait PageExtractor: Send + Sync + 'static {
    type Item: Send + 'static;

    fn extract(&self, body: &[u8]) -> ScrapeResult<FetchResult<Self::Item>>;
}

/// Year from an `og:title` of the form `Title (1971)`.
pub fn year_from_title(title: &str) -> Option<u32> {
    let inner = title.trim().strip_suffix(')')?;
    let (_, year) = inner.rsplit_once('(')?;
    (year.len() == 4).then(|| year.parse().ok()).flatten()
}

/// Title with the trailing ` (YYYY)` removed.
pub fn title_without_year(title: &str) -> &str {
    let title = title.trim();
    match title.rfind(" (") {
        Some(idx) if year_from_title(title).is_some() => &title[..idx],
        _ => title,
    }
}

/// IMDb or TMDb identifier from the outbound link on a film page.
pub fn id_from_external_url(url: &str) -> Option<String> {
    if !(url.contains("imdb.com") || url.contains("themoviedb.org")) {
        return None;
    }
    url.split('/').nth(4).filter(|id| !id.is_empty()).map(str::to_string)
}

/// `/film/cure/` -> `cure`
pub fn normalize_slug(slug: &str) -> String {
    let slug = slug.trim();
    let slug = slug.strip_prefix("/film/").unwrap_or(slug);
    slug.trim_end_matches('/').to_string()
}
