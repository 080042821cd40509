//! Scripted fetchers and page builders shared by unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::ScrapeResult;
use crate::fetch::{Fetcher, RawPage};
use crate::storage::NoCache;
use crate::Boxd;

/// Serves canned responses by exact URL; unknown URLs are 404s.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    pages: Mutex<HashMap<String, RawPage>>,
    calls: Mutex<Vec<String>>,
    latency: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self { Self::default() }

    pub(crate) fn with_latency(ms: u64) -> Self { Self { latency: Duration::from_millis(ms), ..Self::default() } }

    pub(crate) fn insert(&self, url: &str, status: u16, body: impl Into<Vec<u8>>) {
        self.pages.lock().unwrap().insert(url.to_string(), RawPage { status, body: body.into() });
    }

    pub(crate) fn calls(&self) -> Vec<String> { self.calls.lock().unwrap().clone() }

    pub(crate) fn calls_to(&self, url: &str) -> usize { self.calls().iter().filter(|u| *u == url).count() }

    pub(crate) fn peak(&self) -> usize { self.peak.load(Ordering::SeqCst) }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> ScrapeResult<RawPage> {
        self.calls.lock().unwrap().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let page = self.pages.lock().unwrap().get(url).cloned();
        Ok(page.unwrap_or(RawPage { status: 404, body: b"not found".to_vec() }))
    }
}

/// An uncached client over `fetcher`, pointed at the default site.
pub(crate) fn client(fetcher: Arc<ScriptedFetcher>) -> Boxd {
    Boxd::with_parts(ClientConfig::default(), fetcher, Arc::new(NoCache))
}

fn page_list(current: u32, total: u32) -> String {
    if total <= 1 {
        return String::new();
    }
    let mut lis = String::new();
    for n in [1, current.saturating_sub(1), current, current + 1, total] {
        if n == 0 || n > total || lis.contains(&format!(">{n}<")) {
            continue;
        }
        if n == current {
            lis.push_str(&format!(r#"<li class="paginate-page paginate-current"><span>{n}</span></li>"#));
        } else {
            lis.push_str(&format!(r#"<li class="paginate-page"><a href="/x/page/{n}/">{n}</a></li>"#));
        }
    }
    format!(r#"<div class="pagination"><div class="paginate-pages"><ul>{lis}</ul></div></div>"#)
}

/// A poster grid with the given slugs and pagination.
pub(crate) fn film_list_page(slugs: &[&str], current: u32, total: u32) -> String {
    let posters: String = slugs
        .iter()
        .map(|slug| {
            format!(
                r#"<li class="poster-container"><div class="poster film-poster" data-film-id="id-{slug}" data-film-slug="{slug}" data-target-link="/film/{slug}/"><img class="image" alt="Title {slug}"></div></li>"#
            )
        })
        .collect();
    format!(r#"<html><body><ul class="poster-list">{posters}</ul>{}</body></html>"#, page_list(current, total))
}

pub(crate) fn film_page(slug: &str, title: &str, year: u32, imdb: &str, tmdb: &str) -> String {
    format!(
        r#"<html><head><meta property="og:title" content="{title} ({year})"></head><body>
        <div class="film-poster" data-film-id="id-{slug}" data-film-slug="{slug}" data-target-link="/film/{slug}/"></div>
        <a href="http://www.imdb.com/title/{imdb}/maindetails" data-track-action="IMDb">IMDB</a>
        <a href="https://www.themoviedb.org/movie/{tmdb}/" data-track-action="TMDb">TMDB</a>
        </body></html>"#
    )
}

/// Diary rows as (viewing date, slug) pairs.
pub(crate) fn diary_page(entries: &[(&str, &str)], current: u32, total: u32) -> String {
    let rows: String = entries
        .iter()
        .map(|(date, slug)| {
            format!(
                r#"<tr><td class="diary-entry-edit"><a href="" data-viewing-date="{date}" data-rating="6" data-film-poster="/film/{slug}/image-150/">Edit</a></td></tr>"#
            )
        })
        .collect();
    format!(r#"<html><body><table>{rows}</table>{}</body></html>"#, page_list(current, total))
}

pub(crate) fn people_page(names: &[&str], has_next: bool) -> String {
    let rows: String = names
        .iter()
        .map(|n| format!(r#"<tr><td class="table-person"><a class="name" href="/{n}/">{n}</a></td></tr>"#))
        .collect();
    let next = if has_next { r#"<a class="next" href="/x/page/2/">Next</a>"# } else { "" };
    format!(r#"<html><body><table>{rows}</table><div class="pagination">{next}</div></body></html>"#)
}

pub(crate) fn profile_page(username: &str, watched: u32) -> String {
    format!(
        r#"<html><body><section class="js-profile-header" data-person="{username}"></section>
        <div class="profile-stats"><a href="/{username}/films/"><span class="value">{watched}</span></a></div></body></html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::detect_bytes;

    #[test]
    fn builders_render_detectable_pagination() {
        let p = detect_bytes(film_list_page(&["a"], 3, 9).as_bytes()).unwrap();
        assert_eq!((p.current_page, p.total_pages), (3, 9));
        let p = detect_bytes(film_list_page(&["a"], 9, 9).as_bytes()).unwrap();
        assert!(p.is_last);
        assert!(detect_bytes(film_list_page(&["a"], 1, 1).as_bytes()).is_none());
    }
}
