use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::error::{ScrapeError, ScrapeResult};
use crate::extract::{FilmPageExtractor, PageExtractor};
use crate::fetch::PageLoader;
use crate::storage::current_epoch;
use crate::types::{DiaryEntry, Film};

/// An entity that can be completed from a fuller record found by key.
pub trait Enhance: Send {
    type Full: Send;
    const KIND: &'static str;

    fn key(&self) -> Option<&str>;

    /// Copy over fields that are still unset. Populated fields are never replaced.
    fn merge_missing(&mut self, full: Self::Full);
}

impl Enhance for Film {
    type Full = Film;
    const KIND: &'static str = "film";

    fn key(&self) -> Option<&str> { Some(self.slug.as_str()).filter(|s| !s.is_empty()) }

    fn merge_missing(&mut self, full: Film) {
        if self.year == 0 { self.year = full.year; }
        if self.title.is_empty() { self.title = full.title; }
        if self.external_ids.is_none() { self.external_ids = full.external_ids; }
        if self.id.is_empty() { self.id = full.id; }
    }
}

impl Enhance for DiaryEntry {
    type Full = Film;
    const KIND: &'static str = "diary entry";

    fn key(&self) -> Option<&str> { self.slug.as_deref().filter(|s| !s.is_empty()) }

    fn merge_missing(&mut self, full: Film) {
        if self.film.is_none() { self.film = Some(full); }
    }
}

#[async_trait]
pub trait Lookup<T>: Send + Sync + 'static {
    async fn lookup(&self, key: &str) -> ScrapeResult<T>;
}

/// Outcome of a batch enhancement. The batch itself never fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnhanceReport {
    pub attempted: usize,
    pub failed: usize,
}

impl EnhanceReport {
    pub fn is_complete(&self) -> bool { self.failed == 0 }
}

pub struct Enhancer<L> {
    lookup: Arc<L>,
    limit: usize,
}

impl<L> Clone for Enhancer<L> {
    fn clone(&self) -> Self { Self { lookup: self.lookup.clone(), limit: self.limit } }
}

impl<L> Enhancer<L> {
    pub fn new(lookup: Arc<L>, limit: usize) -> Self { Self { lookup, limit: limit.max(1) } }

    pub async fn enhance<T>(&self, item: &mut T) -> ScrapeResult<()>
    where
        T: Enhance,
        L: Lookup<T::Full>,
    {
        let key = item.key().ok_or(ScrapeError::MissingKey { kind: T::KIND })?.to_string();
        let full = self.lookup.lookup(&key).await?;
        item.merge_missing(full);
        Ok(())
    }

    /// Enhance every item with at most `limit` lookups in flight. Failures are logged
    /// and counted; the call returns once every item has been attempted.
    pub async fn enhance_batch<T>(&self, items: &mut [T]) -> EnhanceReport
    where
        T: Enhance,
        L: Lookup<T::Full>,
    {
        let permits = Semaphore::new(self.limit);
        let attempts = items.iter_mut().map(|item| {
            let permits = &permits;
            async move {
                let _permit = permits.acquire().await.ok();
                let key = item.key().map(str::to_string);
                tracing::debug!(kind = T::KIND, key = ?key, "looking up");
                match self.enhance(item).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(kind = T::KIND, key = ?key, error = %e, "enhancement failed");
                        false
                    }
                }
            }
        });
        let outcomes = join_all(attempts).await;
        EnhanceReport {
            attempted: outcomes.len(),
            failed: outcomes.iter().filter(|ok| !**ok).count(),
        }
    }
}

/// Film lookups by slug, cached as `film|<slug>`.
pub struct FilmLookup {
    loader: PageLoader,
    base_url: String,
}

impl FilmLookup {
    pub fn new(loader: PageLoader, base_url: impl Into<String>) -> Self {
        Self { loader, base_url: base_url.into() }
    }

    pub fn url_for(&self, slug: &str) -> String { format!("{}/film/{}/", self.base_url, slug) }
}

#[async_trait]
impl Lookup<Film> for FilmLookup {
    async fn lookup(&self, slug: &str) -> ScrapeResult<Film> {
        let key = format!("film|{slug}");
        let now = current_epoch();
        let cache = self.loader.cache();
        if let Some(payload) = cache.get_cache(&key, now).await.ok().flatten() {
            if let Ok(film) = serde_json::from_str::<Film>(&payload) {
                tracing::debug!(key = %key, "film served from cache");
                return Ok(film);
            }
        }

        let body = self.loader.fetch_body(&self.url_for(slug)).await?;
        let film = FilmPageExtractor
            .extract(&body)?
            .items
            .into_iter()
            .next()
            .ok_or_else(|| ScrapeError::extract("film", "film page yielded nothing"))?;
        if let Ok(payload) = serde_json::to_string(&film) {
            if let Err(e) = cache.put_cache(&key, &payload, now + self.loader.film_ttl_secs()).await {
                tracing::warn!(key = %key, error = %e, "error writing cache");
            }
        }
        Ok(film)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::storage::MemoryCache;
    use crate::testing::{film_page, ScriptedFetcher};
    use crate::types::ExternalFilmIds;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// In-memory lookup that records how many lookups ran at once.
    #[derive(Default)]
    struct TableLookup {
        films: HashMap<String, Film>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Lookup<Film> for TableLookup {
        async fn lookup(&self, key: &str) -> ScrapeResult<Film> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.films.get(key).cloned().ok_or_else(|| ScrapeError::NotFound { url: key.to_string() })
        }
    }

    fn full_film(slug: &str, title: &str) -> Film {
        Film {
            id: format!("id-{slug}"),
            title: title.to_string(),
            slug: slug.to_string(),
            target: format!("/film/{slug}/"),
            year: 1997,
            external_ids: Some(ExternalFilmIds { imdb: "tt0123948".into(), tmdb: "36095".into() }),
        }
    }

    #[tokio::test]
    async fn merge_keeps_fields_the_caller_set() {
        let lookup = TableLookup { films: HashMap::from([("cure".to_string(), full_film("cure", "Cure"))]), ..Default::default() };
        let enhancer = Enhancer::new(Arc::new(lookup), 5);

        let mut film = Film { title: "Kyua".into(), ..Film::with_slug("cure") };
        enhancer.enhance(&mut film).await.unwrap();
        assert_eq!(film.title, "Kyua");
        assert_eq!(film.year, 1997);
        assert_eq!(film.id, "id-cure");
        assert_eq!(film.external_ids.unwrap().imdb, "tt0123948");
    }

    #[tokio::test]
    async fn missing_key_is_rejected() {
        let enhancer = Enhancer::new(Arc::new(TableLookup::default()), 5);
        let err = enhancer.enhance(&mut Film::default()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::MissingKey { kind: "film" }));
    }

    #[tokio::test]
    async fn batch_swallows_failures_and_respects_limit() {
        let films: HashMap<String, Film> = (0..20).map(|i| {
            let slug = format!("film-{i}");
            (slug.clone(), full_film(&slug, &format!("Film {i}")))
        }).collect();
        let lookup = Arc::new(TableLookup { films, ..Default::default() });
        let enhancer = Enhancer::new(lookup.clone(), 3);

        let mut batch: Vec<Film> = (0..20).map(|i| Film::with_slug(format!("film-{i}"))).collect();
        batch.push(Film::with_slug("unknown"));
        batch.push(Film::default());

        let report = enhancer.enhance_batch(&mut batch).await;
        assert_eq!(report, EnhanceReport { attempted: 22, failed: 2 });
        assert!(!report.is_complete());
        assert!(lookup.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(batch[7].title, "Film 7");
        assert!(batch[20].title.is_empty());
    }

    #[tokio::test]
    async fn diary_entries_gain_their_film() {
        let lookup = TableLookup { films: HashMap::from([("cure".to_string(), full_film("cure", "Cure"))]), ..Default::default() };
        let enhancer = Enhancer::new(Arc::new(lookup), 2);
        let mut entries = vec![
            DiaryEntry { slug: Some("cure".into()), ..DiaryEntry::default() },
            DiaryEntry::default(),
        ];
        let report = enhancer.enhance_batch(&mut entries).await;
        assert_eq!(report.failed, 1);
        assert_eq!(entries[0].film.as_ref().unwrap().title, "Cure");
        assert!(entries[1].film.is_none());
    }

    #[tokio::test]
    async fn film_lookup_fetches_once_then_uses_cache() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let url = "https://letterboxd.com/film/cure/";
        fetcher.insert(url, 200, film_page("cure", "Cure", 1997, "tt0123948", "36095"));
        let cache = Arc::new(MemoryCache::new());
        let loader = PageLoader::new(fetcher.clone(), cache.clone(), CacheConfig::default());
        let lookup = FilmLookup::new(loader, "https://letterboxd.com");

        let first = lookup.lookup("cure").await.unwrap();
        let again = lookup.lookup("cure").await.unwrap();
        assert_eq!(first, again);
        assert_eq!(first.year, 1997);
        assert_eq!(fetcher.calls_to(url), 1);
        assert_eq!(cache.keys(), vec!["film|cure".to_string()]);
    }
}
