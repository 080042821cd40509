pub mod batch;
pub mod collector;
pub mod config;
pub mod db;
pub mod diary;
pub mod enhancer;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod films;
pub(crate) mod html;
pub mod lists;
pub mod pagination;
pub mod storage;
pub mod stream;
pub mod types;
pub mod urls;
pub mod users;

#[cfg(test)]
mod testing;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::batch::{BatchSpec, SubRequest};
    pub use crate::config::{BatchErrorPolicy, ClientConfig};
    pub use crate::diary::DiaryFilter;
    pub use crate::error::{ScrapeError, ScrapeResult};
    pub use crate::films::{FilmListOptions, FilmographyRequest};
    pub use crate::lists::ListId;
    pub use crate::pagination::Pagination;
    pub use crate::stream::ItemStream;
    pub use crate::types::{DiaryEntry, ExternalFilmIds, Film, FilmSet, FilmSetExt, User};
    pub use crate::Boxd;
}

use anyhow::Result;
use std::sync::Arc;

use crate::collector::{Collector, EnhancedPages, UrlPages};
use crate::config::ClientConfig;
use crate::db::Database;
use crate::enhancer::{Enhancer, FilmLookup};
use crate::extract::FilmListExtractor;
use crate::fetch::{Fetcher, HttpFetcher, PageLoader};
use crate::storage::{NoCache, Storage};

/// Async library entry point. Owns the page loader, the film lookup and (when
/// caching is on) the database.
#[derive(Clone)]
pub struct Boxd {
    config: Arc<ClientConfig>,
    loader: PageLoader,
    films: Arc<FilmLookup>,
    collector: Collector,
    database: Option<Database>,
}

impl Boxd {
    /// HTTP client plus the sqlite cache (migrated on connect) unless caching is disabled.
    pub async fn new(config: ClientConfig) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config)?);
        let database = if config.cache.enabled {
            let db = Database::connect(config.cache.database_url.as_deref()).await?;
            db.run_migrations().await?;
            Some(db)
        } else {
            None
        };
        let cache: Arc<dyn Storage> = match &database {
            Some(db) => Arc::new(db.clone()),
            None => Arc::new(NoCache),
        };
        let mut boxd = Self::with_parts(config, fetcher, cache);
        boxd.database = database;
        Ok(boxd)
    }

    /// Assemble a client from an arbitrary fetcher and cache.
    pub fn with_parts(config: ClientConfig, fetcher: Arc<dyn Fetcher>, cache: Arc<dyn Storage>) -> Self {
        let loader = PageLoader::new(fetcher, cache, config.cache.clone());
        let films = Arc::new(FilmLookup::new(loader.clone(), config.base_url.clone()));
        let collector = Collector::from_config(&config);
        Self { config: Arc::new(config), loader, films, collector, database: None }
    }

    pub fn config(&self) -> &ClientConfig { &self.config }

    /// The sqlite cache, if this client opened one.
    pub fn database(&self) -> Option<&Database> { self.database.as_ref() }

    pub(crate) fn url(&self, path: &str) -> String { format!("{}{}", self.config.base_url, path) }

    /// Host of the configured site, without a leading `www.`.
    pub(crate) fn site_host(&self) -> String {
        url::Url::parse(&self.config.base_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
            .unwrap_or_else(|| self.config.base_url.clone())
    }

    pub(crate) fn enhancer(&self) -> Enhancer<FilmLookup> {
        Enhancer::new(self.films.clone(), self.config.enhance_concurrency)
    }

    /// Film grid pages behind `template`, enhanced page by page.
    pub(crate) fn enhanced_films(&self, template: String) -> Arc<EnhancedPages<UrlPages<FilmListExtractor>, FilmLookup>> {
        let pages = UrlPages::new(self.loader.clone(), template, FilmListExtractor);
        Arc::new(EnhancedPages::new(pages, self.enhancer()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryCache;
    use crate::testing::{film_list_page, film_page, ScriptedFetcher};

    #[test]
    fn site_host_drops_www() {
        let boxd = Boxd::with_parts(
            ClientConfig { base_url: "https://www.letterboxd.com".into(), ..ClientConfig::default() },
            Arc::new(ScriptedFetcher::new()),
            Arc::new(NoCache),
        );
        assert_eq!(boxd.site_host(), "letterboxd.com");
        assert_eq!(boxd.url("/film/cure/"), "https://www.letterboxd.com/film/cure/");
    }

    #[tokio::test]
    async fn shared_cache_spares_repeat_fetches() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.insert("https://letterboxd.com/dave/films/page/1/", 200, film_list_page(&["cure"], 1, 1));
        fetcher.insert("https://letterboxd.com/film/cure/", 200, film_page("cure", "Cure", 1997, "tt0123948", "36095"));
        let cache = Arc::new(MemoryCache::new());
        let boxd = Boxd::with_parts(ClientConfig::default(), fetcher.clone(), cache.clone());

        let first = boxd.watched("dave").await.unwrap();
        let second = boxd.watched("dave").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(fetcher.calls().len(), 2);
        assert!(cache.keys().iter().any(|k| k == "film|cure"));
    }
}
