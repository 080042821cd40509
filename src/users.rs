use std::sync::Arc;

use crate::collector::{collect_sequential, EnhancedPages, UrlPages};
use crate::diary::sort_most_recent_first;
use crate::error::{ScrapeError, ScrapeResult};
use crate::extract::{DiaryExtractor, PeopleExtractor, ProfileExtractor};
use crate::stream::ItemStream;
use crate::types::{DiaryEntries, DiaryEntry, Film, FilmSet, User};
use crate::Boxd;

impl Boxd {
    pub fn stream_watched(&self, user: &str) -> ItemStream<Film> {
        tracing::info!(user, "streaming watched films");
        self.collector.stream(self.enhanced_films(self.url(&format!("/{user}/films/page/{{page}}/"))))
    }

    pub fn stream_list(&self, owner: &str, slug: &str) -> ItemStream<Film> {
        tracing::info!(user = owner, slug, "streaming list films");
        self.collector.stream(self.enhanced_films(self.url(&format!("/{owner}/list/{slug}/page/{{page}}/"))))
    }

    pub fn stream_watchlist(&self, user: &str) -> ItemStream<Film> {
        tracing::info!(user, "streaming watchlist films");
        self.collector.stream(self.enhanced_films(self.url(&format!("/{user}/watchlist/page/{{page}}/"))))
    }

    pub async fn watched(&self, user: &str) -> ScrapeResult<FilmSet> { self.stream_watched(user).collect().await }

    pub async fn list(&self, owner: &str, slug: &str) -> ScrapeResult<FilmSet> { self.stream_list(owner, slug).collect().await }

    pub async fn watchlist(&self, user: &str) -> ScrapeResult<FilmSet> { self.stream_watchlist(user).collect().await }

    /// Diary entries with their films attached, in page completion order.
    pub fn stream_diary(&self, user: &str) -> ItemStream<DiaryEntry> {
        tracing::info!(user, "streaming diary");
        let pages = UrlPages::new(self.loader.clone(), self.url(&format!("/{user}/films/diary/page/{{page}}/")), DiaryExtractor);
        self.collector.stream(Arc::new(EnhancedPages::new(pages, self.enhancer())))
    }

    /// The whole diary, most recent watch first.
    pub async fn diary(&self, user: &str) -> ScrapeResult<DiaryEntries> {
        let mut entries = self.stream_diary(user).collect().await?;
        sort_most_recent_first(&mut entries);
        Ok(entries)
    }

    pub async fn followers(&self, user: &str) -> ScrapeResult<Vec<String>> { self.people(user, "followers").await }

    pub async fn following(&self, user: &str) -> ScrapeResult<Vec<String>> { self.people(user, "following").await }

    async fn people(&self, user: &str, kind: &str) -> ScrapeResult<Vec<String>> {
        let pages = UrlPages::new(self.loader.clone(), self.url(&format!("/{user}/{kind}/page/{{page}}/")), PeopleExtractor);
        collect_sequential(&pages, self.config.max_sequential_pages).await
    }

    /// Profile details plus who the user follows and is followed by. Failing to read
    /// either people list leaves it empty.
    pub async fn profile(&self, user: &str) -> ScrapeResult<User> {
        let page = self.loader.load(&ProfileExtractor, &self.url(&format!("/{user}/"))).await?;
        let mut profile = page
            .items
            .into_iter()
            .next()
            .ok_or_else(|| ScrapeError::extract("user", "profile page yielded nothing"))?;

        match self.following(&profile.username).await {
            Ok(names) => profile.following = names,
            Err(e) => tracing::warn!(user, error = %e, "could not get user following"),
        }
        match self.followers(&profile.username).await {
            Ok(names) => profile.followers = names,
            Err(e) => tracing::warn!(user, error = %e, "could not get user followers"),
        }
        Ok(profile)
    }
}
