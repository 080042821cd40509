use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::pagination::Pagination;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalFilmIds {
    #[serde(default)]
    pub imdb: String,
    #[serde(default)]
    pub tmdb: String,
}

/// A film as it appears on the site. Anything left empty/zero has not been looked up yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Film {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub year: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ids: Option<ExternalFilmIds>,
}

impl Film {
    pub fn with_slug(slug: impl Into<String>) -> Self {
        Self { slug: slug.into(), ..Self::default() }
    }
}

pub type FilmSet = Vec<Film>;

/// Convenience accessors over a collected set of films.
pub trait FilmSetExt {
    fn imdb_ids(&self) -> Vec<String>;
    fn tmdb_ids(&self) -> Vec<String>;
}

impl FilmSetExt for [Film] {
    // Films without external ids contribute an empty string, keeping positions aligned.
    fn imdb_ids(&self) -> Vec<String> {
        self.iter().map(|f| f.external_ids.as_ref().map(|e| e.imdb.clone()).unwrap_or_default()).collect()
    }

    fn tmdb_ids(&self) -> Vec<String> {
        self.iter().map(|f| f.external_ids.as_ref().map(|e| e.tmdb.clone()).unwrap_or_default()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bio: String,
    #[serde(default)]
    pub watched_film_count: u32,
    #[serde(default)]
    pub following: Vec<String>,
    #[serde(default)]
    pub followers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub watched: Option<NaiveDate>,
    pub rating: Option<u8>,
    #[serde(default)]
    pub rewatch: bool,
    #[serde(default)]
    pub specified_date: bool,
    pub film: Option<Film>,
    pub slug: Option<String>,
}

pub type DiaryEntries = Vec<DiaryEntry>;

/// Items and pagination extracted from one fetched page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult<T> {
    pub items: Vec<T>,
    pub pagination: Option<Pagination>,
}

impl<T> FetchResult<T> {
    pub fn new(items: Vec<T>, pagination: Option<Pagination>) -> Self {
        Self { items, pagination }
    }
}
