use rand::seq::SliceRandom;

use crate::collector::PageSource;
use crate::enhancer::{EnhanceReport, Lookup};
use crate::error::{ScrapeError, ScrapeResult};
use crate::extract::FilmListExtractor;
use crate::types::Film;
use crate::Boxd;

pub const FILMOGRAPHY_PROFESSIONS: [&str; 4] = ["actor", "director", "producer", "writer"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilmographyRequest {
    pub person: String,
    pub profession: String,
}

impl FilmographyRequest {
    pub fn new(profession: impl Into<String>, person: impl Into<String>) -> Self {
        Self { person: person.into(), profession: profession.into() }
    }

    pub fn validate(&self) -> ScrapeResult<()> {
        if self.person.trim().is_empty() {
            return Err(ScrapeError::Validation("person is required".into()));
        }
        if self.profession.trim().is_empty() {
            return Err(ScrapeError::Validation("profession is required".into()));
        }
        if !FILMOGRAPHY_PROFESSIONS.contains(&self.profession.as_str()) {
            return Err(ScrapeError::Validation(format!(
                "profession must be one of {}",
                FILMOGRAPHY_PROFESSIONS.join(", ")
            )));
        }
        Ok(())
    }
}

/// Which pages of the site-wide film browser to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilmListOptions {
    pub sort_by: String,
    pub page_count: u32,
    pub shuffle: bool,
}

impl Default for FilmListOptions {
    fn default() -> Self { Self { sort_by: "popular".into(), page_count: 1, shuffle: false } }
}

/// Pages to read after page 1: the next `page_count - 1` in order, or a random
/// distinct sample from `2..=total_pages`.
pub fn remaining_pages(page_count: u32, total_pages: u32, shuffle: bool) -> Vec<u32> {
    let wanted = page_count.saturating_sub(1) as usize;
    let candidates: Vec<u32> = (2..=total_pages).collect();
    if shuffle {
        let mut rng = rand::thread_rng();
        candidates.choose_multiple(&mut rng, wanted).copied().collect()
    } else {
        candidates.into_iter().take(wanted).collect()
    }
}

impl Boxd {
    pub async fn film(&self, slug: &str) -> ScrapeResult<Film> { self.films.lookup(slug).await }

    pub async fn enhance_film(&self, film: &mut Film) -> ScrapeResult<()> { self.enhancer().enhance(film).await }

    pub async fn enhance_films(&self, films: &mut [Film]) -> EnhanceReport { self.enhancer().enhance_batch(films).await }

    /// Every film a person worked on in one role. The request is checked before any fetch.
    pub async fn filmography(&self, request: &FilmographyRequest) -> ScrapeResult<Vec<Film>> {
        request.validate()?;
        let url = self.url(&format!("/{}/{}/", request.profession, request.person));
        let mut films = self.loader.load(&FilmListExtractor, &url).await?.items;
        let report = self.enhance_films(&mut films).await;
        tracing::debug!(person = %request.person, films = films.len(), failed = report.failed, "filmography enhanced");
        Ok(films)
    }

    /// Films from the site-wide browser, enhanced. Any page failure fails the call.
    pub async fn popular_films(&self, options: &FilmListOptions) -> ScrapeResult<Vec<Film>> {
        let sort_by = if options.sort_by.trim().is_empty() { "popular" } else { options.sort_by.trim() };
        let source = self.enhanced_films(self.url(&format!("/films/ajax/{sort_by}/size/small/page/{{page}}/")));
        let first = source.page(1).await?;
        let total_pages = first.pagination.map_or(1, |p| p.total_pages);
        let mut films = first.items;
        for page in remaining_pages(options.page_count.max(1), total_pages, options.shuffle) {
            films.extend(source.page(page).await?.items);
        }
        Ok(films)
    }

    /// IMDb ids of a user's watched films; films without external ids are skipped.
    pub async fn watched_imdb_ids(&self, user: &str) -> ScrapeResult<Vec<String>> {
        let mut stream = self.stream_watched(user);
        let mut ids = Vec::new();
        while let Some(film) = stream.next().await {
            match film.external_ids {
                Some(ext) if !ext.imdb.is_empty() => ids.push(ext.imdb),
                _ => tracing::debug!(slug = %film.slug, "no external ids, skipping"),
            }
        }
        stream.finish().await?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client, film_list_page, film_page, ScriptedFetcher};
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn filmography_requests_are_validated() {
        assert!(FilmographyRequest::new("actor", "nicolas-cage").validate().is_ok());
        assert!(FilmographyRequest::new("writer", "nora-ephron").validate().is_ok());
        for bad in [
            FilmographyRequest::new("actor", ""),
            FilmographyRequest::new("", "nicolas-cage"),
            FilmographyRequest::new("best-boy", "nicolas-cage"),
        ] {
            assert!(matches!(bad.validate(), Err(ScrapeError::Validation(_))), "{bad:?}");
        }
    }

    #[tokio::test]
    async fn invalid_filmography_makes_no_requests() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let boxd = client(fetcher.clone());
        for request in [FilmographyRequest::new("actor", ""), FilmographyRequest::new("gaffer", "someone")] {
            let err = boxd.filmography(&request).await.unwrap_err();
            assert!(matches!(err, ScrapeError::Validation(_)));
        }
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn filmography_is_fetched_and_enhanced() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.insert("https://letterboxd.com/director/kiyoshi-kurosawa/", 200, film_list_page(&["cure", "pulse"], 1, 1));
        fetcher.insert("https://letterboxd.com/film/cure/", 200, film_page("cure", "Cure", 1997, "tt0123948", "36095"));
        let boxd = client(fetcher.clone());

        let films = boxd.filmography(&FilmographyRequest::new("director", "kiyoshi-kurosawa")).await.unwrap();
        assert_eq!(films.len(), 2);
        assert_eq!(films[0].year, 1997);
        // Poster alt text was already set and wins over the film page title
        assert_eq!(films[0].title, "Title cure");
        assert_eq!(films[1].year, 0);
    }

    #[test]
    fn remaining_pages_in_order_or_sampled() {
        assert_eq!(remaining_pages(1, 10, false), Vec::<u32>::new());
        assert_eq!(remaining_pages(4, 10, false), vec![2, 3, 4]);
        assert_eq!(remaining_pages(20, 3, false), vec![2, 3]);

        let sampled = remaining_pages(5, 10, true);
        assert_eq!(sampled.len(), 4);
        assert_eq!(sampled.iter().collect::<HashSet<_>>().len(), 4);
        assert!(sampled.iter().all(|p| (2..=10).contains(p)));
        assert!(remaining_pages(3, 1, true).is_empty());
    }

    #[tokio::test]
    async fn popular_films_reads_requested_pages() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        for (page, slug) in [(1, "a"), (2, "b"), (3, "c")] {
            fetcher.insert(
                &format!("https://letterboxd.com/films/ajax/popular/size/small/page/{page}/"),
                200,
                film_list_page(&[slug], page, 40),
            );
        }
        let boxd = client(fetcher.clone());
        let films = boxd.popular_films(&FilmListOptions { page_count: 3, ..Default::default() }).await.unwrap();
        assert_eq!(films.iter().map(|f| f.slug.as_str()).collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn watched_imdb_ids_skip_films_without_ids() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.insert("https://letterboxd.com/dave/films/page/1/", 200, film_list_page(&["cure", "lost"], 1, 1));
        fetcher.insert("https://letterboxd.com/film/cure/", 200, film_page("cure", "Cure", 1997, "tt0123948", "36095"));
        let boxd = client(fetcher);
        assert_eq!(boxd.watched_imdb_ids("dave").await.unwrap(), vec!["tt0123948".to_string()]);
    }
}
