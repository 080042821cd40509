use crate::error::ScrapeResult;
use crate::extract::{normalize_slug, PageExtractor};
use crate::html::{attr, parse, selector};
use crate::pagination::{self, Pagination};
use crate::types::{FetchResult, Film};

/// Poster grids: watched films, lists, watchlists, popular films and filmographies.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilmListExtractor;

impl PageExtractor for FilmListExtractor {
    type Item = Film;

    fn extract(&self, body: &[u8]) -> ScrapeResult<FetchResult<Film>> {
        let doc = parse(body);
        let mut films = Vec::new();
        for container in doc.select(&selector("li.poster-container")) {
            for poster in container.select(&selector("div.film-poster")) {
                let mut film = Film {
                    id: attr(poster, "data-film-id").unwrap_or_default().to_string(),
                    slug: normalize_slug(attr(poster, "data-film-slug").unwrap_or_default()),
                    target: attr(poster, "data-target-link").unwrap_or_default().to_string(),
                    ..Film::default()
                };
                // The real title only appears as the poster image's alt text
                if let Some(img) = poster.select(&selector("img.image")).next() {
                    film.title = attr(img, "alt").unwrap_or_default().to_string();
                }
                films.push(film);
            }
        }
        let pagination = pagination::detect(&doc).unwrap_or_else(|| {
            tracing::debug!("no pagination found, assuming a single page");
            Pagination::single_page()
        });
        Ok(FetchResult::new(films, Some(pagination)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_page_yields_a_full_grid() {
        let page = FilmListExtractor.extract(include_bytes!("../../tests/fixtures/user/films.html")).unwrap();
        assert_eq!(page.items.len(), 72);
        let first = &page.items[0];
        assert_eq!(first.slug, "the-french-connection");
        assert_eq!(first.title, "The French Connection");
        assert_eq!(first.id, "51602");
        assert_eq!(first.target, "/film/the-french-connection/");
        assert_eq!(first.year, 0);
        assert!(first.external_ids.is_none());
        let p = page.pagination.unwrap();
        assert_eq!((p.current_page, p.total_pages), (1, 59));
    }

    #[test]
    fn unpaginated_grid_falls_back_to_single_page() {
        let html = br#"<ul><li class="poster-container"><div class="film-poster" data-film-slug="/film/cure/" data-film-id="1">
            <img class="image" alt="Cure"></div></li></ul>"#;
        let page = FilmListExtractor.extract(html).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].slug, "cure");
        let p = page.pagination.unwrap();
        assert_eq!((p.current_page, p.total_pages, p.is_last), (1, 1, true));
    }

    #[test]
    fn empty_page_is_not_an_error() {
        let page = FilmListExtractor.extract(b"").unwrap();
        assert!(page.items.is_empty());
    }
}
