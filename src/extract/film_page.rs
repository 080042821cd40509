use crate::error::ScrapeResult;
use crate::extract::{id_from_external_url, normalize_slug, title_without_year, year_from_title, PageExtractor};
use crate::html::{attr, parse, selector};
use crate::types::{ExternalFilmIds, FetchResult, Film};

/// A film's own page, the source of everything the enhancer fills in.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilmPageExtractor;

impl PageExtractor for FilmPageExtractor {
    type Item = Film;

    fn extract(&self, body: &[u8]) -> ScrapeResult<FetchResult<Film>> {
        let doc = parse(body);
        let mut film = Film::default();
        let mut ids = ExternalFilmIds::default();

        for meta in doc.select(&selector(r#"meta[property="og:title"]"#)) {
            let full = attr(meta, "content").unwrap_or_default();
            match year_from_title(full) {
                Some(year) => {
                    film.year = year;
                    film.title = title_without_year(full).to_string();
                }
                None => tracing::debug!(title = full, "no year in film title"),
            }
        }

        // First poster on the page is the film itself; later ones are recommendations
        if let Some(poster) = doc.select(&selector("div.film-poster")).next() {
            film.slug = normalize_slug(attr(poster, "data-film-slug").unwrap_or_default());
            film.target = attr(poster, "data-target-link").unwrap_or_default().to_string();
            film.id = attr(poster, "data-film-id").unwrap_or_default().to_string();
        }

        for link in doc.select(&selector("a[data-track-action]")) {
            let href = attr(link, "href").unwrap_or_default();
            match attr(link, "data-track-action") {
                Some("IMDb") => ids.imdb = id_from_external_url(href).unwrap_or_default(),
                Some("TMDb") => ids.tmdb = id_from_external_url(href).unwrap_or_default(),
                _ => {}
            }
        }
        film.external_ids = Some(ids);
        Ok(FetchResult::new(vec![film], None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::film_page;

    #[test]
    fn film_page_fields() {
        let html = film_page("sweet-sweetbacks-baadasssss-song", "Sweet Sweetback's Baadasssss Song", 1971, "tt0067810", "5822");
        let page = FilmPageExtractor.extract(html.as_bytes()).unwrap();
        let film = &page.items[0];
        assert_eq!(film.title, "Sweet Sweetback's Baadasssss Song");
        assert_eq!(film.year, 1971);
        assert_eq!(film.slug, "sweet-sweetbacks-baadasssss-song");
        assert_eq!(film.target, "/film/sweet-sweetbacks-baadasssss-song/");
        let ids = film.external_ids.as_ref().unwrap();
        assert_eq!(ids.imdb, "tt0067810");
        assert_eq!(ids.tmdb, "5822");
    }

    #[test]
    fn title_without_year_is_left_empty() {
        let html = br#"<meta property="og:title" content="Untitled Project">"#;
        let page = FilmPageExtractor.extract(html).unwrap();
        assert_eq!(page.items[0].title, "");
        assert_eq!(page.items[0].year, 0);
    }
}
