use crate::error::{self, ScrapeResult};
use crate::extract::PageExtractor;
use crate::html::{attr, first, parse, selector, text_of};
use crate::types::{FetchResult, User};

/// A user's profile page. Yields exactly one `User` without following/followers.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProfileExtractor;

impl PageExtractor for ProfileExtractor {
    type Item = User;

    fn extract(&self, body: &[u8]) -> ScrapeResult<FetchResult<User>> {
        let doc = parse(body);
        let mut user = User::default();
        if let Some(bio) = first(&doc, "section#person-bio div.collapsible-text") {
            user.bio = text_of(bio);
        }
        if let Some(header) = first(&doc, "section.js-profile-header") {
            user.username = attr(header, "data-person").unwrap_or_default().to_string();
        }
        if user.username.is_empty() {
            return Err(error::ScrapeError::extract("user", "no profile header found"));
        }

        let films_href = format!("/{}/films/", user.username);
        for link in doc.select(&selector("div.profile-stats a")) {
            if attr(link, "href") != Some(films_href.as_str()) {
                continue;
            }
            if let Some(value) = link.select(&selector("span.value")).next() {
                let raw = text_of(value).replace(',', "");
                match raw.parse() {
                    Ok(count) => user.watched_film_count = count,
                    Err(e) => tracing::warn!(value = %raw, error = %e, "failed to parse film count"),
                }
            }
        }
        Ok(FetchResult::new(vec![user], None))
    }
}
