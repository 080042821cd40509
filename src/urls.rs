use crate::error::{ScrapeError, ScrapeResult};
use crate::films::{FilmographyRequest, FILMOGRAPHY_PROFESSIONS};
use crate::lists::ListId;
use crate::types::FilmSet;
use crate::Boxd;

/// What a site URL points at, as far as film collections go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlTarget {
    Filmography(FilmographyRequest),
    Watchlist(String),
    List(ListId),
    Watched(String),
}

/// Path of a site URL without its trailing slash. Bare paths pass through; full URLs
/// must be on `site_host`.
pub fn normalize_url_path(raw: &str, site_host: &str) -> ScrapeResult<String> {
    let raw = raw.trim().trim_end_matches('/');
    if raw.starts_with('/') {
        return Ok(raw.to_string());
    }
    let parsed = url::Url::parse(raw).map_err(|e| {
        tracing::debug!(url = raw, error = %e, "error parsing url");
        ScrapeError::InvalidUrl(format!("{raw}: {e}"))
    })?;
    if !parsed.host_str().is_some_and(|h| on_site(h, site_host)) {
        return Err(ScrapeError::InvalidUrl(format!("{raw} is not a {site_host} url")));
    }
    Ok(parsed.path().trim_end_matches('/').to_string())
}

fn on_site(host: &str, site_host: &str) -> bool {
    host == site_host || host.strip_suffix(site_host).is_some_and(|sub| sub.ends_with('.'))
}

pub fn classify_path(path: &str) -> ScrapeResult<UrlTarget> {
    let parts: Vec<&str> = path.trim_matches('/').split('/').filter(|p| !p.is_empty()).collect();
    match parts.as_slice() {
        [profession, person, ..] if FILMOGRAPHY_PROFESSIONS.contains(profession) => {
            Ok(UrlTarget::Filmography(FilmographyRequest::new(*profession, *person)))
        }
        [user, .., "watchlist"] => Ok(UrlTarget::Watchlist(user.to_string())),
        [owner, "list", slug, ..] => Ok(UrlTarget::List(ListId::new(*owner, *slug))),
        [user, "films"] => Ok(UrlTarget::Watched(user.to_string())),
        _ => Err(ScrapeError::InvalidUrl(format!("could not find a match for {path}"))),
    }
}

impl Boxd {
    /// Films behind any supported site URL: filmographies, watchlists, lists and watched films.
    pub async fn items_for_url(&self, raw: &str) -> ScrapeResult<FilmSet> {
        let path = normalize_url_path(raw, &self.site_host())?;
        let target = classify_path(&path)?;
        tracing::debug!(path = %path, target = ?target, "dispatching url");
        match target {
            UrlTarget::Filmography(request) => self.filmography(&request).await,
            UrlTarget::Watchlist(user) => self.watchlist(&user).await,
            UrlTarget::List(id) => self.list(&id.owner, &id.slug).await,
            UrlTarget::Watched(user) => self.watched(&user).await,
        }
    }
}
