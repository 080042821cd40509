use crate::error::ScrapeResult;
use crate::extract::PageExtractor;
use crate::html::{attr, parse, selector};
use crate::pagination::{self, Pagination};
use crate::types::FetchResult;

/// Followers/following tables. These pages only say whether a next page exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct PeopleExtractor;

impl PageExtractor for PeopleExtractor {
    type Item = String;

    fn extract(&self, body: &[u8]) -> ScrapeResult<FetchResult<String>> {
        let doc = parse(body);
        let names = doc
            .select(&selector("td.table-person a.name"))
            .filter_map(|a| attr(a, "href"))
            .map(|href| href.trim_matches('/').to_string())
            .filter(|name| !name.is_empty())
            .collect();
        let pagination = Pagination::from_has_next(pagination::has_next(&doc));
        Ok(FetchResult::new(names, Some(pagination)))
    }
}
