use regex::Regex;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::html::{attr, selector, text_of};

/// Page size the site uses on templates that only announce an item count.
pub const HEADING_ITEMS_PER_PAGE: u32 = 72;

static ITEM_COUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"There are (\d+)").expect("item count regex"));

/// Where a page sits inside its collection.
///
/// `is_last` is true exactly when `current_page == total_pages`, and `next_page` is
/// `current_page + 1` otherwise (0 on the last page). The one exception is
/// [`Pagination::from_has_next`], used by templates that only render a "Next" link:
/// there the page counters are unknown (0) and only `is_last` is meaningful.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u32,
    pub next_page: u32,
    pub total_pages: u32,
    pub total_items: u32,
    pub items_per_page: u32,
    pub is_last: bool,
}

impl Pagination {
    pub fn new(current_page: u32, total_pages: u32) -> Self {
        let is_last = current_page == total_pages;
        Self {
            current_page,
            next_page: if is_last { 0 } else { current_page.checked_add(1).unwrap_or(0) },
            total_pages,
            total_items: 0,
            items_per_page: 0,
            is_last,
        }
    }

    /// Assumed shape of a page that renders no pagination controls at all.
    pub fn single_page() -> Self { Self::new(1, 1) }

    pub fn from_has_next(has_next: bool) -> Self {
        Self { is_last: !has_next, ..Self::default() }
    }

    /// Record an announced item count; derives the page count when the page size is known.
    pub fn set_total_items(&mut self, total_items: u32) {
        self.total_items = total_items;
        if self.items_per_page != 0 {
            self.total_pages = total_items.div_ceil(self.items_per_page).max(1);
        }
    }
}

/// Infer pagination from a parsed page. The page-list strategy runs first; the
/// item-count heading is only consulted when it yields no current page.
pub fn detect(doc: &Html) -> Option<Pagination> {
    let found = from_page_list(doc).or_else(|| from_block_heading(doc))?;
    let mut p = Pagination::new(found.current_page, found.total_pages);
    p.total_items = found.total_items;
    p.items_per_page = found.items_per_page;
    Some(p)
}

pub fn detect_bytes(body: &[u8]) -> Option<Pagination> {
    detect(&crate::html::parse(body))
}

/// Whether the page renders an active "Next" link.
pub fn has_next(doc: &Html) -> bool {
    doc.select(&selector("div.pagination a.next"))
        .next()
        .is_some_and(|a| text_of(a) == "Next")
}

/// Trailing page number of a navigation link (`/someone/films/page/4/` -> 4).
pub fn page_from_href(href: &str) -> Option<u32> {
    href.trim_end_matches('/').rsplit('/').next()?.trim().parse().ok()
}

fn is_placeholder(text: &str) -> bool {
    text.is_empty() || text == "…" || text == "..."
}

fn has_class(el: ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

fn from_page_list(doc: &Html) -> Option<Pagination> {
    let mut p = Pagination::default();
    for list in doc.select(&selector("div.paginate-pages")) {
        for li in list.select(&selector("li")) {
            let text = text_of(li);
            if is_placeholder(&text) {
                continue;
            }
            let Ok(n) = text.parse::<u32>() else {
                tracing::debug!(text = %text, "skipping non-numeric page marker");
                continue;
            };
            if has_class(li, "paginate-current") {
                p.current_page = n;
                // Provisional; any later page link raises it
                p.total_pages = p.total_pages.max(n);
            } else if has_class(li, "paginate-page") {
                p.total_pages = p.total_pages.max(n);
            }
        }
    }
    (p.current_page != 0).then_some(p)
}

fn from_block_heading(doc: &Html) -> Option<Pagination> {
    let mut p = Pagination { items_per_page: HEADING_ITEMS_PER_PAGE, ..Pagination::default() };
    for heading in doc.select(&selector("p.ui-block-heading")) {
        let text = text_of(heading).replace(',', "");
        let Some(count) = ITEM_COUNT.captures(&text).and_then(|c| c[1].parse::<u32>().ok()) else { continue };
        p.set_total_items(count);
        for nav in doc.select(&selector("div.pagination")) {
            apply_next_link(&mut p, nav);
            apply_previous_link(&mut p, nav);
        }
    }
    (p.current_page != 0).then_some(p)
}

fn apply_next_link(p: &mut Pagination, nav: ElementRef<'_>) {
    let Some(link) = nav.select(&selector("a.next")).next() else { return };
    if text_of(link) != "Next" { return; }
    let Some(next) = attr(link, "href").and_then(page_from_href) else { return };
    if let Some(current) = next.checked_sub(1).filter(|c| *c > 0) {
        p.current_page = current;
    }
}

fn apply_previous_link(p: &mut Pagination, nav: ElementRef<'_>) {
    let Some(link) = nav.select(&selector("a.previous")).next() else { return };
    if text_of(link) != "Previous" { return; }
    match attr(link, "href").map(page_from_href) {
        Some(Some(prev)) => match prev.checked_add(1) {
            Some(current) => p.current_page = current,
            None => tracing::warn!(prev, "previous link page number out of range"),
        },
        Some(None) => tracing::warn!("previous link has no page number"),
        None => {}
    }
}
