use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::config::{ClientConfig, DEFAULT_MAX_COLLECTION_PAGES};
use crate::enhancer::{Enhance, Enhancer, Lookup};
use crate::error::ScrapeResult;
use crate::extract::PageExtractor;
use crate::fetch::PageLoader;
use crate::stream::{self, ItemSink, ItemStream};
use crate::types::FetchResult;

/// One paginated collection, addressable by 1-based page number.
#[async_trait]
pub trait PageSource: Send + Sync + 'static {
    type Item: Send + 'static;

    async fn page(&self, n: u32) -> ScrapeResult<FetchResult<Self::Item>>;

    /// Used in log lines.
    fn label(&self) -> String { "pages".to_string() }
}

/// Pages fetched from a URL template with a `{page}` placeholder.
pub struct UrlPages<E> {
    loader: PageLoader,
    template: String,
    extractor: E,
}

impl<E> UrlPages<E> {
    pub fn new(loader: PageLoader, template: impl Into<String>, extractor: E) -> Self {
        Self { loader, template: template.into(), extractor }
    }

    pub fn url_for(&self, page: u32) -> String { self.template.replace("{page}", &page.to_string()) }
}

#[async_trait]
impl<E> PageSource for UrlPages<E>
where
    E: PageExtractor,
    E::Item: Serialize + DeserializeOwned,
{
    type Item = E::Item;

    async fn page(&self, n: u32) -> ScrapeResult<FetchResult<E::Item>> {
        self.loader.load(&self.extractor, &self.url_for(n)).await
    }

    fn label(&self) -> String { self.template.clone() }
}

/// Runs the enhancer over each page before its items are handed on.
pub struct EnhancedPages<S, L> {
    inner: S,
    enhancer: Enhancer<L>,
}

impl<S, L> EnhancedPages<S, L> {
    pub fn new(inner: S, enhancer: Enhancer<L>) -> Self { Self { inner, enhancer } }
}

#[async_trait]
impl<S, L> PageSource for EnhancedPages<S, L>
where
    S: PageSource,
    S::Item: Enhance,
    L: Lookup<<S::Item as Enhance>::Full>,
{
    type Item = S::Item;

    async fn page(&self, n: u32) -> ScrapeResult<FetchResult<S::Item>> {
        let mut page = self.inner.page(n).await?;
        let report = self.enhancer.enhance_batch(&mut page.items).await;
        if !report.is_complete() {
            tracing::debug!(page = n, failed = report.failed, attempted = report.attempted, "page partially enhanced");
        }
        Ok(page)
    }

    fn label(&self) -> String { self.inner.label() }
}

/// What a collection run saw. `estimated_total_items` is advisory only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectStats {
    pub total_pages: u32,
    pub items: usize,
    pub failed_pages: u32,
    pub estimated_total_items: usize,
}

#[derive(Default)]
struct Tally {
    items: usize,
    failed: u32,
}

/// Drives a [`PageSource`]: page 1, then the last page, then the middle pages on a
/// bounded worker pool.
#[derive(Debug, Clone, Copy)]
pub struct Collector {
    concurrency: usize,
    buffer: usize,
    max_pages: u32,
}

// Keeps the shared page cursor well clear of wrapping
const PAGE_CAP_LIMIT: u32 = u32::MAX / 2;

impl Collector {
    pub fn new(concurrency: usize, buffer: usize) -> Self {
        Self { concurrency: concurrency.max(1), buffer: buffer.max(1), max_pages: DEFAULT_MAX_COLLECTION_PAGES }
    }

    /// Upper bound on the page count a collection may report.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.clamp(1, PAGE_CAP_LIMIT);
        self
    }

    pub fn from_config(cfg: &ClientConfig) -> Self {
        Self::new(cfg.page_concurrency, cfg.stream_buffer).with_max_pages(cfg.max_collection_pages)
    }

    pub fn concurrency(&self) -> usize { self.concurrency }

    pub fn stream<S: PageSource>(&self, source: Arc<S>) -> ItemStream<S::Item> {
        let collector = *self;
        stream::spawn(self.buffer, move |sink| async move {
            collector.run(source, &sink).await.map(|_| ())
        })
    }

    pub async fn collect<S: PageSource>(&self, source: Arc<S>) -> ScrapeResult<Vec<S::Item>> {
        self.stream(source).collect().await
    }

    /// Emit every page of `source` into `sink`. Only a page 1 failure is an error;
    /// later pages that fail are logged and left out.
    pub async fn run<S: PageSource>(&self, source: Arc<S>, sink: &ItemSink<S::Item>) -> ScrapeResult<CollectStats> {
        let label = source.label();
        let first = source.page(1).await?;
        let reported = first.pagination.map_or(1, |p| p.total_pages).max(1);
        let total_pages = reported.min(self.max_pages);
        if total_pages < reported {
            tracing::warn!(source = %label, reported, max_pages = self.max_pages, "page count over the limit, capping");
        }
        let per_full_page = first.items.len();
        let mut stats = CollectStats { total_pages, items: per_full_page, ..CollectStats::default() };
        tracing::debug!(source = %label, total_pages, per_page = per_full_page, "first page fetched");
        if !emit(sink, first.items).await {
            tracing::debug!(source = %label, "consumer gone, stopping");
            return Ok(stats);
        }

        // The last page is usually partial; fetch it before the bulk
        let mut last_count = 0;
        if total_pages > 1 {
            match source.page(total_pages).await {
                Ok(last) => {
                    last_count = last.items.len();
                    stats.items += last_count;
                    if !emit(sink, last.items).await {
                        tracing::debug!(source = %label, "consumer gone, stopping");
                        return Ok(stats);
                    }
                }
                Err(e) => {
                    tracing::warn!(source = %label, page = total_pages, error = %e, "dropping last page");
                    stats.failed_pages += 1;
                }
            }
        }

        if total_pages > 2 {
            let middle = self.middle_pages(source, total_pages, sink).await;
            stats.items += middle.items;
            stats.failed_pages += middle.failed;
        }

        stats.estimated_total_items = estimate_total(per_full_page, total_pages, last_count);
        if stats.items != stats.estimated_total_items {
            tracing::warn!(
                source = %label,
                items = stats.items,
                estimated = stats.estimated_total_items,
                failed_pages = stats.failed_pages,
                "collected item count differs from estimate"
            );
        }
        tracing::debug!(source = %label, items = stats.items, "collection finished");
        Ok(stats)
    }

    // Pages 2..total-1, drained by min(concurrency, count) workers sharing a cursor
    async fn middle_pages<S: PageSource>(&self, source: Arc<S>, total_pages: u32, sink: &ItemSink<S::Item>) -> Tally {
        let count = (total_pages - 2) as usize;
        let cursor = Arc::new(AtomicU32::new(2));
        let mut workers = JoinSet::new();
        for _ in 0..self.concurrency.min(count) {
            let (source, sink, cursor) = (source.clone(), sink.clone(), cursor.clone());
            workers.spawn(async move {
                let mut tally = Tally::default();
                while !sink.is_closed() {
                    let page = cursor.fetch_add(1, Ordering::Relaxed);
                    if page >= total_pages {
                        break;
                    }
                    match source.page(page).await {
                        Ok(result) => {
                            tally.items += result.items.len();
                            if !emit(&sink, result.items).await {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(source = %source.label(), page, error = %e, "dropping middle page");
                            tally.failed += 1;
                        }
                    }
                }
                tally
            });
        }

        let mut total = Tally::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(t) => {
                    total.items += t.items;
                    total.failed += t.failed;
                }
                Err(e) => tracing::error!(error = %e, "page worker died"),
            }
        }
        total
    }
}

/// `per_full_page * (total - 2) + first + last`, with first == per_full_page.
pub fn estimate_total(per_full_page: usize, total_pages: u32, last_count: usize) -> usize {
    match total_pages {
        0 | 1 => per_full_page,
        2 => per_full_page + last_count,
        n => per_full_page * (n as usize - 2) + per_full_page + last_count,
    }
}

async fn emit<T>(sink: &ItemSink<T>, items: Vec<T>) -> bool {
    for item in items {
        if !sink.send(item).await {
            return false;
        }
    }
    true
}

/// For collections that only say whether another page follows: fetch 1, 2, ...
/// until a page reports `is_last`. Any page failure fails the whole call.
pub async fn collect_sequential<S: PageSource>(source: &S, max_pages: u32) -> ScrapeResult<Vec<S::Item>> {
    let mut out = Vec::new();
    for n in 1..=max_pages.max(1) {
        let page = source.page(n).await?;
        out.extend(page.items);
        if page.pagination.map_or(true, |p| p.is_last) {
            return Ok(out);
        }
    }
    tracing::warn!(source = %source.label(), max_pages, "stopped at the page limit");
    Ok(out)
}
