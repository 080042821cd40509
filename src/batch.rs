use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::BatchErrorPolicy;
use crate::error::ScrapeError;
use crate::lists::ListId;
use crate::stream::{self, ItemStream};
use crate::types::Film;
use crate::Boxd;

/// A heterogeneous request: several users' watched films, several lists, several watchlists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSpec {
    pub watched: Vec<String>,
    #[serde(alias = "list")]
    pub lists: Vec<ListId>,
    pub watchlist: Vec<String>,
}

impl BatchSpec {
    pub fn is_empty(&self) -> bool { self.watched.is_empty() && self.lists.is_empty() && self.watchlist.is_empty() }

    /// Sub-requests in relay order: watched, then lists, then watchlists.
    pub fn requests(&self) -> Vec<SubRequest> {
        let watched = self.watched.iter().cloned().map(SubRequest::Watched);
        let lists = self.lists.iter().cloned().map(SubRequest::List);
        let watchlists = self.watchlist.iter().cloned().map(SubRequest::Watchlist);
        watched.chain(lists).chain(watchlists).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubRequest {
    Watched(String),
    List(ListId),
    Watchlist(String),
}

impl fmt::Display for SubRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Watched(user) => write!(f, "watched films of {user}"),
            Self::List(id) => write!(f, "list {id}"),
            Self::Watchlist(user) => write!(f, "watchlist of {user}"),
        }
    }
}

/// Relay each sub-request's stream, one after another, onto a single stream.
///
/// With [`BatchErrorPolicy::Continue`] a failed sub-stream is recorded and the batch
/// moves on; the terminal result is `BatchFailed` if anything failed. With
/// [`BatchErrorPolicy::Abort`] the first failure ends the batch with that error.
pub fn multiplex<T, F>(requests: Vec<SubRequest>, policy: BatchErrorPolicy, buffer: usize, open: F) -> ItemStream<T>
where
    T: Send + 'static,
    F: Fn(&SubRequest) -> ItemStream<T> + Send + 'static,
{
    stream::spawn(buffer, move |sink| async move {
        let mut failed = 0;
        let mut first: Option<String> = None;
        for request in requests {
            tracing::info!(request = %request, "streaming batch part");
            match open(&request).relay(&sink).await {
                None => {
                    tracing::debug!("batch consumer gone, stopping");
                    return Ok(());
                }
                Some(Ok(())) => tracing::debug!(request = %request, "batch part finished"),
                Some(Err(e)) => {
                    tracing::error!(request = %request, error = %e, "batch part failed");
                    if policy == BatchErrorPolicy::Abort {
                        return Err(e);
                    }
                    failed += 1;
                    first.get_or_insert_with(|| format!("{request}: {e}"));
                }
            }
        }
        match first {
            None => Ok(()),
            Some(first) => Err(ScrapeError::BatchFailed { failed, first }),
        }
    })
}

impl Boxd {
    /// Every film of every part of `spec` on one stream, using the configured error policy.
    pub fn stream_batch(&self, spec: &BatchSpec) -> ItemStream<Film> { self.stream_batch_with(spec, self.config.batch_errors) }

    pub fn stream_batch_with(&self, spec: &BatchSpec, policy: BatchErrorPolicy) -> ItemStream<Film> {
        let client = self.clone();
        multiplex(spec.requests(), policy, self.config.stream_buffer, move |request| match request {
            SubRequest::Watched(user) => client.stream_watched(user),
            SubRequest::List(id) => client.stream_list(&id.owner, &id.slug),
            SubRequest::Watchlist(user) => client.stream_watchlist(user),
        })
    }
}
