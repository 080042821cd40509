//! Item stream with a single terminal result, the output of every streaming operation.
//!
//! Items travel over a bounded channel; the terminal result travels over a oneshot, so
//! a stream can only ever be completed once. A consumer reads items until the channel
//! closes and then reads the terminal result, which means it always sees every item
//! that was sent before completion. Dropping the [`ItemStream`] is the cancellation
//! signal: producers observe it as a failed [`ItemSink::send`] and stop.

use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};

use crate::error::{ScrapeError, ScrapeResult};

pub fn channel<T>(buffer: usize) -> (StreamSender<T>, ItemStream<T>) {
    let (items_tx, items_rx) = mpsc::channel(buffer.max(1));
    let (done_tx, done_rx) = oneshot::channel();
    (
        StreamSender { sink: ItemSink { tx: items_tx }, done: done_tx },
        ItemStream { items: items_rx, done: done_rx },
    )
}

/// Run `producer` on a new task; its return value becomes the stream's terminal result.
pub fn spawn<T, F, Fut>(buffer: usize, producer: F) -> ItemStream<T>
where
    T: Send + 'static,
    F: FnOnce(ItemSink<T>) -> Fut,
    Fut: Future<Output = ScrapeResult<()>> + Send + 'static,
{
    let (sender, stream) = channel(buffer);
    let work = producer(sender.sink());
    tokio::spawn(async move {
        let result = work.await;
        sender.finish(result);
    });
    stream
}

/// Cloneable item handle given to workers.
pub struct ItemSink<T> {
    tx: mpsc::Sender<T>,
}

impl<T> Clone for ItemSink<T> {
    fn clone(&self) -> Self { Self { tx: self.tx.clone() } }
}

impl<T> ItemSink<T> {
    /// Waits for buffer space. Returns false once the consumer has gone away.
    pub async fn send(&self, item: T) -> bool { self.tx.send(item).await.is_ok() }

    pub fn is_closed(&self) -> bool { self.tx.is_closed() }
}

pub struct StreamSender<T> {
    sink: ItemSink<T>,
    done: oneshot::Sender<ScrapeResult<()>>,
}

impl<T> StreamSender<T> {
    pub fn sink(&self) -> ItemSink<T> { self.sink.clone() }

    pub async fn send(&self, item: T) -> bool { self.sink.send(item).await }

    /// Send the terminal result. Consumes the sender so nothing can be emitted afterwards.
    pub fn finish(self, result: ScrapeResult<()>) {
        let Self { sink, done } = self;
        drop(sink);
        if done.send(result).is_err() {
            tracing::trace!("stream consumer gone before completion");
        }
    }
}

pub struct ItemStream<T> {
    items: mpsc::Receiver<T>,
    done: oneshot::Receiver<ScrapeResult<()>>,
}

impl<T> ItemStream<T> {
    /// A stream that yields nothing and ends with `err`.
    pub fn failed(err: ScrapeError) -> Self {
        let (sender, stream) = channel(1);
        sender.finish(Err(err));
        stream
    }

    pub async fn next(&mut self) -> Option<T> { self.items.recv().await }

    /// Discard any remaining items and wait for the terminal result.
    pub async fn finish(mut self) -> ScrapeResult<()> {
        while self.items.recv().await.is_some() {}
        self.done.await.unwrap_or(Err(ScrapeError::Aborted))
    }

    /// Slurp every item. Fails with the terminal error if there was one.
    pub async fn collect(mut self) -> ScrapeResult<Vec<T>> {
        let mut out = Vec::new();
        while let Some(item) = self.items.recv().await {
            out.push(item);
        }
        self.done.await.unwrap_or(Err(ScrapeError::Aborted))?;
        Ok(out)
    }

    /// Forward every item into `sink`. Returns `None` when the downstream consumer left
    /// before this stream finished, otherwise this stream's terminal result.
    pub async fn relay(mut self, sink: &ItemSink<T>) -> Option<ScrapeResult<()>> {
        while let Some(item) = self.items.recv().await {
            if !sink.send(item).await {
                return None;
            }
        }
        Some(self.done.await.unwrap_or(Err(ScrapeError::Aborted)))
    }
}

impl<T> Stream for ItemStream<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().items.poll_recv(cx)
    }
}
