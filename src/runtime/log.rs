//! `RoutingLog` implementations.
//!
//! [`DefaultLog`] writes straight to the `log`/`defmt` backends. [`ChannelLog`]
//! turns dispatch failures into [`HandlerFailure`] records on an
//! `embassy-sync` channel, so a supervising task can drain and report them
//! outside the broker's delivery callback.

use core::sync::atomic::{AtomicUsize, Ordering};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};

use super::traits::RoutingLog;
use crate::error::HandlerError;
use crate::topic::{MAX_TOPIC_LEN, TopicString};

/// Forwards routing events to the crate's `log`/`defmt` backends.
///
/// Handler failures are warnings; unmatched topics and publishes are debug
/// output. With neither feature enabled this logs nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultLog;

impl RoutingLog for DefaultLog {
    fn handler_failed(&self, topic: &str, error: HandlerError) {
        warn!("message processing error: topic={} error={:?}", topic, error);
    }

    fn unmatched(&self, topic: &str) {
        debug!("no handler for topic {}", topic);
    }

    fn published(&self, topic: &str, payload_len: usize) {
        debug!("message published: topic={} bytes={}", topic, payload_len);
    }
}

/// A handler failure captured during dispatch.
#[derive(Debug)]
pub struct HandlerFailure {
    /// Topic of the failed message, cut to [`MAX_TOPIC_LEN`] bytes if longer
    pub topic: TopicString,
    /// The error returned by the handler
    pub error: HandlerError,
}

#[cfg(feature = "defmt")]
impl defmt::Format for HandlerFailure {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "HandlerFailure({}, {})", self.topic.as_str(), &self.error)
    }
}

pub type FailureChannel<M, const DEPTH: usize> = Channel<M, HandlerFailure, DEPTH>;

pub type FailureSender<'a, M, const DEPTH: usize> = Sender<'a, M, HandlerFailure, DEPTH>;

pub type FailureReceiver<'a, M, const DEPTH: usize> = Receiver<'a, M, HandlerFailure, DEPTH>;

/// Queues handler failures on a [`FailureChannel`].
///
/// Never blocks the dispatch path: when the channel is full the failure is
/// dropped and counted in [`dropped`](Self::dropped).
pub struct ChannelLog<'a, M: RawMutex, const DEPTH: usize> {
    tx: FailureSender<'a, M, DEPTH>,
    dropped: AtomicUsize,
}

impl<'a, M: RawMutex, const DEPTH: usize> ChannelLog<'a, M, DEPTH> {
    pub fn new(tx: FailureSender<'a, M, DEPTH>) -> Self {
        Self {
            tx,
            dropped: AtomicUsize::new(0),
        }
    }

    /// Number of failures lost because the channel was full.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<M, const DEPTH: usize> RoutingLog for ChannelLog<'_, M, DEPTH>
where
    M: RawMutex + Sync,
{
    fn handler_failed(&self, topic: &str, error: HandlerError) {
        let failure = HandlerFailure {
            topic: truncate_topic(topic),
            error,
        };
        if self.tx.try_send(failure).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Reports every failure already queued to `log` and returns how many there
/// were.
pub fn drain_failures<M: RawMutex, const DEPTH: usize>(
    rx: &FailureReceiver<'_, M, DEPTH>,
    log: &dyn RoutingLog,
) -> usize {
    let mut drained = 0;
    while let Ok(failure) = rx.try_receive() {
        log.handler_failed(&failure.topic, failure.error);
        drained += 1;
    }
    drained
}

/// Reports failures to `log` as they arrive. Runs forever; spawn it as a
/// supervising task next to the broker connection.
pub async fn report_failures<M: RawMutex, const DEPTH: usize>(
    rx: FailureReceiver<'_, M, DEPTH>,
    log: &dyn RoutingLog,
) -> ! {
    loop {
        let failure = rx.receive().await;
        log.handler_failed(&failure.topic, failure.error);
    }
}

fn truncate_topic(topic: &str) -> TopicString {
    let mut end = topic.len().min(MAX_TOPIC_LEN);
    while !topic.is_char_boundary(end) {
        end -= 1;
    }

    let mut owned = TopicString::new();
    // Cannot fail: `end` is within capacity.
    let _ = owned.push_str(&topic[..end]);
    owned
}
