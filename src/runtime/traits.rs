//! Handler, subscriber and logging traits.
//!
//! # Object Safety
//!
//! Every trait here is dyn-compatible. The registry stores handlers as
//! `&dyn MessageHandler`, subscribers register through
//! `&mut dyn HandlerCollector`, and the dispatcher reports through
//! `&dyn RoutingLog`, so none of the runtime types carry generic parameters
//! for application code.
//!
//! # Thread Safety
//!
//! `MessageHandler` and `RoutingLog` require `Sync`: the broker connection may
//! call the dispatcher from several threads at once.

use core::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::envelope;
use crate::error::{HandlerError, RegistryError};

/// Processes the payload of a message whose topic matched a registered filter.
///
/// Closures of the form `Fn(&[u8]) -> Result<(), HandlerError> + Sync` are
/// handlers too.
pub trait MessageHandler: Sync {
    fn handle(&self, payload: &[u8]) -> Result<(), HandlerError>;
}

impl<F> MessageHandler for F
where
    F: Fn(&[u8]) -> Result<(), HandlerError> + Sync,
{
    fn handle(&self, payload: &[u8]) -> Result<(), HandlerError> {
        self(payload)
    }
}

/// A handler that decodes a JSON envelope before calling `f`.
pub struct JsonHandler<T, F> {
    f: F,
    _envelope: PhantomData<fn() -> T>,
}

impl<T, F> JsonHandler<T, F>
where
    T: DeserializeOwned,
    F: Fn(T) -> Result<(), HandlerError> + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _envelope: PhantomData,
        }
    }
}

impl<T, F> MessageHandler for JsonHandler<T, F>
where
    T: DeserializeOwned,
    F: Fn(T) -> Result<(), HandlerError> + Sync,
{
    fn handle(&self, payload: &[u8]) -> Result<(), HandlerError> {
        let message = envelope::decode(payload)?;
        (self.f)(message)
    }
}

/// Object-safe trait for collecting `(filter, handler)` pairs.
///
/// The registry provides this to subscribers during registration. The filter
/// is copied, so it only needs to live for the duration of the call; the
/// handler is borrowed for as long as the registry and its dispatcher live.
pub trait HandlerCollector<'h> {
    fn add(&mut self, filter: &str, handler: &'h dyn MessageHandler) -> Result<(), RegistryError>;
}

/// A component that owns handlers for a set of topic filters.
///
/// # Example
///
/// ```ignore
/// struct StatusSubscriber {
///     filter: TopicString,
///     on_status: StatusHandler,
/// }
///
/// impl Subscriber for StatusSubscriber {
///     fn register<'h>(
///         &'h self,
///         collector: &mut dyn HandlerCollector<'h>,
///     ) -> Result<(), RegistryError> {
///         collector.add(&self.filter, &self.on_status)
///     }
/// }
/// ```
pub trait Subscriber {
    /// Adds every filter this component handles to the collector.
    ///
    /// Called once, before the registry subscribes anything.
    fn register<'h>(
        &'h self,
        collector: &mut dyn HandlerCollector<'h>,
    ) -> Result<(), RegistryError>;
}

/// A subscriber that registers nothing.
///
/// Useful as a placeholder or for testing.
pub struct NoopSubscriber;

impl Subscriber for NoopSubscriber {
    fn register<'h>(
        &'h self,
        _collector: &mut dyn HandlerCollector<'h>,
    ) -> Result<(), RegistryError> {
        Ok(())
    }
}

/// Two subscribers registered as one, `first` before `second`.
///
/// Registration order is match priority, so `first` wins where filters
/// overlap.
pub struct SubscriberPair<S1, S2> {
    /// First subscriber
    pub first: S1,
    /// Second subscriber
    pub second: S2,
}

impl<S1, S2> SubscriberPair<S1, S2> {
    pub fn new(first: S1, second: S2) -> Self {
        Self { first, second }
    }
}

impl<S1, S2> Subscriber for SubscriberPair<S1, S2>
where
    S1: Subscriber,
    S2: Subscriber,
{
    fn register<'h>(
        &'h self,
        collector: &mut dyn HandlerCollector<'h>,
    ) -> Result<(), RegistryError> {
        self.first.register(collector)?;
        self.second.register(collector)
    }
}

impl<S: Subscriber + ?Sized> Subscriber for &S {
    fn register<'h>(
        &'h self,
        collector: &mut dyn HandlerCollector<'h>,
    ) -> Result<(), RegistryError> {
        (**self).register(collector)
    }
}

/// Object-safe trait for queuing outbound events from a handler.
///
/// Handlers run synchronously inside the dispatch path and never perform
/// async I/O. They queue events here instead; the application forwards the
/// queue to an [`EventPublisher`](super::EventPublisher) from its own task.
pub trait EventOutbox<E>: Sync {
    /// Queue an event for publishing.
    ///
    /// Returns immediately. Returns `false` if the outbox is full and the
    /// event was dropped.
    fn queue(&self, event: E) -> bool;
}

/// Logging collaborator injected into the dispatcher and publishers.
///
/// Dispatch runs inside the broker connection's delivery callback, which has no
/// way to report failures; everything worth knowing about it ends up here.
pub trait RoutingLog: Sync {
    /// A handler returned an error. The message is dropped afterwards.
    fn handler_failed(&self, topic: &str, error: HandlerError);

    /// No registered filter matched an inbound topic.
    fn unmatched(&self, _topic: &str) {}

    /// A publisher handed a message to the broker connection.
    fn published(&self, _topic: &str, _payload_len: usize) {}
}

impl<L: RoutingLog + ?Sized> RoutingLog for &L {
    fn handler_failed(&self, topic: &str, error: HandlerError) {
        (**self).handler_failed(topic, error)
    }

    fn unmatched(&self, topic: &str) {
        (**self).unmatched(topic)
    }

    fn published(&self, topic: &str, payload_len: usize) {
        (**self).published(topic, payload_len)
    }
}
