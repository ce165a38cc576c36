//! Routing Runtime
//!
//! Registration, subscription, dispatch and publishing on top of a
//! [`BrokerConnection`](crate::transport::BrokerConnection).
//!
//! # Overview
//!
//! Routing has two phases:
//! - **Building:** subscriber components add `(filter, handler)` pairs to a
//!   [`HandlerRegistry`].
//! - **Active:** [`HandlerRegistry::subscribe_all`] subscribes every filter
//!   and returns a [`Dispatcher`]. From then on the routes are read-only and
//!   the broker connection calls [`Dispatcher::dispatch`] for every inbound
//!   message.
//!
//! Outbound events go through an [`EventPublisher`]. Handlers never perform
//! async I/O; they queue follow-up events on an [`OutboxChannel`] through the
//! [`EventOutbox`] trait, and the application forwards the queue to the
//! publisher after dispatch returns.
//!
//! # Failure Reporting
//!
//! Handlers run inside the broker's delivery path, which cannot carry errors
//! back. The dispatcher and publishers report to an injected [`RoutingLog`]
//! instead: [`DefaultLog`] logs directly, [`ChannelLog`] queues failures for a
//! supervising task (see [`report_failures`]).

pub(crate) mod dispatcher;
pub(crate) mod log;
pub(crate) mod publisher;
pub(crate) mod registry;
pub(crate) mod traits;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use self::log::{
    ChannelLog, DefaultLog, FailureChannel, FailureReceiver, FailureSender, HandlerFailure,
    drain_failures, report_failures,
};
pub use publisher::{
    EventPublisher, OutboxChannel, OutboxReceiver, OutboxSender, PublishOptions,
};
pub use registry::{HandlerRegistry, Route, SubscribeOptions};
pub use traits::{
    EventOutbox, HandlerCollector, JsonHandler, MessageHandler, NoopSubscriber, RoutingLog,
    Subscriber, SubscriberPair,
};

// Re-export Publish for convenient use by connection implementations
pub use crate::packet::Publish;
