//! # Error Types
//!
//! This module defines the error types used throughout the routing layer, from
//! malformed topics and full registries to broker rejections and handler
//! failures.

use core::fmt;

use crate::topic::TopicString;

/// Reasons a topic or filter string is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TopicError {
    /// The topic, filter or level was empty.
    Empty,
    /// The string does not fit in the fixed topic buffer.
    TooLong { max: usize, actual: usize },
    /// A wildcard shares its level with other characters, or `#` is not the
    /// last level of a filter. `level` is the zero-based level index.
    MisplacedWildcard { level: usize },
    /// A concrete topic contains a wildcard character.
    WildcardInTopic,
    /// A single topic level contains a separator or wildcard character.
    InvalidLevel,
}

impl fmt::Display for TopicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicError::Empty => f.write_str("topic is empty"),
            TopicError::TooLong { max, actual } => {
                write!(f, "topic is {actual} bytes long, at most {max} allowed")
            }
            TopicError::MisplacedWildcard { level } => {
                write!(f, "misplaced wildcard at level {level}")
            }
            TopicError::WildcardInTopic => f.write_str("wildcard in concrete topic"),
            TopicError::InvalidLevel => f.write_str("topic level contains '/', '+' or '#'"),
        }
    }
}

/// Errors raised while building a handler registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistryError {
    /// The filter failed validation.
    Topic(TopicError),
    /// Every handler slot is taken.
    Full { capacity: usize },
}

impl From<TopicError> for RegistryError {
    fn from(err: TopicError) -> Self {
        RegistryError::Topic(err)
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Topic(err) => write!(f, "invalid filter: {err}"),
            RegistryError::Full { capacity } => {
                write!(f, "handler registry is full ({capacity} entries)")
            }
        }
    }
}

/// A subscription the broker rejected or never acknowledged.
///
/// Subscriptions made before the failing one are left in place; the registry
/// that produced this error has been consumed and cannot be activated.
#[derive(Debug)]
pub struct SubscribeError<E> {
    /// The filter whose subscription failed
    pub filter: TopicString,
    /// The error reported by the broker connection
    pub source: E,
}

impl<E: fmt::Debug> fmt::Display for SubscribeError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscribe to '{}' failed: {:?}", self.filter, self.source)
    }
}

/// Errors returned synchronously to the caller of a publisher.
///
/// It is generic over the connection error type `E`, so broker rejections and
/// acknowledgment timeouts surface unchanged.
#[derive(Debug)]
pub enum PublishError<E> {
    /// The envelope could not be serialized.
    Encode(serde_json::Error),
    /// The destination topic could not be built from the envelope.
    Topic(TopicError),
    /// The broker connection reported a failure.
    Connection(E),
}

impl<E> PublishError<E> {
    /// Short name of the failing step, for log lines that cannot format `E`.
    pub fn kind(&self) -> &'static str {
        match self {
            PublishError::Encode(_) => "encode",
            PublishError::Topic(_) => "topic",
            PublishError::Connection(_) => "connection",
        }
    }
}

impl<E> From<TopicError> for PublishError<E> {
    fn from(err: TopicError) -> Self {
        PublishError::Topic(err)
    }
}

impl<E: fmt::Debug> fmt::Display for PublishError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::Encode(err) => write!(f, "envelope encoding failed: {err}"),
            PublishError::Topic(err) => write!(f, "invalid destination topic: {err}"),
            PublishError::Connection(err) => write!(f, "publish failed: {err:?}"),
        }
    }
}

/// Failures reported by application services invoked from a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServiceError {
    /// The resource described by the message already exists.
    AlreadyExists,
    /// A backing store or downstream dependency could not be reached.
    Unavailable,
    /// Any other failure inside the service.
    Internal,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::AlreadyExists => f.write_str("resource already exists"),
            ServiceError::Unavailable => f.write_str("service unavailable"),
            ServiceError::Internal => f.write_str("internal service error"),
        }
    }
}

/// Errors returned by a message handler.
///
/// These never leave the dispatch path; the dispatcher hands them to its
/// [`RoutingLog`](crate::runtime::RoutingLog) and moves on.
#[derive(Debug)]
pub enum HandlerError {
    /// The payload is not a valid envelope of the expected type.
    Decode(serde_json::Error),
    /// The application service rejected the event.
    Service(ServiceError),
    /// The handler refused the message for the given reason.
    Rejected(&'static str),
    /// The message was processed but a follow-up event could not be queued.
    OutboxFull,
}

impl From<ServiceError> for HandlerError {
    fn from(err: ServiceError) -> Self {
        HandlerError::Service(err)
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Decode(err) => write!(f, "payload decoding failed: {err}"),
            HandlerError::Service(err) => write!(f, "service error: {err}"),
            HandlerError::Rejected(reason) => write!(f, "message rejected: {reason}"),
            HandlerError::OutboxFull => f.write_str("outbox full, follow-up event dropped"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for HandlerError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            HandlerError::Decode(err) => {
                defmt::write!(f, "Decode(line {}, column {})", err.line(), err.column())
            }
            HandlerError::Service(err) => defmt::write!(f, "Service({})", err),
            HandlerError::Rejected(reason) => defmt::write!(f, "Rejected({})", reason),
            HandlerError::OutboxFull => defmt::write!(f, "OutboxFull"),
        }
    }
}
