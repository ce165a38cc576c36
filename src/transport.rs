//! # Broker Connection Abstraction
//!
//! This module defines the `BrokerConnection` trait, which abstracts the MQTT
//! client that owns the socket, the session and the receive loop. The routing
//! layer only ever asks it to subscribe, publish and disconnect.
//!
//! With the Rust 2024 Edition, this trait uses native `async fn`, removing the
//! need for the `#[async_trait]` macro.

use crate::packet::QoS;

/// How long a graceful disconnect may take to flush in-flight messages.
pub const DEFAULT_DISCONNECT_TIMEOUT_MS: u32 = 10_000;

/// A connected MQTT client.
///
/// Establishing the connection (broker URL, credentials, session options) is
/// the implementor's business and happens before a value of this type exists.
///
/// The implementor's receive path must hand every inbound publish to
/// [`Dispatcher::dispatch`](crate::runtime::Dispatcher::dispatch). It may do so
/// from any thread or task, and concurrently.
#[allow(async_fn_in_trait)]
pub trait BrokerConnection {
    /// The error type returned by the connection, including acknowledgment
    /// timeouts if the client surfaces them.
    type Error: core::fmt::Debug;

    /// Subscribes to a topic filter.
    ///
    /// Resolves once the broker has acknowledged the subscription (`SUBACK`).
    async fn subscribe(&self, filter: &str, qos: QoS) -> Result<(), Self::Error>;

    /// Publishes a payload to a concrete topic.
    ///
    /// Resolves once the broker has acknowledged the publish, as far as the
    /// requested QoS level requires.
    async fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), Self::Error>;

    /// Closes the connection, waiting at most `timeout_ms` for pending work.
    async fn disconnect(&self, timeout_ms: u32);
}

impl<C: BrokerConnection> BrokerConnection for &C {
    type Error = C::Error;

    async fn subscribe(&self, filter: &str, qos: QoS) -> Result<(), Self::Error> {
        (**self).subscribe(filter, qos).await
    }

    async fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), Self::Error> {
        (**self).publish(topic, payload, qos, retain).await
    }

    async fn disconnect(&self, timeout_ms: u32) {
        (**self).disconnect(timeout_ms).await
    }
}
