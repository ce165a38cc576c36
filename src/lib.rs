//! # Device Event Routing over MQTT
//!
//! `myrtio-mqtt-router` is a `no_std` routing layer that connects firmware and
//! server components over an MQTT-style broker. It does not speak the wire
//! protocol itself; the broker connection is supplied by the application through
//! the [`BrokerConnection`] trait.
//!
//! ## Core Features
//!
//! - **Canonical topics:** `devices/{device_id}/event/{event}/from/{origin}`,
//!   built into fixed-capacity `heapless` strings.
//! - **Wildcard matching:** `+` (one level) and `#` (trailing levels) filters,
//!   matched without allocation.
//! - **Build-then-freeze dispatch:** handlers are registered into a
//!   [`HandlerRegistry`], which turns into a read-only, `Sync` [`Dispatcher`]
//!   once every filter has been subscribed.
//! - **JSON envelopes:** typed event payloads encoded with `serde_json`
//!   (requires `alloc`).
//! - **Injected logging:** dispatch failures go to a [`RoutingLog`]
//!   collaborator, either forwarded to `log`/`defmt` or queued on an
//!   `embassy-sync` channel for a supervising task.
//!
//! ## Architecture
//!
//! ```ignore
//! use myrtio_mqtt_router::device::FirmwareSubscriber;
//! use myrtio_mqtt_router::runtime::{DefaultLog, EventPublisher, HandlerRegistry, OutboxChannel};
//!
//! static LOG: DefaultLog = DefaultLog;
//!
//! static REGISTERED: OutboxChannel<CriticalSectionRawMutex, DeviceRegisteredMessage, 8> =
//!     OutboxChannel::new();
//!
//! let outbox = REGISTERED.sender();
//! let firmware = FirmwareSubscriber::new(service)?.with_outbox(&outbox);
//!
//! let mut registry = HandlerRegistry::<8>::new();
//! registry.register(&firmware)?;
//!
//! // Subscribes every filter, waiting for each acknowledgment in turn.
//! let dispatcher = registry.subscribe_all(&connection, &LOG).await?;
//!
//! // The connection's delivery path hands every inbound publish over:
//! dispatcher.dispatch(topic, payload);
//!
//! // Handlers never publish; answers they queued go out from here.
//! let publisher = EventPublisher::new(&connection, &LOG);
//! publisher.publish_queued(&REGISTERED.receiver()).await?;
//! ```
//!
//! ## Matching Rules
//!
//! The multi-level wildcard must be the last level of a filter, and it only
//! matches when the topic has at least one level at its position: `a/#`
//! matches `a/b` and `a/b/c` but not `a`. See [`topic::topic_matches`].

#![cfg_attr(not(test), no_std)]

extern crate alloc;

// This mod MUST go first, so that the others see its macros.
#[macro_use]
mod fmt;

pub mod device;
pub mod envelope;
pub mod error;
pub mod packet;
pub mod runtime;
pub mod topic;
pub mod transport;

// Re-export key types for easier access at the crate root.
pub use envelope::{DeviceBootedMessage, DeviceRegisteredMessage, Envelope};
pub use packet::QoS;
pub use runtime::{Dispatcher, EventPublisher, HandlerRegistry, MessageHandler, RoutingLog};
pub use topic::{Origin, build_topic, topic_matches};
pub use transport::BrokerConnection;
