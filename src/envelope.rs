//! # Event Envelopes
//!
//! Typed payloads exchanged between firmware and the server. Envelopes are
//! encoded as JSON; the encoding lives here so that publishers and handlers on
//! both sides agree on it.

use alloc::string::String;
use alloc::vec::Vec;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::HandlerError;
use crate::topic::Origin;

/// An event payload with a fixed place in the topic tree.
///
/// Publishing an envelope sends it to
/// `devices/{entity_id}/event/{EVENT}/from/{ORIGIN}`.
pub trait Envelope: Serialize {
    /// Event name used as the `event` topic level.
    const EVENT: &'static str;
    /// Side of the link that publishes this event.
    const ORIGIN: Origin;

    /// Identifier used as the entity topic level.
    fn entity_id(&self) -> &str;
}

/// Sent by firmware when a device finishes booting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceBootedMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_at: Option<DateTime<Utc>>,
    pub hardware_id: String,
    pub hardware_type: String,
}

impl Envelope for DeviceBootedMessage {
    const EVENT: &'static str = "booted";
    const ORIGIN: Origin = Origin::Firmware;

    fn entity_id(&self) -> &str {
        &self.hardware_id
    }
}

/// Sent by the server once a booted device has been registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRegisteredMessage {
    pub device_id: String,
}

impl Envelope for DeviceRegisteredMessage {
    const EVENT: &'static str = "registered";
    const ORIGIN: Origin = Origin::Api;

    fn entity_id(&self) -> &str {
        &self.device_id
    }
}

/// Serializes an envelope into a payload.
pub fn encode<E: Serialize + ?Sized>(envelope: &E) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(envelope)
}

/// Deserializes a payload, mapping failures to [`HandlerError::Decode`].
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, HandlerError> {
    serde_json::from_slice(payload).map_err(HandlerError::Decode)
}
