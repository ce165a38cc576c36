//! # Device Lifecycle Subscribers
//!
//! Subscriber components for the `devices/...` topic tree. The firmware side
//! of a device link publishes `booted` events, which the server turns into
//! device records through a [`DeviceService`]; the server side publishes
//! events back `from/api`.

use alloc::string::String;

use chrono::{DateTime, Utc};

use crate::envelope::{self, DeviceBootedMessage, DeviceRegisteredMessage};
use crate::error::{HandlerError, RegistryError, ServiceError, TopicError};
use crate::runtime::{EventOutbox, HandlerCollector, MessageHandler, Subscriber};
use crate::topic::{Origin, TopicBuilder, TopicString};

/// Data needed to register a device that announced itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDeviceInput {
    pub hardware_id: String,
    pub hardware_type: String,
    /// When the firmware reported the boot, if it did.
    pub booted_at: Option<DateTime<Utc>>,
}

impl From<DeviceBootedMessage> for CreateDeviceInput {
    fn from(msg: DeviceBootedMessage) -> Self {
        Self {
            hardware_id: msg.hardware_id,
            hardware_type: msg.hardware_type,
            booted_at: msg.triggered_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedDevice {
    pub device_id: String,
}

/// Application service that owns device records.
///
/// Called from the dispatch path, so it must be `Sync` and should not block
/// for long.
pub trait DeviceService: Sync {
    fn create_device(&self, input: CreateDeviceInput) -> Result<CreatedDevice, ServiceError>;
}

impl<S: DeviceService + ?Sized> DeviceService for &S {
    fn create_device(&self, input: CreateDeviceInput) -> Result<CreatedDevice, ServiceError> {
        (**self).create_device(input)
    }
}

/// Creates a device for every `booted` event.
///
/// With an outbox attached, every created device is announced back to the
/// firmware as a `registered` event.
pub struct DeviceBootedHandler<'o, S> {
    service: S,
    outbox: Option<&'o dyn EventOutbox<DeviceRegisteredMessage>>,
}

impl<S: DeviceService> MessageHandler for DeviceBootedHandler<'_, S> {
    fn handle(&self, payload: &[u8]) -> Result<(), HandlerError> {
        let msg: DeviceBootedMessage = envelope::decode(payload)?;
        let created = self.service.create_device(msg.into())?;
        debug!("device created: {}", created.device_id.as_str());

        if let Some(outbox) = self.outbox {
            let registered = DeviceRegisteredMessage {
                device_id: created.device_id,
            };
            if !outbox.queue(registered) {
                return Err(HandlerError::OutboxFull);
            }
        }

        Ok(())
    }
}

/// Handles everything firmware publishes: `devices/+/event/+/from/firmware`.
pub struct FirmwareSubscriber<'o, S> {
    filter: TopicString,
    on_device_booted: DeviceBootedHandler<'o, S>,
}

impl<'o, S: DeviceService> FirmwareSubscriber<'o, S> {
    pub fn new(service: S) -> Result<Self, TopicError> {
        Self::with_builder(TopicBuilder::DEVICES, service)
    }

    /// Subscribe below another namespace than `devices`.
    pub fn with_builder(builder: TopicBuilder, service: S) -> Result<Self, TopicError> {
        Ok(Self {
            filter: builder.origin_filter(Origin::Firmware)?,
            on_device_booted: DeviceBootedHandler {
                service,
                outbox: None,
            },
        })
    }

    /// Queue a `registered` event for every device created.
    ///
    /// Forward the outbox with
    /// [`EventPublisher::publish_queued`](crate::runtime::EventPublisher::publish_queued).
    pub fn with_outbox(mut self, outbox: &'o dyn EventOutbox<DeviceRegisteredMessage>) -> Self {
        self.on_device_booted.outbox = Some(outbox);
        self
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn service(&self) -> &S {
        &self.on_device_booted.service
    }
}

impl<S: DeviceService> Subscriber for FirmwareSubscriber<'_, S> {
    fn register<'h>(
        &'h self,
        collector: &mut dyn HandlerCollector<'h>,
    ) -> Result<(), RegistryError> {
        collector.add(&self.filter, &self.on_device_booted)
    }
}

struct PayloadEcho;

impl MessageHandler for PayloadEcho {
    fn handle(&self, payload: &[u8]) -> Result<(), HandlerError> {
        match core::str::from_utf8(payload) {
            Ok(text) => debug!("api event: {}", text),
            Err(_) => debug!("api event: {} bytes of binary payload", payload.len()),
        }
        Ok(())
    }
}

/// Logs every event the server publishes: `devices/+/event/+/from/api`.
///
/// Lets a device, or a test harness, observe what the server sent it.
pub struct ApiEventSubscriber {
    filter: TopicString,
    on_event: PayloadEcho,
}

impl ApiEventSubscriber {
    pub fn new() -> Result<Self, TopicError> {
        Self::with_builder(TopicBuilder::DEVICES)
    }

    pub fn with_builder(builder: TopicBuilder) -> Result<Self, TopicError> {
        Ok(Self {
            filter: builder.origin_filter(Origin::Api)?,
            on_event: PayloadEcho,
        })
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }
}

impl Subscriber for ApiEventSubscriber {
    fn register<'h>(
        &'h self,
        collector: &mut dyn HandlerCollector<'h>,
    ) -> Result<(), RegistryError> {
        collector.add(&self.filter, &self.on_event)
    }
}
