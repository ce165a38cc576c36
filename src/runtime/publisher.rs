//! Outbound event publishing.
//!
//! A publisher serializes an [`Envelope`], places it at its canonical topic and
//! hands it to the broker connection. Failures are returned to the caller as
//! they happen; nothing is retried here.
//!
//! Handlers never publish directly. They queue envelopes on an
//! [`OutboxChannel`] through the [`EventOutbox`] trait, and the application
//! forwards the queue with [`EventPublisher::publish_queued`] or
//! [`EventPublisher::forward_queued`].

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};

use super::traits::{EventOutbox, RoutingLog};
use crate::envelope::{self, DeviceBootedMessage, DeviceRegisteredMessage, Envelope};
use crate::error::PublishError;
use crate::packet::{DEFAULT_QOS, QoS};
use crate::topic::{self, TopicBuilder};
use crate::transport::BrokerConnection;

/// Options applied to every publish made by an [`EventPublisher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PublishOptions {
    /// Quality of Service level
    pub qos: QoS,
    /// Ask the broker to keep the last message per topic for late subscribers
    pub retain: bool,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            qos: DEFAULT_QOS,
            retain: true,
        }
    }
}

pub type OutboxChannel<M, E, const DEPTH: usize> = Channel<M, E, DEPTH>;

pub type OutboxSender<'a, M, E, const DEPTH: usize> = Sender<'a, M, E, DEPTH>;

pub type OutboxReceiver<'a, M, E, const DEPTH: usize> = Receiver<'a, M, E, DEPTH>;

impl<M, E, const DEPTH: usize> EventOutbox<E> for Sender<'_, M, E, DEPTH>
where
    M: RawMutex + Sync,
    E: Send,
{
    fn queue(&self, event: E) -> bool {
        self.try_send(event).is_ok()
    }
}

/// Publishes device events through a broker connection.
///
/// The publisher borrows the connection, so it can be created wherever an
/// event needs to go out and shares the connection with the dispatcher.
pub struct EventPublisher<'a, C: BrokerConnection> {
    connection: &'a C,
    log: &'a dyn RoutingLog,
    builder: TopicBuilder,
    options: PublishOptions,
}

impl<'a, C: BrokerConnection> EventPublisher<'a, C> {
    pub fn new(connection: &'a C, log: &'a dyn RoutingLog) -> Self {
        Self {
            connection,
            log,
            builder: TopicBuilder::DEVICES,
            options: PublishOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PublishOptions) -> Self {
        self.options = options;
        self
    }

    /// Publish below another namespace than `devices`.
    pub fn with_builder(mut self, builder: TopicBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Publishes `devices/{device_id}/event/registered/from/api`.
    pub async fn dispatch_device_registered(
        &self,
        msg: &DeviceRegisteredMessage,
    ) -> Result<(), PublishError<C::Error>> {
        self.dispatch(msg).await
    }

    /// Publishes `devices/{hardware_id}/event/booted/from/firmware`.
    pub async fn dispatch_device_booted(
        &self,
        msg: &DeviceBootedMessage,
    ) -> Result<(), PublishError<C::Error>> {
        self.dispatch(msg).await
    }

    /// Serializes `event` and publishes it at its canonical topic.
    ///
    /// The envelope's entity id becomes a single topic level, so it must be
    /// non-empty and free of `/`, `+` and `#`.
    pub async fn dispatch<E: Envelope>(&self, event: &E) -> Result<(), PublishError<C::Error>> {
        let payload = envelope::encode(event).map_err(PublishError::Encode)?;

        topic::validate_level(event.entity_id())?;
        let topic = self
            .builder
            .build(event.entity_id(), E::EVENT, E::ORIGIN.as_str())?;
        topic::validate_topic(&topic)?;

        self.connection
            .publish(&topic, &payload, self.options.qos, self.options.retain)
            .await
            .map_err(PublishError::Connection)?;

        self.log.published(&topic, payload.len());

        Ok(())
    }

    /// Publishes every event already queued on `rx` and returns how many went
    /// out.
    ///
    /// Stops at the first failure and returns it; that event is lost, the
    /// rest stay queued.
    pub async fn publish_queued<M, E, const DEPTH: usize>(
        &self,
        rx: &OutboxReceiver<'_, M, E, DEPTH>,
    ) -> Result<usize, PublishError<C::Error>>
    where
        M: RawMutex,
        E: Envelope,
    {
        let mut published = 0;
        while let Ok(event) = rx.try_receive() {
            self.dispatch(&event).await?;
            published += 1;
        }
        Ok(published)
    }

    /// Publishes queued events as they arrive. Runs forever; failures are
    /// logged and the event is dropped.
    pub async fn forward_queued<M, E, const DEPTH: usize>(
        &self,
        rx: OutboxReceiver<'_, M, E, DEPTH>,
    ) -> !
    where
        M: RawMutex,
        E: Envelope,
    {
        loop {
            let event = rx.receive().await;
            if let Err(err) = self.dispatch(&event).await {
                warn!("queued {} event not published: {} failed", E::EVENT, err.kind());
            }
        }
    }
}
