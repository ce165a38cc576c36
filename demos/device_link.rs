//! Example: a device link over an in-memory broker
//!
//! Wires a `FirmwareSubscriber` into a `HandlerRegistry`, activates it as a
//! `Dispatcher`, and answers every `booted` event with a `registered` event
//! through an `EventPublisher`.
//!
//! # Key Concepts
//!
//! - Implement `BrokerConnection` for the MQTT client you use
//! - Register subscriber components, then `subscribe_all` to start routing
//! - Handlers never publish; they queue follow-up events on an outbox
//! - Forward the outbox with `EventPublisher::publish_queued`
//!
//! Run with `cargo run --example device_link`.

use core::convert::Infallible;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use embassy_futures::block_on;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use myrtio_mqtt_router::device::{
    CreateDeviceInput, CreatedDevice, DeviceService, FirmwareSubscriber,
};
use myrtio_mqtt_router::error::ServiceError;
use myrtio_mqtt_router::runtime::{DefaultLog, OutboxChannel};
use myrtio_mqtt_router::transport::DEFAULT_DISCONNECT_TIMEOUT_MS;
use myrtio_mqtt_router::{
    BrokerConnection, DeviceBootedMessage, DeviceRegisteredMessage, EventPublisher,
    HandlerRegistry, QoS,
};

static LOG: DefaultLog = DefaultLog;
static REGISTERED: OutboxChannel<CriticalSectionRawMutex, DeviceRegisteredMessage, 8> =
    OutboxChannel::new();

/// Stands in for a real MQTT client: every publish is kept for the next
/// delivery round.
#[derive(Default)]
struct InMemoryBroker {
    pending: Mutex<Vec<(String, Vec<u8>)>>,
}

impl InMemoryBroker {
    fn take_pending(&self) -> Vec<(String, Vec<u8>)> {
        std::mem::take(&mut *self.pending.lock().unwrap())
    }
}

impl BrokerConnection for InMemoryBroker {
    type Error = Infallible;

    async fn subscribe(&self, filter: &str, qos: QoS) -> Result<(), Self::Error> {
        println!("SUBSCRIBE {filter} ({qos:?})");
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        _qos: QoS,
        retain: bool,
    ) -> Result<(), Self::Error> {
        println!("PUBLISH {topic} retain={retain} {}", String::from_utf8_lossy(payload));
        self.pending
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.to_vec()));
        Ok(())
    }

    async fn disconnect(&self, timeout_ms: u32) {
        println!("DISCONNECT within {timeout_ms} ms");
    }
}

/// Hands out sequential device ids.
#[derive(Default)]
struct DeviceCounter {
    next: AtomicUsize,
}

impl DeviceService for DeviceCounter {
    fn create_device(&self, input: CreateDeviceInput) -> Result<CreatedDevice, ServiceError> {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        println!("created device {n} for {} ({})", input.hardware_id, input.hardware_type);
        Ok(CreatedDevice {
            device_id: format!("dev-{n}"),
        })
    }
}

fn main() {
    let broker = InMemoryBroker::default();
    let devices = DeviceCounter::default();
    let outbox = REGISTERED.sender();

    let firmware = FirmwareSubscriber::new(&devices)
        .expect("filter fits")
        .with_outbox(&outbox);

    let mut registry = HandlerRegistry::<4>::new();
    registry.register(&firmware).expect("registry has room");
    let dispatcher = block_on(registry.subscribe_all(&broker, &LOG)).expect("subscribed");

    let publisher = EventPublisher::new(&broker, &LOG);

    // Firmware side announces two devices.
    for (hardware_id, hardware_type) in [("a1", "sensor"), ("b2", "relay")] {
        let booted = DeviceBootedMessage {
            triggered_at: None,
            hardware_id: hardware_id.into(),
            hardware_type: hardware_type.into(),
        };
        block_on(publisher.dispatch_device_booted(&booted)).expect("published");
    }

    // The broker delivers what was published; the dispatcher routes it.
    for (topic, payload) in broker.take_pending() {
        let outcome = dispatcher.dispatch(&topic, &payload);
        println!("DISPATCH {topic} -> {outcome:?}");
    }

    // Handlers queued `registered` answers; send them out.
    let sent = block_on(publisher.publish_queued(&REGISTERED.receiver())).expect("published");
    println!("{sent} registered events published");

    block_on(broker.disconnect(DEFAULT_DISCONNECT_TIMEOUT_MS));
}
