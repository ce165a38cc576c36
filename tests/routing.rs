//! End-to-end routing: registration, subscription, dispatch and publishing
//! against an in-memory broker connection.

use std::sync::Mutex;

use embassy_futures::block_on;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use myrtio_mqtt_router::device::{
    ApiEventSubscriber, CreateDeviceInput, CreatedDevice, DeviceService, FirmwareSubscriber,
};
use myrtio_mqtt_router::error::{HandlerError, ServiceError};
use myrtio_mqtt_router::runtime::{
    ChannelLog, DispatchOutcome, FailureChannel, JsonHandler, OutboxChannel, Publish,
    RoutingLog, SubscriberPair, drain_failures,
};
use myrtio_mqtt_router::transport::DEFAULT_DISCONNECT_TIMEOUT_MS;
use myrtio_mqtt_router::{
    BrokerConnection, DeviceBootedMessage, DeviceRegisteredMessage, EventPublisher,
    HandlerRegistry, QoS, build_topic,
};

#[derive(Debug, PartialEq)]
enum BrokerError {
    SubscribeRejected,
}

/// Loops publishes back to the test and refuses selected subscriptions.
#[derive(Default)]
struct LoopbackBroker {
    refuse: Vec<&'static str>,
    subscriptions: Mutex<Vec<String>>,
    outbox: Mutex<Vec<(String, Vec<u8>)>>,
    disconnected_with: Mutex<Option<u32>>,
}

impl BrokerConnection for LoopbackBroker {
    type Error = BrokerError;

    async fn subscribe(&self, filter: &str, qos: QoS) -> Result<(), Self::Error> {
        assert_eq!(qos, QoS::AtLeastOnce);
        if self.refuse.iter().any(|refused| *refused == filter) {
            return Err(BrokerError::SubscribeRejected);
        }
        self.subscriptions.lock().unwrap().push(filter.to_string());
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        _qos: QoS,
        _retain: bool,
    ) -> Result<(), Self::Error> {
        self.outbox
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.to_vec()));
        Ok(())
    }

    async fn disconnect(&self, timeout_ms: u32) {
        *self.disconnected_with.lock().unwrap() = Some(timeout_ms);
    }
}

#[derive(Default)]
struct Devices {
    created: Mutex<Vec<CreateDeviceInput>>,
}

impl DeviceService for Devices {
    fn create_device(&self, input: CreateDeviceInput) -> Result<CreatedDevice, ServiceError> {
        if input.hardware_type.is_empty() {
            return Err(ServiceError::Internal);
        }
        let device_id = format!("device-{}", input.hardware_id);
        self.created.lock().unwrap().push(input);
        Ok(CreatedDevice { device_id })
    }
}

#[derive(Default)]
struct RecordingLog {
    failures: Mutex<Vec<String>>,
    unmatched: Mutex<Vec<String>>,
}

impl RoutingLog for RecordingLog {
    fn handler_failed(&self, topic: &str, _error: HandlerError) {
        self.failures.lock().unwrap().push(topic.to_string());
    }

    fn unmatched(&self, topic: &str) {
        self.unmatched.lock().unwrap().push(topic.to_string());
    }
}

#[test]
fn firmware_boot_creates_device() {
    let broker = LoopbackBroker::default();
    let devices = Devices::default();
    let log = RecordingLog::default();
    let subscribers = SubscriberPair::new(
        FirmwareSubscriber::new(&devices).unwrap(),
        ApiEventSubscriber::new().unwrap(),
    );

    let mut registry = HandlerRegistry::<4>::new();
    registry.register(&subscribers).unwrap();
    let dispatcher = block_on(registry.subscribe_all(&broker, &log)).unwrap();

    assert_eq!(
        *broker.subscriptions.lock().unwrap(),
        ["devices/+/event/+/from/firmware", "devices/+/event/+/from/api"]
    );

    let outcome = dispatcher.dispatch(
        "devices/42/event/booted/from/firmware",
        br#"{"hardware_id":"42","hardware_type":"sensor"}"#,
    );
    assert_eq!(outcome, DispatchOutcome::Handled);

    let created = devices.created.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].hardware_id, "42");
    assert!(log.failures.lock().unwrap().is_empty());
}

/// Two filters, one inbound message: only the matching handler runs, once.
#[test]
fn only_matching_handler_sees_the_message() {
    let broker = LoopbackBroker::default();
    let log = RecordingLog::default();
    let booted = Mutex::new(Vec::new());
    let registered = Mutex::new(Vec::new());
    let on_booted = JsonHandler::new(|msg: DeviceBootedMessage| -> Result<(), HandlerError> {
        booted.lock().unwrap().push(msg);
        Ok(())
    });
    let on_registered =
        JsonHandler::new(|msg: DeviceRegisteredMessage| -> Result<(), HandlerError> {
            registered.lock().unwrap().push(msg);
            Ok(())
        });

    let firmware_filter = build_topic("+", "+", "firmware").unwrap();
    let api_filter = build_topic("+", "+", "api").unwrap();
    let mut registry = HandlerRegistry::<2>::new();
    registry.register_handler(&firmware_filter, &on_booted).unwrap();
    registry.register_handler(&api_filter, &on_registered).unwrap();
    let dispatcher = block_on(registry.subscribe_all(&broker, &log)).unwrap();

    dispatcher.dispatch_message(&Publish::new(
        "devices/42/event/booted/from/firmware",
        br#"{"hardware_id":"42","hardware_type":"sensor"}"#,
    ));

    let booted = booted.lock().unwrap();
    assert_eq!(booted.len(), 1);
    assert_eq!(booted[0].hardware_id, "42");
    assert_eq!(booted[0].hardware_type, "sensor");
    assert!(registered.lock().unwrap().is_empty());
}

#[test]
fn failed_subscription_is_not_rolled_back() {
    let broker = LoopbackBroker {
        refuse: vec!["devices/+/event/+/from/api"],
        ..Default::default()
    };
    let devices = Devices::default();
    let log = RecordingLog::default();
    let subscribers = SubscriberPair::new(
        FirmwareSubscriber::new(&devices).unwrap(),
        ApiEventSubscriber::new().unwrap(),
    );

    let mut registry = HandlerRegistry::<4>::new();
    registry.register(&subscribers).unwrap();

    let Err(err) = block_on(registry.subscribe_all(&broker, &log)) else {
        panic!("second subscription should fail");
    };
    assert_eq!(err.filter.as_str(), "devices/+/event/+/from/api");
    assert_eq!(err.source, BrokerError::SubscribeRejected);
    assert_eq!(
        *broker.subscriptions.lock().unwrap(),
        ["devices/+/event/+/from/firmware"]
    );
}

#[test]
fn failing_handler_does_not_block_later_messages() {
    let broker = LoopbackBroker::default();
    let devices = Devices::default();
    let log = RecordingLog::default();
    let firmware = FirmwareSubscriber::new(&devices).unwrap();

    let mut registry = HandlerRegistry::<1>::new();
    registry.register(&firmware).unwrap();
    let dispatcher = block_on(registry.subscribe_all(&broker, &log)).unwrap();

    let topic = "devices/7/event/booted/from/firmware";
    assert_eq!(dispatcher.dispatch(topic, b"garbage"), DispatchOutcome::Failed);
    assert_eq!(
        dispatcher.dispatch(topic, br#"{"hardware_id":"7","hardware_type":""}"#),
        DispatchOutcome::Failed
    );
    assert_eq!(
        dispatcher.dispatch(topic, br#"{"hardware_id":"7","hardware_type":"relay"}"#),
        DispatchOutcome::Handled
    );
    assert_eq!(
        dispatcher.dispatch("devices/7/event/booted/from/api", b"{}"),
        DispatchOutcome::Unmatched
    );

    assert_eq!(*log.failures.lock().unwrap(), [topic, topic]);
    assert_eq!(
        *log.unmatched.lock().unwrap(),
        ["devices/7/event/booted/from/api"]
    );
    assert_eq!(devices.created.lock().unwrap().len(), 1);
}

#[test]
fn failures_are_queued_for_a_supervisor() {
    static FAILURES: FailureChannel<CriticalSectionRawMutex, 8> = FailureChannel::new();

    let broker = LoopbackBroker::default();
    let devices = Devices::default();
    let log = ChannelLog::new(FAILURES.sender());
    let firmware = FirmwareSubscriber::new(&devices).unwrap();

    let mut registry = HandlerRegistry::<1>::new();
    registry.register(&firmware).unwrap();
    let dispatcher = block_on(registry.subscribe_all(&broker, &log)).unwrap();

    std::thread::scope(|scope| {
        for id in 0..3 {
            let dispatcher = &dispatcher;
            scope.spawn(move || {
                let topic = build_topic(&id.to_string(), "booted", "firmware").unwrap();
                dispatcher.dispatch(&topic, b"not json");
            });
        }
    });

    let supervisor = RecordingLog::default();
    assert_eq!(drain_failures(&FAILURES.receiver(), &supervisor), 3);
    assert_eq!(log.dropped(), 0);

    let mut topics = supervisor.failures.lock().unwrap().clone();
    topics.sort();
    assert_eq!(
        topics,
        [
            "devices/0/event/booted/from/firmware",
            "devices/1/event/booted/from/firmware",
            "devices/2/event/booted/from/firmware",
        ]
    );
}

#[test]
fn published_events_route_back_to_subscribers() {
    let broker = LoopbackBroker::default();
    let devices = Devices::default();
    let log = RecordingLog::default();
    let firmware = FirmwareSubscriber::new(&devices).unwrap();

    let mut registry = HandlerRegistry::<1>::new();
    registry.register(&firmware).unwrap();
    let dispatcher = block_on(registry.subscribe_all(&broker, &log)).unwrap();

    let publisher = EventPublisher::new(&broker, &log);
    let booted = DeviceBootedMessage {
        triggered_at: None,
        hardware_id: "hw-9".into(),
        hardware_type: "thermostat".into(),
    };
    block_on(publisher.dispatch_device_booted(&booted)).unwrap();
    block_on(publisher.dispatch_device_registered(&DeviceRegisteredMessage {
        device_id: "device-hw-9".into(),
    }))
    .unwrap();

    let outbox = broker.outbox.lock().unwrap();
    let outcomes: Vec<DispatchOutcome> = outbox
        .iter()
        .map(|(topic, payload)| dispatcher.dispatch(topic, payload))
        .collect();

    assert_eq!(outcomes, [DispatchOutcome::Handled, DispatchOutcome::Unmatched]);
    assert_eq!(devices.created.lock().unwrap()[0].hardware_type, "thermostat");
}

#[test]
fn boot_is_answered_with_registered_event() {
    let outbox = OutboxChannel::<CriticalSectionRawMutex, DeviceRegisteredMessage, 4>::new();
    let sender = outbox.sender();
    let broker = LoopbackBroker::default();
    let devices = Devices::default();
    let log = RecordingLog::default();
    let firmware = FirmwareSubscriber::new(&devices).unwrap().with_outbox(&sender);

    let mut registry = HandlerRegistry::<1>::new();
    registry.register(&firmware).unwrap();
    let dispatcher = block_on(registry.subscribe_all(&broker, &log)).unwrap();
    let publisher = EventPublisher::new(&broker, &log);

    let outcome = dispatcher.dispatch(
        "devices/42/event/booted/from/firmware",
        br#"{"hardware_id":"42","hardware_type":"sensor"}"#,
    );
    assert_eq!(outcome, DispatchOutcome::Handled);
    assert!(broker.outbox.lock().unwrap().is_empty());

    let published = block_on(publisher.publish_queued(&outbox.receiver())).unwrap();
    assert_eq!(published, 1);

    let sent = broker.outbox.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "devices/device-42/event/registered/from/api");
    assert_eq!(sent[0].1, br#"{"device_id":"device-42"}"#);
    drop(sent);

    block_on(broker.disconnect(DEFAULT_DISCONNECT_TIMEOUT_MS));
    assert_eq!(
        *broker.disconnected_with.lock().unwrap(),
        Some(DEFAULT_DISCONNECT_TIMEOUT_MS)
    );
}
