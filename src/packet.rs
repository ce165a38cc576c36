//! # Message Primitives
//!
//! Quality of service levels and the borrowed view of an inbound publish that a
//! broker connection hands to the [`Dispatcher`](crate::runtime::Dispatcher).

/// Represents the Quality of Service (QoS) levels for MQTT messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum QoS {
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

/// QoS used for every subscription and publish unless configured otherwise.
pub const DEFAULT_QOS: QoS = QoS::AtLeastOnce;

impl From<QoS> for u8 {
    fn from(qos: QoS) -> Self {
        qos as u8
    }
}

impl TryFrom<u8> for QoS {
    type Error = u8;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(other),
        }
    }
}

/// An inbound message as delivered by the broker connection.
///
/// Borrows from the connection's receive buffer; handlers only ever see the
/// payload slice and must copy anything they want to keep.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Publish<'a> {
    /// The concrete topic the message was published to
    pub topic: &'a str,
    /// The payload bytes
    pub payload: &'a [u8],
    /// Quality of Service level the message was delivered with
    pub qos: QoS,
    /// Whether the broker replayed this message from its retained store
    pub retain: bool,
}

impl<'a> Publish<'a> {
    pub fn new(topic: &'a str, payload: &'a [u8]) -> Self {
        Self {
            topic,
            payload,
            qos: DEFAULT_QOS,
            retain: false,
        }
    }
}
