use core::fmt::{self, Write};

use super::{DEVICES_NAMESPACE, MAX_TOPIC_LEN, SINGLE_LEVEL_WILDCARD, TopicString};
use crate::error::TopicError;

/// Which side of a device/server pair produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Origin {
    /// Published by the server.
    Api,
    /// Published by device firmware.
    Firmware,
}

impl Origin {
    pub const fn as_str(self) -> &'static str {
        match self {
            Origin::Api => "api",
            Origin::Firmware => "firmware",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds canonical event topics below a namespace:
/// `<namespace>/<entity_id>/event/<event>/from/<origin>`.
///
/// The same shape is used for filters by passing `+` for the levels that
/// should match anything. Arguments are not validated; a `/` inside one of
/// them silently shifts every following level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicBuilder {
    namespace: &'static str,
}

impl TopicBuilder {
    /// Builder for the `devices/...` topic tree.
    pub const DEVICES: Self = Self::new(DEVICES_NAMESPACE);

    pub const fn new(namespace: &'static str) -> Self {
        Self { namespace }
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    /// Builds a topic from its variable levels.
    ///
    /// Fails only if the result does not fit in [`MAX_TOPIC_LEN`] bytes.
    pub fn build(
        &self,
        entity_id: &str,
        event: &str,
        origin: &str,
    ) -> Result<TopicString, TopicError> {
        let mut topic = TopicString::new();
        write!(
            topic,
            "{}/{}/event/{}/from/{}",
            self.namespace, entity_id, event, origin
        )
        .map_err(|_| TopicError::TooLong {
            max: MAX_TOPIC_LEN,
            // "/" + "/event/" + "/from/"
            actual: self.namespace.len() + entity_id.len() + event.len() + origin.len() + 14,
        })?;
        Ok(topic)
    }

    /// Filter matching every event of every entity from one origin.
    pub fn origin_filter(&self, origin: Origin) -> Result<TopicString, TopicError> {
        self.build(SINGLE_LEVEL_WILDCARD, SINGLE_LEVEL_WILDCARD, origin.as_str())
    }
}

impl Default for TopicBuilder {
    fn default() -> Self {
        Self::DEVICES
    }
}

/// Builds `devices/<entity_id>/event/<event>/from/<origin>`.
pub fn build_topic(entity_id: &str, event: &str, origin: &str) -> Result<TopicString, TopicError> {
    TopicBuilder::DEVICES.build(entity_id, event, origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topic::topic_matches;

    #[test]
    fn builds_canonical_topic() {
        let topic = build_topic("d1", "registered", "api").unwrap();
        assert_eq!(topic.as_str(), "devices/d1/event/registered/from/api");
    }

    #[test]
    fn builds_wildcard_filter() {
        let filter = TopicBuilder::DEVICES.origin_filter(Origin::Firmware).unwrap();
        assert_eq!(filter.as_str(), "devices/+/event/+/from/firmware");
    }

    #[test]
    fn origin_filter_separates_origins() {
        let filter = build_topic("+", "+", Origin::Firmware.as_str()).unwrap();

        for (id, event) in [("1", "booted"), ("abc-def", "registered"), ("42", "heartbeat")] {
            let firmware = build_topic(id, event, Origin::Firmware.as_str()).unwrap();
            let api = build_topic(id, event, Origin::Api.as_str()).unwrap();
            assert!(topic_matches(&filter, &firmware), "{firmware}");
            assert!(!topic_matches(&filter, &api), "{api}");
        }
    }

    #[test]
    fn custom_namespace() {
        let builder = TopicBuilder::new("gateways");
        let topic = builder.build("g7", "online", "firmware").unwrap();
        assert_eq!(topic.as_str(), "gateways/g7/event/online/from/firmware");
        assert_eq!(TopicBuilder::default().namespace(), "devices");
    }

    #[test]
    fn overflow_reports_full_length() {
        let id = "x".repeat(MAX_TOPIC_LEN);
        let err = build_topic(&id, "booted", "firmware").unwrap_err();
        assert_eq!(
            err,
            TopicError::TooLong {
                max: MAX_TOPIC_LEN,
                actual: "devices".len() + MAX_TOPIC_LEN + "booted".len() + "firmware".len() + 14,
            }
        );
    }
}
