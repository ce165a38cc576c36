use super::{LEVEL_SEPARATOR, MAX_TOPIC_LEN, MULTI_LEVEL_WILDCARD, SINGLE_LEVEL_WILDCARD};
use crate::error::TopicError;

/// Checks whether a concrete topic matches a subscription filter.
///
/// Levels are compared pairwise:
/// - `+` matches exactly one non-empty level
/// - `#` matches the rest of the topic, but only as the last filter level
/// - anything else must be byte-for-byte equal
///
/// The topic must have a level at the position of `#`, so `a/#` matches `a/b`
/// and `a/b/c` but not `a`. A filter with `#` anywhere but the end never
/// matches; [`validate_filter`] rejects such filters up front.
///
/// Two empty strings match each other; an empty string matches nothing else.
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    if filter.is_empty() && topic.is_empty() {
        return true;
    }
    if filter.is_empty() || topic.is_empty() {
        return false;
    }

    let mut filter_levels = filter.split(LEVEL_SEPARATOR).peekable();
    let mut topic_levels = topic.split(LEVEL_SEPARATOR);

    while let Some(filter_level) = filter_levels.next() {
        // Bounds first: a missing topic level fails even against `#`.
        let Some(topic_level) = topic_levels.next() else {
            return false;
        };

        match filter_level {
            MULTI_LEVEL_WILDCARD => return filter_levels.peek().is_none(),
            SINGLE_LEVEL_WILDCARD => {
                if topic_level.is_empty() {
                    return false;
                }
            }
            literal => {
                if literal != topic_level {
                    return false;
                }
            }
        }
    }

    topic_levels.next().is_none()
}

/// Validates a subscription filter.
///
/// Wildcards must occupy a whole level and `#` may only appear as the last
/// level. Empty levels are allowed, as in MQTT.
pub fn validate_filter(filter: &str) -> Result<(), TopicError> {
    check_length(filter)?;

    let mut levels = filter.split(LEVEL_SEPARATOR).enumerate().peekable();
    while let Some((index, level)) = levels.next() {
        match level {
            MULTI_LEVEL_WILDCARD if levels.peek().is_some() => {
                return Err(TopicError::MisplacedWildcard { level: index });
            }
            MULTI_LEVEL_WILDCARD | SINGLE_LEVEL_WILDCARD => {}
            _ if has_wildcard(level) => {
                return Err(TopicError::MisplacedWildcard { level: index });
            }
            _ => {}
        }
    }

    Ok(())
}

/// Validates a concrete topic used for publishing.
pub fn validate_topic(topic: &str) -> Result<(), TopicError> {
    check_length(topic)?;

    if has_wildcard(topic) {
        return Err(TopicError::WildcardInTopic);
    }

    Ok(())
}

/// Validates a single topic level, such as a device id placed into a topic.
pub fn validate_level(level: &str) -> Result<(), TopicError> {
    if level.is_empty() {
        return Err(TopicError::Empty);
    }
    if level.contains(LEVEL_SEPARATOR) || has_wildcard(level) {
        return Err(TopicError::InvalidLevel);
    }

    Ok(())
}

fn check_length(value: &str) -> Result<(), TopicError> {
    if value.is_empty() {
        return Err(TopicError::Empty);
    }
    if value.len() > MAX_TOPIC_LEN {
        return Err(TopicError::TooLong {
            max: MAX_TOPIC_LEN,
            actual: value.len(),
        });
    }

    Ok(())
}

fn has_wildcard(value: &str) -> bool {
    value.contains(['+', '#'])
}
