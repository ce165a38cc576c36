//! Topic construction, validation and wildcard matching.
//!
//! Topics are `/`-separated levels. Filters may additionally contain the
//! single-level wildcard `+` and, as their last level only, the multi-level
//! wildcard `#`. Published topics never contain wildcards.

mod builder;
mod filter;

pub use builder::{Origin, TopicBuilder, build_topic};
pub use filter::{topic_matches, validate_filter, validate_level, validate_topic};

/// Maximum length for a single topic or filter string.
pub const MAX_TOPIC_LEN: usize = 128;

/// Fixed-capacity owned topic string.
pub type TopicString = heapless::String<MAX_TOPIC_LEN>;

pub const LEVEL_SEPARATOR: char = '/';
pub const SINGLE_LEVEL_WILDCARD: &str = "+";
pub const MULTI_LEVEL_WILDCARD: &str = "#";

/// Root level of every device topic.
pub const DEVICES_NAMESPACE: &str = "devices";
