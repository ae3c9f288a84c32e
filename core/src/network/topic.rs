//! Publish topic construction

use heapless::String;

/// Maximum topic length
pub const MAX_TOPIC_LEN: usize = 96;

/// A topic could not be built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TopicError {
    /// A level contains `+`, `#` or NUL
    InvalidCharacter,
    /// A level is empty
    EmptyLevel,
    /// The topic does not fit in [`MAX_TOPIC_LEN`]
    TooLong,
}

impl core::fmt::Display for TopicError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidCharacter => write!(f, "Topic contains invalid characters"),
            Self::EmptyLevel => write!(f, "Topic contains an empty level"),
            Self::TooLong => write!(f, "Topic too long"),
        }
    }
}

impl core::error::Error for TopicError {}

/// Check one topic level: non-empty, no wildcard, no NUL
///
/// `/` is allowed so a root may span several levels.
pub fn validate_level(level: &str) -> Result<(), TopicError> {
    if level.is_empty() {
        return Err(TopicError::EmptyLevel);
    }
    if level.contains(['+', '#', '\0']) {
        return Err(TopicError::InvalidCharacter);
    }
    Ok(())
}

/// Build `{root}/{subtopic}`
///
/// ```
/// use sensor_node_core::network::format_topic;
///
/// let topic = format_topic("sensors", "greenhouse-3").unwrap();
/// assert_eq!(topic.as_str(), "sensors/greenhouse-3");
/// ```
pub fn format_topic(root: &str, subtopic: &str) -> Result<String<MAX_TOPIC_LEN>, TopicError> {
    if let Err(e) = validate_level(root).and_then(|()| validate_level(subtopic)) {
        error!("Invalid topic level: {:?}", e);
        return Err(e);
    }

    let mut topic = String::<MAX_TOPIC_LEN>::new();
    topic.push_str(root).map_err(|_| TopicError::TooLong)?;
    topic.push('/').map_err(|_| TopicError::TooLong)?;
    topic.push_str(subtopic).map_err(|_| TopicError::TooLong)?;
    Ok(topic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_topic() {
        let topic = format_topic("sensors", "DEFAULT").unwrap();
        assert_eq!(topic.as_str(), "sensors/DEFAULT");

        let topic = format_topic("farm/north", "bed-7").unwrap();
        assert_eq!(topic.as_str(), "farm/north/bed-7");
    }

    #[test]
    fn test_format_topic_too_long() {
        let long_root = "this_is_a_very_long_topic_root_that_together_with_the_name_exceeds_the_topic_buffer_by_a_wide_margin";
        assert_eq!(
            format_topic(long_root, "sensor-name"),
            Err(TopicError::TooLong)
        );
    }

    #[test]
    fn test_format_topic_invalid_characters() {
        assert_eq!(
            format_topic("sensors", "bed+1"),
            Err(TopicError::InvalidCharacter)
        );
        assert_eq!(
            format_topic("sensors/#", "bed"),
            Err(TopicError::InvalidCharacter)
        );
        assert_eq!(
            format_topic("sensors", "bed\0"),
            Err(TopicError::InvalidCharacter)
        );
        assert_eq!(format_topic("sensors", ""), Err(TopicError::EmptyLevel));
    }
}
