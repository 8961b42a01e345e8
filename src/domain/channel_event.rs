//! Diagnostic events describing channel lifecycle and traffic.
//!
//! Every connection transition, applied write and rejected operation
//! emits a [`ChannelEvent`] through the [`super::EventBus`]. Readers do
//! not depend on these events; value delivery goes through
//! [`super::ChannelReader`].

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::value::ValueType;

/// Diagnostic event emitted by channels and the registry.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ChannelEvent {
    /// A channel was created on first lookup.
    ChannelCreated {
        /// Channel name.
        channel: String,
        /// Creation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A channel transitioned to connected.
    Connected {
        /// Channel name.
        channel: String,
        /// Transition timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A channel transitioned to disconnected.
    Disconnected {
        /// Channel name.
        channel: String,
        /// Transition timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A value was cached and delivered to readers.
    ValueWritten {
        /// Channel name.
        channel: String,
        /// Shape of the delivered value.
        value_type: ValueType,
        /// Number of readers notified.
        readers: usize,
        /// Delivery timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A write, type declaration or initial value was rejected.
    OperationRejected {
        /// Channel name.
        channel: String,
        /// Numeric error code (see [`crate::error::ChannelError::error_code`]).
        code: u32,
        /// Human-readable rejection reason.
        reason: String,
        /// Rejection timestamp.
        timestamp: DateTime<Utc>,
    },

    /// An unused channel was removed from the registry.
    ChannelEvicted {
        /// Channel name.
        channel: String,
        /// Eviction timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl ChannelEvent {
    /// Returns the channel name associated with this event.
    #[must_use]
    pub fn channel(&self) -> &str {
        match self {
            Self::ChannelCreated { channel, .. }
            | Self::Connected { channel, .. }
            | Self::Disconnected { channel, .. }
            | Self::ValueWritten { channel, .. }
            | Self::OperationRejected { channel, .. }
            | Self::ChannelEvicted { channel, .. } => channel,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::ChannelCreated { .. } => "channel_created",
            Self::Connected { .. } => "connected",
            Self::Disconnected { .. } => "disconnected",
            Self::ValueWritten { .. } => "value_written",
            Self::OperationRejected { .. } => "operation_rejected",
            Self::ChannelEvicted { .. } => "channel_evicted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_created_event_type() {
        let event = ChannelEvent::ChannelCreated {
            channel: "loc://a".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_type_str(), "channel_created");
        assert_eq!(event.channel(), "loc://a");
    }

    #[test]
    fn value_written_serializes() {
        let event = ChannelEvent::ValueWritten {
            channel: "loc://a".to_string(),
            value_type: ValueType::DoubleArray,
            readers: 3,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap_or_default();
        assert!(json.contains("\"event_type\":\"value_written\""));
        assert!(json.contains("double-array"));
    }
}
