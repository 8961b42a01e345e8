//! Reader callbacks.
//!
//! A [`ChannelReader`] is notified synchronously, on the thread that
//! changed the channel, of every connection transition and every new
//! value. Callbacks run while the channel is locked for mutation: they may
//! read snapshots but must not write to, connect, disconnect or
//! (un)subscribe on the channel that is notifying them.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::value::Value;

/// Connection state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No cached value; initial state.
    Disconnected,
    /// Connected; the channel holds a cached payload.
    Connected,
}

impl ConnectionState {
    /// Returns `true` for [`ConnectionState::Connected`].
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connected => f.write_str("connected"),
        }
    }
}

/// Receiver of channel notifications.
pub trait ChannelReader: Send + Sync {
    /// Called with every value the channel delivers, in write order.
    fn on_value(&self, channel: &str, value: &Value);

    /// Called when the channel connects or disconnects.
    fn on_connection(&self, channel: &str, state: ConnectionState) {
        let _ = (channel, state);
    }
}

type ValueFn = Box<dyn Fn(&str, &Value) + Send + Sync>;
type ConnectionFn = Box<dyn Fn(&str, ConnectionState) + Send + Sync>;

/// [`ChannelReader`] built from closures.
pub struct FnReader {
    on_value: ValueFn,
    on_connection: Option<ConnectionFn>,
}

impl FnReader {
    /// Creates a reader that only observes values.
    #[must_use]
    pub fn new(on_value: impl Fn(&str, &Value) + Send + Sync + 'static) -> Self {
        Self {
            on_value: Box::new(on_value),
            on_connection: None,
        }
    }

    /// Also observe connection transitions.
    #[must_use]
    pub fn with_connection(
        mut self,
        on_connection: impl Fn(&str, ConnectionState) + Send + Sync + 'static,
    ) -> Self {
        self.on_connection = Some(Box::new(on_connection));
        self
    }
}

impl fmt::Debug for FnReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnReader")
            .field("on_connection", &self.on_connection.is_some())
            .finish_non_exhaustive()
    }
}

impl ChannelReader for FnReader {
    fn on_value(&self, channel: &str, value: &Value) {
        (self.on_value)(channel, value);
    }

    fn on_connection(&self, channel: &str, state: ConnectionState) {
        if let Some(on_connection) = &self.on_connection {
            on_connection(channel, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    #[test]
    fn fn_reader_forwards_values_and_states() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let values = Arc::clone(&seen);
        let states = Arc::clone(&seen);
        let reader = FnReader::new(move |ch, v| values.lock().push(format!("{ch}={v}")))
            .with_connection(move |ch, s| states.lock().push(format!("{ch}:{s}")));

        reader.on_connection("x", ConnectionState::Connected);
        reader.on_value("x", &Value::Double(1.5));

        assert_eq!(*seen.lock(), vec!["x:connected", "x=1.5"]);
    }

    #[test]
    fn value_only_reader_ignores_states() {
        let count = Arc::new(Mutex::new(0_u32));
        let counter = Arc::clone(&count);
        let reader = FnReader::new(move |_, _| *counter.lock() += 1);
        reader.on_connection("x", ConnectionState::Disconnected);
        reader.on_value("x", &Value::Double(0.0));
        assert_eq!(*count.lock(), 1);
    }
}
