//! One named channel: connection state, last-value cache, declared type
//! and reader fan-out.
//!
//! # Concurrency
//!
//! Every mutating operation holds the channel's operation lock for its
//! whole duration, including reader notification, so writes, connection
//! transitions and (un)subscriptions on one channel are strictly
//! serialized and every reader sees values in write order. Channel state
//! sits behind a separate `RwLock` that is only held while it is read or
//! replaced. [`ChannelHandler::snapshot`] holds that lock together with the
//! subscription read lock, never the operation lock, so it can run while a
//! fan-out is in progress.
//!
//! Different channels share no locks.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use super::coercion::{self, ChannelInput};
use super::reader::{ChannelReader, ConnectionState};
use super::value::{Value, ValueType};
use super::{ChannelEvent, EventBus, SubscriptionId, SubscriptionSet};
use crate::error::ChannelError;

/// Content of the last-value cache while connected.
#[derive(Debug, Clone, PartialEq)]
enum CachedPayload {
    /// Connected, but no value delivered yet.
    Marker,
    /// Last delivered value.
    Value(Value),
}

#[derive(Debug, Default)]
struct ChannelState {
    declared: Option<ValueType>,
    /// `Some` exactly while connected.
    cached: Option<CachedPayload>,
    initial: Option<Value>,
    /// A write has replaced the recorded initial value since it was set.
    superseded: bool,
}

impl ChannelState {
    fn connection(&self) -> ConnectionState {
        if self.cached.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    fn value(&self) -> Option<&Value> {
        match &self.cached {
            Some(CachedPayload::Value(value)) => Some(value),
            _ => None,
        }
    }
}

/// Read-only view of a channel at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSnapshot {
    /// Channel name.
    pub name: String,
    /// Connection state.
    pub state: ConnectionState,
    /// Declared type, if any.
    pub declared_type: Option<ValueType>,
    /// Cached value; `None` when disconnected or connected without a value.
    pub value: Option<Value>,
    /// Recorded initial value.
    pub initial_value: Option<Value>,
    /// Registered readers.
    pub readers: usize,
    /// Registered writers.
    pub writers: usize,
}

/// Owner of a single named channel.
///
/// Handlers are shared as `Arc<ChannelHandler>`; see the module docs for
/// the locking discipline. Reader callbacks must not mutate the channel
/// that is notifying them.
#[derive(Debug)]
pub struct ChannelHandler {
    name: String,
    op: Mutex<()>,
    state: RwLock<ChannelState>,
    subscriptions: RwLock<SubscriptionSet>,
    events: Option<EventBus>,
}

impl ChannelHandler {
    /// Creates a disconnected, untyped channel.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op: Mutex::new(()),
            state: RwLock::new(ChannelState::default()),
            subscriptions: RwLock::new(SubscriptionSet::new()),
            events: None,
        }
    }

    /// Creates a channel that reports diagnostic events on `events`.
    #[must_use]
    pub fn with_event_bus(name: impl Into<String>, events: EventBus) -> Self {
        Self {
            events: Some(events),
            ..Self::new(name)
        }
    }

    /// Channel name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.state.read().connection()
    }

    /// Declared type, if any.
    #[must_use]
    pub fn declared_type(&self) -> Option<ValueType> {
        self.state.read().declared
    }

    /// Last delivered value, if connected and a value was delivered.
    #[must_use]
    pub fn value(&self) -> Option<Value> {
        self.state.read().value().cloned()
    }

    /// Number of registered readers.
    #[must_use]
    pub fn reader_count(&self) -> usize {
        self.subscriptions.read().reader_count()
    }

    /// Number of registered writers.
    #[must_use]
    pub fn writer_count(&self) -> usize {
        self.subscriptions.read().writer_count()
    }

    /// Returns `true` if no reader or writer is registered.
    #[must_use]
    pub fn is_unused(&self) -> bool {
        self.subscriptions.read().is_empty()
    }

    /// Returns a consistent read-only view of the channel.
    #[must_use]
    pub fn snapshot(&self) -> ChannelSnapshot {
        let st = self.state.read();
        let subs = self.subscriptions.read();
        ChannelSnapshot {
            name: self.name.clone(),
            state: st.connection(),
            declared_type: st.declared,
            value: st.value().cloned(),
            initial_value: st.initial.clone(),
            readers: subs.reader_count(),
            writers: subs.writer_count(),
        }
    }

    /// Connects the channel.
    ///
    /// The cache is seeded with the recorded initial value, or with the
    /// connection marker when there is none or a write has replaced it
    /// since it was recorded. Readers are told about the
    /// transition, then receive the seeded value if there is one.
    /// Connecting an already connected channel does nothing.
    pub fn connect(&self) {
        let _op = self.op.lock();
        let seeded = {
            let mut st = self.state.write();
            if st.cached.is_some() {
                return;
            }
            let seeded = match (&st.initial, st.declared) {
                (Some(_), _) if st.superseded => None,
                (Some(initial), Some(declared)) if initial.value_type() != declared => {
                    tracing::warn!(
                        channel = %self.name,
                        %declared,
                        "initial value does not match declared type; connecting without a value"
                    );
                    None
                }
                (initial, _) => initial.clone(),
            };
            if let Some(value) = &seeded
                && st.declared.is_none()
            {
                st.declared = Some(value.value_type());
            }
            st.cached = Some(
                seeded
                    .clone()
                    .map_or(CachedPayload::Marker, CachedPayload::Value),
            );
            seeded
        };
        tracing::info!(channel = %self.name, seeded = seeded.is_some(), "channel connected");
        self.notify_connection(ConnectionState::Connected);
        if let Some(value) = seeded {
            self.notify_value(&value);
        }
    }

    /// Disconnects the channel.
    ///
    /// Clears the cached value and the declared type. The recorded initial
    /// value is kept, so the next [`connect`](Self::connect) restores it
    /// unless a write has replaced it in the meantime. Readers are notified only if the channel was connected.
    pub fn disconnect(&self) {
        let _op = self.op.lock();
        let was_connected = {
            let mut st = self.state.write();
            st.declared = None;
            st.cached.take().is_some()
        };
        if was_connected {
            tracing::info!(channel = %self.name, "channel disconnected");
            self.notify_connection(ConnectionState::Disconnected);
        }
    }

    /// Declares the channel's value type by name.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::UnsupportedType`] for an unrecognized name
    /// and [`ChannelError::TypeConflict`] if a different type is declared.
    pub fn set_type(&self, type_name: &str) -> Result<(), ChannelError> {
        let requested = type_name.parse::<ValueType>().map_err(|err| {
            let err = ChannelError::UnsupportedType {
                channel: self.name.clone(),
                type_name: err.0,
            };
            self.rejected(&err);
            err
        })?;
        self.set_value_type(requested)
    }

    /// Declares the channel's value type.
    ///
    /// Declaring the type already in place is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::TypeConflict`] if a different type is
    /// already declared.
    pub fn set_value_type(&self, requested: ValueType) -> Result<(), ChannelError> {
        let _op = self.op.lock();
        let mut st = self.state.write();
        let current = st.declared;
        match current {
            Some(declared) if declared != requested => {
                drop(st);
                let err = ChannelError::TypeConflict {
                    channel: self.name.clone(),
                    declared,
                    requested,
                };
                self.rejected(&err);
                Err(err)
            }
            Some(_) => Ok(()),
            None => {
                st.declared = Some(requested);
                tracing::debug!(channel = %self.name, %requested, "channel type declared");
                Ok(())
            }
        }
    }

    /// Records the value used to seed the cache on connection.
    ///
    /// Re-declaring an equal value changes nothing. If the cache holds no
    /// value yet, the value is delivered right away, which connects the
    /// channel.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::ConflictingInitialValue`] if a different
    /// initial value is recorded and no write has superseded it,
    /// [`ChannelError::ConversionFailure`] if the input has no value shape
    /// and [`ChannelError::TypeMismatch`] if it contradicts the declared
    /// type. On error the previous initial value stays in place.
    pub fn set_initial_value(&self, input: impl Into<ChannelInput>) -> Result<(), ChannelError> {
        let value = self.resolve(input.into())?;
        let _op = self.op.lock();
        let deliver = {
            let mut st = self.state.write();
            if let Some(existing) = &st.initial
                && !st.superseded
                && !existing.same_as(&value)
            {
                let err = ChannelError::ConflictingInitialValue {
                    channel: self.name.clone(),
                    existing: existing.clone(),
                    requested: value,
                };
                drop(st);
                self.rejected(&err);
                return Err(err);
            }
            if let Err(err) = self.check_type(st.declared, &value) {
                drop(st);
                self.rejected(&err);
                return Err(err);
            }
            if !st.initial.as_ref().is_some_and(|initial| initial.same_as(&value)) {
                st.initial = Some(value.clone());
                st.superseded = false;
            }
            st.value().is_none()
        };
        if deliver {
            self.apply(value, false)?;
        }
        Ok(())
    }

    /// Writes a value to the channel.
    ///
    /// Raw text that parses as a number is written as a scalar double.
    /// On success the value is cached, the channel connects if needed and
    /// every reader is notified before this returns. If no type is
    /// declared, the value's shape becomes the declared type.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::ConversionFailure`] if the input has no
    /// value shape and [`ChannelError::TypeMismatch`] if it contradicts the
    /// declared type. A failed write leaves the channel untouched.
    pub fn write(&self, input: impl Into<ChannelInput>) -> Result<(), ChannelError> {
        let value = self.resolve(input.into())?;
        let _op = self.op.lock();
        self.apply(value, true)
    }

    /// Writes a value and reports the outcome to `callback`.
    ///
    /// The callback runs exactly once, after the channel lock is released.
    pub fn write_with_callback<F>(&self, input: impl Into<ChannelInput>, callback: F)
    where
        F: FnOnce(Result<(), ChannelError>),
    {
        callback(self.write(input));
    }

    /// Registers a reader.
    ///
    /// If the channel is connected, the reader is told so and receives the
    /// cached value (if any) before this returns.
    pub fn add_reader(&self, reader: Arc<dyn ChannelReader>) -> SubscriptionId {
        let id = SubscriptionId::new();
        let _op = self.op.lock();
        self.subscriptions.write().add_reader(id, Arc::clone(&reader));
        let (state, value) = {
            let st = self.state.read();
            (st.connection(), st.value().cloned())
        };
        tracing::debug!(channel = %self.name, subscription = %id, %state, "reader added");
        if state.is_connected() {
            reader.on_connection(&self.name, state);
            if let Some(value) = value {
                reader.on_value(&self.name, &value);
            }
        }
        id
    }

    /// Removes a reader. Returns `false` if it was not registered.
    pub fn remove_reader(&self, id: SubscriptionId) -> bool {
        let _op = self.op.lock();
        let removed = self.subscriptions.write().remove_reader(id);
        tracing::debug!(channel = %self.name, subscription = %id, removed, "reader removed");
        removed
    }

    /// Registers a writer.
    pub fn add_writer(&self) -> SubscriptionId {
        let id = SubscriptionId::new();
        let _op = self.op.lock();
        self.subscriptions.write().add_writer(id);
        tracing::debug!(channel = %self.name, subscription = %id, "writer added");
        id
    }

    /// Removes a writer. Returns `false` if it was not registered.
    pub fn remove_writer(&self, id: SubscriptionId) -> bool {
        let _op = self.op.lock();
        let removed = self.subscriptions.write().remove_writer(id);
        tracing::debug!(channel = %self.name, subscription = %id, removed, "writer removed");
        removed
    }

    fn resolve(&self, input: ChannelInput) -> Result<Value, ChannelError> {
        coercion::coerce(input).map_err(|source| {
            let err = ChannelError::ConversionFailure {
                channel: self.name.clone(),
                source,
            };
            self.rejected(&err);
            err
        })
    }

    fn check_type(&self, declared: Option<ValueType>, value: &Value) -> Result<(), ChannelError> {
        match declared {
            Some(expected) if expected != value.value_type() => Err(ChannelError::TypeMismatch {
                channel: self.name.clone(),
                expected,
                actual: value.value_type(),
            }),
            _ => Ok(()),
        }
    }

    /// Validates, caches and fans out a value. Caller holds the op lock.
    fn apply(&self, value: Value, from_write: bool) -> Result<(), ChannelError> {
        let connected_now = {
            let mut st = self.state.write();
            if let Err(err) = self.check_type(st.declared, &value) {
                drop(st);
                self.rejected(&err);
                return Err(err);
            }
            if st.declared.is_none() {
                st.declared = Some(value.value_type());
            }
            if from_write {
                st.superseded = true;
            }
            st.cached
                .replace(CachedPayload::Value(value.clone()))
                .is_none()
        };
        if connected_now {
            tracing::info!(channel = %self.name, "channel connected by first value");
            self.notify_connection(ConnectionState::Connected);
        }
        self.notify_value(&value);
        Ok(())
    }

    fn notify_connection(&self, state: ConnectionState) {
        let readers = self.subscriptions.read().readers();
        for reader in &readers {
            reader.on_connection(&self.name, state);
        }
        self.publish(match state {
            ConnectionState::Connected => ChannelEvent::Connected {
                channel: self.name.clone(),
                timestamp: Utc::now(),
            },
            ConnectionState::Disconnected => ChannelEvent::Disconnected {
                channel: self.name.clone(),
                timestamp: Utc::now(),
            },
        });
    }

    fn notify_value(&self, value: &Value) {
        let readers = self.subscriptions.read().readers();
        for reader in &readers {
            reader.on_value(&self.name, value);
        }
        tracing::debug!(
            channel = %self.name,
            value_type = %value.value_type(),
            readers = readers.len(),
            "value delivered"
        );
        self.publish(ChannelEvent::ValueWritten {
            channel: self.name.clone(),
            value_type: value.value_type(),
            readers: readers.len(),
            timestamp: Utc::now(),
        });
    }

    fn rejected(&self, err: &ChannelError) {
        tracing::warn!(channel = %self.name, kind = err.kind(), error = %err, "operation rejected");
        self.publish(ChannelEvent::OperationRejected {
            channel: self.name.clone(),
            code: err.error_code(),
            reason: err.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn publish(&self, event: ChannelEvent) {
        if let Some(events) = &self.events {
            let _ = events.publish(event);
        }
    }
}
