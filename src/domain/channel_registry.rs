//! Channel lookup and the subscribe/write surface.
//!
//! [`ChannelRegistry`] maps channel names to shared [`ChannelHandler`]s,
//! creating them on first lookup. The map sits behind a
//! [`parking_lot::RwLock`] that is only held around the lookup and the
//! create-if-absent step; each handler does its own locking, so work on
//! different channels never contends.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::channel_handler::{ChannelHandler, ChannelSnapshot};
use super::coercion::ChannelInput;
use super::reader::ChannelReader;
use super::{ChannelEvent, EventBus, SubscriptionId};
use crate::config::MuxConfig;
use crate::error::ChannelError;

/// What happens to channels nobody uses any more.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Keep every channel for the lifetime of the registry.
    #[default]
    Retain,
    /// Drop a channel once an unsubscribe leaves it disconnected and
    /// without readers, writers or outside handles.
    ///
    /// Connected channels are never evicted, so a cached value and its
    /// declared type survive until the channel is disconnected.
    WhenUnused,
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retain" => Ok(Self::Retain),
            "when_unused" | "when-unused" => Ok(Self::WhenUnused),
            other => Err(format!("unknown eviction policy: {other}")),
        }
    }
}

/// Whether a subscription reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionKind {
    /// Receives value and connection notifications.
    Reader,
    /// Registered writer (bookkeeping only).
    Writer,
}

/// Handle returned by the registry's subscribe calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subscription {
    id: SubscriptionId,
    channel: String,
    kind: SubscriptionKind,
}

impl Subscription {
    /// Subscription identifier.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Name of the channel the subscription belongs to.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Reader or writer.
    #[must_use]
    pub const fn kind(&self) -> SubscriptionKind {
        self.kind
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            SubscriptionKind::Reader => "reader",
            SubscriptionKind::Writer => "writer",
        };
        write!(f, "{kind} {} on {}", self.id, self.channel)
    }
}

/// Central store of all channels in the process.
///
/// # Concurrency
///
/// - Lookups of existing channels only take the map's read lock.
/// - Concurrent first lookups of one name create exactly one handler.
/// - Operations on different channels never block each other.
#[derive(Debug)]
pub struct ChannelRegistry {
    channels: RwLock<HashMap<String, Arc<ChannelHandler>>>,
    events: EventBus,
    eviction: EvictionPolicy,
}

impl ChannelRegistry {
    /// Creates an empty registry that retains channels.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&MuxConfig::default())
    }

    /// Creates an empty registry from configuration.
    #[must_use]
    pub fn with_config(config: &MuxConfig) -> Self {
        Self::with_policy(config.eviction, EventBus::new(config.event_bus_capacity))
    }

    /// Creates an empty registry with an explicit eviction policy and
    /// event bus.
    #[must_use]
    pub fn with_policy(eviction: EvictionPolicy, events: EventBus) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            events,
            eviction,
        }
    }

    /// Diagnostic event bus shared by every channel of this registry.
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    /// Active eviction policy.
    #[must_use]
    pub const fn eviction_policy(&self) -> EvictionPolicy {
        self.eviction
    }

    /// Returns the channel named `name`, creating it if needed.
    ///
    /// Every call with the same name returns the same handler.
    pub fn lookup(&self, name: &str) -> Arc<ChannelHandler> {
        let existing = self.channels.read().get(name).map(Arc::clone);
        if let Some(handler) = existing {
            return handler;
        }

        let mut created = false;
        let handler = {
            let mut map = self.channels.write();
            let entry = map.entry(name.to_string()).or_insert_with(|| {
                created = true;
                Arc::new(ChannelHandler::with_event_bus(name, self.events.clone()))
            });
            Arc::clone(entry)
        };
        if created {
            tracing::info!(channel = name, "channel created");
            let _ = self.events.publish(ChannelEvent::ChannelCreated {
                channel: name.to_string(),
                timestamp: Utc::now(),
            });
        }
        handler
    }

    /// Returns the channel named `name` without creating it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<ChannelHandler>> {
        self.channels.read().get(name).map(Arc::clone)
    }

    /// Returns `true` if a channel named `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.channels.read().contains_key(name)
    }

    /// Number of channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.read().len()
    }

    /// Returns `true` if the registry holds no channels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.read().is_empty()
    }

    /// Channel names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshots of every channel, sorted by name.
    #[must_use]
    pub fn snapshots(&self) -> Vec<ChannelSnapshot> {
        let handlers: Vec<Arc<ChannelHandler>> =
            self.channels.read().values().map(Arc::clone).collect();
        let mut snapshots: Vec<ChannelSnapshot> = handlers.iter().map(|h| h.snapshot()).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    /// Registers a reader on `handle`, replaying the current value if the
    /// channel is connected.
    pub fn subscribe_reader(
        &self,
        handle: &ChannelHandler,
        reader: Arc<dyn ChannelReader>,
    ) -> Subscription {
        Subscription {
            id: handle.add_reader(reader),
            channel: handle.name().to_string(),
            kind: SubscriptionKind::Reader,
        }
    }

    /// Registers a writer on `handle`.
    pub fn subscribe_writer(&self, handle: &ChannelHandler) -> Subscription {
        Subscription {
            id: handle.add_writer(),
            channel: handle.name().to_string(),
            kind: SubscriptionKind::Writer,
        }
    }

    /// Removes a reader subscription. Returns `false` if it was not active.
    pub fn unsubscribe_reader(&self, subscription: &Subscription) -> bool {
        let Some(handle) = self.get(&subscription.channel) else {
            return false;
        };
        let removed = handle.remove_reader(subscription.id);
        drop(handle);
        self.after_unsubscribe(&subscription.channel);
        removed
    }

    /// Removes a writer subscription. Returns `false` if it was not active.
    pub fn unsubscribe_writer(&self, subscription: &Subscription) -> bool {
        let Some(handle) = self.get(&subscription.channel) else {
            return false;
        };
        let removed = handle.remove_writer(subscription.id);
        drop(handle);
        self.after_unsubscribe(&subscription.channel);
        removed
    }

    /// Removes a subscription of either kind.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        match subscription.kind {
            SubscriptionKind::Reader => self.unsubscribe_reader(subscription),
            SubscriptionKind::Writer => self.unsubscribe_writer(subscription),
        }
    }

    /// Writes a value to `handle`.
    ///
    /// # Errors
    ///
    /// See [`ChannelHandler::write`].
    pub fn write(
        &self,
        handle: &ChannelHandler,
        input: impl Into<ChannelInput>,
    ) -> Result<(), ChannelError> {
        handle.write(input)
    }

    /// Writes a value to `handle`, reporting the outcome to `callback`
    /// exactly once.
    pub fn write_with_callback<F>(
        &self,
        handle: &ChannelHandler,
        input: impl Into<ChannelInput>,
        callback: F,
    ) where
        F: FnOnce(Result<(), ChannelError>),
    {
        handle.write_with_callback(input, callback);
    }

    /// Records the initial value of `handle`.
    ///
    /// # Errors
    ///
    /// See [`ChannelHandler::set_initial_value`].
    pub fn declare_initial_value(
        &self,
        handle: &ChannelHandler,
        input: impl Into<ChannelInput>,
    ) -> Result<(), ChannelError> {
        handle.set_initial_value(input)
    }

    /// Locks the value type of `handle`.
    ///
    /// # Errors
    ///
    /// See [`ChannelHandler::set_type`].
    pub fn declare_type(&self, handle: &ChannelHandler, type_name: &str) -> Result<(), ChannelError> {
        handle.set_type(type_name)
    }

    /// Connects `handle`.
    pub fn connect(&self, handle: &ChannelHandler) {
        handle.connect();
    }

    /// Disconnects `handle`.
    pub fn disconnect(&self, handle: &ChannelHandler) {
        handle.disconnect();
    }

    /// Removes every disconnected channel with no subscriptions and no
    /// handle held outside the registry, regardless of the eviction policy.
    ///
    /// Returns the number of channels removed.
    pub fn evict_unused(&self) -> usize {
        let evicted: Vec<String> = {
            let mut map = self.channels.write();
            let names: Vec<String> = map
                .iter()
                .filter(|(_, handler)| is_evictable(handler))
                .map(|(name, _)| name.clone())
                .collect();
            for name in &names {
                map.remove(name);
            }
            names
        };
        for name in &evicted {
            self.evicted(name);
        }
        evicted.len()
    }

    fn after_unsubscribe(&self, name: &str) {
        if self.eviction != EvictionPolicy::WhenUnused {
            return;
        }
        let removed = {
            let mut map = self.channels.write();
            let evictable = map.get(name).is_some_and(is_evictable);
            evictable && map.remove(name).is_some()
        };
        if removed {
            self.evicted(name);
        }
    }

    fn evicted(&self, name: &str) {
        tracing::info!(channel = name, "channel evicted");
        let _ = self.events.publish(ChannelEvent::ChannelEvicted {
            channel: name.to_string(),
            timestamp: Utc::now(),
        });
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Only the registry's map holds the handler, nothing is subscribed and
/// no value is cached. Must be called with the map's write lock held.
fn is_evictable(handler: &Arc<ChannelHandler>) -> bool {
    Arc::strong_count(handler) == 1
        && handler.is_unused()
        && !handler.connection_state().is_connected()
}
