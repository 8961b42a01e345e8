//! Multiplexer configuration loaded from environment variables.
//!
//! All settings come from environment variables (or a `.env` file via
//! `dotenvy`). Recognized value type names are fixed and not
//! configurable.
//!
//! | Variable                             | Default  |
//! |--------------------------------------|----------|
//! | `LOCAL_CHANNELS_EVENT_BUS_CAPACITY`  | `1024`   |
//! | `LOCAL_CHANNELS_EVICTION`            | `retain` |

use crate::domain::EvictionPolicy;

/// Default capacity of the diagnostic event bus.
pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 1024;

/// Top-level multiplexer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxConfig {
    /// Capacity of the [`crate::domain::EventBus`] broadcast channel.
    pub event_bus_capacity: usize,

    /// What the registry does with channels nobody uses any more.
    pub eviction: EvictionPolicy,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            event_bus_capacity: DEFAULT_EVENT_BUS_CAPACITY,
            eviction: EvictionPolicy::Retain,
        }
    }
}

impl MuxConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    /// Missing or invalid values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let event_bus_capacity = parse_or(
            lookup("LOCAL_CHANNELS_EVENT_BUS_CAPACITY"),
            defaults.event_bus_capacity,
        );
        let eviction = parse_or(lookup("LOCAL_CHANNELS_EVICTION"), defaults.eviction);
        Self {
            event_bus_capacity,
            eviction,
        }
    }
}

/// Parses `raw` as `T`, returning `default` on missing or invalid values.
fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    match raw.map(|v| v.parse::<T>()) {
        Some(Ok(value)) => value,
        Some(Err(_)) => {
            tracing::warn!("ignoring invalid configuration value; using default");
            default
        }
        None => default,
    }
}
