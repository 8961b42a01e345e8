//! # local-channels
//!
//! In-process multiplexer for named value channels.
//!
//! Any number of readers subscribe to a channel by name, writers push
//! values into it, and the channel caches the last value, locks itself to
//! a single value type and tracks a connect/disconnect lifecycle that is
//! independent of who is subscribed. There is no network protocol and no
//! persistence; ordering is guaranteed only within one channel.
//!
//! ## Architecture
//!
//! ```text
//! Callers (readers, writers, adapters)
//!     │
//!     ├── ChannelRegistry (domain/)      name → Arc<ChannelHandler>
//!     │
//!     ├── ChannelHandler (domain/)       state machine, last-value cache,
//!     │     ├── SubscriptionSet          reader fan-out
//!     │     └── coercion                 input → Value
//!     │
//!     └── EventBus (domain/)             diagnostic ChannelEvents
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use local_channels::domain::{ChannelRegistry, FnReader, Value};
//!
//! let registry = ChannelRegistry::new();
//! let temperature = registry.lookup("loc://temperature");
//!
//! let reader = FnReader::new(|channel, value| println!("{channel} = {value}"));
//! let subscription = registry.subscribe_reader(&temperature, Arc::new(reader));
//!
//! registry.write(&temperature, "21.5")?;
//! assert_eq!(temperature.value(), Some(Value::Double(21.5)));
//!
//! registry.unsubscribe(&subscription);
//! # Ok::<(), local_channels::error::ChannelError>(())
//! ```

pub mod config;
pub mod domain;
pub mod error;
