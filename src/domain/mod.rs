//! Domain layer: values, channels, the registry and diagnostic events.
//!
//! Leaves first: the closed [`Value`] model and its coercion rules,
//! subscription bookkeeping, the per-channel [`ChannelHandler`] state
//! machine and the [`ChannelRegistry`] that owns every channel.

pub mod channel_event;
pub mod channel_handler;
pub mod channel_registry;
pub mod coercion;
pub mod event_bus;
pub mod reader;
pub mod subscription_id;
pub mod subscription_set;
pub mod value;

pub use channel_event::ChannelEvent;
pub use channel_handler::{ChannelHandler, ChannelSnapshot};
pub use channel_registry::{ChannelRegistry, EvictionPolicy, Subscription, SubscriptionKind};
pub use coercion::ChannelInput;
pub use event_bus::EventBus;
pub use reader::{ChannelReader, ConnectionState, FnReader};
pub use subscription_id::SubscriptionId;
pub use subscription_set::SubscriptionSet;
pub use value::{ColumnData, Table, TableColumn, Value, ValueType};
