//! Type-safe subscription identifier.
//!
//! [`SubscriptionId`] is a newtype wrapper around [`uuid::Uuid`] (v4) so
//! subscription handles cannot be confused with other UUIDs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier of a reader or writer subscription.
///
/// Generated once when the subscription is created and used as the key
/// in a channel's [`super::SubscriptionSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(uuid::Uuid);

impl SubscriptionId {
    /// Creates a new random `SubscriptionId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for SubscriptionId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}
