//! Channel error types.
//!
//! [`ChannelError`] is the error reported to callers of channel operations.
//! Every variant is a rejected operation: the channel keeps its previous
//! state and nothing propagates to other channels.
//!
//! # Error Codes
//!
//! | Code | Variant                     |
//! |------|-----------------------------|
//! | 1001 | `UnsupportedType`           |
//! | 1002 | `TypeConflict`              |
//! | 1003 | `TypeMismatch`              |
//! | 1004 | `ConflictingInitialValue`   |
//! | 1005 | `ConversionFailure`         |

use crate::domain::value::{Value, ValueType};

/// A type name outside the recognized set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value type: {0}")]
pub struct UnknownValueType(pub String);

/// Why an input could not be turned into a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoercionError {
    /// The input kind has no matching value shape (null, bool, nested data).
    #[error("{0} cannot be converted to a channel value")]
    Unsupported(&'static str),

    /// An array mixes numbers and strings, or holds non-scalar elements.
    #[error("array elements must be all numbers or all strings")]
    MixedArray,

    /// A number is not representable as `f64`.
    #[error("number {0} is not representable as f64")]
    NotFinite(String),

    /// A table column is not an array of numbers or an array of strings.
    #[error("table column {0:?} must be an array of numbers or of strings")]
    InvalidColumn(String),

    /// Two table columns share a name.
    #[error("duplicate table column {0:?}")]
    DuplicateColumn(String),

    /// Table columns disagree on the row count.
    #[error("table column {column:?} has {actual} rows, expected {expected}")]
    RaggedTable {
        /// Offending column.
        column: String,
        /// Row count of the first column.
        expected: usize,
        /// Row count of the offending column.
        actual: usize,
    },
}

/// Error returned by channel operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChannelError {
    /// The declared type name is not one of the recognized shapes.
    #[error("type {type_name} for channel {channel} is not supported by local channels")]
    UnsupportedType {
        /// Channel name.
        channel: String,
        /// The rejected type name.
        type_name: String,
    },

    /// The channel already has a different declared type.
    #[error("type conflict for channel {channel}: {requested} but was {declared}")]
    TypeConflict {
        /// Channel name.
        channel: String,
        /// Type currently locked on the channel.
        declared: ValueType,
        /// Type the caller tried to declare.
        requested: ValueType,
    },

    /// A value's shape does not match the channel's declared type.
    #[error("value for channel {channel} is {actual}, expected {expected}")]
    TypeMismatch {
        /// Channel name.
        channel: String,
        /// Declared type.
        expected: ValueType,
        /// Shape of the rejected value.
        actual: ValueType,
    },

    /// A different initial value is already recorded.
    #[error("different initialization for channel {channel}: {requested} but was {existing}")]
    ConflictingInitialValue {
        /// Channel name.
        channel: String,
        /// The initial value already recorded.
        existing: Value,
        /// The rejected initial value.
        requested: Value,
    },

    /// The input could not be coerced into any value shape.
    #[error("cannot convert value for channel {channel}: {source}")]
    ConversionFailure {
        /// Channel name.
        channel: String,
        /// Underlying coercion failure.
        #[source]
        source: CoercionError,
    },
}

impl ChannelError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::UnsupportedType { .. } => 1001,
            Self::TypeConflict { .. } => 1002,
            Self::TypeMismatch { .. } => 1003,
            Self::ConflictingInitialValue { .. } => 1004,
            Self::ConversionFailure { .. } => 1005,
        }
    }

    /// Returns the variant as a static snake_case label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedType { .. } => "unsupported_type",
            Self::TypeConflict { .. } => "type_conflict",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::ConflictingInitialValue { .. } => "conflicting_initial_value",
            Self::ConversionFailure { .. } => "conversion_failure",
        }
    }

    /// Name of the channel that rejected the operation.
    #[must_use]
    pub fn channel(&self) -> &str {
        match self {
            Self::UnsupportedType { channel, .. }
            | Self::TypeConflict { channel, .. }
            | Self::TypeMismatch { channel, .. }
            | Self::ConflictingInitialValue { channel, .. }
            | Self::ConversionFailure { channel, .. } => channel,
        }
    }
}
