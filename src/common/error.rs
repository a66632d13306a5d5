//! Error taxonomy: configuration, invariant violations, and decode errors.

use thiserror::Error;

/// Raised while constructing a [`crate::Config`] or a back-end structure from one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: i64 },

    #[error("{field} (width) must be at least 1, got {value}")]
    ZeroWidth { field: &'static str, value: usize },
}

/// Raised by a back-end structure when a caller violates one of its
/// capacity or ordering invariants. These are programmer errors: the
/// engine never retries internally, it surfaces the violation and lets
/// the driver (or a test) decide whether to abort.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("feed into full {structure} (capacity {capacity})")]
    FeedIntoFull {
        structure: &'static str,
        capacity: usize,
    },

    #[error("{structure} has no free tag: all {capacity} slots are live")]
    TagsExhausted {
        structure: &'static str,
        capacity: usize,
    },

    #[error("address {address} out of range for memory of size {size}")]
    AddressOutOfRange { address: i64, size: usize },

    #[error("register index {index} out of range for register file of size {size}")]
    RegisterOutOfRange { index: usize, size: usize },
}

/// Raised by [`crate::isa::decode`] on malformed input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown instruction {0:?}")]
    UnknownMnemonic(String),

    #[error("malformed operand list in {0:?}")]
    MalformedOperands(String),
}
