//! The operand and register-reference types instructions are built from
//! before and after renaming.

use crate::bus::Value;
use crate::common::RobTag;

/// A reference to an architectural register, as written in source text.
/// `Pc` is kept distinct from the general registers because the ROB
/// corrects it directly on a branch misprediction instead of routing a
/// value through the common data bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegRef {
    General(usize),
    Pc,
}

/// A source operand after renaming: either a value already resolved from
/// the register file, or the tag of the producer it is still waiting on.
///
/// This replaces the Python `Instruction`'s practice of overwriting an
/// operand field in place with a tag and later with a value — the two
/// states are distinguished by the type system instead of by a runtime
/// "is this still a tag" check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Value(Value),
    Tag(RobTag),
}

impl Operand {
    /// Returns the resolved value, if this operand is no longer pending.
    pub fn value(self) -> Option<Value> {
        match self {
            Operand::Value(v) => Some(v),
            Operand::Tag(_) => None,
        }
    }

    /// Replaces this operand with `value` if it was pending on `tag`.
    /// Leaves it untouched otherwise. Mirrors the fan-out in the Python
    /// `receive(result)` methods, which scan every waiting instruction's
    /// source fields for a matching tag.
    pub fn resolve(&mut self, tag: RobTag, value: Value) {
        if *self == Operand::Tag(tag) {
            *self = Operand::Value(value);
        }
    }

    pub fn is_ready(self) -> bool {
        matches!(self, Operand::Value(_))
    }
}
