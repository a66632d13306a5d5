//! The Common Data Bus: single-cycle broadcast of `(tag, value)` results.
//!
//! The Python reference wires the bus as a plain list of listeners that
//! register themselves and get a `receive(result)` callback. Rust has no
//! cheap equivalent of mutually-aliased listener references, so here the
//! bus carries no listener list of its own — it is just the set of results
//! produced this cycle. The [`Simulator`](crate::sim::simulator::Simulator)
//! is the sole owner of every [`Subscriber`] and fans each result out to
//! all of them by collecting disjoint `&mut dyn Subscriber` borrows for the
//! one cycle it needs them, which satisfies the listener-fan-out pattern
//! without any shared mutable aliasing.

use crate::common::RobTag;

/// A value carried on the bus or held in a register/memory cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Bool(bool),
}

impl Value {
    pub fn as_int(self) -> i64 {
        match self {
            Value::Int(v) => v,
            Value::Bool(b) => i64::from(b),
        }
    }

    pub fn as_bool(self) -> bool {
        match self {
            Value::Bool(b) => b,
            Value::Int(v) => v != 0,
        }
    }
}

/// A completed instruction's tag and its computed value, broadcast once on
/// the cycle it finishes execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultMsg {
    pub tag: RobTag,
    pub value: Value,
}

/// Implemented by every structure that holds operands pending on a tag:
/// the ROB (to fill in a committed value), the reservation station and
/// load/store queue (to fill in a waiting operand), and the register file
/// overlay is updated directly by the ROB at commit instead of through
/// this trait.
///
/// `receive` must only ever write into the subscriber's *future* state, per
/// the two-phase `operate`/`trigger` discipline every clocked component
/// follows — a result observed this cycle becomes visible to `operate()`
/// only after the next `trigger()`.
pub trait Subscriber {
    fn receive(&mut self, result: ResultMsg);
}

/// The set of results broadcast on one cycle. Built up during `operate()`
/// by each execution unit and the LSQ, then drained by the `Simulator`
/// into every subscriber before the cycle's `trigger()` phase.
#[derive(Debug, Default, Clone)]
pub struct CommonDataBus {
    pending: Vec<ResultMsg>,
}

impl CommonDataBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a result to be broadcast this cycle.
    pub fn publish(&mut self, result: ResultMsg) {
        self.pending.push(result);
    }

    /// Returns this cycle's broadcast results without clearing them.
    pub fn pending(&self) -> &[ResultMsg] {
        &self.pending
    }

    /// Clears the bus at the end of a cycle, after every subscriber has
    /// observed `pending()`.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_then_clear() {
        let mut bus = CommonDataBus::new();
        bus.publish(ResultMsg {
            tag: RobTag(3),
            value: Value::Int(42),
        });
        assert_eq!(bus.pending().len(), 1);
        bus.clear();
        assert!(bus.pending().is_empty());
    }

    #[test]
    fn value_coercions() {
        assert_eq!(Value::Bool(true).as_int(), 1);
        assert_eq!(Value::Bool(false).as_int(), 0);
        assert!(Value::Int(7).as_bool());
        assert!(!Value::Int(0).as_bool());
    }
}
