//! Single-slot, fixed-latency functional units.
//!
//! Grounded in the Python reference's `front_end/decode.py` delay-slot
//! pattern (a `current`/`current_timer`/`future`/`future_timer` quartet),
//! which is the one place in the reference that already implements exactly
//! the "accept work, hold it for `DELAY` cycles, then fire" shape every
//! execution unit in this back-end needs.

use crate::backend::AluOp;
use crate::bus::{CommonDataBus, ResultMsg};
use crate::common::InvariantViolation;
use crate::isa::instruction::Family;

/// A functional unit that accepts one [`AluOp`] at a time and, `delay`
/// cycles later, broadcasts its result on the common data bus.
#[derive(Debug, Clone)]
pub struct ExecutionUnit {
    family: Family,
    delay: u32,
    /// The operation currently occupying the unit, with cycles remaining.
    slot: Option<(AluOp, u32)>,
    /// Mirrors what `slot` will become after `trigger`; `Some` exactly
    /// when the unit cannot accept new work this cycle.
    staged: Option<(AluOp, u32)>,
}

impl ExecutionUnit {
    pub fn new(family: Family, delay: u32) -> Self {
        Self {
            family,
            delay,
            slot: None,
            staged: None,
        }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn accepts(&self, op: &AluOp) -> bool {
        op.kind.family() == self.family
    }

    pub fn full(&self) -> bool {
        self.staged.is_some()
    }

    pub fn feed(&mut self, op: AluOp) -> Result<(), InvariantViolation> {
        if self.full() {
            return Err(InvariantViolation::FeedIntoFull {
                structure: "ExecutionUnit",
                capacity: 1,
            });
        }
        self.staged = Some((op, self.delay.saturating_sub(1)));
        Ok(())
    }

    /// Fires the occupant whose countdown has reached zero, broadcasting
    /// its result. Reads only `slot` (this cycle's already-established
    /// state), never `staged`.
    pub fn operate(&mut self, bus: &mut CommonDataBus) {
        if let Some((op, 0)) = self.slot {
            let src1 = op.src1.value().expect("dispatched op must have resolved operands").as_int();
            let src2 = op.src2.value().expect("dispatched op must have resolved operands").as_int();
            bus.publish(ResultMsg {
                tag: op.tag,
                value: op.kind.execute(src1, src2),
            });
        }
    }

    /// Promotes `staged` into `slot`, then re-stages a decremented copy
    /// unless `slot` just fired, which frees the unit for the next `feed`.
    pub fn trigger(&mut self) {
        self.slot = self.staged.take();
        self.staged = match self.slot {
            Some((op, timer)) if timer > 0 => Some((op, timer - 1)),
            _ => None,
        };
    }

    /// Discards whatever the unit is holding, speculative or not.
    pub fn flush(&mut self) {
        self.slot = None;
        self.staged = None;
    }
}
