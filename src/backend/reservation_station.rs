//! Capability-matched dispatch from a pool of waiting instructions to a
//! pool of execution units.
//!
//! Grounded in the Python reference's `back_end/reservation_station.py`:
//! a `current_buffer`/`future_buffer` pair of waiting instructions, a
//! `register(execution_unit)` call that groups units by the capability
//! they accept, and an `operate()` dispatch loop bounded by `width`. The
//! reference's capability lookup walks `inspect.getmro` over an
//! `Instruction` subclass chain; here `Kind::family` already reduces that
//! walk to a single enum comparison (see [`crate::isa::instruction`]).

use tracing::trace;

use crate::backend::execution_unit::ExecutionUnit;
use crate::backend::flush_root::FlushSink;
use crate::bus::ResultMsg;
use crate::common::{InvariantViolation, RobTag};
use crate::isa::instruction::Kind;
use crate::isa::operand::Operand;

/// A renamed ALU or branch instruction, dispatched by `ReorderBuffer::feed`
/// and waiting in the reservation station for its operands and a free
/// execution unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluOp {
    pub tag: RobTag,
    pub kind: Kind,
    pub src1: Operand,
    pub src2: Operand,
    /// The architectural destination register, if any (`None` for `Jump`
    /// and `Blth`, which only ever redirect `pc`).
    pub dest: Option<usize>,
}

impl AluOp {
    pub fn is_ready(&self) -> bool {
        self.src1.is_ready() && self.src2.is_ready()
    }
}

/// Holds instructions whose operands are still being awaited, dispatching
/// each to a matching, free [`ExecutionUnit`] as soon as both operands
/// resolve and a slot is free.
#[derive(Debug, Clone)]
pub struct ReservationStation {
    capacity: usize,
    width: usize,
    current: Vec<AluOp>,
    future: Vec<AluOp>,
}

impl ReservationStation {
    pub fn new(capacity: usize, width: usize) -> Self {
        Self {
            capacity,
            width,
            current: Vec::with_capacity(capacity),
            future: Vec::with_capacity(capacity),
        }
    }

    pub fn full(&self) -> bool {
        self.future.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.future.len()
    }

    pub fn is_empty(&self) -> bool {
        self.future.is_empty()
    }

    /// Entries waiting in `current` for this cycle's `operate` to dispatch,
    /// for tests that check dispatch-width and unit-capacity bounds.
    pub fn current_len(&self) -> usize {
        self.current.len()
    }

    pub fn feed(&mut self, op: AluOp) -> Result<(), InvariantViolation> {
        if self.full() {
            return Err(InvariantViolation::FeedIntoFull {
                structure: "ReservationStation",
                capacity: self.capacity,
            });
        }
        self.future.push(op);
        Ok(())
    }

    /// Dispatches up to `width` ready instructions from `current` to a
    /// free, capability-matched unit in `units`, in FIFO order. Dispatched
    /// instructions are removed from `future` so they do not survive into
    /// next cycle's `current`.
    pub fn operate(&mut self, units: &mut [ExecutionUnit]) {
        let mut dispatched = 0usize;
        let mut remaining = Vec::with_capacity(self.current.len());

        for op in self.current.drain(..) {
            if dispatched < self.width && op.is_ready() {
                if let Some(unit) = units.iter_mut().find(|u| !u.full() && u.accepts(&op)) {
                    unit.feed(op).expect("unit was just checked free");
                    dispatched += 1;
                    trace!(tag = op.tag.0, kind = ?op.kind, "dispatched to execution unit");
                    self.future.retain(|f| f.tag != op.tag);
                    continue;
                }
            }
            remaining.push(op);
        }

        self.current = remaining;
    }

    pub fn trigger(&mut self) {
        self.current = self.future.clone();
    }

    /// Resolves any waiting operand pending on `result.tag`.
    pub fn receive(&mut self, result: ResultMsg) {
        for op in &mut self.future {
            op.src1.resolve(result.tag, result.value);
            op.src2.resolve(result.tag, result.value);
        }
    }
}

impl FlushSink for ReservationStation {
    /// An entry only ever leaves the reservation station by being
    /// dispatched to an execution unit, which happens strictly before that
    /// entry's result is broadcast. The ROB can only retire an entry whose
    /// result has already been broadcast, and retirement is in order — so
    /// by the time a misprediction reaches retirement, every entry still
    /// resident here is necessarily younger than the mispredicting branch,
    /// never an older survivor. `flush_after` therefore discards everything,
    /// same as `flush_all`; `keep` is accepted only to satisfy the trait.
    fn flush_after(&mut self, _keep: RobTag) {
        self.flush_all();
    }

    fn flush_all(&mut self) {
        self.future.clear();
        self.current.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Value;
    use crate::isa::instruction::Family;

    fn ready_op(tag: usize) -> AluOp {
        AluOp {
            tag: RobTag(tag),
            kind: Kind::Add,
            src1: Operand::Value(Value::Int(1)),
            src2: Operand::Value(Value::Int(2)),
            dest: Some(0),
        }
    }

    #[test]
    fn feed_then_full() {
        let mut rs = ReservationStation::new(1, 1);
        rs.feed(ready_op(0)).unwrap();
        assert!(rs.full());
        assert!(rs.feed(ready_op(1)).is_err());
    }

    #[test]
    fn dispatches_ready_op_to_matching_unit() {
        let mut rs = ReservationStation::new(4, 4);
        rs.feed(ready_op(0)).unwrap();
        rs.trigger();

        let mut units = vec![ExecutionUnit::new(Family::Alu, 1)];
        rs.operate(&mut units);

        assert!(units[0].full());
        assert!(rs.current.is_empty());
    }

    #[test]
    fn pending_op_waits_until_operand_resolves() {
        let mut rs = ReservationStation::new(4, 4);
        let waiting = AluOp {
            tag: RobTag(0),
            kind: Kind::Add,
            src1: Operand::Tag(RobTag(5)),
            src2: Operand::Value(Value::Int(2)),
            dest: Some(0),
        };
        rs.feed(waiting).unwrap();
        rs.trigger();

        let mut units = vec![ExecutionUnit::new(Family::Alu, 1)];
        rs.operate(&mut units);
        assert!(!units[0].full());
        assert_eq!(rs.current.len(), 1);

        rs.receive(ResultMsg {
            tag: RobTag(5),
            value: Value::Int(9),
        });
        rs.trigger();
        rs.operate(&mut units);
        assert!(units[0].full());
    }

    #[test]
    fn flush_after_discards_every_entry_regardless_of_keep_tag() {
        let mut rs = ReservationStation::new(4, 4);
        rs.feed(ready_op(0)).unwrap();
        rs.feed(ready_op(1)).unwrap();
        rs.trigger();

        rs.flush_after(RobTag(0));

        assert!(rs.is_empty());
        assert!(rs.current.is_empty());
    }
}
