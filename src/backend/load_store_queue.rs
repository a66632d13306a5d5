//! In-order memory access with speculative-store holdback.
//!
//! Grounded in `examples/original_source/test/back_end/test_load_store_queue.py`,
//! read alongside spec section 4.4's `PENDING_OPERANDS -> READY ->
//! EXECUTING(delay) -> COMPLETED` state machine: loads and stores execute
//! strictly in program order (one entry active at a time, at the head of
//! the queue), and a speculative store still runs its delay countdown and
//! reaches COMPLETED — broadcasting so the reorder buffer can mark it
//! ready to retire — but its memory *write* parks until
//! [`LoadStoreQueue::speculative_execution_off`] releases it.

use std::collections::VecDeque;

use tracing::trace;

use crate::backend::flush_root::FlushSink;
use crate::bus::{CommonDataBus, ResultMsg};
use crate::common::{InvariantViolation, RobTag, SeqId};
use crate::isa::operand::Operand;
use crate::state::Memory;

/// A renamed memory instruction, dispatched by `ReorderBuffer::feed` to
/// the load/store queue. `seq_id` is assigned by
/// [`LoadStoreQueue::feed`], not by the caller — pass `SeqId::default()`
/// and use the returned id to address this entry later (e.g. for
/// `speculative_execution_off`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemOp {
    Load {
        tag: RobTag,
        seq_id: SeqId,
        dest: usize,
        base: Operand,
    },
    Store {
        tag: RobTag,
        seq_id: SeqId,
        base: Operand,
        value: Operand,
        speculative: bool,
    },
}

impl MemOp {
    pub fn tag(&self) -> RobTag {
        match *self {
            MemOp::Load { tag, .. } | MemOp::Store { tag, .. } => tag,
        }
    }

    pub fn seq_id(&self) -> SeqId {
        match *self {
            MemOp::Load { seq_id, .. } | MemOp::Store { seq_id, .. } => seq_id,
        }
    }

    fn with_seq_id(self, seq_id: SeqId) -> Self {
        match self {
            MemOp::Load { tag, dest, base, .. } => MemOp::Load { tag, seq_id, dest, base },
            MemOp::Store { tag, base, value, speculative, .. } => {
                MemOp::Store { tag, seq_id, base, value, speculative }
            }
        }
    }
}

#[derive(Debug)]
struct Entry {
    op: MemOp,
    /// `None` until this entry is at the head and its operands have
    /// resolved; counts down to 0 once started, firing the cycle `operate`
    /// observes it at 0.
    timer: Option<u32>,
    /// Set the cycle this entry first reaches a fired timer. For a load,
    /// or a non-speculative store, completion and retirement happen in the
    /// same cycle. For a speculative store, `operate` broadcasts its
    /// readiness exactly once (on the transition to `completed`) and then
    /// parks the entry — still at the head, still un-popped — until
    /// [`LoadStoreQueue::speculative_execution_off`] performs the held-back
    /// write.
    completed: bool,
}

/// FIFO queue of in-flight loads and stores.
#[derive(Debug)]
pub struct LoadStoreQueue {
    capacity: usize,
    delay: u32,
    entries: VecDeque<Entry>,
    next_seq: u64,
}

impl LoadStoreQueue {
    pub fn new(capacity: usize, delay: u32) -> Self {
        Self {
            capacity,
            delay,
            entries: VecDeque::with_capacity(capacity),
            next_seq: 0,
        }
    }

    pub fn full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn feed(&mut self, op: MemOp) -> Result<SeqId, InvariantViolation> {
        if self.full() {
            return Err(InvariantViolation::FeedIntoFull {
                structure: "LoadStoreQueue",
                capacity: self.capacity,
            });
        }
        let seq_id = SeqId(self.next_seq);
        self.next_seq += 1;
        self.entries.push_back(Entry {
            op: op.with_seq_id(seq_id),
            timer: None,
            completed: false,
        });
        Ok(seq_id)
    }

    /// Whether an entry's timer may start: operand readiness only. A
    /// speculative store still executes — only its memory write is held
    /// back, in `operate`/`speculative_execution_off` — so `speculative`
    /// plays no part here.
    fn ready(op: &MemOp) -> bool {
        match op {
            MemOp::Load { base, .. } => base.is_ready(),
            MemOp::Store { base, value, .. } => base.is_ready() && value.is_ready(),
        }
    }

    /// An entry may leave the queue once it has nothing left to do: a load
    /// always, once fired; a store once it has completed *and* its write
    /// is no longer being held back.
    fn finished(op: &MemOp, completed: bool) -> bool {
        match op {
            MemOp::Load { .. } => true,
            MemOp::Store { speculative, .. } => completed && !*speculative,
        }
    }

    /// Releases the speculative hold on the entry with this `seq_id` and
    /// performs its held-back memory write immediately. Called by the ROB
    /// when the entry's owning store retires (i.e. every older
    /// instruction, including any branch, has itself already retired
    /// without a flush) — by then the store has necessarily already
    /// reached `COMPLETED`, so its address and value operands are
    /// resolved.
    pub fn speculative_execution_off(&mut self, seq_id: SeqId, memory: &mut Memory) -> Result<(), InvariantViolation> {
        for entry in &mut self.entries {
            if entry.op.seq_id() != seq_id {
                continue;
            }
            let MemOp::Store { tag, base, value, speculative, .. } = &mut entry.op else {
                break;
            };
            if *speculative {
                let addr = base.value().expect("released store has resolved operands").as_int();
                let val = value.value().expect("released store has resolved operands");
                memory.write(addr, val)?;
                trace!(tag = tag.0, addr, "speculative store released and committed");
                *speculative = false;
            }
            break;
        }
        Ok(())
    }

    /// Fires the head entry the cycle its countdown first reaches zero:
    /// loads read memory and broadcast the value; a non-speculative store
    /// writes memory and broadcasts its own tag so the ROB can mark the
    /// entry ready to retire. A *speculative* store broadcasts the same
    /// readiness signal — without writing memory — and then parks,
    /// completed, until [`LoadStoreQueue::speculative_execution_off`]
    /// performs the write.
    pub fn operate(&mut self, memory: &mut Memory, bus: &mut CommonDataBus) -> Result<(), InvariantViolation> {
        let Some(front) = self.entries.front() else {
            return Ok(());
        };
        if front.timer != Some(0) || front.completed {
            return Ok(());
        }
        match front.op {
            MemOp::Load { tag, base, .. } => {
                let addr = base.value().expect("head entry is ready").as_int();
                let value = memory.read(addr)?;
                trace!(tag = tag.0, addr, "load committed");
                bus.publish(ResultMsg { tag, value });
            }
            MemOp::Store { tag, base, value, speculative, .. } => {
                let addr = base.value().expect("head entry is ready").as_int();
                let value = value.value().expect("head entry is ready");
                if speculative {
                    trace!(tag = tag.0, "speculative store completed, parking write");
                } else {
                    memory.write(addr, value)?;
                    trace!(tag = tag.0, addr, "store committed");
                }
                bus.publish(ResultMsg { tag, value });
            }
        }
        self.entries
            .front_mut()
            .expect("checked non-empty above")
            .completed = true;
        Ok(())
    }

    /// Pops the head entry once it has nothing left to do, decrements its
    /// timer otherwise, and starts the new head's countdown once it is
    /// ready.
    pub fn trigger(&mut self) {
        let fired = matches!(
            self.entries.front(),
            Some(e) if e.timer == Some(0) && Self::finished(&e.op, e.completed)
        );
        if fired {
            self.entries.pop_front();
        } else if let Some(front) = self.entries.front_mut() {
            if let Some(t) = front.timer {
                front.timer = Some(t.saturating_sub(1));
            }
        }

        if let Some(front) = self.entries.front_mut() {
            if front.timer.is_none() && Self::ready(&front.op) {
                front.timer = Some(self.delay.saturating_sub(1));
            }
        }
    }

    /// Resolves any waiting operand pending on `result.tag`, in any entry.
    pub fn receive(&mut self, result: ResultMsg) {
        for entry in &mut self.entries {
            match &mut entry.op {
                MemOp::Load { base, .. } => base.resolve(result.tag, result.value),
                MemOp::Store { base, value, .. } => {
                    base.resolve(result.tag, result.value);
                    value.resolve(result.tag, result.value);
                }
            }
        }
    }
}

impl FlushSink for LoadStoreQueue {
    /// Drops every speculative entry, keeping only a store already released
    /// by [`LoadStoreQueue::speculative_execution_off`] but not yet written
    /// (architecturally committed, just still waiting its turn in the FIFO).
    ///
    /// Filtering by tag order would be wrong here even ignoring `RobTag`
    /// wraparound: a released store can sit behind other entries for
    /// several cycles after the ROB has already retired it, so "older than
    /// the mispredicting branch" and "already released" are not the same
    /// test — only the entry's own `speculative` flag tells them apart. A
    /// load never survives to this point non-speculatively: its result
    /// broadcast and its pop from the queue happen in the same cycle as the
    /// ROB retirement that would have cleared it, so any load still queued
    /// when a flush fires is always junior to the mispredicting branch.
    fn flush_after(&mut self, _keep: RobTag) {
        self.entries
            .retain(|e| matches!(e.op, MemOp::Store { speculative: false, .. }));
    }

    fn flush_all(&mut self) {
        self.entries.clear();
    }
}
