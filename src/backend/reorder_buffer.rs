//! The Reorder Buffer: tag allocation, register renaming, in-order
//! retirement, and misprediction detection.
//!
//! Grounded in `examples/willmccallion-rvsim/crates/hardware/src/core/pipeline/rob.rs`
//! for the ring-buffer shape (`entries`/`head`/`tail`/`count`), and in
//! `examples/original_source/test/back_end/test_reorder_buffer.py` for
//! retirement and misprediction semantics — in particular
//! `test_conditional_instructions_incorrect_prediction_no_commit`, which
//! settles the corrected-`pc` question: on a mispredict, `pc` becomes the
//! branch's own `target` operand when the actual outcome was taken, or
//! `pc_at_dispatch + 1` when it was not, never the `BranchInfo`'s own
//! `actual_target_if_mispredict` field (see [`crate::isa::branch::BranchInfo`]).

use tracing::{debug, trace};

use crate::backend::flush_root::PipelineFlushRoot;
use crate::backend::{AluOp, Dispatch, LoadStoreQueue, MemOp};
use crate::bus::{ResultMsg, Subscriber, Value};
use crate::common::{InvariantViolation, RobTag, SeqId};
use crate::isa::branch::BranchInfo;
use crate::isa::instruction::RawInstruction;
use crate::isa::operand::{Operand, RegRef};
use crate::state::{Memory, RegisterFile};

/// The family of operation a ROB entry represents. Carried alongside the
/// entry itself (per spec's ROB Entry shape) so a retiring tag can be
/// attributed to the right `Stats` counter without re-deriving it from the
/// dispatch payload, which is long gone from the RS/LSQ by retire time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Alu,
    Load,
    Store,
    Branch,
}

#[derive(Debug, Clone)]
struct RobEntry {
    valid: bool,
    dest: Option<RegRef>,
    value: Option<Value>,
    ready: bool,
    kind: EntryKind,
    branch_info: Option<BranchInfo>,
    branch_target: i64,
    mem_seq_id: Option<SeqId>,
}

impl RobEntry {
    fn empty() -> Self {
        Self {
            valid: false,
            dest: None,
            value: None,
            ready: false,
            kind: EntryKind::Alu,
            branch_info: None,
            branch_target: 0,
            mem_seq_id: None,
        }
    }
}

/// A branch misprediction discovered at retirement: every entry issued
/// after `keep_tag` must be discarded from the ROB, reservation station,
/// and load/store queue, and fetch must resume at `corrected_pc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushEvent {
    pub keep_tag: RobTag,
    pub corrected_pc: i64,
}

/// The outcome of one cycle's retirement pass.
#[derive(Debug, Clone, Default)]
pub struct RetireOutcome {
    pub retired: Vec<(RobTag, EntryKind)>,
    pub flush: Option<FlushEvent>,
}

/// Ring buffer of in-flight instructions, indexed directly by tag (the
/// tag *is* the slot index — see [`crate::common::tag::RobTag`]).
pub struct ReorderBuffer {
    entries: Vec<RobEntry>,
    head: usize,
    tail: usize,
    count: usize,
    capacity: usize,
    width: usize,
    /// Count of live (unretired) `Branch`-kind entries between `head` and
    /// `tail`. A store fed while this is nonzero lies in the shadow of an
    /// unresolved branch and is dispatched speculative; see `feed`.
    live_branches: usize,
    /// The upstream collaborator (fetch/decode, out of scope for this
    /// crate) to notify on a misprediction, per spec.md §6's
    /// `set_pipeline_flush_root()` binding. `None` until wired.
    flush_root: Option<Box<dyn PipelineFlushRoot>>,
}

impl std::fmt::Debug for ReorderBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReorderBuffer")
            .field("entries", &self.entries)
            .field("head", &self.head)
            .field("tail", &self.tail)
            .field("count", &self.count)
            .field("capacity", &self.capacity)
            .field("width", &self.width)
            .field("live_branches", &self.live_branches)
            .field("flush_root", &self.flush_root.is_some())
            .finish()
    }
}

impl ReorderBuffer {
    pub fn new(capacity: usize, width: usize) -> Self {
        Self {
            entries: vec![RobEntry::empty(); capacity],
            head: 0,
            tail: 0,
            count: 0,
            capacity,
            width,
            live_branches: 0,
            flush_root: None,
        }
    }

    /// Binds the upstream collaborator notified on every misprediction
    /// flush. Replaces any previously bound root.
    pub fn set_pipeline_flush_root(&mut self, root: Box<dyn PipelineFlushRoot>) {
        self.flush_root = Some(root);
    }

    pub fn is_full(&self) -> bool {
        self.count == self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn len(&self) -> usize {
        self.count
    }

    fn rename(reg: Option<RegRef>, register_file: &RegisterFile) -> Result<Operand, InvariantViolation> {
        match reg {
            None => Ok(Operand::Value(Value::Int(0))),
            Some(r) => register_file.read(r),
        }
    }

    /// Allocates a tag, renames source registers against `register_file`'s
    /// current pending-tag overlay, marks the destination register (if
    /// any) pending on the new tag, and returns the tag plus the renamed
    /// instruction ready to hand to a reservation station or the LSQ.
    ///
    /// For a `Store`, the returned `Dispatch::Mem` carries a placeholder
    /// `seq_id`; the real one comes back from `LoadStoreQueue::feed`, and
    /// must be recorded with [`ReorderBuffer::record_mem_seq_id`] so
    /// commit can release the store's speculative hold.
    pub fn feed(
        &mut self,
        instr: RawInstruction,
        register_file: &mut RegisterFile,
        pc_at_dispatch: i64,
    ) -> Result<(RobTag, Dispatch), InvariantViolation> {
        if self.is_full() {
            // The ROB's tag space *is* its ring buffer: unlike the RS or
            // LSQ, a full ROB means there is no free tag to hand out, not
            // merely no free slot, so this is `TagsExhausted` rather than
            // the generic `FeedIntoFull` the other structures raise.
            return Err(InvariantViolation::TagsExhausted {
                structure: "ReorderBuffer",
                capacity: self.capacity,
            });
        }

        let tag = RobTag(self.tail);
        let dest = instr.dest_register().map(RegRef::General);
        let [s1, s2] = instr.source_registers();
        let src1 = Self::rename(s1, register_file)?;
        // The `*I` variants carry their immediate outside `source_registers`
        // (their second slot is `None`): fold it into `src2` here, at rename
        // time, so `Kind::execute` can treat every ALU op uniformly as
        // `(src1, src2)` without a separate immediate case.
        let src2 = match instr.immediate() {
            Some(imm) => Operand::Value(Value::Int(imm)),
            None => Self::rename(s2, register_file)?,
        };

        // A store lies in the shadow of an unresolved branch — and so must
        // hold back its memory write until that branch retires — exactly
        // when an older, still-live `Branch`-kind entry precedes it.
        let store_speculative = self.live_branches > 0;

        let dispatch = match instr {
            RawInstruction::Load { rd, .. } => Dispatch::Mem(MemOp::Load {
                tag,
                seq_id: SeqId::default(),
                dest: rd,
                base: src1,
            }),
            RawInstruction::Store { .. } => Dispatch::Mem(MemOp::Store {
                tag,
                seq_id: SeqId::default(),
                base: src1,
                value: src2,
                speculative: store_speculative,
            }),
            _ => Dispatch::Alu(AluOp {
                tag,
                kind: instr.kind().expect("non-memory instruction always has a Kind"),
                src1,
                src2,
                dest: instr.dest_register(),
            }),
        };

        let (kind, branch_info, branch_target) = match instr {
            RawInstruction::Blth { target, branch_info, .. } => (EntryKind::Branch, Some(branch_info), target),
            RawInstruction::Jump { target } => (
                EntryKind::Branch,
                Some(BranchInfo::new(true, 0, pc_at_dispatch)),
                target,
            ),
            RawInstruction::Load { .. } => (EntryKind::Load, None, 0),
            RawInstruction::Store { .. } => (EntryKind::Store, None, 0),
            _ => (EntryKind::Alu, None, 0),
        };

        self.entries[tag.0] = RobEntry {
            valid: true,
            dest,
            value: None,
            ready: false,
            kind,
            branch_info,
            branch_target,
            mem_seq_id: None,
        };

        if let Some(reg) = dest {
            register_file.set_pending(reg, tag)?;
        }

        if kind == EntryKind::Branch {
            self.live_branches += 1;
        }

        self.tail = (self.tail + 1) % self.capacity;
        self.count += 1;
        Ok((tag, dispatch))
    }

    /// Records the real LSQ sequence id for a store dispatched by `feed`.
    pub fn record_mem_seq_id(&mut self, tag: RobTag, seq_id: SeqId) {
        self.entries[tag.0].mem_seq_id = Some(seq_id);
    }

    /// Retires up to `width` entries from the head, in order, stopping at
    /// the first entry that is invalid, not yet ready, or once a
    /// misprediction is found (nothing after a flushed branch can retire
    /// this cycle, since it no longer architecturally exists).
    ///
    /// A retiring store's `speculative_execution_off` release happens
    /// here, in program order — exactly the point at which every older
    /// instruction, including any branch it was shadowed by, has itself
    /// already retired without a flush.
    pub fn retire(
        &mut self,
        register_file: &mut RegisterFile,
        lsq: &mut LoadStoreQueue,
        memory: &mut Memory,
    ) -> Result<RetireOutcome, InvariantViolation> {
        let mut retired = Vec::new();
        let mut flush = None;

        for _ in 0..self.width {
            if self.count == 0 {
                break;
            }
            let head_tag = RobTag(self.head);
            let entry = self.entries[self.head].clone();
            if !entry.valid || !entry.ready {
                break;
            }

            if let (Some(dest), Some(value)) = (entry.dest, entry.value) {
                register_file
                    .commit(dest, value, head_tag)
                    .expect("dest register index was validated at feed time");
            }

            if entry.kind == EntryKind::Branch {
                self.live_branches = self.live_branches.saturating_sub(1);

                let actual_taken = entry
                    .value
                    .expect("a ready branch entry always has its outcome")
                    .as_bool();
                let info = entry
                    .branch_info
                    .expect("every branch entry carries BranchInfo");
                if info.mispredicted(actual_taken) {
                    let corrected_pc = if actual_taken {
                        entry.branch_target
                    } else {
                        info.fallthrough_pc()
                    };
                    flush = Some(FlushEvent { keep_tag: head_tag, corrected_pc });
                }
            }

            if let Some(seq_id) = entry.mem_seq_id {
                lsq.speculative_execution_off(seq_id, memory)?;
            }

            trace!(tag = head_tag.0, kind = ?entry.kind, "retiring");
            retired.push((head_tag, entry.kind));
            self.entries[self.head] = RobEntry::empty();
            self.head = (self.head + 1) % self.capacity;
            self.count -= 1;

            if let Some(event) = flush {
                debug!(keep_tag = event.keep_tag.0, corrected_pc = event.corrected_pc, "misprediction detected");
                self.flush_after(event.keep_tag);
                if let Some(root) = &mut self.flush_root {
                    root.flush();
                }
                break;
            }
        }

        Ok(RetireOutcome { retired, flush })
    }

    /// Discards every entry issued after `keep` (which has already
    /// retired by the time this is called from `retire`).
    fn flush_after(&mut self, keep: RobTag) {
        let new_tail = (keep.0 + 1) % self.capacity;
        let mut idx = new_tail;
        while idx != self.tail {
            if self.entries[idx].valid && self.entries[idx].kind == EntryKind::Branch {
                self.live_branches = self.live_branches.saturating_sub(1);
            }
            self.entries[idx] = RobEntry::empty();
            idx = (idx + 1) % self.capacity;
        }
        self.tail = new_tail;
        self.count = if self.tail >= self.head {
            self.tail - self.head
        } else {
            self.tail + self.capacity - self.head
        };
    }
}

impl Subscriber for ReorderBuffer {
    fn receive(&mut self, result: ResultMsg) {
        let entry = &mut self.entries[result.tag.0];
        if entry.valid {
            entry.value = Some(result.value);
            entry.ready = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::instruction::Kind;

    fn alu_instr() -> RawInstruction {
        RawInstruction::Add { rd: 1, r1: 2, r2: 3 }
    }

    #[test]
    fn allocate_and_retire_single_instruction() {
        let mut rob = ReorderBuffer::new(4, 1);
        let mut rf = RegisterFile::new(8);
        let (tag, dispatch) = rob.feed(alu_instr(), &mut rf, 0).unwrap();
        assert_eq!(tag, RobTag(0));
        assert!(matches!(dispatch, Dispatch::Alu(AluOp { kind: Kind::Add, .. })));
        assert_eq!(rf.read(RegRef::General(1)).unwrap(), Operand::Tag(tag));

        rob.receive(ResultMsg { tag, value: Value::Int(5) });

        let mut lsq = LoadStoreQueue::new(1, 1);
        let mut memory = Memory::new(1);
        let outcome = rob.retire(&mut rf, &mut lsq, &mut memory).unwrap();
        assert_eq!(outcome.retired, vec![(tag, EntryKind::Alu)]);
        assert!(outcome.flush.is_none());
        assert_eq!(rf.read(RegRef::General(1)).unwrap(), Operand::Value(Value::Int(5)));
        assert!(rob.is_empty());
    }

    #[test]
    fn full_rob_rejects_feed() {
        let mut rob = ReorderBuffer::new(1, 1);
        let mut rf = RegisterFile::new(4);
        rob.feed(alu_instr(), &mut rf, 0).unwrap();
        assert!(rob.feed(alu_instr(), &mut rf, 1).is_err());
    }

    #[test]
    fn correct_prediction_commits_without_flush() {
        let mut rob = ReorderBuffer::new(4, 1);
        let mut rf = RegisterFile::new(8);
        let blth = RawInstruction::Blth {
            r1: 4,
            r2: 5,
            target: 2,
            branch_info: BranchInfo::new(false, 2, 2),
        };
        let (tag, _) = rob.feed(blth, &mut rf, 2).unwrap();
        rob.receive(ResultMsg { tag, value: Value::Bool(false) });

        let mut lsq = LoadStoreQueue::new(1, 1);
        let mut memory = Memory::new(1);
        let outcome = rob.retire(&mut rf, &mut lsq, &mut memory).unwrap();
        assert!(outcome.flush.is_none());
        assert_eq!(rf.pc(), 0);
    }

    #[test]
    fn mispredicted_taken_branch_corrects_pc_to_its_own_target() {
        let mut rob = ReorderBuffer::new(4, 1);
        let mut rf = RegisterFile::new(8);
        let blth = RawInstruction::Blth {
            r1: 4,
            r2: 5,
            target: 100,
            branch_info: BranchInfo::new(false, 1, 1),
        };
        let (tag, _) = rob.feed(blth, &mut rf, 1).unwrap();
        rob.receive(ResultMsg { tag, value: Value::Bool(true) });

        let mut lsq = LoadStoreQueue::new(1, 1);
        let mut memory = Memory::new(1);
        let outcome = rob.retire(&mut rf, &mut lsq, &mut memory).unwrap();
        let flush = outcome.flush.expect("mismatch between predicted and actual outcome must flush");
        assert_eq!(flush.corrected_pc, 100);
        assert!(rob.is_empty());
    }

    #[test]
    fn immediate_variant_folds_imm_into_src2() {
        let mut rob = ReorderBuffer::new(4, 1);
        let mut rf = RegisterFile::new(8);
        let (_, dispatch) = rob
            .feed(RawInstruction::AddI { rd: 1, r1: 2, imm: 5 }, &mut rf, 0)
            .unwrap();
        let Dispatch::Alu(op) = dispatch else { panic!("expected an ALU dispatch") };
        assert_eq!(op.src2, Operand::Value(Value::Int(5)));
    }
}
