//! The instruction enum, its capability tags, and its arithmetic/branch
//! execution logic.
//!
//! The Python reference models capability matching with `inspect.getmro`
//! walking an `Instruction` subclass hierarchy (`SubI` is-a `ArithmeticI`
//! is-a `Instruction`) so an execution unit registered for the general
//! class picks up every specific subclass. A tagged-variant enum has no
//! class hierarchy to walk, so capability matching here is two flat enums:
//! [`Kind`] (the specific op) and [`Family`] (the general capability an
//! execution unit is built for), with [`RawInstruction::family`] doing the
//! walk in one step instead of an MRO traversal.

use crate::bus::Value;
use crate::isa::branch::BranchInfo;
use crate::isa::operand::RegRef;

/// The specific operation an instruction performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Add,
    Sub,
    Mul,
    AddI,
    SubI,
    MulI,
    Jump,
    Blth,
}

/// The capability family an execution unit is registered for. Load and
/// Store have no `Family`: they are executed exclusively by the load/store
/// queue (see [`crate::backend::load_store_queue`]), never dispatched to a
/// reservation-station execution unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Alu,
    Branch,
}

impl Kind {
    pub fn family(self) -> Family {
        match self {
            Kind::Add | Kind::Sub | Kind::Mul | Kind::AddI | Kind::SubI | Kind::MulI => Family::Alu,
            Kind::Jump | Kind::Blth => Family::Branch,
        }
    }

    /// Computes the result value from two already-resolved source values.
    /// Immediates are folded into `src2` by the caller before this runs, so
    /// `AddI`/`SubI`/`MulI` need no special case.
    pub fn execute(self, src1: i64, src2: i64) -> Value {
        match self {
            Kind::Add | Kind::AddI => Value::Int(src1 + src2),
            Kind::Sub | Kind::SubI => Value::Int(src1 - src2),
            Kind::Mul | Kind::MulI => Value::Int(src1 * src2),
            Kind::Jump => Value::Bool(true),
            Kind::Blth => Value::Bool(src1 < src2),
        }
    }
}

/// An instruction, with register references still unrenamed. Produced by
/// [`crate::isa::decode::decode`]; renamed into an `Operand`-bearing form
/// by `Rob::feed` before being handed to a reservation station or the LSQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInstruction {
    Add { rd: usize, r1: usize, r2: usize },
    Sub { rd: usize, r1: usize, r2: usize },
    Mul { rd: usize, r1: usize, r2: usize },
    AddI { rd: usize, r1: usize, imm: i64 },
    SubI { rd: usize, r1: usize, imm: i64 },
    MulI { rd: usize, r1: usize, imm: i64 },
    /// Loads `memory[register_file[base]]` into `rd`.
    Load { rd: usize, base: usize },
    /// Stores `register_file[value]` into `memory[register_file[base]]`.
    Store { base: usize, value: usize },
    Jump { target: i64 },
    Blth {
        r1: usize,
        r2: usize,
        target: i64,
        branch_info: BranchInfo,
    },
}

impl RawInstruction {
    pub fn kind(&self) -> Option<Kind> {
        match self {
            RawInstruction::Add { .. } => Some(Kind::Add),
            RawInstruction::Sub { .. } => Some(Kind::Sub),
            RawInstruction::Mul { .. } => Some(Kind::Mul),
            RawInstruction::AddI { .. } => Some(Kind::AddI),
            RawInstruction::SubI { .. } => Some(Kind::SubI),
            RawInstruction::MulI { .. } => Some(Kind::MulI),
            RawInstruction::Jump { .. } => Some(Kind::Jump),
            RawInstruction::Blth { .. } => Some(Kind::Blth),
            RawInstruction::Load { .. } | RawInstruction::Store { .. } => None,
        }
    }

    pub fn family(&self) -> Option<Family> {
        match self.kind()? {
            Kind::Add | Kind::Sub | Kind::Mul | Kind::AddI | Kind::SubI | Kind::MulI => {
                Some(Family::Alu)
            }
            Kind::Jump | Kind::Blth => Some(Family::Branch),
        }
    }

    pub fn is_memory_op(&self) -> bool {
        matches!(self, RawInstruction::Load { .. } | RawInstruction::Store { .. })
    }

    pub fn is_branch(&self) -> bool {
        matches!(self.family(), Some(Family::Branch))
    }

    /// The immediate operand folded into `src2` at rename time, for the
    /// three `*I` variants. `None` for every other variant, including the
    /// two-register arithmetic ops, which take both operands from the
    /// register file.
    pub fn immediate(&self) -> Option<i64> {
        match self {
            RawInstruction::AddI { imm, .. }
            | RawInstruction::SubI { imm, .. }
            | RawInstruction::MulI { imm, .. } => Some(*imm),
            _ => None,
        }
    }

    /// The architectural register this instruction writes, if any. Store,
    /// Jump, and Blth write no register (Blth only ever redirects `pc`).
    pub fn dest_register(&self) -> Option<usize> {
        match self {
            RawInstruction::Add { rd, .. }
            | RawInstruction::Sub { rd, .. }
            | RawInstruction::Mul { rd, .. }
            | RawInstruction::AddI { rd, .. }
            | RawInstruction::SubI { rd, .. }
            | RawInstruction::MulI { rd, .. }
            | RawInstruction::Load { rd, .. } => Some(*rd),
            RawInstruction::Store { .. } | RawInstruction::Jump { .. } | RawInstruction::Blth { .. } => {
                None
            }
        }
    }

    /// The source register references an execution unit or the LSQ needs
    /// resolved before this instruction can run, in a fixed two-slot shape
    /// (unused slots are `None`) so the ROB can rename them uniformly.
    pub fn source_registers(&self) -> [Option<RegRef>; 2] {
        match self {
            RawInstruction::Add { r1, r2, .. } | RawInstruction::Sub { r1, r2, .. } | RawInstruction::Mul { r1, r2, .. } => {
                [Some(RegRef::General(*r1)), Some(RegRef::General(*r2))]
            }
            RawInstruction::AddI { r1, .. } | RawInstruction::SubI { r1, .. } | RawInstruction::MulI { r1, .. } => {
                [Some(RegRef::General(*r1)), None]
            }
            RawInstruction::Load { base, .. } => [Some(RegRef::General(*base)), None],
            RawInstruction::Store { base, value } => {
                [Some(RegRef::General(*base)), Some(RegRef::General(*value))]
            }
            RawInstruction::Blth { r1, r2, .. } => [Some(RegRef::General(*r1)), Some(RegRef::General(*r2))],
            RawInstruction::Jump { .. } => [None, None],
        }
    }

    /// Executes an ALU or branch instruction given its two resolved source
    /// values (immediates are already folded into the variant). Must not be
    /// called on a `Load`/`Store`, which have no single result value of
    /// this shape — the LSQ computes their effect directly against memory.
    /// Attaches branch-prediction metadata to a `Blth`. No-op on every
    /// other variant. `decode` cannot fill this in itself — it has no
    /// notion of the current `pc` or the branch predictor's call — so the
    /// simulator's dispatch step calls this right before `Rob::feed`.
    pub fn with_branch_info(self, info: BranchInfo) -> Self {
        match self {
            RawInstruction::Blth { r1, r2, target, .. } => RawInstruction::Blth {
                r1,
                r2,
                target,
                branch_info: info,
            },
            other => other,
        }
    }

}
