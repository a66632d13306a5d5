//! The four cooperating back-end structures: the reorder buffer, the
//! reservation station, the load/store queue, and the pool of execution
//! units, plus the `Dispatch` wire format that connects them.

pub mod execution_unit;
pub mod flush_root;
pub mod load_store_queue;
pub mod reorder_buffer;
pub mod reservation_station;

pub use execution_unit::ExecutionUnit;
pub use flush_root::{FlushSink, PipelineFlushRoot};
pub use load_store_queue::{LoadStoreQueue, MemOp};
pub use reorder_buffer::{EntryKind, ReorderBuffer};
pub use reservation_station::{AluOp, ReservationStation};

/// A renamed instruction as handed from [`ReorderBuffer::feed`] to
/// whichever structure executes it: ALU and branch instructions go to the
/// reservation station, loads and stores go straight to the load/store
/// queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Alu(AluOp),
    Mem(MemOp),
}
