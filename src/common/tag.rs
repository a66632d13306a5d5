//! Rename tags and load/store sequence ids.

/// Unique tag identifying an in-flight instruction in the ROB.
///
/// Implemented as the instruction's slot index in the ROB's ring buffer:
/// since the ROB never holds more than `capacity` live instructions, the
/// slot index alone is already "a monotonically increasing integer modulo
/// ROB capacity" with at most `capacity` tags live at once, so no separate
/// counter is needed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct RobTag(pub usize);

/// Unique, monotonically increasing id for an LSQ entry's issue order.
///
/// Unlike [`RobTag`], this is never reused: the LSQ is a FIFO drained from
/// the front, and `seq_id` exists purely to let `ReorderBuffer` reference a
/// specific LSQ entry (e.g. for `speculative_execution_off`) without caring
/// about the entry's current position in the queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct SeqId(pub u64);
