//! The register file and memory array: the simple, non-clocked storage
//! the back-end operates on. Neither participates in the two-phase
//! `operate`/`trigger` discipline — they are written directly by the ROB
//! (register file, at commit) and the load/store queue (memory, at
//! execution), the way the Python reference treats them as plain
//! collaborators rather than `Clocked` components.

pub mod memory;
pub mod register_file;

pub use memory::Memory;
pub use register_file::RegisterFile;
