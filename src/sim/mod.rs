//! Wiring: the [`Simulator`](simulator::Simulator) that owns the whole
//! back-end and drives it one cycle at a time.

pub mod simulator;

pub use simulator::{CommittedState, SimError, Simulator, TickReport};
