//! Cycle-accurate simulator of an out-of-order processor back-end.
//!
//! This crate implements the two-phase clocked state-update discipline and
//! the four cooperating structures that carry out out-of-order dispatch,
//! in-order commit, speculative-store holding, and pipeline-flush-on-
//! misprediction:
//! 1. **Clocked discipline:** the `operate()` / `trigger()` / `tick()` contract
//!    every back-end component implements (see [`clocked`]).
//! 2. **Reorder Buffer:** tag allocation, in-order retirement, misprediction
//!    detection (see [`backend::reorder_buffer`]).
//! 3. **Reservation Station:** capability-matched dispatch to execution units
//!    (see [`backend::reservation_station`]).
//! 4. **Load/Store Queue:** in-order memory access with speculative holdback
//!    (see [`backend::load_store_queue`]).
//! 5. **Common Data Bus:** single-cycle result broadcast (see [`bus`]).

/// Common types shared across the crate (tags, errors).
pub mod common;
/// Simulator configuration (capacities, widths, per-kind execution delays).
pub mod config;
/// The broadcast result bus and the subscriber contract.
pub mod bus;
/// The two-phase `operate`/`trigger`/`tick` contract and the `Clock`.
pub mod clocked;
/// Instruction set: decode, operand/tag model, and per-kind execution.
pub mod isa;
/// Register file and memory — the simple, non-clocked indexed stores.
pub mod state;
/// The four back-end structures: ROB, reservation station, LSQ, execution units.
pub mod backend;
/// Per-run statistics.
pub mod stats;
/// Wiring: the `Simulator` that owns and drives the whole back-end.
pub mod sim;

pub use crate::config::Config;
pub use crate::sim::simulator::Simulator;
