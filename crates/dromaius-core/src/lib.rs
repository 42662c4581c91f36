//! Discrete-event digital-logic simulation kernel.
//!
//! Dromaius simulates vintage microcomputer hardware at the gate
//! level: every chip is an independent active component that reads and
//! writes shared [`Signal`]s, advanced by a single global clock tick.
//! This crate is the kernel — the signal pool, the scheduler, the chip
//! contract and the simulator step loop — that a netlist of chips
//! (provided by `dromaius-chips` or a downstream device crate) runs on.

pub mod chip;
pub mod context;
pub mod group;
pub mod history;
pub mod scheduler;
pub mod signal;
pub mod testing;

mod simulator;

pub use chip::{Chip, ChipId, DependencyContext, SignalContext};
pub use group::SignalGroup;
pub use history::SignalHistory;
pub use signal::{Signal, SignalPool};
pub use simulator::Simulator;

/// A discrete point in virtual time: an integer multiple of the
/// simulator's `tick_duration_ps`. See spec §3, §6.
pub type Tick = i64;
