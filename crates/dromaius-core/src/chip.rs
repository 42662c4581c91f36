//! The chip trait and the small amount of state every registered chip
//! carries in the simulator (id, name, storage slot).

use crate::signal::{Signal, SignalPool};
use crate::Tick;

/// Identifies a chip within a single [`crate::Simulator`].
///
/// Chip ids are assigned sequentially starting at zero as chips are
/// registered and fit in six bits: a simulator holds at most 64 chips
/// because dirty/writer/dependency sets are all `u64` bitmasks.
pub type ChipId = u8;

/// Maximum number of chips a single simulator can hold (dirty sets are
/// `u64` bitmasks, one bit per chip).
pub const MAX_CHIPS: usize = 64;

/// A chip is an independent active component that reads electrical
/// signals and writes new ones, advancing the clock tick it was invoked
/// for. Every chip family in the simulation (gates, flip-flops, counters,
/// RAM/ROM, VIAs, CPUs, ...) implements this trait.
///
/// `process` is called by the simulator whenever the chip is dirty: one
/// of its registered dependency signals changed on the previous tick, or
/// the scheduler fired a wake-up previously requested by this chip.
/// Implementations must:
///  - read only *current* values from the [`SignalContext`] (never a
///    next-slot value left over from this same pass);
///  - write outputs via [`SignalContext::write`] or release them via
///    [`SignalContext::clear_writer`];
///  - be safe to invoke twice within the same timestep without changing
///    behavior (the high-impedance reconciliation pass may re-run a
///    chip that shares a signal with one that just released it);
///  - never reach into another chip's state.
///
/// Returning `Some(tick)` from `process` requests a wake-up at that
/// absolute tick (the simulator forwards it to the scheduler); this
/// replaces the C original's mutable `schedule_timestamp` chip field
/// with a plain return value, which needs no extra bookkeeping on the
/// trait object.
pub trait Chip: Send {
    /// Run one activation of the chip against the current signal
    /// snapshot, queuing any output writes into `ctx`.
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick>;

    /// Called once, after every chip in the device has been registered,
    /// to declare which signals this chip must be re-run for when they
    /// change. Must call [`DependencyContext::depends_on`] for every
    /// signal the chip reads in `process`.
    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>);
}

/// A queued write or release, recorded by a chip during the process
/// pass and applied to the shared [`SignalPool`] state once the pass
/// (and any concurrent partition of it) has finished.
///
/// Per spec §4.1/§5, each worker accumulates writes in its own queue and
/// the simulator merges the queues deterministically; because merges
/// are plain AND-over-contributions, the order in which queued ops from
/// different workers are applied does not affect the result.
pub(crate) enum WriteOp {
    Write { signal: Signal, chip: ChipId, value: bool },
    Release { signal: Signal, chip: ChipId },
}

/// View a chip's `process` method is given: read access to the frozen
/// current-value snapshot, and a private queue to record this chip's
/// writes for later merging.
pub struct SignalContext<'a> {
    pub(crate) pool: &'a SignalPool,
    pub(crate) chip_id: ChipId,
    pub(crate) current_tick: Tick,
    pub(crate) writes: Vec<WriteOp>,
}

impl<'a> SignalContext<'a> {
    pub(crate) fn new(pool: &'a SignalPool, chip_id: ChipId, current_tick: Tick) -> Self {
        SignalContext { pool, chip_id, current_tick, writes: Vec::new() }
    }

    /// The id of the chip this context was handed to.
    pub fn chip_id(&self) -> ChipId {
        self.chip_id
    }

    /// The simulator's tick for this activation. Chips that schedule
    /// their own future wake-ups (oscillators, timers, cursor blink)
    /// compute the target tick relative to this, replacing the C
    /// original's `chip->simulator` back-reference.
    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    /// Read a signal's current value.
    pub fn read(&self, signal: Signal) -> bool {
        self.pool.read(signal)
    }

    /// Read a signal's resolved next value (the value it will take on
    /// the next `cycle()`, as of the state before this process pass).
    pub fn read_next(&self, signal: Signal) -> bool {
        self.pool.read_next(signal)
    }

    /// True if `signal`'s current value differs from its value on the
    /// previous tick.
    pub fn changed(&self, signal: Signal) -> bool {
        self.pool.changed(signal)
    }

    /// Drive `signal` to `value`, recording this chip as an active
    /// writer. Multiple chips driving the same signal in one timestep
    /// is legal; resolution happens on AND semantics in [`SignalPool::cycle`].
    pub fn write(&mut self, signal: Signal, value: bool) {
        self.writes.push(WriteOp::Write { signal, chip: self.chip_id, value });
    }

    /// Release this chip's drive on `signal` (enter high-impedance for
    /// this output). If no writer remains, the signal reverts to its
    /// default value.
    pub fn clear_writer(&mut self, signal: Signal) {
        self.writes.push(WriteOp::Release { signal, chip: self.chip_id });
    }
}

/// View passed to [`Chip::register_dependencies`].
pub struct DependencyContext<'a> {
    pub(crate) pool: &'a mut SignalPool,
    pub(crate) chip_id: ChipId,
}

impl<'a> DependencyContext<'a> {
    /// Declare that the owning chip must be re-run whenever `signal`
    /// changes.
    pub fn depends_on(&mut self, signal: Signal) {
        self.pool.add_dependency(signal, self.chip_id);
    }
}
