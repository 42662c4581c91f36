//! The signal pool: current/next/default values, writer and dependency
//! bitmasks, and the open-drain write-resolution rule that ties them
//! together. See spec §3 DATA MODEL and §4.1.

use std::collections::HashMap;

use crate::chip::{ChipId, WriteOp};

/// An opaque index into a [`SignalPool`]. Signals are cheap to copy and
/// carry no state of their own; all state lives in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signal(u32);

impl Signal {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Owns every signal's current/next/default value, the per-signal
/// writer and dependent-chip bitmasks, and resolves contention between
/// multiple writers of the same signal.
///
/// Invariants (spec §3):
///  - a signal's `current` value equals the default when it has no
///    writers, and the AND of all writers' contributed values
///    otherwise (open-drain / wired-AND resolution);
///  - writes during a timestep only ever affect the *next* slot;
///    `cycle()` is the only place `current` changes.
pub struct SignalPool {
    names: Vec<Option<String>>,
    by_name: HashMap<String, Signal>,
    current: Vec<bool>,
    default: Vec<bool>,
    changed: Vec<bool>,
    /// Bit i set => chip i is currently driving this signal.
    writers: Vec<u64>,
    /// Bit i set => chip i is currently driving this signal low. Only
    /// meaningful for bits also set in `writers`.
    writers_low: Vec<u64>,
    /// Bit i set => chip i depends on this signal (re-run when it changes).
    dependents: Vec<u64>,
    /// Signals touched (written or released) since the last `cycle()`,
    /// used to avoid rescanning every signal every tick. May contain
    /// duplicates; `cycle()` tolerates that.
    touched: Vec<Signal>,
    /// Chips whose driven-but-not-winning output may need re-evaluating
    /// because a fellow writer on the same signal just released it.
    /// Populated by `clear_writer`/`apply_write`, drained by
    /// `process_high_impedance`.
    rerun_chips: u64,
}

impl SignalPool {
    /// Create an empty pool. `num_domains` is a capacity hint for the
    /// expected signal count (amortizes the first few `signal_create`
    /// calls); `worker_count` is recorded for callers that want to size
    /// their own per-worker write queues to match, but the pool itself
    /// needs no per-worker storage since writes are merged back in
    /// before any other pool method is observed.
    pub fn create(num_domains: usize, worker_count: usize) -> SignalPool {
        let _ = worker_count;
        SignalPool {
            names: Vec::with_capacity(num_domains),
            by_name: HashMap::new(),
            current: Vec::with_capacity(num_domains),
            default: Vec::with_capacity(num_domains),
            changed: Vec::with_capacity(num_domains),
            writers: Vec::with_capacity(num_domains),
            writers_low: Vec::with_capacity(num_domains),
            dependents: Vec::with_capacity(num_domains),
            touched: Vec::new(),
            rerun_chips: 0,
        }
    }

    /// Allocate a new single-bit signal, defaulting to `false` with no
    /// name and no writers.
    pub fn signal_create(&mut self) -> Signal {
        let signal = Signal(self.current.len() as u32);
        self.names.push(None);
        self.current.push(false);
        self.default.push(false);
        self.changed.push(false);
        self.writers.push(0);
        self.writers_low.push(0);
        self.dependents.push(0);
        signal
    }

    pub fn set_name(&mut self, signal: Signal, name: impl Into<String>) {
        let name = name.into();
        self.by_name.insert(name.clone(), signal);
        self.names[signal.index()] = Some(name);
    }

    pub fn by_name(&self, name: &str) -> Option<Signal> {
        self.by_name.get(name).copied()
    }

    pub fn get_name(&self, signal: Signal) -> &str {
        self.names[signal.index()].as_deref().unwrap_or("")
    }

    /// Set the value `signal` takes when no chip is driving it.
    pub fn default(&mut self, signal: Signal, value: bool) {
        self.default[signal.index()] = value;
    }

    /// Register that `chip_id` must be re-run whenever `signal` changes.
    pub fn add_dependency(&mut self, signal: Signal, chip_id: ChipId) {
        debug_assert!((chip_id as usize) < crate::chip::MAX_CHIPS);
        self.dependents[signal.index()] |= 1u64 << chip_id;
    }

    pub fn read(&self, signal: Signal) -> bool {
        self.current[signal.index()]
    }

    /// The value `signal` will resolve to on the next `cycle()`, given
    /// writer state as of the last merge.
    pub fn read_next(&self, signal: Signal) -> bool {
        self.resolve(signal.index())
    }

    pub fn changed(&self, signal: Signal) -> bool {
        self.changed[signal.index()]
    }

    /// Bitmask of chips currently driving `signal`.
    pub fn writers(&self, signal: Signal) -> u64 {
        self.writers[signal.index()]
    }

    fn resolve(&self, idx: usize) -> bool {
        let writers = self.writers[idx];
        if writers == 0 {
            self.default[idx]
        } else {
            self.writers_low[idx] == 0
        }
    }

    /// Apply one chip's queued write directly (used for the
    /// single-threaded high-impedance rerun pass, where there is no
    /// separate worker queue to merge).
    pub(crate) fn apply_write(&mut self, signal: Signal, chip_id: ChipId, value: bool) {
        let idx = signal.index();
        let bit = 1u64 << chip_id;
        self.writers[idx] |= bit;
        if value {
            self.writers_low[idx] &= !bit;
        } else {
            self.writers_low[idx] |= bit;
        }
        self.touched.push(signal);
    }

    /// Apply one chip's release of `signal` directly.
    pub(crate) fn apply_release(&mut self, signal: Signal, chip_id: ChipId) {
        let idx = signal.index();
        let bit = 1u64 << chip_id;
        if self.writers[idx] & bit != 0 {
            self.writers[idx] &= !bit;
            self.writers_low[idx] &= !bit;
            let remaining = self.writers[idx];
            if remaining != 0 {
                // Fellow writers may no longer be masked by the leaver;
                // give them a chance to re-evaluate.
                self.rerun_chips |= remaining;
            }
            self.touched.push(signal);
        }
    }

    /// Merge a worker's queued writes into the shared pool state. Safe
    /// to call only between process passes (single-threaded).
    pub(crate) fn merge(&mut self, ops: Vec<WriteOp>) {
        for op in ops {
            match op {
                WriteOp::Write { signal, chip, value } => self.apply_write(signal, chip, value),
                WriteOp::Release { signal, chip } => self.apply_release(signal, chip),
            }
        }
    }

    /// Chips to re-process because a signal they (also) write had its
    /// active-writer set shrink since the last call. Called once
    /// between the main process pass and `cycle()`.
    pub fn process_high_impedance(&mut self) -> u64 {
        std::mem::take(&mut self.rerun_chips)
    }

    /// Promote every touched signal's resolved next value to current,
    /// compute which signals changed, and return the union of
    /// dependent-chip masks for changed signals. Clears per-cycle
    /// scratch state.
    pub fn cycle(&mut self) -> u64 {
        let mut dirty = 0u64;
        let touched = std::mem::take(&mut self.touched);
        for signal in touched {
            let idx = signal.index();
            let resolved = self.resolve(idx);
            if resolved != self.current[idx] {
                self.current[idx] = resolved;
                self.changed[idx] = true;
                dirty |= self.dependents[idx];
            } else {
                self.changed[idx] = false;
            }
        }
        dirty
    }
}
