//! The simulator: owns the signal pool, the chip registry and the
//! scheduler, and drives the per-timestep dataflow of spec §4.4.

use crate::chip::{Chip, ChipId, DependencyContext, SignalContext, WriteOp, MAX_CHIPS};
use crate::history::SignalHistory;
use crate::scheduler::Scheduler;
use crate::signal::SignalPool;
use crate::Tick;

struct ChipSlot {
    name: String,
    chip: Option<Box<dyn Chip>>,
}

/// Owns a device's chips and signal pool and advances them one
/// timestep at a time. See spec §3 (Simulator), §4.4 (step loop) and
/// §5 (concurrency model).
pub struct Simulator {
    pool: SignalPool,
    chips: Vec<ChipSlot>,
    scheduler: Scheduler,
    dirty_chips: u64,
    tick_duration_ps: i64,
    current_tick: Tick,
    history: Option<SignalHistory>,
    worker_count: usize,
    complete: bool,
}

impl Simulator {
    /// Create a simulator with the given tick duration (picoseconds)
    /// and worker-thread count for the process pass. A `worker_count`
    /// of 1 runs every pass sequentially on the calling thread.
    pub fn with_workers(tick_duration_ps: i64, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        Simulator {
            pool: SignalPool::create(256, worker_count),
            chips: Vec::new(),
            scheduler: Scheduler::new(worker_count),
            dirty_chips: 0,
            tick_duration_ps,
            current_tick: 0,
            history: None,
            worker_count,
            complete: false,
        }
    }

    /// Create a simulator with the spec's typical two-worker pool.
    pub fn new(tick_duration_ps: i64) -> Self {
        Self::with_workers(tick_duration_ps, 2)
    }

    pub fn pool(&self) -> &SignalPool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut SignalPool {
        &mut self.pool
    }

    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    pub fn tick_duration_ps(&self) -> i64 {
        self.tick_duration_ps
    }

    /// Convert a real-world interval in picoseconds to a tick count,
    /// rounding down (spec §6, §9: sub-tick frequencies round down and
    /// accumulate at most 1ps/tick of drift).
    pub fn interval_to_ticks(&self, interval_ps: i64) -> Tick {
        interval_ps / self.tick_duration_ps
    }

    pub fn enable_history(&mut self, capacity_per_signal: usize) {
        self.history = Some(SignalHistory::new(capacity_per_signal));
    }

    pub fn history(&self) -> Option<&SignalHistory> {
        self.history.as_ref()
    }

    pub fn history_mut(&mut self) -> Option<&mut SignalHistory> {
        self.history.as_mut()
    }

    /// Register a chip, assigning it the next free id. The chip starts
    /// dirty so every chip runs at least once (spec §4.3).
    ///
    /// # Panics (debug builds only)
    /// Panics via `debug_assert!` if registering this chip would push
    /// the simulator past [`MAX_CHIPS`] — a programming error per spec
    /// §7, since dirty/writer/dependency sets are all `u64` bitmasks.
    pub fn register_chip(&mut self, name: impl Into<String>, chip: Box<dyn Chip>) -> ChipId {
        debug_assert!(self.chips.len() < MAX_CHIPS, "simulator chip limit ({MAX_CHIPS}) exceeded");
        let id = self.chips.len() as ChipId;
        self.chips.push(ChipSlot { name: name.into(), chip: Some(chip) });
        self.dirty_chips |= 1u64 << id;
        id
    }

    pub fn chip_by_name(&self, name: &str) -> Option<ChipId> {
        self.chips.iter().position(|c| c.name == name).map(|i| i as ChipId)
    }

    pub fn chip_name(&self, chip_id: ChipId) -> Option<&str> {
        self.chips.get(chip_id as usize).map(|c| c.name.as_str())
    }

    /// Freeze the signal graph: call `register_dependencies` on every
    /// registered chip. Must be called exactly once, after all chips
    /// have been constructed and wired, before the first
    /// [`Simulator::simulate_timestep`] (spec §3 Lifecycles).
    pub fn device_complete(&mut self) {
        for (id, slot) in self.chips.iter().enumerate() {
            if let Some(chip) = &slot.chip {
                let mut ctx = DependencyContext { pool: &mut self.pool, chip_id: id as ChipId };
                chip.register_dependencies(&mut ctx);
            }
        }
        self.complete = true;
    }

    /// Advance virtual time by one step: pick the next timestamp,
    /// process every dirty chip (concurrently across workers when
    /// configured), reconcile high-impedance cascades, then cycle the
    /// pool. See spec §4.4 for the exact five-step dataflow.
    pub fn simulate_timestep(&mut self) {
        debug_assert!(self.complete, "simulate_timestep called before device_complete");

        if self.dirty_chips != 0 {
            self.current_tick += 1;
        } else {
            self.current_tick = self.scheduler.next_timestamp();
        }

        self.dirty_chips |= self.scheduler.pop_due(self.current_tick);

        let requests = self.run_pass(self.dirty_chips);
        self.apply_schedule_requests(requests);

        let rerun = self.pool.process_high_impedance();
        if rerun != 0 {
            let requests = self.run_pass_sequential(rerun);
            self.apply_schedule_requests(requests);
        }

        self.dirty_chips = self.pool.cycle();

        if let Some(history) = &mut self.history {
            history.record(&self.pool, self.current_tick);
        }
    }

    /// True once `current_tick` has caught up with every scheduled
    /// event and no chip is dirty: the simulation has nothing left to
    /// do until an external stimulus (e.g. a key press) changes a signal.
    pub fn is_idle(&self) -> bool {
        self.dirty_chips == 0 && self.scheduler.next_timestamp() == Tick::MAX
    }

    fn apply_schedule_requests(&mut self, requests: Vec<(ChipId, Tick)>) {
        for (chip_id, tick) in requests {
            let scheduled = self.scheduler.schedule(chip_id, tick);
            debug_assert!(scheduled, "scheduler free-pool exhausted for chip {chip_id}");
        }
    }

    fn run_pass(&mut self, mask: u64) -> Vec<(ChipId, Tick)> {
        if mask == 0 {
            return Vec::new();
        }
        if self.worker_count <= 1 {
            self.run_pass_sequential(mask)
        } else {
            self.run_pass_concurrent(mask)
        }
    }

    fn run_pass_sequential(&mut self, mask: u64) -> Vec<(ChipId, Tick)> {
        let mut requests = Vec::new();
        let mut remaining = mask;
        while remaining != 0 {
            let chip_id = remaining.trailing_zeros() as ChipId;
            remaining &= !(1u64 << chip_id);

            let Some(mut chip) = self.chips[chip_id as usize].chip.take() else { continue };
            let writes = {
                let mut ctx = SignalContext::new(&self.pool, chip_id, self.current_tick);
                if let Some(tick) = chip.process(&mut ctx) {
                    requests.push((chip_id, tick));
                }
                ctx.writes
            };
            self.pool.merge(writes);
            self.chips[chip_id as usize].chip = Some(chip);
        }
        requests
    }

    /// Run the process pass across `self.worker_count` scoped threads,
    /// partitioning the dirty mask by `chip_id % worker_count` (spec
    /// §4.4, §5). Each worker only ever sees chips it was assigned, so
    /// chip boxes are moved into the worker closures for the duration
    /// of the pass and moved back once every worker has joined.
    fn run_pass_concurrent(&mut self, mask: u64) -> Vec<(ChipId, Tick)> {
        let worker_count = self.worker_count;
        let mut partitions: Vec<Vec<(ChipId, Box<dyn Chip>)>> =
            (0..worker_count).map(|_| Vec::new()).collect();

        let mut remaining = mask;
        while remaining != 0 {
            let chip_id = remaining.trailing_zeros() as ChipId;
            remaining &= !(1u64 << chip_id);
            if let Some(chip) = self.chips[chip_id as usize].chip.take() {
                partitions[chip_id as usize % worker_count].push((chip_id, chip));
            }
        }

        let pool = &self.pool;
        let current_tick = self.current_tick;
        let results = std::thread::scope(|scope| {
            let handles: Vec<_> = partitions
                .into_iter()
                .map(|mut partition| {
                    scope.spawn(move || {
                        let mut writes = Vec::new();
                        let mut requests = Vec::new();
                        for (chip_id, chip) in partition.iter_mut() {
                            let mut ctx = SignalContext::new(pool, *chip_id, current_tick);
                            if let Some(tick) = chip.process(&mut ctx) {
                                requests.push((*chip_id, tick));
                            }
                            writes.append(&mut ctx.writes);
                        }
                        (partition, writes, requests)
                    })
                })
                .collect();

            handles.into_iter().map(|h| h.join().expect("chip worker panicked")).collect::<Vec<_>>()
        });

        let mut all_requests = Vec::new();
        for (partition, writes, requests): (Vec<(ChipId, Box<dyn Chip>)>, Vec<WriteOp>, Vec<(ChipId, Tick)>) in results {
            for (chip_id, chip) in partition {
                self.chips[chip_id as usize].chip = Some(chip);
            }
            self.pool.merge(writes);
            all_requests.extend(requests);
        }
        all_requests
    }
}
