//! Optional ring buffer of (tick, value) transitions per signal, for
//! logic-analyzer style display. See spec §2 Signal history and
//! Design Notes (GUI consumption is out of scope; this only records).

use std::collections::HashMap;

use crate::signal::{Signal, SignalPool};
use crate::Tick;

/// One recorded level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub tick: Tick,
    pub value: bool,
}

struct Trace {
    capacity: usize,
    transitions: std::collections::VecDeque<Transition>,
}

impl Trace {
    fn push(&mut self, tick: Tick, value: bool) {
        if self.transitions.len() == self.capacity {
            self.transitions.pop_front();
        }
        self.transitions.push_back(Transition { tick, value });
    }
}

/// Records transitions for a chosen subset of signals. Signals not
/// registered with [`SignalHistory::watch`] are not recorded, keeping
/// the per-tick cost proportional to the number of signals a host
/// actually wants to inspect rather than the whole pool.
pub struct SignalHistory {
    capacity_per_signal: usize,
    traces: HashMap<Signal, Trace>,
}

impl SignalHistory {
    pub fn new(capacity_per_signal: usize) -> Self {
        SignalHistory { capacity_per_signal, traces: HashMap::new() }
    }

    /// Start recording transitions of `signal`, seeding the trace with
    /// its current value so the first recorded transition has a
    /// well-defined predecessor.
    pub fn watch(&mut self, pool: &SignalPool, signal: Signal, tick: Tick) {
        let mut trace = Trace { capacity: self.capacity_per_signal, transitions: Default::default() };
        trace.push(tick, pool.read(signal));
        self.traces.insert(signal, trace);
    }

    pub fn unwatch(&mut self, signal: Signal) {
        self.traces.remove(&signal);
    }

    pub fn is_watched(&self, signal: Signal) -> bool {
        self.traces.contains_key(&signal)
    }

    /// Called once per completed tick by the simulator; records a new
    /// transition for every watched signal that changed this cycle.
    pub fn record(&mut self, pool: &SignalPool, tick: Tick) {
        for (signal, trace) in self.traces.iter_mut() {
            if pool.changed(*signal) {
                trace.push(tick, pool.read(*signal));
            }
        }
    }

    /// Recorded transitions for `signal`, oldest first. Copies out of
    /// the ring buffer (rather than borrowing) since the buffer may be
    /// wrapped internally and so isn't always one contiguous slice.
    pub fn transitions(&self, signal: Signal) -> Vec<Transition> {
        self.traces.get(&signal).map(|t| t.transitions.iter().copied().collect()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watching_records_only_real_changes() {
        let mut pool = SignalPool::create(1, 1);
        let sig = pool.signal_create();
        let mut history = SignalHistory::new(4);
        history.watch(&pool, sig, 0);

        pool.apply_write(sig, 0, false);
        pool.cycle();
        history.record(&pool, 1);

        pool.apply_write(sig, 0, true);
        pool.cycle();
        history.record(&pool, 2);

        let transitions: Vec<_> = history.transitions(sig).to_vec();
        assert_eq!(transitions, vec![
            Transition { tick: 0, value: false },
            Transition { tick: 2, value: true },
        ]);
    }

    #[test]
    fn ring_buffer_drops_oldest_when_full() {
        let mut pool = SignalPool::create(1, 1);
        let sig = pool.signal_create();
        let mut history = SignalHistory::new(2);
        history.watch(&pool, sig, 0);

        for t in 1..=3 {
            pool.apply_write(sig, 0, t % 2 == 0);
            pool.cycle();
            history.record(&pool, t);
        }

        assert_eq!(history.transitions(sig).len(), 2);
        assert_eq!(history.transitions(sig)[0].tick, 2);
    }
}
