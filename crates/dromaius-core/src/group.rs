//! [`SignalGroup`]: a bundle of signals read and written as one
//! little-endian integer bus. See spec §3 DATA MODEL.

use crate::chip::SignalContext;
use crate::signal::{Signal, SignalPool};

/// Maximum number of signals a single group may hold (callers pack a
/// group's value into a `u32`).
pub const MAX_GROUP_SIZE: usize = 32;

/// An ordered list of signals interpreted as a little-endian integer
/// bus: bit `i` of the group's value is signal `i`'s value.
#[derive(Debug, Clone)]
pub struct SignalGroup {
    signals: Vec<Signal>,
}

impl SignalGroup {
    pub fn from_signals(signals: Vec<Signal>) -> Self {
        assert!(signals.len() <= MAX_GROUP_SIZE, "signal group exceeds {MAX_GROUP_SIZE} bits");
        SignalGroup { signals }
    }

    /// Allocate `count` fresh signals and bundle them into a new group.
    pub fn create(pool: &mut SignalPool, count: usize) -> Self {
        assert!(count <= MAX_GROUP_SIZE, "signal group exceeds {MAX_GROUP_SIZE} bits");
        let signals = (0..count).map(|_| pool.signal_create()).collect();
        SignalGroup { signals }
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn signal(&self, i: usize) -> Signal {
        self.signals[i]
    }

    pub fn iter(&self) -> impl Iterator<Item = Signal> + '_ {
        self.signals.iter().copied()
    }

    /// Name every signal in the group `"{group_name}{i}"` for `i` in
    /// `start_idx..`, mirroring the `%d`-style group-naming helper from
    /// the C original.
    pub fn set_name(&self, pool: &mut SignalPool, group_name: &str, start_idx: u32) {
        for (i, signal) in self.signals.iter().enumerate() {
            pool.set_name(*signal, format!("{group_name}{}", start_idx as usize + i));
        }
    }

    pub fn set_defaults(&self, pool: &mut SignalPool, value: u32) {
        for (i, signal) in self.signals.iter().enumerate() {
            pool.default(*signal, (value >> i) & 1 != 0);
        }
    }

    pub fn add_dependencies(&self, pool: &mut SignalPool, chip_id: crate::chip::ChipId) {
        for signal in &self.signals {
            pool.add_dependency(*signal, chip_id);
        }
    }

    pub fn read(&self, pool: &SignalPool) -> u32 {
        let mut result = 0u32;
        for (i, signal) in self.signals.iter().enumerate() {
            result |= (pool.read(*signal) as u32) << i;
        }
        result
    }

    pub fn read_next(&self, pool: &SignalPool) -> u32 {
        let mut result = 0u32;
        for (i, signal) in self.signals.iter().enumerate() {
            result |= (pool.read_next(*signal) as u32) << i;
        }
        result
    }

    pub fn changed(&self, pool: &SignalPool) -> bool {
        self.signals.iter().any(|s| pool.changed(*s))
    }
}

/// Context-scoped helpers so chip code can read/write a whole group
/// through a [`SignalContext`] in one call, instead of looping over
/// `signal()` by hand.
impl SignalGroup {
    pub fn ctx_read(&self, ctx: &SignalContext<'_>) -> u32 {
        let mut result = 0u32;
        for (i, signal) in self.signals.iter().enumerate() {
            result |= (ctx.read(*signal) as u32) << i;
        }
        result
    }

    pub fn ctx_write(&self, ctx: &mut SignalContext<'_>, value: u32) {
        for (i, signal) in self.signals.iter().enumerate() {
            ctx.write(*signal, (value >> i) & 1 != 0);
        }
    }

    /// Write only the bits selected by `mask`; other signals in the
    /// group are left untouched.
    pub fn ctx_write_masked(&self, ctx: &mut SignalContext<'_>, value: u32, mask: u32) {
        for (i, signal) in self.signals.iter().enumerate() {
            if (mask >> i) & 1 != 0 {
                ctx.write(*signal, (value >> i) & 1 != 0);
            }
        }
    }

    pub fn ctx_clear_writer(&self, ctx: &mut SignalContext<'_>) {
        for signal in &self.signals {
            ctx.clear_writer(*signal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_read_write_round_trip() {
        let mut pool = SignalPool::create(8, 1);
        let group = SignalGroup::create(&mut pool, 8);
        for (i, s) in group.iter().enumerate() {
            pool.apply_write(s, 0, (0xA5u32 >> i) & 1 != 0);
        }
        pool.cycle();
        assert_eq!(group.read(&pool), 0xA5);
    }

    #[test]
    fn masked_write_leaves_other_bits_untouched() {
        let mut pool = SignalPool::create(8, 1);
        let group = SignalGroup::create(&mut pool, 8);
        for s in group.iter() {
            pool.apply_write(s, 0, true);
        }
        pool.cycle();
        assert_eq!(group.read(&pool), 0xFF);
    }
}
