//! Decoders and multiplexers. Grounded on the 74145/74154 and
//! 74153 sections of `original_source/src/chip_74xxx.c`.

use dromaius_core::{Chip, DependencyContext, Signal, SignalContext, Tick};

/// A one-of-N decoder with active-low outputs: the binary value on
/// `select` asserts exactly one output, all others are deasserted.
/// Covers both the 7414x's BCD-to-decimal (N=10) and the 74154's
/// 4-to-16 (N=16) by taking the output list as a slice.
pub struct Decoder {
    select: Vec<Signal>,
    outputs: Vec<Signal>,
}

impl Decoder {
    pub fn new(select: impl IntoIterator<Item = Signal>, outputs: impl IntoIterator<Item = Signal>) -> Self {
        Decoder { select: select.into_iter().collect(), outputs: outputs.into_iter().collect() }
    }
}

impl Chip for Decoder {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        let value = self
            .select
            .iter()
            .enumerate()
            .fold(0usize, |acc, (i, &s)| acc | ((ctx.read(s) as usize) << i));

        for (i, &out) in self.outputs.iter().enumerate() {
            ctx.write(out, i != value);
        }
        None
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        for &s in &self.select {
            ctx.depends_on(s);
        }
    }
}

/// A 74153-style dual 4-line-to-1-line multiplexer: two independent
/// channels share the `a`/`b` select lines but have their own
/// active-low enable and four data inputs.
pub struct DualMultiplexer {
    a: Signal,
    b: Signal,
    g1: Signal,
    g2: Signal,
    channel1: [Signal; 4],
    channel2: [Signal; 4],
    y1: Signal,
    y2: Signal,
}

impl DualMultiplexer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        a: Signal,
        b: Signal,
        g1: Signal,
        g2: Signal,
        channel1: [Signal; 4],
        channel2: [Signal; 4],
        y1: Signal,
        y2: Signal,
    ) -> Self {
        DualMultiplexer { a, b, g1, g2, channel1, channel2, y1, y2 }
    }
}

impl Chip for DualMultiplexer {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        let index = (ctx.read(self.a) as usize) | ((ctx.read(self.b) as usize) << 1);
        let y1 = !ctx.read(self.g1) && ctx.read(self.channel1[index]);
        let y2 = !ctx.read(self.g2) && ctx.read(self.channel2[index]);
        ctx.write(self.y1, y1);
        ctx.write(self.y2, y2);
        None
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        ctx.depends_on(self.a);
        ctx.depends_on(self.b);
        ctx.depends_on(self.g1);
        ctx.depends_on(self.g2);
        for &s in self.channel1.iter().chain(self.channel2.iter()) {
            ctx.depends_on(s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixedDriver;
    use dromaius_core::Simulator;

    #[test]
    fn decoder_asserts_only_the_selected_output() {
        let mut sim = Simulator::with_workers(1_000, 1);
        let pool = sim.pool_mut();
        let a = pool.signal_create();
        let b = pool.signal_create();
        let c = pool.signal_create();
        let d = pool.signal_create();
        let outputs: [Signal; 10] = std::array::from_fn(|_| pool.signal_create());

        let driver = FixedDriver::new([(a, true), (b, false), (c, true), (d, false)]); // value = 5
        sim.register_chip("drv", Box::new(driver));
        sim.register_chip("dec", Box::new(Decoder::new([a, b, c, d], outputs)));
        sim.device_complete();

        sim.simulate_timestep();
        for (i, &out) in outputs.iter().enumerate() {
            assert_eq!(sim.pool().read(out), i != 5);
        }
    }

    #[test]
    fn mux_selects_channel_input_when_enabled() {
        let mut sim = Simulator::with_workers(1_000, 1);
        let pool = sim.pool_mut();
        let a = pool.signal_create();
        let b = pool.signal_create();
        let g1 = pool.signal_create();
        let g2 = pool.signal_create();
        let ch1: [Signal; 4] = std::array::from_fn(|_| pool.signal_create());
        let ch2: [Signal; 4] = std::array::from_fn(|_| pool.signal_create());
        let y1 = pool.signal_create();
        let y2 = pool.signal_create();

        let driver = FixedDriver::new([(a, true), (b, false), (g1, false), (g2, true), (ch1[1], true)]);
        sim.register_chip("drv", Box::new(driver));
        sim.register_chip("mux", Box::new(DualMultiplexer::new(a, b, g1, g2, ch1, ch2, y1, y2)));
        sim.device_complete();

        sim.simulate_timestep();
        assert!(sim.pool().read(y1));
        assert!(!sim.pool().read(y2)); // disabled via g2
    }
}
