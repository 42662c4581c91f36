//! Quad bus transceiver. Grounded on `original_source/src/chip_mc3446a.c`.

use dromaius_core::{Chip, DependencyContext, Signal, SignalContext, Tick};

struct Channel {
    bus: Signal,
    input: Signal,
    output: Signal,
}

/// A MC3446A: three channels (A/B/C) share one active-low enable, the
/// fourth (D) has its own. A disabled channel drives its bus and
/// output pins low; an enabled one releases the bus pin and passes
/// its value through to the output.
pub struct Transceiver {
    enable_abc_b: Signal,
    abc: [Channel; 3],
    enable_d_b: Signal,
    d: Channel,
}

impl Transceiver {
    pub fn new(
        enable_abc_b: Signal,
        a: (Signal, Signal, Signal),
        b: (Signal, Signal, Signal),
        c: (Signal, Signal, Signal),
        enable_d_b: Signal,
        d: (Signal, Signal, Signal),
    ) -> Self {
        let chan = |(bus, input, output): (Signal, Signal, Signal)| Channel { bus, input, output };
        Transceiver {
            enable_abc_b,
            abc: [chan(a), chan(b), chan(c)],
            enable_d_b,
            d: chan(d),
        }
    }

    fn drive_channel(ctx: &mut SignalContext<'_>, enable_b: bool, channel: &Channel) {
        if !(enable_b || ctx.read(channel.input)) {
            ctx.write(channel.bus, false);
            ctx.write(channel.output, false);
        } else {
            ctx.clear_writer(channel.bus);
            ctx.write(channel.output, ctx.read(channel.bus));
        }
    }
}

impl Chip for Transceiver {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        let enable_abc_b = ctx.read(self.enable_abc_b);
        for channel in &self.abc {
            Self::drive_channel(ctx, enable_abc_b, channel);
        }
        let enable_d_b = ctx.read(self.enable_d_b);
        Self::drive_channel(ctx, enable_d_b, &self.d);
        None
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        ctx.depends_on(self.enable_abc_b);
        ctx.depends_on(self.enable_d_b);
        for channel in self.abc.iter().chain(std::iter::once(&self.d)) {
            ctx.depends_on(channel.bus);
            ctx.depends_on(channel.input);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixedDriver;
    use dromaius_core::Simulator;

    #[test]
    fn disabled_channel_drives_bus_and_output_low() {
        let mut sim = Simulator::with_workers(1_000, 1);
        let pool = sim.pool_mut();
        let enable_abc_b = pool.signal_create();
        let enable_d_b = pool.signal_create();
        let (a_bus, a_in, a_out) = (pool.signal_create(), pool.signal_create(), pool.signal_create());
        let (b_bus, b_in, b_out) = (pool.signal_create(), pool.signal_create(), pool.signal_create());
        let (c_bus, c_in, c_out) = (pool.signal_create(), pool.signal_create(), pool.signal_create());
        let (d_bus, d_in, d_out) = (pool.signal_create(), pool.signal_create(), pool.signal_create());

        let driver = FixedDriver::new([
            (enable_abc_b, false),
            (enable_d_b, true),
            (a_in, false),
            (b_in, false),
            (c_in, false),
            (d_in, false),
        ]);
        sim.register_chip("drv", Box::new(driver));
        sim.register_chip(
            "xcvr",
            Box::new(Transceiver::new(
                enable_abc_b,
                (a_bus, a_in, a_out),
                (b_bus, b_in, b_out),
                (c_bus, c_in, c_out),
                enable_d_b,
                (d_bus, d_in, d_out),
            )),
        );
        sim.device_complete();

        sim.simulate_timestep();
        assert!(!sim.pool().read(a_out));
        assert!(!sim.pool().read(b_out));
        assert!(!sim.pool().read(c_out));
        assert_eq!(sim.pool().writers(d_bus), 0); // channel D enabled: bus released
    }
}
