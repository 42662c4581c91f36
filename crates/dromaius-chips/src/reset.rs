//! Power-on reset generator. Grounded on
//! `original_source/src/chip_poweronreset.c`.

use dromaius_core::{Chip, DependencyContext, Signal, SignalContext, Tick};

/// Drives `reset_b` low for `duration_ticks`, either from t=0 or after
/// a negative edge on `trigger_b` retriggers it.
pub struct PowerOnReset {
    trigger_b: Signal,
    reset_b: Signal,
    duration_ticks: Tick,
    next_action: Tick,
    prev_trigger_b: bool,
}

impl PowerOnReset {
    pub fn new(trigger_b: Signal, reset_b: Signal, duration_ticks: Tick) -> Self {
        PowerOnReset {
            trigger_b,
            reset_b,
            duration_ticks,
            next_action: duration_ticks,
            prev_trigger_b: true,
        }
    }
}

impl Chip for PowerOnReset {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        let trigger_b = ctx.read(self.trigger_b);
        if !trigger_b && self.prev_trigger_b {
            self.next_action = ctx.current_tick() + self.duration_ticks;
        }

        let deasserted = ctx.current_tick() >= self.next_action;
        ctx.write(self.reset_b, deasserted);
        self.prev_trigger_b = trigger_b;

        if deasserted {
            None
        } else {
            Some(self.next_action)
        }
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        ctx.depends_on(self.trigger_b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixedDriver;
    use dromaius_core::Simulator;

    #[test]
    fn holds_reset_low_for_configured_duration() {
        let mut sim = Simulator::with_workers(1_000, 1);
        let trigger_b = sim.pool_mut().signal_create();
        let reset_b = sim.pool_mut().signal_create();
        sim.pool_mut().default(trigger_b, true);

        let driver = FixedDriver::new([(trigger_b, true)]);
        sim.register_chip("drv", Box::new(driver));
        sim.register_chip("por", Box::new(PowerOnReset::new(trigger_b, reset_b, 10)));
        sim.device_complete();

        sim.simulate_timestep();
        assert!(!sim.pool().read(reset_b));

        sim.simulate_timestep();
        assert!(sim.pool().read(reset_b));
    }

    #[test]
    fn retriggers_on_falling_edge() {
        let mut sim = Simulator::with_workers(1_000, 1);
        let trigger_b = sim.pool_mut().signal_create();
        let reset_b = sim.pool_mut().signal_create();
        sim.pool_mut().default(trigger_b, true);

        let (driver, handles) = FixedDriver::with_handles([(trigger_b, true)]);
        sim.register_chip("drv", Box::new(driver));
        sim.register_chip("por", Box::new(PowerOnReset::new(trigger_b, reset_b, 10)));
        sim.device_complete();

        sim.simulate_timestep();
        sim.simulate_timestep();
        assert!(sim.pool().read(reset_b));

        handles[0].set(false);
        sim.simulate_timestep();
        assert!(!sim.pool().read(reset_b));
    }
}
