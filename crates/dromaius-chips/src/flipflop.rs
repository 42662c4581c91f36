//! Edge-triggered flip-flops. Grounded on the 7474 (D) and 74107 (JK)
//! sections of `original_source/src/chip_74xxx.c`.

use dromaius_core::{Chip, DependencyContext, Signal, SignalContext, Tick};

/// A positive-edge-triggered D flip-flop with active-low async preset
/// and clear, matching one half of a 7474 package.
pub struct DFlipFlop {
    d: Signal,
    clk: Signal,
    pr_b: Signal,
    clr_b: Signal,
    q: Signal,
    q_b: Signal,
    prev_clk: bool,
    state: bool,
}

impl DFlipFlop {
    pub fn new(d: Signal, clk: Signal, pr_b: Signal, clr_b: Signal, q: Signal, q_b: Signal) -> Self {
        DFlipFlop { d, clk, pr_b, clr_b, q, q_b, prev_clk: false, state: false }
    }
}

impl Chip for DFlipFlop {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        let clk = ctx.read(self.clk);
        let preset = !ctx.read(self.pr_b);
        let clear = !ctx.read(self.clr_b);

        // datasheet-undefined case: both asserted drives Q and Q-bar both high
        let q_b_state;
        if preset && clear {
            self.state = true;
            q_b_state = true;
        } else if preset {
            self.state = true;
            q_b_state = false;
        } else if clear {
            self.state = false;
            q_b_state = true;
        } else {
            if clk && !self.prev_clk {
                self.state = ctx.read(self.d);
            }
            q_b_state = !self.state;
        }

        ctx.write(self.q, self.state);
        ctx.write(self.q_b, q_b_state);
        self.prev_clk = clk;
        None
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        ctx.depends_on(self.clk);
        ctx.depends_on(self.pr_b);
        ctx.depends_on(self.clr_b);
    }
}

/// A negative-edge-triggered JK flip-flop with active-low async clear,
/// matching one half of a 74107 package.
pub struct JkFlipFlop {
    j: Signal,
    k: Signal,
    clk: Signal,
    clr_b: Signal,
    q: Signal,
    q_b: Signal,
    prev_clk: bool,
    state: bool,
}

impl JkFlipFlop {
    pub fn new(j: Signal, k: Signal, clk: Signal, clr_b: Signal, q: Signal, q_b: Signal) -> Self {
        JkFlipFlop { j, k, clk, clr_b, q, q_b, prev_clk: false, state: false }
    }
}

impl Chip for JkFlipFlop {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        let clk = ctx.read(self.clk);

        if !ctx.read(self.clr_b) {
            self.state = false;
        } else if !clk && self.prev_clk {
            let j = ctx.read(self.j);
            let k = ctx.read(self.k);
            if j && k {
                self.state = !self.state;
            } else if j || k {
                self.state = j;
            }
        }

        ctx.write(self.q, self.state);
        ctx.write(self.q_b, !self.state);
        self.prev_clk = clk;
        None
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        ctx.depends_on(self.clk);
        ctx.depends_on(self.clr_b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixedDriver;
    use dromaius_core::Simulator;

    #[test]
    fn d_flipflop_captures_on_rising_edge() {
        let mut sim = Simulator::with_workers(1_000, 1);
        let pool = sim.pool_mut();
        let d = pool.signal_create();
        let clk = pool.signal_create();
        let pr_b = pool.signal_create();
        let clr_b = pool.signal_create();
        let q = pool.signal_create();
        let q_b = pool.signal_create();
        sim.pool_mut().default(pr_b, true);
        sim.pool_mut().default(clr_b, true);

        let (driver, handles) =
            FixedDriver::with_handles([(d, true), (clk, false), (pr_b, true), (clr_b, true)]);
        sim.register_chip("drv", Box::new(driver));
        sim.register_chip("ff", Box::new(DFlipFlop::new(d, clk, pr_b, clr_b, q, q_b)));
        sim.device_complete();

        sim.simulate_timestep();
        assert!(!sim.pool().read(q));

        handles[1].set(true); // rising edge on clk
        sim.simulate_timestep();
        sim.simulate_timestep();
        assert!(sim.pool().read(q));
        assert!(!sim.pool().read(q_b));
    }

    #[test]
    fn preset_and_clear_both_asserted_drives_both_outputs_high() {
        let mut sim = Simulator::with_workers(1_000, 1);
        let pool = sim.pool_mut();
        let d = pool.signal_create();
        let clk = pool.signal_create();
        let pr_b = pool.signal_create();
        let clr_b = pool.signal_create();
        let q = pool.signal_create();
        let q_b = pool.signal_create();

        let (driver, _handles) =
            FixedDriver::with_handles([(d, false), (clk, false), (pr_b, false), (clr_b, false)]);
        sim.register_chip("drv", Box::new(driver));
        sim.register_chip("ff", Box::new(DFlipFlop::new(d, clk, pr_b, clr_b, q, q_b)));
        sim.device_complete();

        sim.simulate_timestep();
        sim.simulate_timestep();
        assert!(sim.pool().read(q));
        assert!(sim.pool().read(q_b));
    }

    #[test]
    fn jk_flipflop_toggles_when_both_inputs_high() {
        let mut sim = Simulator::with_workers(1_000, 1);
        let pool = sim.pool_mut();
        let j = pool.signal_create();
        let k = pool.signal_create();
        let clk = pool.signal_create();
        let clr_b = pool.signal_create();
        let q = pool.signal_create();
        let q_b = pool.signal_create();
        sim.pool_mut().default(clr_b, true);

        let (driver, handles) =
            FixedDriver::with_handles([(j, true), (k, true), (clk, true), (clr_b, true)]);
        sim.register_chip("drv", Box::new(driver));
        sim.register_chip("ff", Box::new(JkFlipFlop::new(j, k, clk, clr_b, q, q_b)));
        sim.device_complete();

        sim.simulate_timestep();
        let before = sim.pool().read(q);

        handles[2].set(false); // falling edge
        sim.simulate_timestep();
        sim.simulate_timestep();
        assert_eq!(sim.pool().read(q), !before);
    }
}
