//! Binary counters. Grounded on the 7493, 74177 and 74191 sections of
//! `original_source/src/chip_74xxx.c`.

use dromaius_core::{Chip, DependencyContext, Signal, SignalContext, Tick};

/// A two-stage ripple counter: a 1-bit first stage clocked by `clk_a`,
/// feeding a 3-bit second stage clocked by `clk_b`. Covers both the
/// 7493 (`reset_a`/`reset_b` act as an AND'd active-high clear, no
/// load) and the 74177 (active-low `load`/`clear`, parallel inputs)
/// by making load optional.
///
/// When `clk_b` is wired to the first stage's `qa` output (the usual
/// divide-by-16 hookup), the second stage ripples within the same
/// timestep instead of lagging a tick, matching the original's
/// pointer-identity check on the `Signal` feeding `clk_b`.
pub struct RippleCounter {
    clk_a: Signal,
    clk_b: Signal,
    clear: ClearInput,
    load: Option<LoadInput>,
    qa: Signal,
    qb: Signal,
    qc: Signal,
    qd: Signal,
    count_a: bool,
    count_b: u8,
    prev_clk_a: bool,
    prev_clk_b: bool,
}

enum ClearInput {
    /// 7493-style: both reset lines active-high, ANDed.
    ActiveHighPair(Signal, Signal),
    /// 74177-style: a single active-low clear line.
    ActiveLow(Signal),
}

struct LoadInput {
    load_b: Signal,
    a: Signal,
    b: Signal,
    c: Signal,
    d: Signal,
}

impl RippleCounter {
    /// A 7493-style 4-bit binary counter: active-high `r01`/`r02` reset
    /// pair, no parallel load.
    pub fn binary_7493(
        a_b: Signal,
        b_b: Signal,
        r01: Signal,
        r02: Signal,
        qa: Signal,
        qb: Signal,
        qc: Signal,
        qd: Signal,
    ) -> Self {
        RippleCounter {
            clk_a: a_b,
            clk_b: b_b,
            clear: ClearInput::ActiveHighPair(r01, r02),
            load: None,
            qa,
            qb,
            qc,
            qd,
            count_a: false,
            count_b: 0,
            prev_clk_a: false,
            prev_clk_b: false,
        }
    }

    /// A 74177-style presettable counter/latch: active-low clear and
    /// load, with `a`/`b`/`c`/`d` parallel data inputs.
    pub fn presettable_74177(
        clk1: Signal,
        clk2: Signal,
        clear_b: Signal,
        load_b: Signal,
        a: Signal,
        b: Signal,
        c: Signal,
        d: Signal,
        qa: Signal,
        qb: Signal,
        qc: Signal,
        qd: Signal,
    ) -> Self {
        RippleCounter {
            clk_a: clk1,
            clk_b: clk2,
            clear: ClearInput::ActiveLow(clear_b),
            load: Some(LoadInput { load_b, a, b, c, d }),
            qa,
            qb,
            qc,
            qd,
            count_a: false,
            count_b: 0,
            prev_clk_a: false,
            prev_clk_b: false,
        }
    }
}

impl Chip for RippleCounter {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        let clk_a = ctx.read(self.clk_a);
        let clk_b = ctx.read(self.clk_b);

        let cleared = match self.clear {
            ClearInput::ActiveHighPair(r01, r02) => ctx.read(r01) && ctx.read(r02),
            ClearInput::ActiveLow(clear_b) => !ctx.read(clear_b),
        };
        let loaded = self
            .load
            .as_ref()
            .map(|l| !ctx.read(l.load_b))
            .unwrap_or(false);

        if cleared {
            self.count_a = false;
            self.count_b = 0;
        } else if loaded {
            let l = self.load.as_ref().unwrap();
            self.count_a = ctx.read(l.a);
            self.count_b =
                (ctx.read(l.b) as u8) | ((ctx.read(l.c) as u8) << 1) | ((ctx.read(l.d) as u8) << 2);
        } else {
            let a_falling = self.prev_clk_a && !clk_a;
            if a_falling {
                self.count_a = !self.count_a;
            }

            if self.clk_b == self.qa {
                if a_falling {
                    self.count_b = self.count_b.wrapping_add(!self.count_a as u8) & 0b111;
                }
            } else if self.prev_clk_b && !clk_b {
                self.count_b = (self.count_b + 1) & 0b111;
            }
        }

        ctx.write(self.qa, self.count_a);
        ctx.write(self.qb, self.count_b & 0b001 != 0);
        ctx.write(self.qc, self.count_b & 0b010 != 0);
        ctx.write(self.qd, self.count_b & 0b100 != 0);

        self.prev_clk_a = clk_a;
        self.prev_clk_b = clk_b;
        None
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        ctx.depends_on(self.clk_a);
        ctx.depends_on(self.clk_b);
        match self.clear {
            ClearInput::ActiveHighPair(r01, r02) => {
                ctx.depends_on(r01);
                ctx.depends_on(r02);
            }
            ClearInput::ActiveLow(clear_b) => ctx.depends_on(clear_b),
        }
        if let Some(l) = &self.load {
            ctx.depends_on(l.load_b);
            ctx.depends_on(l.a);
            ctx.depends_on(l.b);
            ctx.depends_on(l.c);
            ctx.depends_on(l.d);
        }
    }
}

/// A 74191-style 4-bit synchronous up/down counter with ripple
/// carry/borrow output.
pub struct UpDownCounter {
    clk: Signal,
    enable_b: Signal,
    load_b: Signal,
    down: Signal,
    a: Signal,
    b: Signal,
    c: Signal,
    d: Signal,
    qa: Signal,
    qb: Signal,
    qc: Signal,
    qd: Signal,
    max_min: Signal,
    rco_b: Signal,
    state: u8,
    at_extreme: bool,
    prev_clk: bool,
}

impl UpDownCounter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        clk: Signal,
        enable_b: Signal,
        load_b: Signal,
        down: Signal,
        a: Signal,
        b: Signal,
        c: Signal,
        d: Signal,
        qa: Signal,
        qb: Signal,
        qc: Signal,
        qd: Signal,
        max_min: Signal,
        rco_b: Signal,
    ) -> Self {
        UpDownCounter {
            clk,
            enable_b,
            load_b,
            down,
            a,
            b,
            c,
            d,
            qa,
            qb,
            qc,
            qd,
            max_min,
            rco_b,
            state: 0,
            at_extreme: false,
            prev_clk: false,
        }
    }
}

impl Chip for UpDownCounter {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        let clk = ctx.read(self.clk);
        let down = ctx.read(self.down);
        let mut rco = true;

        if !ctx.read(self.load_b) {
            self.state = (ctx.read(self.a) as u8)
                | ((ctx.read(self.b) as u8) << 1)
                | ((ctx.read(self.c) as u8) << 2)
                | ((ctx.read(self.d) as u8) << 3);
        } else if !ctx.read(self.enable_b) && clk && !self.prev_clk {
            self.state = (self.state.wrapping_sub(down as u8).wrapping_add(!down as u8)) & 0xf;
            self.at_extreme = (down && self.state == 0) || (!down && self.state == 0xf);
        } else if !clk && self.prev_clk {
            rco = !self.at_extreme;
        }

        ctx.write(self.qa, self.state & 0b0001 != 0);
        ctx.write(self.qb, self.state & 0b0010 != 0);
        ctx.write(self.qc, self.state & 0b0100 != 0);
        ctx.write(self.qd, self.state & 0b1000 != 0);
        ctx.write(self.max_min, self.at_extreme);
        ctx.write(self.rco_b, rco);

        self.prev_clk = clk;
        None
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        ctx.depends_on(self.clk);
        ctx.depends_on(self.enable_b);
        ctx.depends_on(self.load_b);
        ctx.depends_on(self.a);
        ctx.depends_on(self.b);
        ctx.depends_on(self.c);
        ctx.depends_on(self.d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixedDriver;
    use dromaius_core::Simulator;

    #[test]
    fn binary_counter_sequences_0_through_9() {
        // spec concrete scenario 2: 7493 ripple counter
        let mut sim = Simulator::with_workers(1_000, 1);
        let pool = sim.pool_mut();
        let a_b = pool.signal_create();
        let r01 = pool.signal_create();
        let r02 = pool.signal_create();
        let qa = pool.signal_create();
        let qb = pool.signal_create();
        let qc = pool.signal_create();
        let qd = pool.signal_create();
        let b_b = qa; // wire stage B's clock directly to stage A's output

        let (driver, handles) =
            FixedDriver::with_handles([(a_b, false), (r01, false), (r02, false)]);
        sim.register_chip("drv", Box::new(driver));
        sim.register_chip(
            "counter",
            Box::new(RippleCounter::binary_7493(a_b, b_b, r01, r02, qa, qb, qc, qd)),
        );
        sim.device_complete();

        let read_count = |sim: &Simulator| {
            (sim.pool().read(qa) as u8)
                | ((sim.pool().read(qb) as u8) << 1)
                | ((sim.pool().read(qc) as u8) << 2)
                | ((sim.pool().read(qd) as u8) << 3)
        };

        sim.simulate_timestep();
        let mut counts = Vec::new();
        for _ in 0..10 {
            handles[0].set(true);
            sim.simulate_timestep();
            sim.simulate_timestep();
            counts.push(read_count(&sim));
            handles[0].set(false);
            sim.simulate_timestep();
            sim.simulate_timestep();
        }

        assert_eq!(counts, (1..=10).map(|n| n % 16).collect::<Vec<_>>());
    }

    #[test]
    fn active_high_reset_pair_clears_counter() {
        let mut sim = Simulator::with_workers(1_000, 1);
        let pool = sim.pool_mut();
        let a_b = pool.signal_create();
        let b_b = pool.signal_create();
        let r01 = pool.signal_create();
        let r02 = pool.signal_create();
        let qa = pool.signal_create();
        let qb = pool.signal_create();
        let qc = pool.signal_create();
        let qd = pool.signal_create();

        let (driver, handles) =
            FixedDriver::with_handles([(a_b, false), (b_b, false), (r01, true), (r02, true)]);
        sim.register_chip("drv", Box::new(driver));
        sim.register_chip(
            "counter",
            Box::new(RippleCounter::binary_7493(a_b, b_b, r01, r02, qa, qb, qc, qd)),
        );
        sim.device_complete();

        sim.simulate_timestep();
        sim.simulate_timestep();
        assert!(!sim.pool().read(qa));
        assert!(!sim.pool().read(qb));
        let _ = handles;
    }

    #[test]
    fn up_down_counter_counts_down_and_raises_carry() {
        let mut sim = Simulator::with_workers(1_000, 1);
        let pool = sim.pool_mut();
        let clk = pool.signal_create();
        let enable_b = pool.signal_create();
        let load_b = pool.signal_create();
        let down = pool.signal_create();
        let a = pool.signal_create();
        let b = pool.signal_create();
        let c = pool.signal_create();
        let d = pool.signal_create();
        let qa = pool.signal_create();
        let qb = pool.signal_create();
        let qc = pool.signal_create();
        let qd = pool.signal_create();
        let max_min = pool.signal_create();
        let rco_b = pool.signal_create();

        let (driver, handles) = FixedDriver::with_handles([
            (clk, false),
            (enable_b, false),
            (load_b, false),
            (down, true),
            (a, true),
            (b, false),
            (c, false),
            (d, false),
        ]);
        sim.register_chip("drv", Box::new(driver));
        sim.register_chip(
            "counter",
            Box::new(UpDownCounter::new(
                clk, enable_b, load_b, down, a, b, c, d, qa, qb, qc, qd, max_min, rco_b,
            )),
        );
        sim.device_complete();

        // load value 1
        sim.simulate_timestep();
        sim.simulate_timestep();
        assert!(sim.pool().read(qa));

        // release load, clock down to 0
        handles[2].set(true);
        sim.simulate_timestep();
        handles[0].set(true);
        sim.simulate_timestep();
        sim.simulate_timestep();
        assert!(!sim.pool().read(qa));
        assert!(sim.pool().read(max_min));
    }
}
