//! 6520 Peripheral Interface Adapter.
//!
//! No `original_source/` file models this chip (only GUI panel code
//! references it), so this module is derived from the 6522 VIA in
//! [`crate::via`] rather than ported from a C file directly: same
//! register-pair/DDR/control-line shape, without the VIA's timers or
//! shift register. See `DESIGN.md` for the rationale.

use dromaius_core::{Chip, DependencyContext, Signal, SignalContext, SignalGroup, Tick};

struct PortControlState {
    prev_c1: bool,
    prev_c2: bool,
    c2_is_output: bool,
    out_c2: bool,
}

impl Default for PortControlState {
    fn default() -> Self {
        PortControlState {
            prev_c1: false,
            prev_c2: false,
            c2_is_output: false,
            out_c2: true,
        }
    }
}

struct PiaPort {
    io: SignalGroup,
    c1: Signal,
    c2: Signal,
    or: u8,
    ddr: u8,
    ir: u8,
    control: u8,
    state: PortControlState,
    irq_b: Signal,
}

impl PiaPort {
    fn new(io: SignalGroup, c1: Signal, c2: Signal, irq_b: Signal) -> Self {
        PiaPort {
            io,
            c1,
            c2,
            or: 0,
            ddr: 0,
            ir: 0,
            control: 0,
            state: PortControlState::default(),
            irq_b,
        }
    }

    fn read_output_reg(&mut self) -> u8 {
        self.control &= !0b1000_0000; // clear IRQA1 flag on read
        (self.ir & !self.ddr) | (self.or & self.ddr)
    }

    fn latch_input(&mut self, ctx: &SignalContext<'_>) {
        self.ir = self.io.ctx_read(ctx) as u8;
    }

    fn sample_control_lines(&mut self, ctx: &SignalContext<'_>) {
        let c1 = ctx.read(self.c1);
        let c1_pos = self.control & 0b0000_0010 != 0;
        let c1_active = (c1 && !self.state.prev_c1 && c1_pos) || (!c1 && self.state.prev_c1 && !c1_pos);
        if c1_active {
            self.control |= 0b1000_0000;
        }

        self.state.c2_is_output = self.control & 0b0010_0000 != 0;
        if !self.state.c2_is_output {
            let c2 = ctx.read(self.c2);
            let c2_pos = self.control & 0b0000_1000 != 0;
            let c2_active = (c2 && !self.state.prev_c2 && c2_pos) || (!c2 && self.state.prev_c2 && !c2_pos);
            if c2_active {
                self.control |= 0b0100_0000;
            }
            self.state.prev_c2 = c2;
        }

        self.state.prev_c1 = c1;
    }

    fn drive_outputs(&mut self, ctx: &mut SignalContext<'_>) {
        self.io.ctx_write_masked(ctx, self.or as u32, self.ddr as u32);

        if self.state.c2_is_output {
            let mode = (self.control >> 3) & 0b111;
            self.state.out_c2 = match mode {
                0b110 => false, // manual output, low
                0b111 => true,  // manual output, high
                _ => self.state.out_c2,
            };
            ctx.write(self.c2, self.state.out_c2);
        } else {
            ctx.clear_writer(self.c2);
        }

        let irq = (self.control & 0b1000_0000 != 0 && self.control & 0b0000_0001 != 0)
            || (self.control & 0b0100_0000 != 0 && self.control & 0b0000_0100 != 0);
        ctx.write(self.irq_b, !irq);
    }
}

/// A 6520-style PIA: two independent ports (A/B), each with an
/// output/data-direction register pair selected by bit 2 of the
/// control register, and two control lines (C1/C2) supporting
/// interrupt-flagging input or manual/handshake output, modeled after
/// the VIA's simpler single-port slice (no timers, no shift
/// register).
pub struct Pia {
    rs0: Signal,
    rs1: Signal,
    cs: Signal,
    rw: Signal,
    enable: Signal,
    reset_b: Signal,
    data: SignalGroup,
    port_a: PiaPort,
    port_b: PiaPort,
}

impl Pia {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rs0: Signal,
        rs1: Signal,
        cs: Signal,
        rw: Signal,
        enable: Signal,
        reset_b: Signal,
        data: SignalGroup,
        io_a: SignalGroup,
        ca1: Signal,
        ca2: Signal,
        irqa_b: Signal,
        io_b: SignalGroup,
        cb1: Signal,
        cb2: Signal,
        irqb_b: Signal,
    ) -> Self {
        Pia {
            rs0,
            rs1,
            cs,
            rw,
            enable,
            reset_b,
            data,
            port_a: PiaPort::new(io_a, ca1, ca2, irqa_b),
            port_b: PiaPort::new(io_b, cb1, cb2, irqb_b),
        }
    }
}

impl Chip for Pia {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        if !ctx.read(self.reset_b) {
            self.port_a.or = 0;
            self.port_a.ddr = 0;
            self.port_a.control = 0;
            self.port_b.or = 0;
            self.port_b.ddr = 0;
            self.port_b.control = 0;
        }

        self.port_a.sample_control_lines(ctx);
        self.port_b.sample_control_lines(ctx);
        self.port_a.latch_input(ctx);
        self.port_b.latch_input(ctx);

        if ctx.read(self.cs) && ctx.changed(self.enable) && ctx.read(self.enable) {
            let select_b = ctx.read(self.rs1);
            let select_ddr = !ctx.read(self.rs0);

            let port = if select_b { &mut self.port_b } else { &mut self.port_a };
            let access_ddr = select_ddr && port.control & 0b0000_0100 == 0;

            if ctx.read(self.rw) {
                let value = if access_ddr { port.ddr } else { port.read_output_reg() };
                self.data.ctx_write(ctx, value as u32);
            } else {
                let value = self.data.ctx_read(ctx) as u8;
                if access_ddr {
                    port.ddr = value;
                } else if select_ddr {
                    port.control = value;
                } else {
                    port.or = value;
                }
            }
        }

        self.port_a.drive_outputs(ctx);
        self.port_b.drive_outputs(ctx);
        None
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        ctx.depends_on(self.reset_b);
        ctx.depends_on(self.enable);
        ctx.depends_on(self.cs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixedDriver;
    use dromaius_core::Simulator;

    #[test]
    fn reset_clears_control_registers() {
        let mut sim = Simulator::with_workers(1_000, 1);
        let rs0 = sim.pool_mut().signal_create();
        let rs1 = sim.pool_mut().signal_create();
        let cs = sim.pool_mut().signal_create();
        let rw = sim.pool_mut().signal_create();
        let enable = sim.pool_mut().signal_create();
        let reset_b = sim.pool_mut().signal_create();
        let data = SignalGroup::create(sim.pool_mut(), 8);
        let io_a = SignalGroup::create(sim.pool_mut(), 8);
        let ca1 = sim.pool_mut().signal_create();
        let ca2 = sim.pool_mut().signal_create();
        let irqa_b = sim.pool_mut().signal_create();
        let io_b = SignalGroup::create(sim.pool_mut(), 8);
        let cb1 = sim.pool_mut().signal_create();
        let cb2 = sim.pool_mut().signal_create();
        let irqb_b = sim.pool_mut().signal_create();

        let driver = FixedDriver::new([(reset_b, false), (cs, false), (enable, false)]);
        sim.register_chip("drv", Box::new(driver));
        sim.register_chip(
            "pia",
            Box::new(Pia::new(
                rs0, rs1, cs, rw, enable, reset_b, data, io_a, ca1, ca2, irqa_b, io_b, cb1, cb2, irqb_b,
            )),
        );
        sim.device_complete();

        sim.simulate_timestep();
        sim.simulate_timestep();
        assert!(sim.pool().read(irqa_b));
    }

    #[test]
    fn cpu_write_then_read_round_trips_port_a_output_register() {
        let mut sim = Simulator::with_workers(1_000, 1);
        let rs0 = sim.pool_mut().signal_create();
        let rs1 = sim.pool_mut().signal_create();
        let cs = sim.pool_mut().signal_create();
        let rw = sim.pool_mut().signal_create();
        let enable = sim.pool_mut().signal_create();
        let reset_b = sim.pool_mut().signal_create();
        let data = SignalGroup::create(sim.pool_mut(), 8);
        let io_a = SignalGroup::create(sim.pool_mut(), 8);
        let ca1 = sim.pool_mut().signal_create();
        let ca2 = sim.pool_mut().signal_create();
        let irqa_b = sim.pool_mut().signal_create();
        let io_b = SignalGroup::create(sim.pool_mut(), 8);
        let cb1 = sim.pool_mut().signal_create();
        let cb2 = sim.pool_mut().signal_create();
        let irqb_b = sim.pool_mut().signal_create();
        sim.pool_mut().default(reset_b, true);

        let mut pins: Vec<(Signal, bool)> = data.iter().map(|s| (s, true)).collect();
        pins.push((rs0, true));
        pins.push((rs1, false));
        pins.push((cs, true));
        pins.push((rw, false));
        let enable_idx = pins.len();
        pins.push((enable, false));

        let (driver, handles) = FixedDriver::with_handles(pins);
        sim.register_chip("drv", Box::new(driver));
        sim.register_chip(
            "pia",
            Box::new(Pia::new(
                rs0, rs1, cs, rw, enable, reset_b, data, io_a.clone(), ca1, ca2, irqa_b, io_b, cb1, cb2, irqb_b,
            )),
        );
        sim.device_complete();

        // Drive $ff onto the data bus, pulse enable to latch it into port A's
        // output register (DDR bit clear in the control register selects ORA).
        sim.simulate_timestep();
        handles[enable_idx].set(true);

        for _ in 0..3 {
            sim.simulate_timestep();
        }

        assert_eq!(io_a.read(sim.pool()) & 0xff, 0xff);
    }
}
