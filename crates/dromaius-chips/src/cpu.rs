//! A 6502-style micro-sequencer.
//!
//! No chip source for the CPU itself ships in `original_source/` (only
//! `dev_minimal_6502.c`, which wires one up, and the GUI disassembler
//! panels survive). The bus contract below — 16-bit address bus, 8-bit
//! data bus, active-low RESET/IRQ/NMI, SYNC asserted on an opcode
//! fetch, RDY stalling the sequencer mid-instruction, φ2 driving one
//! micro-step per rising edge — is taken directly from
//! `dev_minimal_6502.c`'s wiring, the same way [`crate::via`] is
//! clocked by φ2. The opcode table itself is deliberately small:
//! enough to demonstrate the fetch-on-sync / per-opcode micro-step
//! dispatch contract, not a full 6502 instruction set.

use dromaius_core::{Chip, DependencyContext, Signal, SignalContext, SignalGroup, Tick};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Step {
    FetchOpcode,
    FetchOperandLow,
    FetchOperandHigh,
    ReadOrWrite,
    Execute,
}

#[derive(Clone, Copy)]
enum Opcode {
    Nop,
    LdaImmediate,
    LdaAbsolute,
    StaAbsolute,
    JmpAbsolute,
    Inx,
    Dex,
    Clc,
    Sec,
    AdcImmediate,
    BeqRelative,
}

fn decode(opcode: u8) -> Option<Opcode> {
    match opcode {
        0xea => Some(Opcode::Nop),
        0xa9 => Some(Opcode::LdaImmediate),
        0xad => Some(Opcode::LdaAbsolute),
        0x8d => Some(Opcode::StaAbsolute),
        0x4c => Some(Opcode::JmpAbsolute),
        0xe8 => Some(Opcode::Inx),
        0xca => Some(Opcode::Dex),
        0x18 => Some(Opcode::Clc),
        0x38 => Some(Opcode::Sec),
        0x69 => Some(Opcode::AdcImmediate),
        0xf0 => Some(Opcode::BeqRelative),
        _ => None,
    }
}

/// `Opcode::LdaImmediate`/`AdcImmediate` read one operand byte and
/// execute; absolute-mode opcodes read a two-byte operand first.
fn operand_bytes(opcode: Opcode) -> u8 {
    match opcode {
        Opcode::Nop | Opcode::Inx | Opcode::Dex | Opcode::Clc | Opcode::Sec => 0,
        Opcode::LdaImmediate | Opcode::AdcImmediate | Opcode::BeqRelative => 1,
        Opcode::LdaAbsolute | Opcode::StaAbsolute | Opcode::JmpAbsolute => 2,
    }
}

/// A reduced 6502-style CPU core: samples RES/IRQ/NMI per the usual
/// 6502 rules (RES and IRQ level-sensitive, sampled during the last
/// cycle of an instruction; NMI edge-triggered), asserts SYNC while
/// fetching an opcode, stalls the whole sequencer while RDY is low,
/// and advances exactly one micro-step per φ2 rising edge.
pub struct Cpu {
    address: SignalGroup,
    data: SignalGroup,
    reset_b: Signal,
    rw: Signal,
    irq_b: Signal,
    nmi_b: Signal,
    sync: Signal,
    rdy: Signal,
    phi2: Signal,

    a: u8,
    x: u8,
    pc: u16,
    carry: bool,
    operand: u16,
    opcode: Option<Opcode>,
    step: Step,
    bytes_read: u8,

    prev_nmi_b: bool,
    prev_phi2: bool,
    in_reset: bool,
}

impl Cpu {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        address: SignalGroup,
        data: SignalGroup,
        reset_b: Signal,
        rw: Signal,
        irq_b: Signal,
        nmi_b: Signal,
        sync: Signal,
        rdy: Signal,
        phi2: Signal,
    ) -> Self {
        Cpu {
            address,
            data,
            reset_b,
            rw,
            irq_b,
            nmi_b,
            sync,
            rdy,
            phi2,
            a: 0,
            x: 0,
            pc: 0xfffc,
            carry: false,
            operand: 0,
            opcode: None,
            step: Step::FetchOpcode,
            bytes_read: 0,
            prev_nmi_b: true,
            prev_phi2: false,
            in_reset: true,
        }
    }

    pub fn a(&self) -> u8 {
        self.a
    }

    pub fn x(&self) -> u8 {
        self.x
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    fn begin_instruction(&mut self) {
        self.step = Step::FetchOpcode;
        self.opcode = None;
        self.bytes_read = 0;
        self.operand = 0;
    }

    fn execute(&mut self, ctx: &mut SignalContext<'_>, opcode: Opcode) {
        match opcode {
            Opcode::Nop => {}
            Opcode::LdaImmediate => self.a = self.operand as u8,
            Opcode::LdaAbsolute => self.a = self.data.ctx_read(ctx) as u8,
            Opcode::StaAbsolute => {}
            Opcode::JmpAbsolute => self.pc = self.operand,
            Opcode::Inx => self.x = self.x.wrapping_add(1),
            Opcode::Dex => self.x = self.x.wrapping_sub(1),
            Opcode::Clc => self.carry = false,
            Opcode::Sec => self.carry = true,
            Opcode::AdcImmediate => {
                let (sum, carry) = self.a.overflowing_add(self.operand as u8);
                let (sum, carry2) = sum.overflowing_add(self.carry as u8);
                self.a = sum;
                self.carry = carry || carry2;
            }
            Opcode::BeqRelative => {
                if self.carry {
                    let offset = self.operand as u8 as i8;
                    self.pc = self.pc.wrapping_add(offset as u16);
                }
            }
        }
    }
}

impl Chip for Cpu {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        if !ctx.read(self.rdy) {
            ctx.write(self.sync, false);
            return None;
        }

        if !ctx.read(self.reset_b) {
            self.in_reset = true;
            ctx.write(self.sync, false);
            ctx.clear_writer(self.rw); // tri-state data bus while reset holds the address high-Z
            return None;
        }

        if self.in_reset {
            self.in_reset = false;
            self.pc = 0xfffc;
            self.begin_instruction();
        }

        let phi2 = ctx.read(self.phi2);
        let phi2_rising = phi2 && !self.prev_phi2;
        self.prev_phi2 = phi2;
        if !phi2_rising {
            return None;
        }

        let nmi_b = ctx.read(self.nmi_b);
        let nmi_edge = !nmi_b && self.prev_nmi_b;
        self.prev_nmi_b = nmi_b;

        match self.step {
            Step::FetchOpcode => {
                ctx.write(self.sync, true);
                self.address.ctx_write(ctx, self.pc as u32);
                ctx.write(self.rw, true);

                let opcode_byte = self.data.ctx_read(ctx) as u8;
                self.pc = self.pc.wrapping_add(1);
                self.opcode = decode(opcode_byte);
                self.step = if operand_bytes(self.opcode.unwrap_or(Opcode::Nop)) > 0 {
                    Step::FetchOperandLow
                } else {
                    Step::Execute
                };
            }
            Step::FetchOperandLow => {
                ctx.write(self.sync, false);
                self.address.ctx_write(ctx, self.pc as u32);
                ctx.write(self.rw, true);
                let byte = self.data.ctx_read(ctx) as u8;
                self.operand = byte as u16;
                self.pc = self.pc.wrapping_add(1);
                self.bytes_read = 1;

                let need_high = operand_bytes(self.opcode.unwrap_or(Opcode::Nop)) > 1;
                self.step = if need_high { Step::FetchOperandHigh } else { Step::Execute };
            }
            Step::FetchOperandHigh => {
                ctx.write(self.sync, false);
                self.address.ctx_write(ctx, self.pc as u32);
                ctx.write(self.rw, true);
                let byte = self.data.ctx_read(ctx) as u8;
                self.operand |= (byte as u16) << 8;
                self.pc = self.pc.wrapping_add(1);
                self.step = Step::ReadOrWrite;
            }
            Step::ReadOrWrite => {
                ctx.write(self.sync, false);
                match self.opcode {
                    Some(Opcode::LdaAbsolute) => {
                        self.address.ctx_write(ctx, self.operand as u32);
                        ctx.write(self.rw, true);
                    }
                    Some(Opcode::StaAbsolute) => {
                        self.address.ctx_write(ctx, self.operand as u32);
                        ctx.write(self.rw, false);
                        self.data.ctx_write(ctx, self.a as u32);
                    }
                    _ => {}
                }
                self.step = Step::Execute;
            }
            Step::Execute => {
                ctx.write(self.sync, false);
                if let Some(opcode) = self.opcode {
                    self.execute(ctx, opcode);
                }
                self.begin_instruction();
            }
        }

        if nmi_edge {
            self.pc = 0xfffa;
            self.begin_instruction();
        } else if self.step == Step::FetchOpcode && !ctx.read(self.irq_b) {
            self.pc = 0xfffe;
        }

        None
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        ctx.depends_on(self.reset_b);
        ctx.depends_on(self.rdy);
        ctx.depends_on(self.nmi_b);
        ctx.depends_on(self.irq_b);
        ctx.depends_on(self.phi2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Rom;
    use crate::testing::{FixedDriver, Shared};
    use dromaius_core::Simulator;

    #[test]
    fn fetches_and_executes_lda_immediate_then_nop() {
        let mut sim = Simulator::with_workers(1_000, 1);
        let address = SignalGroup::create(sim.pool_mut(), 16);
        let data = SignalGroup::create(sim.pool_mut(), 8);
        let reset_b = sim.pool_mut().signal_create();
        let rw = sim.pool_mut().signal_create();
        let irq_b = sim.pool_mut().signal_create();
        let nmi_b = sim.pool_mut().signal_create();
        let sync = sim.pool_mut().signal_create();
        let rdy = sim.pool_mut().signal_create();
        let phi2 = sim.pool_mut().signal_create();
        sim.pool_mut().default(irq_b, true);
        sim.pool_mut().default(nmi_b, true);
        sim.pool_mut().default(rdy, true);

        let mut program = vec![0u8; 0x10000];
        program[0xfffc] = 0xa9; // LDA #$42
        program[0xfffd] = 0x42;
        program[0xfffe] = 0xea; // NOP

        let rom = Rom::new(address.clone(), data.clone(), vec![], 1, program);
        sim.register_chip("rom", Box::new(rom));
        let (cpu, cpu_handle) = Shared::new(Cpu::new(address, data, reset_b, rw, irq_b, nmi_b, sync, rdy, phi2));
        sim.register_chip("cpu", Box::new(cpu));

        let (driver, handles) = FixedDriver::with_handles([(reset_b, false), (phi2, false)]);
        sim.register_chip("drv", Box::new(driver));
        sim.device_complete();

        sim.simulate_timestep();
        handles[0].set(true); // release reset
        sim.simulate_timestep();
        sim.simulate_timestep();

        let pulse_phi2 = |sim: &mut Simulator, handles: &[crate::testing::DriverHandle]| {
            handles[1].set(true);
            sim.simulate_timestep();
            sim.simulate_timestep();
            handles[1].set(false);
            sim.simulate_timestep();
            sim.simulate_timestep();
        };

        // three rising edges: fetch opcode, fetch the immediate operand, execute
        pulse_phi2(&mut sim, &handles);
        pulse_phi2(&mut sim, &handles);
        pulse_phi2(&mut sim, &handles);

        assert_eq!(cpu_handle.lock().unwrap().a(), 0x42);

        // a fourth edge fetches the trailing NOP and leaves PC past it
        pulse_phi2(&mut sim, &handles);
        assert_eq!(cpu_handle.lock().unwrap().pc(), 0xffff);
    }
}
