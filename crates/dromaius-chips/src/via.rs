//! 6522 Versatile Interface Adapter. Grounded on
//! `original_source/src/chip_6522.c`.
//!
//! The original source carries a comment noting its own open
//! questions (timer start-up timing, whether IER gates an IFR read,
//! what happens to the CB-flags in IFR when the shift register
//! activates); this port reproduces the behavior the original's own
//! unit tests pin down and does not try to resolve those questions
//! further.

use dromaius_core::{Chip, DependencyContext, Signal, SignalContext, SignalGroup, Tick};

const ADDR_ORB_IRB: u8 = 0b0000;
const ADDR_ORA_IRA: u8 = 0b0001;
const ADDR_DDRB: u8 = 0b0010;
const ADDR_DDRA: u8 = 0b0011;
const ADDR_T1C_L: u8 = 0b0100;
const ADDR_T1C_H: u8 = 0b0101;
const ADDR_T1L_L: u8 = 0b0110;
const ADDR_T1L_H: u8 = 0b0111;
const ADDR_T2C_L: u8 = 0b1000;
const ADDR_T2C_H: u8 = 0b1001;
const ADDR_SR: u8 = 0b1010;
const ADDR_ACR: u8 = 0b1011;
const ADDR_PCR: u8 = 0b1100;
const ADDR_IFR: u8 = 0b1101;
const ADDR_IER: u8 = 0b1110;
const ADDR_ORA_IRA_NOHS: u8 = 0b1111;

#[derive(Default)]
struct PortControlState {
    prev_cl1: bool,
    prev_cl2: bool,
    act_trans_cl1: bool,
    act_trans_cl2: bool,
    latched: bool,
    port_read: bool,
    port_written: bool,
    cl2_is_output: bool,
    out_cl2: bool,
    cl1_is_output: bool,
    out_cl1: bool,
}

#[derive(Default)]
struct OutputStage {
    drv_data: bool,
    data: u8,
    irq: bool,
    drv_ca2: bool,
    drv_cb1: bool,
    drv_cb2: bool,
    ca2: bool,
    cb1: bool,
    cb2: bool,
    reg_ora: u8,
    reg_ddra: u8,
    reg_orb: u8,
    reg_ddrb: u8,
}

pub struct Via {
    port_a: SignalGroup,
    port_b: SignalGroup,
    data: SignalGroup,
    rs: SignalGroup,
    ca1: Signal,
    ca2: Signal,
    cb1: Signal,
    cb2: Signal,
    irq_b: Signal,
    reset_b: Signal,
    phi2: Signal,
    cs1: Signal,
    cs2_b: Signal,
    rw: Signal,

    reg_ora: u8,
    reg_ddra: u8,
    reg_orb: u8,
    reg_ddrb: u8,
    reg_ila: u8,
    reg_ilb: u8,
    reg_t1c: u16,
    reg_t1l_l: u8,
    reg_t1l_h: u8,
    reg_t2c: u16,
    reg_t2l_l: u8,
    reg_t2l_h: u8,
    reg_sr: u8,
    reg_acr: u8,
    reg_pcr: u8,
    reg_ifr: u8,
    reg_ier: u8,

    state_a: PortControlState,
    state_b: PortControlState,

    strobe: bool,
    prev_pb6: bool,
    prev_cb1: bool,

    t1_start: bool,
    t1_enabled: bool,
    t1_clr_irq: bool,
    t1_set_irq: bool,

    t2_start: bool,
    t2_enabled: bool,
    t2_irq_done: bool,
    t2_clr_irq: bool,
    t2_set_irq: bool,

    sr_start: bool,
    sr_running: bool,
    sr_count: u8,
    sr_timer: u8,
    sr_clr_irq: bool,
    sr_set_irq: bool,

    output: OutputStage,
    last_output: OutputStage,
}

impl Via {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        port_a: SignalGroup,
        port_b: SignalGroup,
        data: SignalGroup,
        rs: SignalGroup,
        ca1: Signal,
        ca2: Signal,
        cb1: Signal,
        cb2: Signal,
        irq_b: Signal,
        reset_b: Signal,
        phi2: Signal,
        cs1: Signal,
        cs2_b: Signal,
        rw: Signal,
    ) -> Self {
        let mut via = Via {
            port_a,
            port_b,
            data,
            rs,
            ca1,
            ca2,
            cb1,
            cb2,
            irq_b,
            reset_b,
            phi2,
            cs1,
            cs2_b,
            rw,
            reg_ora: 0,
            reg_ddra: 0,
            reg_orb: 0,
            reg_ddrb: 0,
            reg_ila: 0,
            reg_ilb: 0,
            reg_t1c: 0,
            reg_t1l_l: 0,
            reg_t1l_h: 0,
            reg_t2c: 0,
            reg_t2l_l: 0,
            reg_t2l_h: 0,
            reg_sr: 0,
            reg_acr: 0,
            reg_pcr: 0,
            reg_ifr: 0,
            reg_ier: 0,
            state_a: PortControlState::default(),
            state_b: PortControlState::default(),
            strobe: false,
            prev_pb6: false,
            prev_cb1: false,
            t1_start: false,
            t1_enabled: false,
            t1_clr_irq: false,
            t1_set_irq: false,
            t2_start: false,
            t2_enabled: false,
            t2_irq_done: false,
            t2_clr_irq: false,
            t2_set_irq: false,
            sr_start: false,
            sr_running: false,
            sr_count: 0,
            sr_timer: 0,
            sr_clr_irq: false,
            sr_set_irq: false,
            output: OutputStage::default(),
            last_output: OutputStage::default(),
        };
        via.state_a.out_cl2 = true;
        via.state_b.out_cl2 = true;
        via.last_output.irq = true;
        via
    }

    fn rs_to_addr(&self, ctx: &SignalContext<'_>) -> u8 {
        self.rs.ctx_read(ctx) as u8
    }

    fn acr_t1_free_run(&self) -> bool {
        self.reg_acr & 0b0100_0000 != 0
    }

    fn acr_t1_square_wave(&self) -> bool {
        self.reg_acr & 0b1100_0000 == 0b1000_0000
    }

    fn acr_t2_count_pb6(&self) -> bool {
        self.reg_acr & 0b0010_0000 != 0
    }

    fn acr_sr_mode(&self) -> u8 {
        (self.reg_acr & 0b0001_1100) >> 2
    }

    fn acr_sr_shift_out(&self) -> bool {
        self.reg_acr & 0b0001_0000 != 0
    }

    fn acr_pa_latch(&self) -> bool {
        self.reg_acr & 0b0000_0001 != 0
    }

    fn acr_pb_latch(&self) -> bool {
        self.reg_acr & 0b0000_0010 != 0
    }

    fn write_register(&mut self, ctx: &mut SignalContext<'_>, addr: u8, value: u8) {
        match addr {
            ADDR_ORB_IRB => {
                self.reg_orb = value;
                self.state_b.port_written = true;
            }
            ADDR_ORA_IRA => {
                self.reg_ora = value;
                self.state_a.port_written = true;
            }
            ADDR_DDRB => {
                self.reg_ddrb = value;
                self.port_b.ctx_clear_writer(ctx);
            }
            ADDR_DDRA => {
                self.reg_ddra = value;
                self.port_a.ctx_clear_writer(ctx);
            }
            ADDR_T1C_L => self.reg_t1l_l = value,
            ADDR_T1C_H => {
                self.reg_t1l_h = value;
                self.t1_clr_irq = true;
                self.t1_start = true;
            }
            ADDR_T1L_L => self.reg_t1l_l = value,
            ADDR_T1L_H => {
                self.t1_clr_irq = true;
                self.reg_t1l_h = value;
            }
            ADDR_T2C_L => self.reg_t2l_l = value,
            ADDR_T2C_H => {
                self.reg_t2l_h = value;
                self.t2_clr_irq = true;
                self.t2_start = true;
            }
            ADDR_SR => {
                self.reg_sr = value;
                self.sr_start = true;
                self.sr_clr_irq = true;
            }
            ADDR_ACR => {
                self.reg_acr = value;
                self.setup_shift_register();
            }
            ADDR_PCR => self.reg_pcr = value,
            ADDR_IFR => self.reg_ifr &= !(value & 0x7f),
            ADDR_IER => {
                if value & 0x80 != 0 {
                    self.reg_ier |= value & 0x7f;
                } else {
                    self.reg_ier &= !value & 0x7f;
                }
            }
            ADDR_ORA_IRA_NOHS => self.reg_ora = value,
            _ => unreachable!(),
        }
    }

    fn read_register(&mut self, ctx: &SignalContext<'_>, addr: u8) -> u8 {
        match addr {
            ADDR_ORB_IRB => {
                self.state_b.port_read = true;
                (self.reg_ilb & !self.reg_ddrb) | (self.reg_orb & self.reg_ddrb)
            }
            ADDR_ORA_IRA => {
                self.state_a.port_read = true;
                self.reg_ila
            }
            ADDR_DDRB => self.reg_ddrb,
            ADDR_DDRA => self.reg_ddra,
            ADDR_T1C_L => {
                self.t1_clr_irq = true;
                (self.reg_t1c & 0xff) as u8
            }
            ADDR_T1C_H => (self.reg_t1c >> 8) as u8,
            ADDR_T1L_L => self.reg_t1l_l,
            ADDR_T1L_H => self.reg_t1l_h,
            ADDR_T2C_L => {
                self.t2_clr_irq = true;
                (self.reg_t2c & 0xff) as u8
            }
            ADDR_T2C_H => (self.reg_t2c >> 8) as u8,
            ADDR_SR => {
                self.sr_clr_irq = true;
                self.sr_start = true;
                self.reg_sr
            }
            ADDR_ACR => self.reg_acr,
            ADDR_PCR => self.reg_pcr,
            ADDR_IFR => self.reg_ifr,
            ADDR_IER => self.reg_ier | 0x80,
            ADDR_ORA_IRA_NOHS => self.port_a.ctx_read(ctx) as u8,
            _ => unreachable!(),
        }
    }

    fn setup_shift_register(&mut self) {
        match self.acr_sr_mode() {
            0b001 | 0b010 | 0b100 | 0b101 | 0b110 => {
                self.state_b.cl1_is_output = true;
                self.state_b.out_cl1 = true;
            }
            _ => self.state_b.cl1_is_output = false,
        }
    }

    fn process_end(&mut self, ctx: &mut SignalContext<'_>) {
        if self.output.irq != self.last_output.irq {
            ctx.write(self.irq_b, !self.output.irq);
            self.last_output.irq = self.output.irq;
        }

        if self.reg_ora != self.last_output.reg_ora || self.reg_ddra != self.last_output.reg_ddra {
            self.port_a.ctx_write_masked(ctx, self.reg_ora as u32, self.reg_ddra as u32);
            self.last_output.reg_ora = self.reg_ora;
            self.last_output.reg_ddra = self.reg_ddra;
        }

        if self.reg_orb != self.last_output.reg_orb || self.reg_ddrb != self.last_output.reg_ddrb {
            self.port_b.ctx_write_masked(ctx, self.reg_orb as u32, self.reg_ddrb as u32);
            self.last_output.reg_orb = self.reg_orb;
            self.last_output.reg_ddrb = self.reg_ddrb;
        }

        if self.output.drv_data {
            if self.output.data != self.last_output.data || !self.last_output.drv_data {
                self.data.ctx_write(ctx, self.output.data as u32);
                self.last_output.data = self.output.data;
                self.last_output.drv_data = true;
            }
        } else if self.last_output.drv_data {
            self.data.ctx_clear_writer(ctx);
            self.last_output.drv_data = false;
        }

        if self.state_a.cl2_is_output {
            if self.state_a.out_cl2 != self.last_output.ca2 || !self.last_output.drv_ca2 {
                ctx.write(self.ca2, self.state_a.out_cl2);
                self.last_output.drv_ca2 = true;
                self.last_output.ca2 = self.state_a.out_cl2;
            }
        } else if self.last_output.drv_ca2 {
            ctx.clear_writer(self.ca2);
            self.last_output.drv_ca2 = false;
        }

        if self.state_b.cl1_is_output {
            if self.state_b.out_cl1 != self.last_output.cb1 || !self.last_output.drv_cb1 {
                ctx.write(self.cb1, self.state_b.out_cl1);
                self.last_output.drv_cb1 = true;
                self.last_output.cb1 = self.state_b.out_cl1;
            }
        } else if self.last_output.drv_cb1 {
            ctx.clear_writer(self.cb1);
            self.last_output.drv_cb1 = false;
        }

        if self.state_b.cl2_is_output {
            if self.state_b.out_cl2 != self.last_output.cb2 || !self.last_output.drv_cb2 {
                ctx.write(self.cb2, self.state_b.out_cl2);
                self.last_output.drv_cb2 = true;
                self.last_output.cb2 = self.state_b.out_cl2;
            }
        } else if self.last_output.drv_cb2 {
            ctx.clear_writer(self.cb2);
            self.last_output.drv_cb2 = false;
        }
    }

    fn process_control_line_port_input(cl1: bool, cl2: bool, control: u8, state: &mut PortControlState) {
        let cl1_pos = control & 0b0001 == 0b0001;
        state.act_trans_cl1 = (cl1 && !state.prev_cl1 && cl1_pos) || (!cl1 && state.prev_cl1 && !cl1_pos);

        state.cl2_is_output = control & 0b1000 == 0b1000;
        if !state.cl2_is_output {
            let cl2_pos = control & 0b0100 == 0b0100;
            state.act_trans_cl2 = (cl2 && !state.prev_cl2 && cl2_pos) || (!cl2 && state.prev_cl2 && !cl2_pos);
        }

        state.latched = state.latched || state.act_trans_cl1;
        state.prev_cl1 = cl1;
        state.prev_cl2 = cl2;
    }

    fn process_control_line_output(check_read: bool, control: u8, state: &mut PortControlState) {
        match (control >> 1) & 0b11 {
            0b10 => {
                if (check_read && state.port_read) || state.port_written {
                    state.out_cl2 = false;
                }
                if state.act_trans_cl1 {
                    state.out_cl2 = true;
                }
            }
            0b11 => {
                state.out_cl2 = !((check_read && state.port_read) || state.port_written);
            }
            _ => state.out_cl2 = control & 0b0010 != 0,
        }
    }

    fn process_edge_common(&mut self, ctx: &mut SignalContext<'_>) {
        if !self.acr_pa_latch() || !self.state_a.latched {
            self.reg_ila = self.port_a.ctx_read(ctx) as u8;
        }
        if !self.acr_pb_latch() || !self.state_b.latched {
            self.reg_ilb = self.port_b.ctx_read(ctx) as u8;
        }
    }

    fn build_interrupt_register(&mut self) {
        let new_ifr = (self.state_a.act_trans_cl2 as u8)
            | ((self.state_a.act_trans_cl1 as u8) << 1)
            | ((self.sr_set_irq as u8) << 2)
            | ((self.state_b.act_trans_cl2 as u8) << 3)
            | ((self.state_b.act_trans_cl1 as u8) << 4)
            | ((self.t2_set_irq as u8) << 5)
            | ((self.t1_set_irq as u8) << 6);
        self.reg_ifr |= new_ifr;

        let mut clr_ifr: u8 = ((self.state_a.port_read || self.state_a.port_written) as u8)
            | ((self.state_a.port_read || self.state_a.port_written) as u8) << 1
            | (self.sr_clr_irq as u8) << 2
            | ((self.state_b.port_read || self.state_b.port_written) as u8) << 3
            | ((self.state_b.port_read || self.state_b.port_written) as u8) << 4
            | (self.t2_clr_irq as u8) << 5
            | (self.t1_clr_irq as u8) << 6;

        let ca2_indep = matches!(self.reg_pcr & 0x0c, 0b0000 | 0b0100);
        if ca2_indep {
            clr_ifr &= 0b1111_1110;
        }
        let cb2_indep = matches!((self.reg_pcr >> 4) & 0x0c, 0b0000 | 0b0100);
        if cb2_indep {
            clr_ifr &= 0b1111_0111;
        }

        self.reg_ifr &= !clr_ifr;

        self.t1_clr_irq = false;
        self.t1_set_irq = false;
        self.t2_clr_irq = false;
        self.t2_set_irq = false;
        self.sr_clr_irq = false;
        self.sr_set_irq = false;

        if self.reg_ifr & self.reg_ier > 0 {
            self.reg_ifr |= 0x80;
            self.output.irq = true;
        } else {
            self.reg_ifr &= 0x7f;
            self.output.irq = false;
        }
    }

    fn process_timer1(&mut self) {
        if self.t1_start {
            self.reg_t1c = ((self.reg_t1l_h as u16) << 8) | self.reg_t1l_l as u16;
            self.t1_start = false;
            self.t1_enabled = true;
            if !self.acr_t1_free_run() {
                self.reg_orb &= !0b1000_0000;
            }
            return;
        }

        if !self.t1_enabled {
            return;
        }

        if self.reg_t1c == 0 {
            self.t1_set_irq = true;
            if self.acr_t1_square_wave() {
                self.reg_orb ^= 0b1000_0000;
            } else if !self.acr_t1_free_run() {
                self.reg_orb |= 0b1000_0000;
            }
            self.t1_start = self.reg_acr & 0b0100_0000 != 0;
            self.t1_enabled = false;
        }

        self.reg_t1c = self.reg_t1c.wrapping_sub(1);
    }

    fn process_timer2(&mut self) {
        if self.t2_start {
            self.reg_t2c = ((self.reg_t2l_h as u16) << 8) | self.reg_t2l_l as u16;
            self.t2_start = false;
            self.t2_enabled = true;
            self.t2_irq_done = false;
            self.prev_pb6 = self.reg_ilb & 0b0100_0000 != 0;
            return;
        }

        if !self.t2_enabled {
            return;
        }

        let count_pb6 = self.acr_t2_count_pb6();

        if self.reg_t2c == 0 && !self.t2_irq_done {
            self.t2_set_irq = true;
            self.t2_irq_done = true;
        }

        let pb6 = self.reg_ilb & 0b0100_0000 != 0;
        if !count_pb6 || (self.prev_pb6 && !pb6) {
            self.reg_t2c = self.reg_t2c.wrapping_sub(1);
        }
        self.prev_pb6 = pb6;
    }

    fn process_shift_register(&mut self, ctx: &SignalContext<'_>) {
        if self.sr_start {
            self.sr_start = false;
            self.sr_running = true;
            self.sr_count = 0;
            self.sr_timer = 1;
            self.state_b.out_cl1 = true;
            return;
        }

        let mode = self.acr_sr_mode();
        if mode == 0 || !self.sr_running {
            return;
        }

        if self.sr_count == 8 {
            if mode != 0b100 {
                self.sr_set_irq = true;
                self.sr_running = false;
                return;
            } else {
                self.sr_count = 0;
            }
        }

        let shift_out = self.acr_sr_shift_out();
        let mut do_shift = false;

        match mode & 0b011 {
            0b010 => {
                self.state_b.out_cl1 = !self.state_b.out_cl1;
                do_shift = self.state_b.out_cl1;
            }
            0b011 => {
                do_shift = !self.prev_cb1 && ctx.read(self.cb1);
            }
            _ => {
                self.sr_timer = self.sr_timer.wrapping_sub(1);
                if self.sr_timer == 0 {
                    self.state_b.out_cl1 = !self.state_b.out_cl1;
                    do_shift = self.state_b.out_cl1;
                    self.sr_timer = self.reg_t2l_l;
                }
            }
        }

        if !do_shift {
            return;
        }

        if shift_out {
            self.state_b.cl2_is_output = true;
            self.state_b.out_cl2 = self.reg_sr & 0x80 != 0;
            self.reg_sr = (self.reg_sr << 1) | self.state_b.out_cl2 as u8;
        } else {
            self.reg_sr = (self.reg_sr << 1) | ctx.read(self.cb2) as u8;
        }

        self.sr_count += 1;
    }

    fn process_positive_enable_edge(&mut self, ctx: &mut SignalContext<'_>) {
        self.process_edge_common(ctx);
        if self.strobe && ctx.read(self.rw) {
            let addr = self.rs_to_addr(ctx);
            self.output.data = self.read_register(ctx, addr);
            self.output.drv_data = true;
        }
    }

    fn process_negative_enable_edge(&mut self, ctx: &mut SignalContext<'_>) {
        self.process_edge_common(ctx);

        let ca1 = ctx.read(self.ca1);
        let ca2 = ctx.read(self.ca2);
        let cb1 = ctx.read(self.cb1);
        let cb2 = ctx.read(self.cb2);
        let pcr = self.reg_pcr;
        Self::process_control_line_port_input(ca1, ca2, pcr & 0x0f, &mut self.state_a);
        Self::process_control_line_port_input(cb1, cb2, pcr >> 4, &mut self.state_b);

        self.process_timer1();
        self.process_timer2();
        self.process_shift_register(ctx);

        if self.strobe {
            if !ctx.read(self.rw) {
                let addr = self.rs_to_addr(ctx);
                let value = self.data.ctx_read(ctx) as u8;
                self.write_register(ctx, addr, value);
            } else {
                let addr = self.rs_to_addr(ctx);
                self.output.data = self.read_register(ctx, addr);
                self.output.drv_data = true;
                self.state_a.latched = self.state_a.latched && !self.state_a.port_read;
                self.state_b.latched = self.state_b.latched && !self.state_b.port_read;
            }
        }

        if self.state_a.cl2_is_output {
            Self::process_control_line_output(true, self.reg_pcr & 0x0f, &mut self.state_a);
        }
        if self.state_b.cl2_is_output && self.reg_acr & 0b0001_0000 == 0 {
            Self::process_control_line_output(false, self.reg_pcr >> 4, &mut self.state_b);
        }

        self.build_interrupt_register();
        self.prev_cb1 = ctx.read(self.cb1);
    }
}

impl Chip for Via {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        self.state_a.port_read = false;
        self.state_a.port_written = false;
        self.state_b.port_read = false;
        self.state_b.port_written = false;

        if !ctx.read(self.reset_b) {
            self.reg_ifr = 0;
            self.reg_ier = 0;
            self.reg_pcr = 0;
            self.reg_acr = 0;
            self.reg_ila = 0;
            self.reg_ora = 0;
            self.reg_ddra = 0;
            self.reg_ilb = 0;
            self.reg_orb = 0;
            self.reg_ddrb = 0;
            self.process_end(ctx);
            return None;
        }

        if !ctx.changed(self.phi2) {
            self.process_end(ctx);
            return None;
        }

        self.strobe = ctx.read(self.cs1) && !ctx.read(self.cs2_b);
        self.output.drv_data = false;

        if ctx.read(self.phi2) {
            self.process_positive_enable_edge(ctx);
        } else {
            self.process_negative_enable_edge(ctx);
        }

        self.process_end(ctx);
        None
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        ctx.depends_on(self.reset_b);
        ctx.depends_on(self.phi2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixedDriver;
    use dromaius_core::Simulator;

    #[test]
    fn t1_one_shot_sets_interrupt_flag_at_exact_tick() {
        // spec concrete scenario 3: 6522 T1 one-shot timer
        let mut sim = Simulator::with_workers(1_000, 1);
        let port_a = SignalGroup::create(sim.pool_mut(), 8);
        let port_b = SignalGroup::create(sim.pool_mut(), 8);
        let data = SignalGroup::create(sim.pool_mut(), 8);
        let rs = SignalGroup::create(sim.pool_mut(), 4);
        let ca1 = sim.pool_mut().signal_create();
        let ca2 = sim.pool_mut().signal_create();
        let cb1 = sim.pool_mut().signal_create();
        let cb2 = sim.pool_mut().signal_create();
        let irq_b = sim.pool_mut().signal_create();
        let reset_b = sim.pool_mut().signal_create();
        let phi2 = sim.pool_mut().signal_create();
        let cs1 = sim.pool_mut().signal_create();
        let cs2_b = sim.pool_mut().signal_create();
        let rw = sim.pool_mut().signal_create();

        let mut pins = vec![(reset_b, true), (phi2, false), (cs1, true), (cs2_b, false), (rw, false)];
        pins.extend(rs.iter().map(|s| (s, false)));
        pins.extend(data.iter().map(|s| (s, false)));
        let (driver, handles) = FixedDriver::with_handles(pins);
        let rs_base = 5usize;
        let data_base = rs_base + rs.len();

        let set_rs = |handles: &[crate::testing::DriverHandle], value: u8| {
            for i in 0..4 {
                handles[rs_base + i].set((value >> i) & 1 != 0);
            }
        };
        let set_data = |handles: &[crate::testing::DriverHandle], value: u8| {
            for i in 0..8 {
                handles[data_base + i].set((value >> i) & 1 != 0);
            }
        };

        sim.register_chip("drv", Box::new(driver));
        sim.register_chip(
            "via",
            Box::new(Via::new(
                port_a, port_b, data.clone(), rs.clone(), ca1, ca2, cb1, cb2, irq_b, reset_b, phi2, cs1, cs2_b, rw,
            )),
        );
        sim.device_complete();

        sim.simulate_timestep();
        handles[0].set(false); // release reset
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

        // write T1L_L = 2 (low byte of the one-shot count)
        set_rs(&handles, ADDR_T1L_L);
        set_data(&handles, 2);
        pulse_phi2(&mut sim, &handles);

        // write T1C_H = 0: latches the high byte and arms the one-shot
        set_rs(&handles, ADDR_T1C_H);
        set_data(&handles, 0);
        pulse_phi2(&mut sim, &handles);

        // switch to reading IFR from here on
        set_rs(&handles, ADDR_IFR);
        handles[4].set(true); // RW = read

        // first negative edge after arming loads the counter (no decrement yet)
        pulse_phi2(&mut sim, &handles);
        assert_eq!(data.read(sim.pool()) & 0b0100_0000, 0);

        // two more edges count 2 -> 1 -> 0
        pulse_phi2(&mut sim, &handles);
        assert_eq!(data.read(sim.pool()) & 0b0100_0000, 0);
        pulse_phi2(&mut sim, &handles);
        assert_eq!(data.read(sim.pool()) & 0b0100_0000, 0);

        // the edge where the counter is observed at zero raises T1's IFR bit
        pulse_phi2(&mut sim, &handles);
        assert_ne!(data.read(sim.pool()) & 0b0100_0000, 0, "T1 one-shot should have set IFR bit 6 by now");
    }

    #[test]
    fn shift_register_phi2_mode_sets_sr_interrupt_flag() {
        // spec concrete scenario 4: 6522 shift register clocked by phi2
        let mut sim = Simulator::with_workers(1_000, 1);
        let port_a = SignalGroup::create(sim.pool_mut(), 8);
        let port_b = SignalGroup::create(sim.pool_mut(), 8);
        let data = SignalGroup::create(sim.pool_mut(), 8);
        let rs = SignalGroup::create(sim.pool_mut(), 4);
        let ca1 = sim.pool_mut().signal_create();
        let ca2 = sim.pool_mut().signal_create();
        let cb1 = sim.pool_mut().signal_create();
        let cb2 = sim.pool_mut().signal_create();
        let irq_b = sim.pool_mut().signal_create();
        let reset_b = sim.pool_mut().signal_create();
        let phi2 = sim.pool_mut().signal_create();
        let cs1 = sim.pool_mut().signal_create();
        let cs2_b = sim.pool_mut().signal_create();
        let rw = sim.pool_mut().signal_create();

        let mut pins = vec![(reset_b, true), (phi2, false), (cs1, true), (cs2_b, false), (rw, false)];
        pins.extend(rs.iter().map(|s| (s, false)));
        pins.extend(data.iter().map(|s| (s, false)));
        let (driver, handles) = FixedDriver::with_handles(pins);
        let rs_base = 5usize;
        let data_base = rs_base + rs.len();

        let set_rs = |handles: &[crate::testing::DriverHandle], value: u8| {
            for i in 0..4 {
                handles[rs_base + i].set((value >> i) & 1 != 0);
            }
        };
        let set_data = |handles: &[crate::testing::DriverHandle], value: u8| {
            for i in 0..8 {
                handles[data_base + i].set((value >> i) & 1 != 0);
            }
        };

        sim.register_chip("drv", Box::new(driver));
        sim.register_chip(
            "via",
            Box::new(Via::new(
                port_a, port_b, data.clone(), rs.clone(), ca1, ca2, cb1, cb2, irq_b, reset_b, phi2, cs1, cs2_b, rw,
            )),
        );
        sim.device_complete();

        sim.simulate_timestep();
        handles[0].set(false); // release reset
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

        // ACR: shift register output, clocked by phi2 (mode bits 4-2 = 0b110)
        set_rs(&handles, ADDR_ACR);
        set_data(&handles, 0b0001_1000);
        pulse_phi2(&mut sim, &handles);

        // arm the shift register with a byte to send
        set_rs(&handles, ADDR_SR);
        set_data(&handles, 0xa5);
        pulse_phi2(&mut sim, &handles);

        // switch to reading IFR from here on
        set_rs(&handles, ADDR_IFR);
        handles[4].set(true); // RW = read

        // out_cl1 toggles once per edge, a bit shifts out only every other
        // edge; 8 bits need up to 16 more edges before SR's IFR bit (2) sets
        let mut sr_flag_seen = false;
        for _ in 0..20 {
            pulse_phi2(&mut sim, &handles);
            if data.read(sim.pool()) & 0b0000_0100 != 0 {
                sr_flag_seen = true;
                break;
            }
        }
        assert!(sr_flag_seen, "shift register should have set IFR bit 2 after shifting out a full byte");
    }
}
