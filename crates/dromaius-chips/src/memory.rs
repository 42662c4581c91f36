//! Memory chips. Grounded on `original_source/src/chip_ram_static.c`
//! (6114 SRAM), `chip_rom.c` (63xx ROM) and `chip_ram_dynamic.c` (4116
//! DRAM).

use dromaius_core::{Chip, DependencyContext, SignalContext, SignalGroup, Tick};

/// A 6114-style static RAM: combinational read/write gated by an
/// active-low chip enable and a `RW` direction line, tri-stating its
/// IO group whenever deselected.
pub struct StaticRam {
    address: SignalGroup,
    io: SignalGroup,
    ce_b: dromaius_core::Signal,
    rw: dromaius_core::Signal,
    data: Vec<u8>,
}

impl StaticRam {
    pub fn new(address: SignalGroup, io: SignalGroup, ce_b: dromaius_core::Signal, rw: dromaius_core::Signal) -> Self {
        let size = 1usize << address.len();
        StaticRam { address, io, ce_b, rw, data: vec![0; size] }
    }
}

impl Chip for StaticRam {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        if ctx.read(self.ce_b) {
            self.io.ctx_clear_writer(ctx);
            return None;
        }

        let addr = self.address.ctx_read(ctx) as usize;
        if ctx.read(self.rw) {
            self.io.ctx_write(ctx, self.data[addr] as u32);
        } else {
            self.data[addr] = self.io.ctx_read(ctx) as u8;
            self.io.ctx_clear_writer(ctx);
        }
        None
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        for s in self.address.iter() {
            ctx.depends_on(s);
        }
        for s in self.io.iter() {
            ctx.depends_on(s);
        }
        ctx.depends_on(self.ce_b);
        ctx.depends_on(self.rw);
    }
}

/// A 63xx-style masked-ROM: two or three chip-select lines (the
/// caller decides their polarity up front and passes a single
/// combined `selected` predicate via `select`), and an access-time
/// delay modeled by scheduling a wake-up instead of driving data
/// immediately on an address or select change.
pub struct Rom {
    address: SignalGroup,
    data: SignalGroup,
    select: Vec<(dromaius_core::Signal, bool)>,
    access_delay_ticks: Tick,
    contents: Vec<u8>,
    last_address: Option<u32>,
}

impl Rom {
    /// `select` is a list of (signal, active_high) pairs; the ROM is
    /// selected only when every one reads its active level.
    pub fn new(
        address: SignalGroup,
        data: SignalGroup,
        select: Vec<(dromaius_core::Signal, bool)>,
        access_delay_ticks: Tick,
        contents: Vec<u8>,
    ) -> Self {
        let size = 1usize << address.len();
        let mut contents = contents;
        contents.resize(size, 0);
        Rom { address, data, select, access_delay_ticks, contents, last_address: None }
    }

    fn selected(&self, ctx: &SignalContext<'_>) -> bool {
        self.select.iter().all(|&(s, active_high)| ctx.read(s) == active_high)
    }
}

impl Chip for Rom {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        if !self.selected(ctx) {
            self.data.ctx_clear_writer(ctx);
            self.last_address = None;
            return None;
        }

        let address = self.address.ctx_read(ctx);
        let select_changed = self.select.iter().any(|&(s, _)| ctx.changed(s));

        if select_changed || self.last_address != Some(address) {
            self.last_address = Some(address);
            return Some(ctx.current_tick() + self.access_delay_ticks);
        }

        self.data.ctx_write(ctx, self.contents[address as usize] as u32);
        None
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        for s in self.address.iter() {
            ctx.depends_on(s);
        }
        for &(s, _) in &self.select {
            ctx.depends_on(s);
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum DramState {
    Idle,
    OutputBegin,
    Output,
}

/// A MK4116-style dynamic RAM: `RAS_B`/`CAS_B` negative edges latch
/// the row and column halves of the multiplexed address bus, writes
/// land immediately if `WE_B` is already asserted when the column
/// latches ("early write"), otherwise a read goes through the same
/// access-time-delay state machine as [`Rom`].
pub struct DynamicRam {
    address: SignalGroup,
    din: SignalGroup,
    dout: SignalGroup,
    we_b: dromaius_core::Signal,
    ras_b: dromaius_core::Signal,
    cas_b: dromaius_core::Signal,
    access_delay_ticks: Tick,
    data: Vec<u8>,
    row: u32,
    col: u32,
    state: DramState,
    next_state_transition: Tick,
    latched_output: u8,
}

impl DynamicRam {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        address: SignalGroup,
        din: SignalGroup,
        dout: SignalGroup,
        we_b: dromaius_core::Signal,
        ras_b: dromaius_core::Signal,
        cas_b: dromaius_core::Signal,
        access_delay_ticks: Tick,
    ) -> Self {
        DynamicRam {
            address,
            din,
            dout,
            we_b,
            ras_b,
            cas_b,
            access_delay_ticks,
            data: vec![0; 128 * 128],
            row: 0,
            col: 0,
            state: DramState::Idle,
            next_state_transition: 0,
            latched_output: 0,
        }
    }

    fn cell(&self) -> usize {
        (self.row * 128 + self.col) as usize
    }
}

impl Chip for DynamicRam {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        let ras_b = ctx.read(self.ras_b);
        let cas_b = ctx.read(self.cas_b);

        if !ras_b && ctx.changed(self.ras_b) {
            self.row = self.address.ctx_read(ctx);
            return None;
        }

        if !ras_b && !cas_b && ctx.changed(self.cas_b) {
            self.col = self.address.ctx_read(ctx);
            if !ctx.read(self.we_b) {
                let cell = self.cell();
                self.data[cell] = self.din.ctx_read(ctx) as u8;
            } else {
                self.next_state_transition = ctx.current_tick() + self.access_delay_ticks;
                self.state = DramState::OutputBegin;
                return Some(self.next_state_transition);
            }
            return None;
        }

        if !ras_b && !cas_b && !ctx.read(self.we_b) && ctx.changed(self.we_b) {
            let cell = self.cell();
            self.data[cell] = self.din.ctx_read(ctx) as u8;
            return None;
        }

        if self.state == DramState::OutputBegin && ctx.current_tick() >= self.next_state_transition {
            self.latched_output = self.data[self.cell()];
            self.dout.ctx_write(ctx, self.latched_output as u32);
            self.state = DramState::Output;
        } else if self.state == DramState::Output {
            self.dout.ctx_write(ctx, self.latched_output as u32);
        }

        if self.state == DramState::Output && cas_b {
            self.dout.ctx_clear_writer(ctx);
            self.state = DramState::Idle;
        }

        None
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        ctx.depends_on(self.ras_b);
        ctx.depends_on(self.cas_b);
        ctx.depends_on(self.we_b);
    }
}
