//! HD44780 dot-matrix LCD controller, instruction/address layer only.
//! Grounded on `original_source/src/chip_hd44780.c`; glyph rendering
//! (`rom_a00`, `draw_character`, `display_data` framebuffer, cursor
//! blink pixel output) is out of scope and not ported — this module
//! tracks DDRAM/CGRAM contents and the address counter, not pixels.

use dromaius_core::{Chip, DependencyContext, Signal, SignalContext, SignalGroup, Tick};

const DDRAM_SIZE: usize = 80;
const CGRAM_SIZE: usize = 64;

#[derive(Clone, Copy, PartialEq, Eq)]
enum RamMode {
    Ddram,
    Cgram,
}

fn ddram_virtual_to_physical(two_line: bool, addr: u8) -> u8 {
    if !two_line {
        return addr;
    }
    let addr = addr as i16;
    if addr >= 64 {
        (addr - 24) as u8
    } else if addr >= 40 {
        64
    } else {
        addr as u8
    }
}

fn ddram_physical_to_virtual(two_line: bool, addr: u8) -> u8 {
    if !two_line {
        return addr;
    }
    if addr >= 40 {
        addr + 24
    } else {
        addr
    }
}

fn ddram_valid_virtual_address(two_line: bool, addr: i32) -> u8 {
    if !two_line {
        return ((addr + 80) % 80) as u8;
    }
    let result = ((addr + 104) % 104) as u8;
    if (40..64).contains(&result) {
        64
    } else {
        result
    }
}

fn ddram_valid_physical_address(addr: i32) -> u8 {
    (((addr % 80) + 80) % 80) as u8
}

fn cgram_valid_address(addr: i32) -> u8 {
    (addr & 0x3f) as u8
}

/// A Hitachi HD44780-style LCD controller. Operates the 8-bit MPU
/// interface only (the 4-bit nibble protocol from the original is not
/// reproduced; callers drive the full 8-bit data bus directly).
pub struct Lcd {
    data: SignalGroup,
    rs: Signal,
    rw: Signal,
    enable: Signal,
    prev_enable: bool,

    ddram: [u8; DDRAM_SIZE],
    cgram: [u8; CGRAM_SIZE],
    reg_ir: u8,
    reg_data: u8,
    reg_ac: u8,

    ddram_addr: u8,
    address_delta: i8,
    ram_mode: RamMode,

    two_line: bool,
    shift_enabled: bool,
    shift_delta: i16,
    display_enabled: bool,
    cursor_enabled: bool,
    cursor_blink: bool,
}

impl Lcd {
    pub fn new(data: SignalGroup, rs: Signal, rw: Signal, enable: Signal) -> Self {
        let mut lcd = Lcd {
            data,
            rs,
            rw,
            enable,
            prev_enable: false,
            ddram: [0x20; DDRAM_SIZE],
            cgram: [0; CGRAM_SIZE],
            reg_ir: 0,
            reg_data: 0,
            reg_ac: 0,
            ddram_addr: 0,
            address_delta: 1,
            ram_mode: RamMode::Ddram,
            two_line: false,
            shift_enabled: false,
            shift_delta: 0,
            display_enabled: false,
            cursor_enabled: false,
            cursor_blink: false,
        };
        lcd.ddram_set_address(0);
        lcd
    }

    fn ddram_set_address(&mut self, addr: u8) {
        self.reg_ac = ddram_valid_virtual_address(self.two_line, addr as i32);
        self.ddram_addr = ddram_virtual_to_physical(self.two_line, self.reg_ac);
        self.reg_data = self.ddram[self.ddram_addr as usize];
        self.ram_mode = RamMode::Ddram;
    }

    fn cgram_set_address(&mut self, addr: u8) {
        self.reg_ac = cgram_valid_address(addr as i32);
        self.reg_data = self.cgram[self.reg_ac as usize];
        self.ram_mode = RamMode::Cgram;
    }

    fn increment_decrement_address(&mut self) {
        match self.ram_mode {
            RamMode::Ddram => {
                self.ddram_addr =
                    ddram_valid_physical_address(self.ddram_addr as i32 + self.address_delta as i32);
                self.reg_ac = ddram_physical_to_virtual(self.two_line, self.ddram_addr);
                self.reg_data = self.ddram[self.ddram_addr as usize];
            }
            RamMode::Cgram => {
                self.reg_ac = cgram_valid_address(self.reg_ac as i32 + self.address_delta as i32);
                self.reg_data = self.cgram[self.reg_ac as usize];
            }
        }
    }

    fn execute_clear_display(&mut self) {
        self.ddram = [0x20; DDRAM_SIZE];
        self.ddram_set_address(0);
        self.shift_delta = 0;
        self.address_delta = 1;
    }

    fn execute_return_home(&mut self) {
        self.ddram_set_address(0);
        self.shift_delta = 0;
    }

    fn execute_entry_mode_set(&mut self, inc: bool, shift: bool) {
        self.address_delta = if inc { 1 } else { -1 };
        self.shift_enabled = shift;
    }

    fn execute_display_on_off(&mut self, display: bool, cursor: bool, blink: bool) {
        self.display_enabled = display;
        self.cursor_enabled = cursor;
        self.cursor_blink = blink;
    }

    fn execute_cursor_or_display_shift(&mut self, display_shift: bool, right: bool) {
        if display_shift {
            if self.shift_enabled {
                self.shift_delta += if right { -1 } else { 1 };
                self.shift_delta = ((self.shift_delta + 80) % 160) - 80;
            }
        } else if self.ram_mode == RamMode::Ddram {
            let delta: i32 = if right { 1 } else { -1 };
            self.ddram_addr = ddram_valid_physical_address(self.ddram_addr as i32 + delta);
            self.reg_ac = ddram_physical_to_virtual(self.two_line, self.ddram_addr);
        }
    }

    fn execute_function_set(&mut self, two_line: bool) {
        self.two_line = two_line;
    }

    fn decode_instruction(&mut self) {
        let ir = self.reg_ir;
        if ir & 0x80 != 0 {
            self.ddram_set_address(ir & 0x7f);
        } else if ir & 0x40 != 0 {
            self.cgram_set_address(ir & 0x3f);
        } else if ir & 0x20 != 0 {
            self.execute_function_set(ir & 0x08 != 0);
        } else if ir & 0x10 != 0 {
            self.execute_cursor_or_display_shift(ir & 0x08 != 0, ir & 0x04 != 0);
        } else if ir & 0x08 != 0 {
            self.execute_display_on_off(ir & 0x04 != 0, ir & 0x02 != 0, ir & 0x01 != 0);
        } else if ir & 0x04 != 0 {
            self.execute_entry_mode_set(ir & 0x02 != 0, ir & 0x01 != 0);
        } else if ir & 0x02 != 0 {
            self.execute_return_home();
        } else if ir & 0x01 != 0 {
            self.execute_clear_display();
        }
    }

    fn store_data(&mut self) {
        match self.ram_mode {
            RamMode::Cgram => self.cgram[self.reg_ac as usize] = self.reg_data,
            RamMode::Ddram => {
                let phys = ddram_virtual_to_physical(self.two_line, self.reg_ac);
                self.ddram[phys as usize] = self.reg_data;
            }
        }
        self.increment_decrement_address();
    }

    fn process_positive_edge(&mut self, ctx: &mut SignalContext<'_>) {
        if ctx.read(self.rw) {
            let value = if ctx.read(self.rs) { self.reg_data } else { self.reg_ac & 0x7f };
            self.data.ctx_write(ctx, value as u32);
        }
    }

    fn process_negative_edge(&mut self, ctx: &mut SignalContext<'_>) {
        if ctx.read(self.rw) {
            return;
        }

        let value = self.data.ctx_read(ctx) as u8;
        if ctx.read(self.rs) {
            self.reg_data = value;
            self.store_data();
        } else {
            self.reg_ir = value;
            self.decode_instruction();
        }
    }

    pub fn ddram(&self) -> &[u8; DDRAM_SIZE] {
        &self.ddram
    }

    pub fn cgram(&self) -> &[u8; CGRAM_SIZE] {
        &self.cgram
    }

    pub fn cursor_address(&self) -> u8 {
        self.reg_ac
    }
}

impl Chip for Lcd {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        let enable = ctx.read(self.enable);
        if !ctx.changed(self.enable) {
            return None;
        }

        if enable {
            self.process_positive_edge(ctx);
        } else {
            self.process_negative_edge(ctx);
        }
        self.prev_enable = enable;
        None
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        ctx.depends_on(self.enable);
    }
}
