//! Tri-state buffers and transparent latches. Grounded on the 74244
//! and 74373 sections of `original_source/src/chip_74xxx.c`.

use dromaius_core::{Chip, DependencyContext, Signal, SignalContext, Tick};

/// A 74244-style octal tri-state buffer split into two independently
/// enabled 4-bit groups; a deasserted enable releases the group's
/// outputs instead of driving them low.
pub struct TriStateBuffer {
    enable1_b: Signal,
    group1: [(Signal, Signal); 4],
    enable2_b: Signal,
    group2: [(Signal, Signal); 4],
}

impl TriStateBuffer {
    pub fn new(
        enable1_b: Signal,
        group1: [(Signal, Signal); 4],
        enable2_b: Signal,
        group2: [(Signal, Signal); 4],
    ) -> Self {
        TriStateBuffer { enable1_b, group1, enable2_b, group2 }
    }

    fn drive_group(ctx: &mut SignalContext<'_>, enable_b: Signal, group: &[(Signal, Signal); 4]) {
        if !ctx.read(enable_b) {
            for &(a, y) in group {
                ctx.write(y, ctx.read(a));
            }
        } else {
            for &(_, y) in group {
                ctx.clear_writer(y);
            }
        }
    }
}

impl Chip for TriStateBuffer {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        Self::drive_group(ctx, self.enable1_b, &self.group1);
        Self::drive_group(ctx, self.enable2_b, &self.group2);
        None
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        ctx.depends_on(self.enable1_b);
        ctx.depends_on(self.enable2_b);
        for &(a, _) in self.group1.iter().chain(self.group2.iter()) {
            ctx.depends_on(a);
        }
    }
}

/// A 74373-style octal transparent latch: while `latch_enable` is
/// high the outputs follow the data inputs; on a low level they hold
/// the last-latched value. `output_enable_b` tri-states the whole
/// output byte when deasserted.
pub struct TransparentLatch {
    data: [Signal; 8],
    latch_enable: Signal,
    output_enable_b: Signal,
    outputs: [Signal; 8],
    state: u8,
}

impl TransparentLatch {
    pub fn new(
        data: [Signal; 8],
        latch_enable: Signal,
        output_enable_b: Signal,
        outputs: [Signal; 8],
    ) -> Self {
        TransparentLatch { data, latch_enable, output_enable_b, outputs, state: 0 }
    }
}

impl Chip for TransparentLatch {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        if ctx.read(self.latch_enable) {
            self.state = self
                .data
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, &d)| acc | ((ctx.read(d) as u8) << i));
        }

        if !ctx.read(self.output_enable_b) {
            for (i, &q) in self.outputs.iter().enumerate() {
                ctx.write(q, self.state & (1 << i) != 0);
            }
        } else {
            for &q in &self.outputs {
                ctx.clear_writer(q);
            }
        }
        None
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        ctx.depends_on(self.latch_enable);
        ctx.depends_on(self.output_enable_b);
        for &d in &self.data {
            ctx.depends_on(d);
        }
    }
}
