//! A minimal reference chip used to exercise the registration /
//! dependency / process contract without pulling in a real behavior
//! model. Grounded directly on `original_source/src/chip_dummy.c`,
//! which exists in the original for exactly this purpose and ships as
//! ordinary (non-test-gated) source rather than a test fixture.

use crate::chip::{Chip, DependencyContext, SignalContext};
use crate::signal::Signal;
use crate::Tick;

/// How a [`DummyChip`] driving an output behaves across invocations.
#[derive(Debug, Clone, Copy)]
pub enum Toggle {
    /// Flip the output once, on the first (forced-dirty) invocation,
    /// then go quiet: never requests a further wake-up.
    Never,
    /// Flip the output and request a wake-up on the very next tick,
    /// behaving like a clock oscillator with a one-tick half period.
    EveryTick,
    /// Flip the output and request a wake-up `period` ticks later.
    Periodic(Tick),
}

enum Kind {
    Toggling { output: Signal, value: bool, mode: Toggle },
    Mirror { input: Signal, output: Signal },
}

/// A do-nothing-interesting chip: either toggles one output on a
/// configurable schedule, or mirrors one input to one output a tick
/// later. Used by kernel unit tests to exercise dirty-chip propagation,
/// scheduler wake-ups and cross-worker determinism without depending
/// on any real chip model from `dromaius-chips`.
pub struct DummyChip {
    kind: Kind,
}

impl DummyChip {
    pub fn new(output: Signal, mode: Toggle) -> Self {
        DummyChip { kind: Kind::Toggling { output, value: false, mode } }
    }

    pub fn mirroring(input: Signal, output: Signal) -> Self {
        DummyChip { kind: Kind::Mirror { input, output } }
    }
}

impl Chip for DummyChip {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        match &mut self.kind {
            Kind::Toggling { output, value, mode } => {
                *value = !*value;
                ctx.write(*output, *value);
                match mode {
                    Toggle::Never => None,
                    Toggle::EveryTick => Some(ctx.current_tick() + 1),
                    Toggle::Periodic(period) => Some(ctx.current_tick() + *period),
                }
            }
            Kind::Mirror { input, output } => {
                ctx.write(*output, ctx.read(*input));
                None
            }
        }
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        if let Kind::Mirror { input, .. } = &self.kind {
            ctx.depends_on(*input);
        }
    }
}
