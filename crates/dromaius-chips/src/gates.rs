//! Combinational 2-input logic gates, generalized from the 74xx quad/hex
//! gate packages (`original_source/src/chip_74xxx.c`, 7400 section) into
//! one parameterized chip instead of one struct per gate function.

use dromaius_core::{Chip, DependencyContext, Signal, SignalContext, Tick};

/// The boolean function a [`Gate`] computes from its two inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    And,
    Nand,
    Or,
    Nor,
    Xor,
    Xnor,
}

impl GateKind {
    fn apply(self, a: bool, b: bool) -> bool {
        match self {
            GateKind::And => a && b,
            GateKind::Nand => !(a && b),
            GateKind::Or => a || b,
            GateKind::Nor => !(a || b),
            GateKind::Xor => a ^ b,
            GateKind::Xnor => !(a ^ b),
        }
    }
}

struct GateUnit {
    a: Signal,
    b: Signal,
    y: Signal,
}

/// One package of N identical 2-input gates sharing a function, e.g. a
/// 7400 quad NAND (`Gate::quad(GateKind::Nand, ...)`) or a single 7404
/// inverter modeled as `GateKind::Nand` with both inputs tied together.
pub struct Gate {
    kind: GateKind,
    units: Vec<GateUnit>,
}

impl Gate {
    pub fn new(kind: GateKind, units: impl IntoIterator<Item = (Signal, Signal, Signal)>) -> Self {
        Gate {
            kind,
            units: units.into_iter().map(|(a, b, y)| GateUnit { a, b, y }).collect(),
        }
    }

    pub fn single(kind: GateKind, a: Signal, b: Signal, y: Signal) -> Self {
        Gate::new(kind, [(a, b, y)])
    }
}

impl Chip for Gate {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        for unit in &self.units {
            let out = self.kind.apply(ctx.read(unit.a), ctx.read(unit.b));
            ctx.write(unit.y, out);
        }
        None
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        for unit in &self.units {
            ctx.depends_on(unit.a);
            ctx.depends_on(unit.b);
        }
    }
}

/// A single-input inverter, covering the 7404 family without forcing a
/// two-input gate's `a == b` wiring trick on callers.
pub struct Inverter {
    units: Vec<(Signal, Signal)>,
}

impl Inverter {
    pub fn new(units: impl IntoIterator<Item = (Signal, Signal)>) -> Self {
        Inverter { units: units.into_iter().collect() }
    }
}

impl Chip for Inverter {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        for &(a, y) in &self.units {
            ctx.write(y, !ctx.read(a));
        }
        None
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        for &(a, _) in &self.units {
            ctx.depends_on(a);
        }
    }
}
