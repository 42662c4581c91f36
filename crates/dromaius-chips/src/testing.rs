//! Test-only helper chips shared by this crate's unit and integration
//! tests: a settable signal driver, standing in for whatever real chip
//! would normally drive a gate's or register file's inputs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use dromaius_core::{Chip, DependencyContext, Signal, SignalContext, Tick};

/// A handle a test can flip between `simulate_timestep` calls; the
/// owning [`FixedDriver`] re-asserts its current value onto the wired
/// signal every tick, the way a host-controlled test fixture would.
#[derive(Clone)]
pub struct DriverHandle(Arc<AtomicBool>);

impl DriverHandle {
    pub fn set(&self, value: bool) {
        self.0.store(value, Ordering::Relaxed);
    }
}

pub struct FixedDriver {
    pins: Vec<(Signal, Arc<AtomicBool>)>,
}

impl FixedDriver {
    /// Build a driver for `pins`, returning the chip plus one
    /// [`DriverHandle`] per signal (same order) that the test keeps to
    /// change the driven value later.
    pub fn with_handles(pins: impl IntoIterator<Item = (Signal, bool)>) -> (Self, Vec<DriverHandle>) {
        let pins: Vec<_> = pins.into_iter().map(|(s, v)| (s, Arc::new(AtomicBool::new(v)))).collect();
        let handles = pins.iter().map(|(_, flag)| DriverHandle(flag.clone())).collect();
        (FixedDriver { pins }, handles)
    }

    /// Build a driver whose values never change after construction.
    pub fn new(pins: impl IntoIterator<Item = (Signal, bool)>) -> Self {
        FixedDriver::with_handles(pins).0
    }
}

impl Chip for FixedDriver {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        for (signal, flag) in &self.pins {
            ctx.write(*signal, flag.load(Ordering::Relaxed));
        }
        Some(ctx.current_tick() + 1)
    }

    fn register_dependencies(&self, _ctx: &mut DependencyContext<'_>) {}
}

/// Wraps a chip in a shared handle so a test can keep inspecting its
/// public getters after the chip itself has been moved into a
/// [`dromaius_core::Simulator`].
pub struct Shared<T>(Arc<Mutex<T>>);

impl<T> Shared<T> {
    /// Returns the chip wrapper to register plus a handle the test
    /// keeps to lock and read the chip's state between timesteps.
    pub fn new(inner: T) -> (Self, Arc<Mutex<T>>) {
        let shared = Arc::new(Mutex::new(inner));
        (Shared(shared.clone()), shared)
    }
}

impl<T: Chip> Chip for Shared<T> {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        self.0.lock().unwrap().process(ctx)
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        self.0.lock().unwrap().register_dependencies(ctx)
    }
}
