//! The host-facing execution context: run/pause/single-step/
//! step-to-signal-edge controls plus signal breakpoints, sitting on
//! top of a [`Simulator`]. See spec §5 "Context layer".

use crate::signal::Signal;
use crate::simulator::Simulator;

/// Mirrors the C original's state atom (`WAIT`, `SINGLE_STEP`,
/// `STEP_SIGNAL`, `RUN`, `EXIT`), driving how much [`ExecutionContext::drive`]
/// advances the simulator on one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Wait,
    SingleStep,
    StepSignal(Signal),
    Run,
    Exit,
}

struct Breakpoint {
    signal: Signal,
    pos_edge: bool,
    neg_edge: bool,
    previous: bool,
}

/// Wraps a [`Simulator`] with run/pause/step controls and signal
/// breakpoints. A host controller toggles [`ExecutionContext::run`],
/// [`ExecutionContext::pause`] etc. between calls to
/// [`ExecutionContext::drive`], which is where timesteps actually
/// happen; nothing here spawns its own thread; a host that wants the
/// simulator on a background thread can hold the `ExecutionContext`
/// there itself and shuttle state-changes in across a channel.
pub struct ExecutionContext {
    simulator: Simulator,
    state: RunState,
    breakpoints: Vec<Breakpoint>,
    /// Safety valve against a `Run` that never hits a breakpoint.
    max_steps_per_drive: u64,
}

impl ExecutionContext {
    pub fn new(simulator: Simulator) -> Self {
        ExecutionContext {
            simulator,
            state: RunState::Wait,
            breakpoints: Vec::new(),
            max_steps_per_drive: 10_000_000,
        }
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    pub fn simulator_mut(&mut self) -> &mut Simulator {
        &mut self.simulator
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn pause(&mut self) {
        self.state = RunState::Wait;
    }

    pub fn run(&mut self) {
        self.state = RunState::Run;
    }

    pub fn single_step(&mut self) {
        self.state = RunState::SingleStep;
    }

    pub fn step_to_signal_edge(&mut self, signal: Signal) {
        self.state = RunState::StepSignal(signal);
    }

    pub fn exit(&mut self) {
        self.state = RunState::Exit;
    }

    /// Toggle a breakpoint on `signal`: pausing execution (transition
    /// to `Wait`) the first timestep boundary where it makes the
    /// requested transition.
    pub fn set_breakpoint(&mut self, signal: Signal, pos_edge: bool, neg_edge: bool) {
        let previous = self.simulator.pool().read(signal);
        self.breakpoints.retain(|b| b.signal != signal);
        self.breakpoints.push(Breakpoint { signal, pos_edge, neg_edge, previous });
    }

    pub fn clear_breakpoint(&mut self, signal: Signal) {
        self.breakpoints.retain(|b| b.signal != signal);
    }

    pub fn has_breakpoint(&self, signal: Signal) -> bool {
        self.breakpoints.iter().any(|b| b.signal == signal)
    }

    /// Advance the simulator according to the current run state.
    /// Returns the number of timesteps executed. `Wait`/`Exit` advance
    /// zero steps; `SingleStep` advances exactly one; `StepSignal`
    /// advances until the watched signal transitions; `Run` advances
    /// until a breakpoint fires or `max_steps_per_drive` is hit (a
    /// safety valve, not part of the spec, against a breakpoint that
    /// never matches).
    pub fn drive(&mut self) -> u64 {
        match self.state {
            RunState::Wait | RunState::Exit => 0,
            RunState::SingleStep => {
                self.simulator.simulate_timestep();
                self.update_breakpoints();
                self.state = RunState::Wait;
                1
            }
            RunState::StepSignal(signal) => {
                let before = self.simulator.pool().read(signal);
                let mut steps = 0;
                loop {
                    self.simulator.simulate_timestep();
                    steps += 1;
                    if self.simulator.pool().read(signal) != before {
                        break;
                    }
                    if steps >= self.max_steps_per_drive {
                        break;
                    }
                }
                self.update_breakpoints();
                self.state = RunState::Wait;
                steps
            }
            RunState::Run => {
                let mut steps = 0;
                loop {
                    self.simulator.simulate_timestep();
                    steps += 1;
                    if self.update_breakpoints() {
                        self.state = RunState::Wait;
                        break;
                    }
                    if steps >= self.max_steps_per_drive {
                        break;
                    }
                }
                steps
            }
        }
    }

    /// Compare every breakpoint's watched signal against its level at
    /// the previous timestep boundary; returns true if any matched.
    fn update_breakpoints(&mut self) -> bool {
        let mut hit = false;
        for bp in &mut self.breakpoints {
            let current = self.simulator.pool().read(bp.signal);
            let rising = !bp.previous && current;
            let falling = bp.previous && !current;
            if (bp.pos_edge && rising) || (bp.neg_edge && falling) {
                hit = true;
            }
            bp.previous = current;
        }
        hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DummyChip, Toggle};
    use crate::Simulator;

    #[test]
    fn run_pauses_exactly_at_the_first_matching_edge() {
        let mut sim = Simulator::with_workers(1_000, 1);
        let clk = sim.pool_mut().signal_create();
        sim.register_chip("clk", Box::new(DummyChip::new(clk, Toggle::EveryTick)));
        sim.device_complete();

        let mut ctx = ExecutionContext::new(sim);
        ctx.set_breakpoint(clk, true, false);
        ctx.run();
        let steps = ctx.drive();

        assert_eq!(ctx.state(), RunState::Wait);
        assert!(ctx.simulator().pool().read(clk), "should have paused on the rising edge");
        assert!(steps >= 1);

        // the clk toggles every tick, so this must be the very first rising edge
        assert_eq!(steps, 1);
    }

    #[test]
    fn single_step_advances_exactly_one_tick() {
        let mut sim = Simulator::with_workers(1_000, 1);
        let sig = sim.pool_mut().signal_create();
        sim.register_chip("dummy", Box::new(DummyChip::new(sig, Toggle::Never)));
        sim.device_complete();

        let mut ctx = ExecutionContext::new(sim);
        ctx.single_step();
        assert_eq!(ctx.drive(), 1);
        assert_eq!(ctx.state(), RunState::Wait);
        assert_eq!(ctx.simulator().current_tick(), 1);
    }

    #[test]
    fn step_to_signal_edge_stops_on_first_transition() {
        let mut sim = Simulator::with_workers(1_000, 1);
        let sig = sim.pool_mut().signal_create();
        sim.register_chip("osc", Box::new(DummyChip::new(sig, Toggle::Periodic(3))));
        sim.device_complete();

        let mut ctx = ExecutionContext::new(sim);
        ctx.step_to_signal_edge(sig);
        let steps = ctx.drive();
        assert_eq!(steps, 3, "the chip only re-schedules itself 3 ticks out");
        assert_eq!(ctx.state(), RunState::Wait);
    }
}
