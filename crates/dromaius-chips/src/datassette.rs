//! Commodore 1530 Datasette peripheral. Grounded on
//! `original_source/src/perif_datassette_1530.c`; operates over an
//! in-memory [`crate::tap::Tap`] rather than loading/saving files.

use crate::tap::Tap;
use dromaius_core::{Chip, DependencyContext, Signal, SignalContext, Tick};

const FAST_WIND_SAMPLES: usize = 1000;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum State {
    Idle,
    TapeLoaded,
    Playing,
    Recording,
    Rewinding,
    FastForwarding,
}

/// A key on the datassette's transport, mirroring the original
/// `PerifDatassetteKeys` bitmask.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Key {
    Record,
    Play,
    Rewind,
    FastForward,
    Stop,
    Eject,
}

pub struct Datassette {
    motor: Signal,
    data_from_ds: Signal,
    data_to_ds: Signal,
    sense: Signal,

    tap: Option<Tap>,
    state: State,
    sense_out: bool,
    data_out: bool,

    idle_interval_ticks: Tick,
    tick_duration_ps: i64,
    tick_next_transition: Tick,
    sample_interval: Tick,
    record_prev_tick: Tick,
    record_count: u64,
}

impl Datassette {
    pub fn new(
        motor: Signal,
        data_from_ds: Signal,
        data_to_ds: Signal,
        sense: Signal,
        idle_interval_ticks: Tick,
        tick_duration_ps: i64,
    ) -> Self {
        Datassette {
            motor,
            data_from_ds,
            data_to_ds,
            sense,
            tap: None,
            state: State::Idle,
            sense_out: false, // ACTLO_DEASSERT
            data_out: true,
            idle_interval_ticks,
            tick_duration_ps,
            tick_next_transition: 0,
            sample_interval: 0,
            record_prev_tick: 0,
            record_count: 0,
        }
    }

    fn change_state(&mut self, new_state: State) {
        match new_state {
            State::Idle => {
                self.sense_out = false;
                self.tap = None;
            }
            State::TapeLoaded => {
                self.sense_out = false;
            }
            State::Playing | State::Rewinding | State::FastForwarding => {
                self.sense_out = true;
            }
            State::Recording => {
                self.sense_out = true;
                self.record_prev_tick = 0;
                self.record_count = 0;
            }
        }
        self.state = new_state;
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Loads a tape from an in-memory `.tap` buffer. Returns `false`
    /// if the buffer doesn't parse as a valid image.
    pub fn load_tap(&mut self, raw: &[u8]) -> bool {
        match Tap::parse(raw) {
            Some(tap) => {
                self.tap = Some(tap);
                self.change_state(State::TapeLoaded);
                true
            }
            None => false,
        }
    }

    /// Mounts a fresh, blank tape ready for recording.
    pub fn new_tape(&mut self) {
        self.tap = Some(Tap::new());
        self.change_state(State::TapeLoaded);
    }

    /// Serializes the mounted tape back into a `.tap` buffer, if one
    /// is loaded.
    pub fn save_tap(&self) -> Option<Vec<u8>> {
        self.tap.as_ref().map(Tap::to_bytes)
    }

    fn valid_key(&self, key: Key) -> bool {
        match self.state {
            State::Idle => false,
            State::TapeLoaded => !matches!(key, Key::Stop),
            _ => matches!(key, Key::Stop),
        }
    }

    pub fn press_key(&mut self, key: Key) {
        if self.tap.is_none() && key != Key::Eject {
            return;
        }
        if !self.valid_key(key) {
            return;
        }

        match key {
            Key::Record => self.change_state(State::Recording),
            Key::Play => self.change_state(State::Playing),
            Key::Rewind => self.change_state(State::Rewinding),
            Key::FastForward => self.change_state(State::FastForwarding),
            Key::Stop => self.change_state(State::TapeLoaded),
            Key::Eject => self.change_state(State::Idle),
        }
    }

    fn fast_forward(&mut self) {
        let Some(tap) = self.tap.as_mut() else { return };
        for _ in 0..FAST_WIND_SAMPLES {
            if !tap.next_sample() {
                self.change_state(State::TapeLoaded);
                return;
            }
        }
    }

    fn rewind(&mut self) {
        let Some(tap) = self.tap.as_mut() else { return };
        for _ in 0..FAST_WIND_SAMPLES {
            if !tap.prev_sample() || tap.at_start() {
                self.change_state(State::TapeLoaded);
                return;
            }
        }
    }
}

impl Chip for Datassette {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        ctx.write(self.sense, self.sense_out);

        if self.state == State::Recording {
            let motor = ctx.read(self.motor);

            if motor && ctx.read(self.data_to_ds) && ctx.changed(self.data_to_ds) {
                if self.record_prev_tick > 0 {
                    let length_ticks = ctx.current_tick() - self.record_prev_tick;
                    self.record_count += 1;
                    if let Some(tap) = self.tap.as_mut() {
                        tap.write_pulse(length_ticks * self.tick_duration_ps);
                    }
                }
                self.record_prev_tick = ctx.current_tick();
            }

            if !motor && self.record_count > 0 {
                self.record_count = 0;
            }

            return None;
        }

        if !ctx.read(self.motor) {
            return Some(ctx.current_tick() + self.idle_interval_ticks);
        }

        match self.state {
            State::Playing if self.tick_next_transition <= ctx.current_tick() => {
                if self.data_out {
                    let Some(tap) = self.tap.as_ref() else { return None };
                    let interval_ps = tap.current_interval_ps();
                    self.sample_interval = (interval_ps / self.tick_duration_ps / 2).max(1);
                    self.tick_next_transition = ctx.current_tick() + self.sample_interval;
                    self.data_out = false;
                } else {
                    self.tick_next_transition = ctx.current_tick() + self.sample_interval;
                    self.data_out = true;
                    let advanced = self.tap.as_mut().map(Tap::next_sample).unwrap_or(false);
                    if !advanced {
                        self.change_state(State::TapeLoaded);
                    }
                }
                ctx.write(self.data_from_ds, self.data_out);
            }
            State::Rewinding if self.tick_next_transition <= ctx.current_tick() => {
                self.rewind();
                self.tick_next_transition = ctx.current_tick() + self.idle_interval_ticks;
            }
            State::FastForwarding if self.tick_next_transition <= ctx.current_tick() => {
                self.fast_forward();
                self.tick_next_transition = ctx.current_tick() + self.idle_interval_ticks;
            }
            State::Idle | State::TapeLoaded if self.tick_next_transition <= ctx.current_tick() => {
                self.tick_next_transition = ctx.current_tick() + self.idle_interval_ticks;
            }
            _ => {}
        }

        Some(self.tick_next_transition)
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        ctx.depends_on(self.motor);
        ctx.depends_on(self.data_to_ds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedDriver, Shared};
    use dromaius_core::Simulator;

    fn tape_with_pulses(pulses_ps: &[i64]) -> Vec<u8> {
        let mut tap = Tap::new();
        for &p in pulses_ps {
            tap.write_pulse(p);
        }
        tap.to_bytes()
    }

    #[test]
    fn playing_a_tape_toggles_data_from_ds_on_schedule() {
        let mut sim = Simulator::with_workers(1_000, 1);
        let motor = sim.pool_mut().signal_create();
        let data_from_ds = sim.pool_mut().signal_create();
        let data_to_ds = sim.pool_mut().signal_create();
        let sense = sim.pool_mut().signal_create();

        let driver = FixedDriver::new([(motor, true), (data_to_ds, false)]);
        sim.register_chip("drv", Box::new(driver));

        let mut datassette = Datassette::new(motor, data_from_ds, data_to_ds, sense, 10, 1_000);
        let tape = tape_with_pulses(&[10_000_000_000, 10_000_000_000]);
        assert!(datassette.load_tap(&tape));
        datassette.press_key(Key::Play);
        assert_eq!(datassette.state(), State::Playing);

        let (datassette, handle) = Shared::new(datassette);
        sim.register_chip("tape", Box::new(datassette));
        sim.device_complete();

        for _ in 0..5 {
            sim.simulate_timestep();
        }

        assert_eq!(handle.lock().unwrap().state(), State::Playing);
        assert!(!sim.pool().read(data_from_ds), "data_from_ds should be low after the fifth scheduled sample");

        // the tape is two pulses long; the next scheduled sample runs past
        // its end and stops playback.
        sim.simulate_timestep();
        assert_eq!(handle.lock().unwrap().state(), State::TapeLoaded);
    }

    #[test]
    fn eject_unloads_the_tape() {
        let mut sim = Simulator::with_workers(1_000, 1);
        let motor = sim.pool_mut().signal_create();
        let data_from_ds = sim.pool_mut().signal_create();
        let data_to_ds = sim.pool_mut().signal_create();
        let sense = sim.pool_mut().signal_create();

        let mut datassette = Datassette::new(motor, data_from_ds, data_to_ds, sense, 10, 1_000);
        assert!(datassette.load_tap(&tape_with_pulses(&[1_000_000_000])));
        datassette.press_key(Key::Eject);
        assert_eq!(datassette.state(), State::Idle);
        assert!(datassette.save_tap().is_none());
    }
}
