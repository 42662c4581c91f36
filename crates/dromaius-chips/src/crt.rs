//! Raster CRT display. Grounded on
//! `original_source/src/display_pet_crt.c`.

use dromaius_core::{Chip, DependencyContext, Signal, SignalContext, Tick};
use rgb::RGBA8;

const COLOR_ON: RGBA8 = RGBA8::new(0x55, 0xff, 0x55, 0xff);
const COLOR_OFF: RGBA8 = RGBA8::new(0, 0, 0, 0xff);

/// A raster CRT driven by horizontal/vertical drive signals and a
/// serial video bit, one pixel at a time.
pub struct Crt {
    video_in: Signal,
    vert_drive_in: Signal,
    horz_drive_in: Signal,

    width: usize,
    height: usize,
    pixel_delta_ticks: Tick,

    pos_x: usize,
    pos_y: usize,
    last_pixel_transition: Tick,

    frame: Vec<RGBA8>,
}

impl Crt {
    pub fn new(
        video_in: Signal,
        vert_drive_in: Signal,
        horz_drive_in: Signal,
        width: usize,
        height: usize,
        pixel_delta_ticks: Tick,
    ) -> Self {
        Crt {
            video_in,
            vert_drive_in,
            horz_drive_in,
            width,
            height,
            pixel_delta_ticks: pixel_delta_ticks.max(1),
            pos_x: 0,
            pos_y: 0,
            last_pixel_transition: 0,
            frame: vec![COLOR_OFF; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn frame(&self) -> &[RGBA8] {
        &self.frame
    }
}

impl Chip for Crt {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        let horz_drive = ctx.read(self.horz_drive_in);
        let vert_drive = ctx.read(self.vert_drive_in);
        let mut schedule = None;

        if horz_drive && vert_drive {
            if ctx.changed(self.horz_drive_in) || ctx.changed(self.vert_drive_in) {
                self.last_pixel_transition = ctx.current_tick();
            }

            while self.last_pixel_transition + self.pixel_delta_ticks <= ctx.current_tick() {
                self.pos_x += 1;
                self.last_pixel_transition += self.pixel_delta_ticks;

                if self.pos_y < self.height && self.pos_x < self.width {
                    let color = if ctx.read(self.video_in) { COLOR_OFF } else { COLOR_ON };
                    self.frame[self.pos_y * self.width + self.pos_x] = color;
                }
            }

            schedule = Some(self.last_pixel_transition + self.pixel_delta_ticks);
        }

        if !horz_drive {
            if self.pos_x > 0 {
                self.pos_y += 1;
                self.pos_x = 0;
            }
            self.last_pixel_transition = ctx.current_tick();
        }

        if !vert_drive {
            self.pos_x = 0;
            self.pos_y = 0;
            self.last_pixel_transition = ctx.current_tick();
        }

        schedule
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        ctx.depends_on(self.horz_drive_in);
        ctx.depends_on(self.vert_drive_in);
    }
}
