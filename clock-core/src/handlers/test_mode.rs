//! User test: cathode and LED exercise reachable from the intro

use super::{Context, Handler};
use crate::display::FULL_BRIGHTNESS;
use crate::hal::ButtonSource;
use crate::types::{Rgb, SystemState};

const DIGIT_TICKS: u32 = 500;
const BEEP_TICKS: u16 = 50;
const RAMP_MIN: u16 = 5;
const RAMP_MAX: u16 = 995;
const RAMP_MID: u16 = 500;
const LIGHT_UPDATE_TICKS: u32 = 5;

/// Every tube shows the same digit, stepping 0 to 9 with a beep after each
/// full sweep. The status lights ramp one colour channel up and down per
/// pair of seconds, red then green then blue, turning on the first second
/// past the midpoint. Any press returns to the intro.
#[derive(Debug)]
pub struct UserTest {
    count: u32,
    digit: u8,
    beep_left: u16,
    level: u16,
    rising: bool,
    channel: u8,
}

impl UserTest {
    pub const fn new() -> Self {
        Self {
            count: 0,
            digit: 0,
            beep_left: 0,
            level: RAMP_MIN,
            rising: true,
            channel: 0,
        }
    }

    pub fn digit(&self) -> u8 {
        self.digit
    }

    fn color(&self) -> Rgb {
        let value = (self.level >> 4) as u8;
        match self.channel {
            0 => Rgb::new(value, 0, 0),
            1 => Rgb::new(0, value, 0),
            _ => Rgb::new(0, 0, value),
        }
    }

    fn ramp(&mut self, slow_tick: bool) {
        if self.rising {
            self.level = (self.level + 1).min(RAMP_MAX);
        } else {
            self.level = self.level.saturating_sub(1).max(RAMP_MIN);
        }

        // Each second resyncs the ramp, but only once it has crossed the
        // midpoint in its current direction.
        if !slow_tick {
            return;
        }
        if self.rising && self.level > RAMP_MID {
            self.rising = false;
            self.level = RAMP_MAX;
        } else if !self.rising && self.level < RAMP_MID {
            self.rising = true;
            self.level = RAMP_MIN;
            self.channel = (self.channel + 1) % 3;
        }
    }
}

impl Handler for UserTest {
    fn enter<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) {
        *self = Self::new();
        ctx.shared.display.enabled = true;
        ctx.shared.display.set_brightness(FULL_BRIGHTNESS);
        ctx.shared.take_slow_tick();
    }

    fn step<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) -> Option<SystemState> {
        ctx.shared.display.show([self.digit; 4]);

        self.count += 1;
        if self.count % DIGIT_TICKS == 0 {
            self.digit = (self.digit + 1) % 10;
            if self.digit == 0 {
                ctx.buzzer.beep_on();
                self.beep_left = BEEP_TICKS;
            }
        }
        if self.beep_left > 0 {
            self.beep_left -= 1;
            if self.beep_left == 0 {
                ctx.buzzer.beep_off();
            }
        }

        let slow_tick = ctx.shared.take_slow_tick();
        self.ramp(slow_tick);
        if self.count % LIGHT_UPDATE_TICKS == 0 {
            ctx.lights.set(self.color());
        }

        if ctx.take_any_action() {
            ctx.buzzer.beep_off();
            ctx.lights.off();
            return Some(SystemState::Intro);
        }
        None
    }
}
