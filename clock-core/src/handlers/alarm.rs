//! Ringing alarm with snooze

use super::{Context, Handler};
use crate::display::FULL_BRIGHTNESS;
use crate::hal::ButtonSource;
use crate::time::SnoozeTime;
use crate::types::{Rgb, SystemState};

const FLASH_TICKS: u32 = 300;
const FLASH_RED: Rgb = Rgb::new(250, 10, 0);
const FLASH_GREEN: Rgb = Rgb::new(10, 250, 0);

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Phase {
    Ringing { count: u32 },
    Snoozing { until: SnoozeTime },
}

/// Rings the alarm melody with flashing lights until a press or the ring
/// window ends, then stays silent until the next snooze instant. A press
/// while silent, or the end of the last ring, dismisses the alarm.
#[derive(Debug)]
pub struct AlarmRing {
    phase: Phase,
    snoozes: u8,
}

impl AlarmRing {
    pub const fn new() -> Self {
        Self {
            phase: Phase::Ringing { count: 0 },
            snoozes: 0,
        }
    }

    pub fn snoozes(&self) -> u8 {
        self.snoozes
    }

    pub fn is_ringing(&self) -> bool {
        matches!(self.phase, Phase::Ringing { .. })
    }

    fn dismiss<S>(&mut self, ctx: &mut Context<'_, S>) -> Option<SystemState> {
        ctx.buzzer.stop();
        ctx.shared.alarm.dismiss();

        #[cfg(feature = "defmt")]
        defmt::info!("alarm dismissed after {} snoozes", self.snoozes);

        Some(SystemState::DisplayTime)
    }

    fn ring<S: ButtonSource>(&mut self, count: u32, ctx: &mut Context<'_, S>) -> Option<SystemState> {
        ctx.buzzer.play(ctx.shared.alarm.melody);
        if count % FLASH_TICKS == 0 {
            let flash = if (count / FLASH_TICKS) % 2 == 0 { FLASH_RED } else { FLASH_GREEN };
            ctx.lights.set(flash);
        }

        let pressed = ctx.take_any_press();
        if !pressed && count + 1 < ctx.config.ring_ticks {
            self.phase = Phase::Ringing { count: count + 1 };
            return None;
        }

        if self.snoozes >= ctx.config.snooze_count {
            return self.dismiss(ctx);
        }

        self.snoozes += 1;
        let until = ctx.shared.alarm.snooze_time(self.snoozes, ctx.config.snooze_minutes);
        ctx.buzzer.stop();
        ctx.lights.off();
        self.phase = Phase::Snoozing { until };

        #[cfg(feature = "defmt")]
        defmt::info!("snooze {} until {}:{}", self.snoozes, until.hour, until.min);

        None
    }
}

impl Handler for AlarmRing {
    fn enter<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) {
        *self = Self::new();
        ctx.shared.display.enabled = true;
        ctx.shared.display.set_brightness(FULL_BRIGHTNESS);
    }

    fn step<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) -> Option<SystemState> {
        let digits = ctx.shared.time.bcd().hh_mm();
        ctx.shared.display.show(digits);

        match self.phase {
            Phase::Ringing { count } => self.ring(count, ctx),
            Phase::Snoozing { until } => {
                if ctx.take_any_press() {
                    return self.dismiss(ctx);
                }
                if ctx.shared.take_slow_tick() && until.matches(&ctx.shared.time) {
                    ctx.shared.alarm.retrigger();
                    self.phase = Phase::Ringing { count: 0 };
                }
                None
            }
        }
    }
}
