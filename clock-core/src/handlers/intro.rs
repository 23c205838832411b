//! Boot animation

use super::{Context, Handler};
use crate::display::{Digit, FULL_BRIGHTNESS};
use crate::hal::ButtonSource;
use crate::types::{ButtonId, Melody, Rgb, SystemState};

/// Cathodes in front-to-back stacking order
const CATHODE_DEPTH: [u8; 10] = [3, 8, 9, 4, 0, 5, 7, 2, 6, 1];

const FRAME_TICKS: u16 = 25;
const SWEEPS: u8 = 4;
const MELODY_REPEATS: u8 = 2;

/// Sweeps every cathode front to back on tubes 1 and 3, then back to front on
/// tubes 2 and 4, four times, while the start-up melody plays twice. Holding
/// X when it finishes opens the user test.
#[derive(Debug)]
pub struct Intro {
    count: u16,
    frame: u8,
    sweeps: u8,
    melodies: u8,
}

impl Intro {
    pub const fn new() -> Self {
        Self {
            count: 0,
            frame: 0,
            sweeps: 0,
            melodies: 0,
        }
    }

    fn render<S>(&self, ctx: &mut Context<'_, S>) {
        let frames = CATHODE_DEPTH.len() as u8;
        let display = &mut ctx.shared.display;
        display.blank();
        if self.frame < frames {
            let digit = Digit::new(CATHODE_DEPTH[self.frame as usize]);
            display.set_digit(0, digit);
            display.set_digit(2, digit);
        } else {
            let back = 2 * frames - 1 - self.frame;
            let digit = Digit::new(CATHODE_DEPTH[back as usize]);
            display.set_digit(1, digit);
            display.set_digit(3, digit);
        }
    }
}

impl Handler for Intro {
    fn enter<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) {
        *self = Self::new();
        ctx.shared.display.enabled = true;
        ctx.shared.display.set_brightness(FULL_BRIGHTNESS);
        ctx.lights.set(Rgb::new(250, 250, 250));
    }

    fn step<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) -> Option<SystemState> {
        self.render(ctx);

        if self.sweeps < SWEEPS {
            self.count += 1;
            if self.count == FRAME_TICKS {
                self.count = 0;
                self.frame += 1;
                if self.frame as usize >= 2 * CATHODE_DEPTH.len() {
                    self.frame = 0;
                    self.sweeps += 1;
                }
            }
        }

        if self.melodies < MELODY_REPEATS && ctx.buzzer.play(Melody::MajorScale) {
            self.melodies += 1;
        }

        if self.sweeps < SWEEPS || self.melodies < MELODY_REPEATS {
            return None;
        }

        ctx.shared.display.blank();
        if ctx.button(ButtonId::X).take_action() {
            Some(SystemState::UserTest)
        } else {
            Some(SystemState::DisplayTime)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::Bench;

    #[test]
    fn test_intro_runs_to_clock_face() {
        let mut bench = Bench::new();
        bench.buzzer = crate::hal::mock::MockBuzzer::with_melody_ticks(300);
        let mut intro = Intro::new();
        bench.enter(&mut intro);

        assert_eq!(bench.run(&mut intro, 1999), None);
        assert_eq!(bench.tick(&mut intro), Some(SystemState::DisplayTime));
        assert_eq!(bench.buzzer.melodies_finished, 2);
        assert!(bench.shared.snapshot().display.digits.iter().all(|d| d.is_blank()));
    }

    #[test]
    fn test_holding_x_opens_user_test() {
        let mut bench = Bench::new();
        let mut intro = Intro::new();
        bench.enter(&mut intro);
        bench.run(&mut intro, 1500);
        bench.set_button(ButtonId::X, true);
        assert_eq!(bench.run(&mut intro, 1000), Some(SystemState::UserTest));
    }

    #[test]
    fn test_intro_waits_for_melody() {
        let mut bench = Bench::new();
        bench.buzzer = crate::hal::mock::MockBuzzer::with_melody_ticks(1500);
        let mut intro = Intro::new();
        bench.enter(&mut intro);
        assert_eq!(bench.run(&mut intro, 2999), None);
        assert_eq!(bench.tick(&mut intro), Some(SystemState::DisplayTime));
    }

    #[test]
    fn test_long_melody_holds_the_last_frame() {
        let mut bench = Bench::new();
        bench.buzzer = crate::hal::mock::MockBuzzer::with_melody_ticks(40_000);
        let mut intro = Intro::new();
        bench.enter(&mut intro);

        assert_eq!(bench.run(&mut intro, 79_999), None);
        assert_eq!((intro.sweeps, intro.frame, intro.count), (SWEEPS, 0, 0));
        assert_eq!(bench.tick(&mut intro), Some(SystemState::DisplayTime));
    }
}
