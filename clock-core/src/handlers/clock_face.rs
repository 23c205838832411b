//! Normal operation: the time on the tubes, status light effects and the
//! shortcuts reachable from the clock face

use super::{alarm_color, period_color, Context, Handler};
use crate::display::FULL_BRIGHTNESS;
use crate::hal::ButtonSource;
use crate::types::{ButtonId, DayPeriod, Rgb, SystemState};

/// How long the alarm time stays on the tubes after Y is tapped
const SHOW_ALARM_TICKS: u16 = 3000;

/// Breathing ramp length in ticks, one way
const BREATH_TICKS: u16 = 2000;

/// Status light behaviour on the clock face, cycled by Z
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LightMode {
    Breathe,
    Steady,
    Off,
}

impl LightMode {
    pub const fn next(&self) -> LightMode {
        match self {
            LightMode::Breathe => LightMode::Steady,
            LightMode::Steady => LightMode::Off,
            LightMode::Off => LightMode::Breathe,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Face {
    Time,
    Alarm { shown: u16 },
}

/// Triangle ramp resynchronised on odd seconds
#[derive(Copy, Clone, Debug)]
struct Breath {
    level: u16,
    rising: bool,
}

impl Breath {
    const fn new() -> Self {
        Self { level: 0, rising: true }
    }

    fn tick(&mut self, second_tick: Option<u8>) {
        if self.rising {
            self.level = (self.level + 1).min(BREATH_TICKS - 1);
        } else {
            self.level = self.level.saturating_sub(1);
        }

        let half = BREATH_TICKS / 2;
        if second_tick.is_some_and(|sec| sec % 2 == 1) {
            if self.rising && self.level > half {
                self.rising = false;
                self.level = BREATH_TICKS - 1;
            } else if !self.rising && self.level < half {
                self.rising = true;
                self.level = 0;
            }
        }
    }

    /// Quadratic brightness scaled per channel for the half of the day
    fn color(&self, period: DayPeriod) -> Rgb {
        let x = u32::from(self.level / 8);
        let pwm = x * x * 254 / (249 * 249);
        let (r, g, b) = match period {
            DayPeriod::Am => (20, 12, 0),
            DayPeriod::Pm => (8, 8, 26),
        };
        let scale = |pct: u32| (pwm * pct / 100) as u8 + 1;
        Rgb::new(scale(r), scale(g), scale(b))
    }
}

#[derive(Debug)]
pub struct ClockFace {
    face: Face,
    lights: LightMode,
    breath: Breath,
}

impl ClockFace {
    pub const fn new() -> Self {
        Self {
            face: Face::Time,
            lights: LightMode::Breathe,
            breath: Breath::new(),
        }
    }

    pub fn light_mode(&self) -> LightMode {
        self.lights
    }

    fn update_lights<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) {
        let second_tick = if ctx.shared.take_slow_tick() {
            Some(ctx.shared.time.second())
        } else {
            None
        };

        if !ctx.shared.display.enabled {
            ctx.lights.off();
            return;
        }
        if let Face::Alarm { .. } = self.face {
            ctx.lights.set(alarm_color(ctx.shared.alarm.time.period()));
            return;
        }

        match self.lights {
            LightMode::Breathe => {
                self.breath.tick(second_tick);
                if self.breath.level % 5 == 0 {
                    ctx.lights.set(self.breath.color(ctx.shared.time.period()));
                }
            }
            LightMode::Steady => ctx.lights.set(period_color(ctx.shared.time.period())),
            LightMode::Off => ctx.lights.off(),
        }
    }

    fn render<S>(&mut self, ctx: &mut Context<'_, S>) {
        match self.face {
            Face::Time => {
                let digits = ctx.shared.time.bcd().hh_mm();
                ctx.shared.display.show(digits);
            }
            Face::Alarm { shown } => {
                let digits = ctx.shared.alarm.time.bcd().hh_mm();
                ctx.shared.display.show(digits);
                self.face = if shown >= SHOW_ALARM_TICKS {
                    Face::Time
                } else {
                    Face::Alarm { shown: shown + 1 }
                };
            }
        }
    }

    fn handle_buttons<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) -> Option<SystemState> {
        let y_action = ctx.button(ButtonId::Y).action();
        let z_action = ctx.button(ButtonId::Z).action();
        let x_action = ctx.button(ButtonId::X).action();
        let mut next = None;

        if !y_action && !z_action && ctx.button(ButtonId::X).take_long_press() {
            if ctx.shared.display.enabled {
                next = Some(SystemState::Menu);
            } else {
                ctx.shared.display.enabled = true;
            }
        }

        if ctx.button(ButtonId::X).take_short_press() {
            if ctx.shared.display.enabled {
                next = Some(SystemState::Intro);
            } else {
                ctx.shared.display.enabled = true;
            }
        }

        if ctx.button(ButtonId::Z).take_short_press() {
            if ctx.shared.display.enabled {
                self.lights = self.lights.next();
                if self.lights == LightMode::Breathe {
                    self.breath = Breath::new();
                }
            } else {
                ctx.shared.display.enabled = true;
            }
        }

        if ctx.button(ButtonId::Y).take_short_press() {
            if ctx.shared.display.enabled {
                if self.face == Face::Time {
                    self.face = Face::Alarm { shown: 0 };
                }
            } else {
                ctx.shared.display.enabled = true;
            }
        }

        if !x_action && !z_action && ctx.button(ButtonId::Y).take_long_press() {
            ctx.shared.display.enabled = false;
            ctx.buzzer.beep_on();
        }

        let all_long = ButtonId::ALL
            .iter()
            .all(|&id| ctx.button(id).is_long_press());
        if all_long {
            for id in ButtonId::ALL {
                ctx.button(id).take_action();
            }
            ctx.shared.display.enabled = false;
            next = Some(SystemState::Reset);
        }

        next
    }
}

impl Handler for ClockFace {
    fn enter<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) {
        self.face = Face::Time;
        self.breath = Breath::new();
        ctx.shared.display.enabled = true;
        ctx.shared.display.set_brightness(FULL_BRIGHTNESS);
        ctx.lights.set(Rgb::OFF);
    }

    fn step<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) -> Option<SystemState> {
        self.update_lights(ctx);
        self.render(ctx);
        let next = self.handle_buttons(ctx);

        #[cfg(feature = "defmt")]
        if let Some(state) = next {
            defmt::debug!("clock face -> {}", state);
        }

        next
    }
}
