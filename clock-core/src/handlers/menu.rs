//! Configuration menu

use super::{Context, Handler, MenuTimer};
use crate::display::{Digit, FULL_BRIGHTNESS};
use crate::hal::ButtonSource;
use crate::types::{ButtonId, ButtonState, Rgb, SystemState};

/// Menu options in display order, numbered from 1
const OPTIONS: [SystemState; 6] = [
    SystemState::SetTime,
    SystemState::SetAlarm,
    SystemState::SetAlarmActive,
    SystemState::SetHourMode,
    SystemState::SetTransitions,
    SystemState::SetAlarmTheme,
];

/// Shows `0N` where N is the selected option. Y and Z move the selection,
/// releasing X enters it and holding X goes back to the clock face.
#[derive(Debug)]
pub struct Menu {
    option: usize,
    timer: MenuTimer,
}

impl Menu {
    pub const fn new() -> Self {
        Self {
            option: 0,
            timer: MenuTimer::new(),
        }
    }

    /// Selected option, 1..=6
    pub fn option(&self) -> u8 {
        self.option as u8 + 1
    }
}

impl Handler for Menu {
    fn enter<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) {
        self.option = 0;
        self.timer = MenuTimer::new();
        let display = &mut ctx.shared.display;
        display.enabled = true;
        display.set_brightness(FULL_BRIGHTNESS);
        display.blank();
        display.set_digit(0, Digit::new(0));
        ctx.lights.set(Rgb::new(250, 0, 250));
    }

    fn step<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) -> Option<SystemState> {
        ctx.shared.display.set_digit(1, Digit::new(self.option()));

        if ctx.button(ButtonId::Y).take_action() {
            self.option = (self.option + OPTIONS.len() - 1) % OPTIONS.len();
            self.timer.touch();
        }
        if ctx.button(ButtonId::Z).take_action() {
            self.option = (self.option + 1) % OPTIONS.len();
            self.timer.touch();
        }

        let mut next = None;
        let x = ctx.button(ButtonId::X);
        if x.action() {
            if x.state() == ButtonState::Released {
                x.take_action();
                next = Some(OPTIONS[self.option]);
            } else if x.take_long_press() {
                next = Some(SystemState::DisplayTime);
            }
            self.timer.touch();
        }

        if self.timer.tick(ctx.config) {
            next = Some(SystemState::DisplayTime);
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::Bench;

    #[test]
    fn test_navigation_wraps() {
        let mut bench = Bench::new();
        let mut menu = Menu::new();
        bench.enter(&mut menu);
        assert_eq!(menu.option(), 1);

        bench.press(&mut menu, ButtonId::Y, 20);
        assert_eq!(menu.option(), 6);
        bench.press(&mut menu, ButtonId::Z, 20);
        bench.press(&mut menu, ButtonId::Z, 20);
        assert_eq!(menu.option(), 2);
        let shown = bench.shared.snapshot().display.digits.map(|d| d.value());
        assert_eq!(shown, [Some(0), Some(2), None, None]);
    }

    #[test]
    fn test_x_release_enters_option() {
        let mut bench = Bench::new();
        let mut menu = Menu::new();
        bench.enter(&mut menu);
        bench.press(&mut menu, ButtonId::Z, 20);
        bench.press(&mut menu, ButtonId::Z, 20);
        assert_eq!(bench.press(&mut menu, ButtonId::X, 20), Some(SystemState::SetAlarmActive));
    }

    #[test]
    fn test_x_hold_returns_home() {
        let mut bench = Bench::new();
        let mut menu = Menu::new();
        bench.enter(&mut menu);
        assert_eq!(bench.press(&mut menu, ButtonId::X, 2100), Some(SystemState::DisplayTime));
    }

    #[test]
    fn test_idle_timeout() {
        let mut bench = Bench::new();
        let mut menu = Menu::new();
        bench.enter(&mut menu);
        assert_eq!(bench.run(&mut menu, 29_999), None);
        assert_eq!(bench.tick(&mut menu), Some(SystemState::DisplayTime));
    }
}
