//! The six setting screens reached from the menu
//!
//! All of them blink the edited value every `blink_ticks`, go back to the
//! menu on a short X press or on the idle timeout, and to the clock face on a
//! long X press.

use super::{alarm_color, period_color, Context, Handler, MenuTimer};
use crate::display::{Digit, FULL_BRIGHTNESS};
use crate::hal::ButtonSource;
use crate::time::{change_hour_mode, TimeField};
use crate::types::{ButtonId, Rgb, SystemState};

/// Ticks between two dimming steps of the fade-out played on entry
const FADE_STEP_TICKS: u32 = 30;

/// Which record the time editor changes
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum EditTarget {
    Time,
    Alarm,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum EditView {
    FadeOut,
    HoursMinutes,
    /// Hidden calibration view of the wall clock
    MinutesSeconds,
}

/// Editor for the wall clock or the alarm time
///
/// Y moves the cursor between the left and right pair of tubes, Z increments
/// the field under the cursor once per release or repeatedly while held.
/// Holding Y on the wall clock switches to minutes:seconds.
#[derive(Debug)]
pub struct TimeEditor {
    target: EditTarget,
    view: EditView,
    left_selected: bool,
    timer: MenuTimer,
}

impl TimeEditor {
    pub const fn new(target: EditTarget) -> Self {
        Self {
            target,
            view: EditView::FadeOut,
            left_selected: true,
            timer: MenuTimer::new(),
        }
    }

    fn field(&self) -> TimeField {
        match (self.view, self.left_selected) {
            (EditView::MinutesSeconds, true) => TimeField::Minute,
            (EditView::MinutesSeconds, false) => TimeField::Second,
            (_, true) => TimeField::Hour,
            (_, false) => TimeField::Minute,
        }
    }

    fn increment<S>(&self, ctx: &mut Context<'_, S>) {
        let field = self.field();
        match self.target {
            EditTarget::Time => {
                ctx.shared.time.increment(field);
                ctx.lights.set(period_color(ctx.shared.time.period()));
            }
            EditTarget::Alarm => {
                ctx.shared.alarm.time.increment(field);
                ctx.lights.set(alarm_color(ctx.shared.alarm.time.period()));
            }
        }
    }

    fn render<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) {
        if self.view == EditView::FadeOut {
            if self.timer.count() % FADE_STEP_TICKS == 0 && ctx.shared.display.dim_step() {
                ctx.shared.display.blank();
                ctx.shared.display.set_brightness(FULL_BRIGHTNESS);
                self.timer.touch();
                self.view = EditView::HoursMinutes;
            }
            return;
        }

        let record = match self.target {
            EditTarget::Time => ctx.shared.time,
            EditTarget::Alarm => ctx.shared.alarm.time,
        };
        let digits = match self.view {
            EditView::MinutesSeconds => record.bcd().mm_ss(),
            _ => record.bcd().hh_mm(),
        };

        if self.timer.visible() || ctx.button(ButtonId::Z).is_held() {
            ctx.shared.display.show(digits);
        } else {
            ctx.shared.display.blank_pair(self.left_selected);
        }
    }
}

impl Handler for TimeEditor {
    fn enter<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) {
        *self = Self::new(self.target);
        ctx.shared.display.enabled = true;
        let color = match self.target {
            EditTarget::Time => period_color(ctx.shared.time.period()),
            EditTarget::Alarm => alarm_color(ctx.shared.alarm.time.period()),
        };
        ctx.lights.set(color);
    }

    fn step<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) -> Option<SystemState> {
        self.render(ctx);

        let mut next = ctx.back_or_home();

        let toggled = match self.target {
            EditTarget::Time => ctx.button(ButtonId::Y).take_short_press(),
            EditTarget::Alarm => ctx.button(ButtonId::Y).take_tap(),
        };
        if toggled {
            self.left_selected = !self.left_selected;
            self.timer.touch();
        }

        if self.target == EditTarget::Time && ctx.button(ButtonId::Y).take_long_press() {
            self.left_selected = !self.left_selected;
            self.view = match self.view {
                EditView::MinutesSeconds => EditView::HoursMinutes,
                _ => EditView::MinutesSeconds,
            };
            self.timer.touch();
        }

        if self.view != EditView::FadeOut && ctx.button(ButtonId::Z).action() {
            if ctx.button(ButtonId::Z).take_release() || ctx.button(ButtonId::Z).take_repeat() {
                self.increment(ctx);
            }
            self.timer.touch();
        }

        if self.timer.tick(ctx.config) {
            next = Some(SystemState::Menu);
        }
        next
    }
}

/// Y or Z toggles whether the alarm is armed; the last tube blinks 1 or 0
#[derive(Debug)]
pub struct AlarmActive {
    timer: MenuTimer,
}

impl AlarmActive {
    pub const fn new() -> Self {
        Self { timer: MenuTimer::new() }
    }
}

impl Handler for AlarmActive {
    fn enter<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) {
        self.timer = MenuTimer::new();
        ctx.shared.display.enabled = true;
        ctx.shared.display.set_brightness(FULL_BRIGHTNESS);
        ctx.shared.display.blank();
        ctx.lights.set(Rgb::new(0, 50, 50));
    }

    fn step<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) -> Option<SystemState> {
        let armed = ctx.shared.alarm.enabled;
        ctx.shared.display.set_digit(3, Digit::new(armed as u8));
        ctx.shared.display.enabled = self.timer.visible();

        let mut next = ctx.back_or_home();

        let y = ctx.button(ButtonId::Y).take_tap();
        let z = ctx.button(ButtonId::Z).take_tap();
        if y || z {
            ctx.shared.alarm.enabled = !armed;
            self.timer.touch();
        }

        if self.timer.tick(ctx.config) {
            next = Some(SystemState::Menu);
        }
        next
    }
}

/// Y or Z switches 12/24-hour notation for the clock and the alarm
#[derive(Debug)]
pub struct HourModeSetting {
    timer: MenuTimer,
}

impl HourModeSetting {
    pub const fn new() -> Self {
        Self { timer: MenuTimer::new() }
    }
}

impl Handler for HourModeSetting {
    fn enter<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) {
        self.timer = MenuTimer::new();
        ctx.shared.display.set_brightness(FULL_BRIGHTNESS);
        ctx.shared.display.blank();
        ctx.lights.set(Rgb::new(10, 10, 100));
    }

    fn step<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) -> Option<SystemState> {
        let [tens, units] = ctx.shared.time.hour_mode().label();
        ctx.shared.display.set_digit(2, Digit::new(tens));
        ctx.shared.display.set_digit(3, Digit::new(units));
        ctx.shared.display.enabled = self.timer.visible();

        let y = ctx.button(ButtonId::Y).take_action();
        let z = ctx.button(ButtonId::Z).take_action();
        if y || z {
            let mode = ctx.shared.time.hour_mode().toggled();
            let shared = &mut *ctx.shared;
            change_hour_mode(&mut shared.time, &mut shared.alarm, mode);
            self.timer.touch();
        }

        let mut next = ctx.back_or_home();
        if self.timer.tick(ctx.config) {
            next = Some(SystemState::Menu);
        }
        next
    }
}

/// Y and Z step through the four minute-change animations
#[derive(Debug)]
pub struct Transitions {
    timer: MenuTimer,
}

impl Transitions {
    pub const fn new() -> Self {
        Self { timer: MenuTimer::new() }
    }
}

impl Handler for Transitions {
    fn enter<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) {
        self.timer = MenuTimer::new();
        ctx.shared.display.enabled = true;
        ctx.shared.display.set_brightness(FULL_BRIGHTNESS);
        ctx.shared.display.blank();
        ctx.lights.set(Rgb::new(100, 10, 10));
    }

    fn step<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) -> Option<SystemState> {
        let shown = if self.timer.visible() {
            Digit::new(ctx.shared.display.transition.number())
        } else {
            Digit::BLANK
        };
        ctx.shared.display.set_digit(3, shown);

        if ctx.button(ButtonId::Y).take_action() {
            ctx.shared.display.transition = ctx.shared.display.transition.previous();
            self.timer.touch();
        }
        if ctx.button(ButtonId::Z).take_action() {
            ctx.shared.display.transition = ctx.shared.display.transition.next();
            self.timer.touch();
        }

        let mut next = ctx.back_or_home();
        if self.timer.tick(ctx.config) {
            next = Some(SystemState::Menu);
        }
        next
    }
}

/// Y and Z step through the alarm melodies, previewing the selected one
#[derive(Debug)]
pub struct AlarmTheme {
    timer: MenuTimer,
}

impl AlarmTheme {
    pub const fn new() -> Self {
        Self { timer: MenuTimer::new() }
    }
}

impl Handler for AlarmTheme {
    fn enter<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) {
        self.timer = MenuTimer::new();
        ctx.shared.display.enabled = true;
        ctx.shared.display.set_brightness(FULL_BRIGHTNESS);
        ctx.shared.display.blank();
        ctx.lights.set(Rgb::new(50, 50, 50));
    }

    fn step<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) -> Option<SystemState> {
        let melody = ctx.shared.alarm.melody;
        let shown = if self.timer.visible() {
            Digit::new(melody.number())
        } else {
            Digit::BLANK
        };
        ctx.shared.display.set_digit(3, shown);

        ctx.buzzer.play(melody);

        if ctx.button(ButtonId::Y).take_tap() {
            ctx.shared.alarm.melody = melody.previous();
            self.timer.touch();
        }
        if ctx.button(ButtonId::Z).take_tap() {
            ctx.shared.alarm.melody = melody.next();
            self.timer.touch();
        }

        let mut next = ctx.back_or_home();
        if self.timer.tick(ctx.config) {
            next = Some(SystemState::Menu);
        }
        if next.is_some() {
            ctx.buzzer.stop();
        }
        next
    }
}
