//! Behaviour handlers, one per [`SystemState`]
//!
//! Every handler is a small state machine driven once per fast tick by the
//! dispatcher, always inside the dispatch critical section. `enter` runs on
//! the first tick after the state changed; `step` returns the next state when
//! the handler wants to leave.

mod alarm;
mod clock_face;
mod intro;
mod menu;
mod settings;
mod test_mode;

pub use alarm::AlarmRing;
pub use clock_face::{ClockFace, LightMode};
pub use intro::Intro;
pub use menu::Menu;
pub use settings::{AlarmActive, AlarmTheme, EditTarget, HourModeSetting, TimeEditor, Transitions};
pub use test_mode::UserTest;

use crate::button::Button;
use crate::hal::{ButtonSource, Buzzer, StatusLights};
use crate::timebase::SharedState;
use crate::types::{ButtonId, ClockConfig, DayPeriod, Rgb, SystemState};

/// What a handler may touch during one step
pub struct Context<'a, S> {
    pub shared: &'a mut SharedState<S>,
    pub buzzer: &'a mut dyn Buzzer,
    pub lights: &'a mut dyn StatusLights,
    pub config: &'a ClockConfig,
}

impl<'a, S: ButtonSource> Context<'a, S> {
    pub fn button(&mut self, id: ButtonId) -> &mut Button<S> {
        self.shared.button(id)
    }

    /// X short press goes back to the menu, X long press to the clock face
    fn back_or_home(&mut self) -> Option<SystemState> {
        let x = self.button(ButtonId::X);
        if x.take_short_press() {
            Some(SystemState::Menu)
        } else if x.take_long_press() {
            Some(SystemState::DisplayTime)
        } else {
            None
        }
    }

    /// Press seen on any button. Every pending action is consumed.
    fn take_any_action(&mut self) -> bool {
        self.shared
            .buttons
            .iter_mut()
            .fold(false, |seen, button| button.take_action() | seen)
    }

    /// Press on any button seen before its long hold
    fn take_any_press(&mut self) -> bool {
        self.shared
            .buttons
            .iter_mut()
            .fold(false, |seen, button| button.take_press() | seen)
    }
}

/// Common shape of every behaviour handler
pub trait Handler {
    fn enter<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>);

    fn step<S: ButtonSource>(&mut self, ctx: &mut Context<'_, S>) -> Option<SystemState>;
}

/// Tick counter with the blink cursor and the idle timeout shared by the
/// setting screens
#[derive(Copy, Clone, Debug, Default)]
pub struct MenuTimer {
    count: u32,
    visible: bool,
}

impl MenuTimer {
    pub const fn new() -> Self {
        Self { count: 0, visible: false }
    }

    /// Restart the idle timeout after user activity
    pub fn touch(&mut self) {
        self.count = 0;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Blink phase: true while the edited value is shown
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Count one tick. Returns true when the idle timeout expired.
    pub fn tick(&mut self, config: &ClockConfig) -> bool {
        self.count += 1;
        if self.count % config.blink_ticks == 0 {
            self.visible = !self.visible;
            if self.count >= config.idle_timeout_ticks {
                self.count = 0;
                return true;
            }
        }
        false
    }
}

/// Steady colour of the status lights for a half of the day
pub(crate) fn period_color(period: DayPeriod) -> Rgb {
    match period {
        DayPeriod::Am => Rgb::new(50, 30, 0),
        DayPeriod::Pm => Rgb::new(20, 20, 65),
    }
}

/// Colour used while the alarm time is on the tubes
pub(crate) fn alarm_color(period: DayPeriod) -> Rgb {
    match period {
        DayPeriod::Am => Rgb::new(0, 150, 0),
        DayPeriod::Pm => Rgb::new(0, 0, 150),
    }
}

/// One instance of every handler, selected by an exhaustive match
pub struct Handlers {
    intro: Intro,
    clock: ClockFace,
    menu: Menu,
    set_time: TimeEditor,
    set_alarm: TimeEditor,
    alarm_active: AlarmActive,
    hour_mode: HourModeSetting,
    transitions: Transitions,
    theme: AlarmTheme,
    ring: AlarmRing,
    user_test: UserTest,
}

impl Handlers {
    pub const fn new() -> Self {
        Self {
            intro: Intro::new(),
            clock: ClockFace::new(),
            menu: Menu::new(),
            set_time: TimeEditor::new(EditTarget::Time),
            set_alarm: TimeEditor::new(EditTarget::Alarm),
            alarm_active: AlarmActive::new(),
            hour_mode: HourModeSetting::new(),
            transitions: Transitions::new(),
            theme: AlarmTheme::new(),
            ring: AlarmRing::new(),
            user_test: UserTest::new(),
        }
    }

    pub fn clock_face(&self) -> &ClockFace {
        &self.clock
    }

    pub fn alarm_ring(&self) -> &AlarmRing {
        &self.ring
    }

    /// Run `enter` of the handler owning `state`. States driven by the
    /// dispatcher itself have no handler.
    pub fn enter<S: ButtonSource>(&mut self, state: SystemState, ctx: &mut Context<'_, S>) {
        match state {
            SystemState::Intro => self.intro.enter(ctx),
            SystemState::DisplayTime => self.clock.enter(ctx),
            SystemState::Menu => self.menu.enter(ctx),
            SystemState::SetTime => self.set_time.enter(ctx),
            SystemState::SetAlarm => self.set_alarm.enter(ctx),
            SystemState::SetAlarmActive => self.alarm_active.enter(ctx),
            SystemState::SetHourMode => self.hour_mode.enter(ctx),
            SystemState::SetTransitions => self.transitions.enter(ctx),
            SystemState::SetAlarmTheme => self.theme.enter(ctx),
            SystemState::AlarmTriggered => self.ring.enter(ctx),
            SystemState::UserTest => self.user_test.enter(ctx),
            SystemState::Sleep | SystemState::ProductionTest | SystemState::Reset => {}
        }
    }

    pub fn step<S: ButtonSource>(
        &mut self,
        state: SystemState,
        ctx: &mut Context<'_, S>,
    ) -> Option<SystemState> {
        match state {
            SystemState::Intro => self.intro.step(ctx),
            SystemState::DisplayTime => self.clock.step(ctx),
            SystemState::Menu => self.menu.step(ctx),
            SystemState::SetTime => self.set_time.step(ctx),
            SystemState::SetAlarm => self.set_alarm.step(ctx),
            SystemState::SetAlarmActive => self.alarm_active.step(ctx),
            SystemState::SetHourMode => self.hour_mode.step(ctx),
            SystemState::SetTransitions => self.transitions.step(ctx),
            SystemState::SetAlarmTheme => self.theme.step(ctx),
            SystemState::AlarmTriggered => self.ring.step(ctx),
            SystemState::UserTest => self.user_test.step(ctx),
            SystemState::Sleep | SystemState::ProductionTest | SystemState::Reset => None,
        }
    }
}

impl Default for Handlers {
    fn default() -> Self {
        Self::new()
    }
}
