//! Dual time base and the records shared with interrupt handlers
//!
//! [`Shared`] is meant to live in a `static`. Interrupt handlers call the
//! `on_*` entry points; the dispatcher reaches the records only through
//! [`Shared::with`], so every multi-field record is read and written inside
//! one critical section and is never observed half-updated.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Deque;
use portable_atomic::{AtomicBool, Ordering};

use crate::button::Button;
use crate::display::{DisplayRecord, Multiplexer};
use crate::hal::{ButtonSource, DisplayDriver};
use crate::time::{Alarm, WallClock};
use crate::types::{ButtonId, SystemState};

/// Serial time reports buffered between two dispatch windows
pub const REPORT_QUEUE: usize = 4;

/// One-shot tick flag: raised by its interrupt, taken by a single consumer
pub struct TickFlag(AtomicBool);

impl TickFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Test-and-clear
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Default for TickFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Every record shared between interrupt handlers and the dispatcher
pub struct SharedState<S> {
    pub system: SystemState,
    pub time: WallClock,
    pub alarm: Alarm,
    pub display: DisplayRecord,
    pub mux: Multiplexer,
    pub buttons: [Button<S>; 3],
    /// External power as last reported by the power pin interrupt
    pub external_power: bool,
    slow_tick: bool,
    reports: Deque<WallClock, REPORT_QUEUE>,
}

impl<S: ButtonSource> SharedState<S> {
    pub fn button(&mut self, id: ButtonId) -> &mut Button<S> {
        &mut self.buttons[id.index()]
    }
}

impl<S> SharedState<S> {
    /// Consume the slow-tick flag
    pub fn take_slow_tick(&mut self) -> bool {
        core::mem::replace(&mut self.slow_tick, false)
    }

    /// Oldest pending `HH:MM:SS` report
    pub fn next_report(&mut self) -> Option<WallClock> {
        self.reports.pop_front()
    }

    fn queue_report(&mut self) {
        if self.reports.is_full() {
            self.reports.pop_front();
        }
        // Cannot fail: a slot was just freed.
        let _ = self.reports.push_back(self.time);
    }
}

/// Copy of the records taken inside one critical section
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockSnapshot {
    pub system: SystemState,
    pub time: WallClock,
    pub alarm: Alarm,
    pub display: DisplayRecord,
}

/// Owner of the fast-tick flag and the shared records
pub struct Shared<S> {
    fast_tick: TickFlag,
    state: Mutex<RefCell<SharedState<S>>>,
}

impl<S: ButtonSource> Shared<S> {
    /// Power-up contents: `Intro`, 12:00:00 AM, alarm disabled
    pub const fn new(x: S, y: S, z: S) -> Self {
        Self {
            fast_tick: TickFlag::new(),
            state: Mutex::new(RefCell::new(SharedState {
                system: SystemState::Intro,
                time: WallClock::new(),
                alarm: Alarm::new(),
                display: DisplayRecord::new(),
                mux: Multiplexer::new(),
                buttons: [
                    Button::new(ButtonId::X, x),
                    Button::new(ButtonId::Y, y),
                    Button::new(ButtonId::Z, z),
                ],
                external_power: false,
                slow_tick: false,
                reports: Deque::new(),
            })),
        }
    }

    pub fn fast_tick(&self) -> &TickFlag {
        &self.fast_tick
    }

    /// Run `f` on the shared records inside a critical section
    pub fn with<R>(&self, f: impl FnOnce(&mut SharedState<S>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.state.borrow_ref_mut(cs)))
    }

    pub fn system(&self) -> SystemState {
        self.with(|s| s.system)
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        self.with(|s| ClockSnapshot {
            system: s.system,
            time: s.time,
            alarm: s.alarm,
            display: s.display,
        })
    }

    /// Fast (1 kHz) tick interrupt: raise the dispatch flag and multiplex
    /// one tube
    pub fn on_fast_tick<D: DisplayDriver + ?Sized>(&self, driver: &mut D) {
        self.fast_tick.raise();
        self.with(|s| {
            if s.system != SystemState::ProductionTest {
                let frame = s.mux.advance(&s.display);
                driver.show(frame);
            }
        });
    }

    /// Slow (1 Hz) tick interrupt: advance the wall clock and check the alarm
    pub fn on_slow_tick(&self) {
        self.with(|s| {
            s.slow_tick = true;
            if s.system == SystemState::ProductionTest {
                return;
            }

            s.time.tick_second();

            if s.alarm.check(&s.time) {
                #[cfg(feature = "defmt")]
                defmt::info!("alarm matched at {}:{}", s.time.hour(), s.time.minute());

                // While asleep the latch is routed by the power controller.
                if s.system != SystemState::Sleep {
                    s.system = SystemState::AlarmTriggered;
                }
            }

            if s.external_power {
                s.queue_report();
            }
        });
    }

    /// Button pin-change interrupt
    pub fn on_button_edge(&self) {
        self.with(|s| {
            for button in s.buttons.iter_mut() {
                button.on_edge();
            }
        });
    }

    /// External power pin-change interrupt
    pub fn on_power_edge(&self, present: bool) {
        self.with(|s| {
            s.external_power = present;
            if !present {
                s.system = SystemState::Sleep;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::mock::{MockButton, MockDisplay};
    use crate::types::DayPeriod;

    fn shared() -> Shared<MockButton> {
        Shared::new(MockButton::new(), MockButton::new(), MockButton::new())
    }

    #[test]
    fn test_tick_flag_take_once() {
        let flag = TickFlag::new();
        assert!(!flag.take());
        flag.raise();
        flag.raise();
        assert!(flag.take());
        assert!(!flag.take());
    }

    #[test]
    fn test_slow_tick_advances_time_and_sets_flag() {
        let shared = shared();
        shared.on_slow_tick();
        let snap = shared.snapshot();
        assert_eq!(snap.time.second(), 1);
        assert!(snap.time.is_consistent());
        assert!(shared.with(|s| s.take_slow_tick()));
        assert!(!shared.with(|s| s.take_slow_tick()));
    }

    #[test]
    fn test_production_test_freezes_time_and_display() {
        let shared = shared();
        let mut display = MockDisplay::new();
        shared.with(|s| s.system = SystemState::ProductionTest);
        shared.on_slow_tick();
        shared.on_fast_tick(&mut display);
        assert_eq!(shared.snapshot().time.second(), 0);
        assert_eq!(display.frames, 0);
        assert!(shared.fast_tick().take());
    }

    #[test]
    fn test_alarm_forces_state_on_exact_tick() {
        let shared = shared();
        shared.with(|s| {
            s.system = SystemState::Menu;
            s.time = WallClock::new_12h(7, 29, 58, DayPeriod::Am).unwrap();
            s.alarm = Alarm::at(WallClock::new_12h(7, 30, 0, DayPeriod::Am).unwrap());
        });
        shared.on_slow_tick();
        assert_eq!(shared.system(), SystemState::Menu);
        shared.on_slow_tick();
        assert_eq!(shared.system(), SystemState::AlarmTriggered);
        assert!(shared.snapshot().alarm.triggered());
    }

    #[test]
    fn test_alarm_while_asleep_only_latches() {
        let shared = shared();
        shared.with(|s| {
            s.system = SystemState::Sleep;
            s.time = WallClock::new_24h(6, 59, 59).unwrap();
            s.alarm = Alarm::at(WallClock::new_24h(7, 0, 0).unwrap());
        });
        shared.on_slow_tick();
        let snap = shared.snapshot();
        assert_eq!(snap.system, SystemState::Sleep);
        assert!(snap.alarm.triggered());
    }

    #[test]
    fn test_power_loss_forces_sleep() {
        let shared = shared();
        shared.on_power_edge(true);
        assert_eq!(shared.system(), SystemState::Intro);
        shared.on_power_edge(false);
        assert_eq!(shared.system(), SystemState::Sleep);
    }

    #[test]
    fn test_button_edge_queries_every_pressed_button() {
        let shared = shared();
        shared.with(|s| {
            s.button(ButtonId::X).source_mut().set_pressed(true);
            s.button(ButtonId::Z).source_mut().set_pressed(true);
        });
        shared.on_button_edge();
        shared.with(|s| {
            assert!(s.button(ButtonId::X).query());
            assert!(!s.button(ButtonId::Y).query());
            assert!(s.button(ButtonId::Z).query());
        });
    }

    #[test]
    fn test_reports_only_with_external_power() {
        let shared = shared();
        shared.on_slow_tick();
        assert!(shared.with(|s| s.next_report()).is_none());

        shared.on_power_edge(true);
        for _ in 0..6 {
            shared.on_slow_tick();
        }
        let first = shared.with(|s| s.next_report()).unwrap();
        assert_eq!(first.second(), 4);
    }
}
