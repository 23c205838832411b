//! Whole-core simulator for host tests
//!
//! [`Simulator`] plays the part of the board: every simulated millisecond it
//! fires the fast-tick interrupt (while peripherals are powered), fires the
//! slow-tick interrupt once per second (while the oscillator runs), applies
//! scripted button and power events, and runs one dispatch window.

use std::boxed::Box;
use std::collections::VecDeque;

use crate::dispatcher::Dispatcher;
use crate::hal::mock::{MockButton, MockDisplay, MockHal};
use crate::time::{Alarm, WallClock};
use crate::timebase::{ClockSnapshot, Shared};
use crate::types::{ButtonId, ClockConfig, SystemState};

const MS_PER_SECOND: u64 = 1000;

/// Board-level stimulus
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SimEvent {
    Press(ButtonId),
    Release(ButtonId),
    Plug,
    Unplug,
}

pub struct Simulator {
    shared: &'static Shared<MockButton>,
    dispatcher: Dispatcher<'static, MockButton>,
    pub hal: MockHal,
    pub display: MockDisplay,
    now_ms: u64,
    script: VecDeque<(u64, SimEvent)>,
}

impl Simulator {
    /// Healthy board with the reference configuration
    pub fn new(external_power: bool) -> Self {
        Self::with_config(ClockConfig::default(), external_power)
    }

    pub fn with_config(config: ClockConfig, external_power: bool) -> Self {
        // One leaked record per simulator keeps the dispatcher borrow 'static
        // like the firmware's.
        let shared: &'static Shared<MockButton> = Box::leak(Box::new(Shared::new(
            MockButton::new(),
            MockButton::new(),
            MockButton::new(),
        )));
        Self {
            shared,
            dispatcher: Dispatcher::new(shared, config),
            hal: MockHal::new(external_power),
            display: MockDisplay::new(),
            now_ms: 0,
            script: VecDeque::new(),
        }
    }

    pub fn shared(&self) -> &'static Shared<MockButton> {
        self.shared
    }

    pub fn dispatcher(&self) -> &Dispatcher<'static, MockButton> {
        &self.dispatcher
    }

    pub fn boot(&mut self) -> SystemState {
        self.dispatcher.boot(&mut self.hal)
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn system(&self) -> SystemState {
        self.shared.system()
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        self.shared.snapshot()
    }

    pub fn set_time(&self, time: WallClock) {
        self.shared.with(|s| s.time = time);
    }

    pub fn set_alarm(&self, alarm: Alarm) {
        self.shared.with(|s| s.alarm = alarm);
    }

    /// Force a state, as an interrupt would
    pub fn force_state(&self, state: SystemState) {
        self.shared.with(|s| s.system = state);
    }

    /// Queue an event `delay_ms` from now. Events due on the same
    /// millisecond apply in the order they were queued.
    pub fn schedule(&mut self, delay_ms: u64, event: SimEvent) {
        let at = self.now_ms + delay_ms;
        let index = self.script.partition_point(|&(t, _)| t <= at);
        self.script.insert(index, (at, event));
    }

    /// Apply an event immediately
    pub fn apply(&mut self, event: SimEvent) {
        match event {
            SimEvent::Press(id) => self.set_button(id, true),
            SimEvent::Release(id) => self.set_button(id, false),
            SimEvent::Plug => {
                self.hal.power.present = true;
                self.shared.on_power_edge(true);
            }
            SimEvent::Unplug => {
                self.hal.power.present = false;
                self.shared.on_power_edge(false);
            }
        }
    }

    fn set_button(&mut self, id: ButtonId, pressed: bool) {
        self.shared.with(|s| s.button(id).source_mut().set_pressed(pressed));
        self.shared.on_button_edge();
    }

    /// One millisecond of board time
    pub fn step(&mut self) -> SystemState {
        while let Some(&(at, event)) = self.script.front() {
            if at > self.now_ms {
                break;
            }
            self.script.pop_front();
            self.apply(event);
        }

        if self.hal.peripherals.enabled {
            self.shared.on_fast_tick(&mut self.display);
        }
        self.now_ms += 1;
        if self.now_ms % MS_PER_SECOND == 0 && !self.hal.peripherals.rtc_halted {
            self.shared.on_slow_tick();
        }

        self.dispatcher.cycle(&mut self.hal)
    }

    pub fn run_ms(&mut self, ms: u64) -> SystemState {
        for _ in 0..ms {
            self.step();
        }
        self.system()
    }

    /// Run until `pred` holds or `max_ms` elapsed. Returns whether it held.
    pub fn run_until(&mut self, max_ms: u64, mut pred: impl FnMut(&Self) -> bool) -> bool {
        for _ in 0..max_ms {
            if pred(self) {
                return true;
            }
            self.step();
        }
        pred(self)
    }

    /// Run until the state is `state`, at most `max_ms`
    pub fn run_until_state(&mut self, state: SystemState, max_ms: u64) -> bool {
        self.run_until(max_ms, |sim| sim.system() == state)
    }

    /// Hold a button for `hold_ms`, release it and let the release spacing
    /// elapse
    pub fn press(&mut self, id: ButtonId, hold_ms: u64) -> SystemState {
        self.apply(SimEvent::Press(id));
        self.run_ms(hold_ms);
        self.apply(SimEvent::Release(id));
        self.run_ms(40)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulator_boots_into_clock_face() {
        let mut sim = Simulator::new(true);
        assert_eq!(sim.boot(), SystemState::Intro);
        assert!(sim.run_until_state(SystemState::DisplayTime, 5000));
        assert!(sim.display.frames > 0);
    }

    #[test]
    fn test_scripted_unplug_puts_clock_to_sleep() {
        let mut sim = Simulator::new(true);
        sim.boot();
        sim.schedule(10, SimEvent::Unplug);
        sim.run_ms(20);
        assert_eq!(sim.system(), SystemState::Sleep);
        assert!(!sim.hal.peripherals.enabled);
    }
}
