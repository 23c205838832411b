//! Host-side rigs shared by the scenario tests, the runner binary and the
//! benches

use clock_core::hal::mock::{MockButton, MockBuzzer};
use clock_core::{Button, ButtonEvent, ButtonId, ClockConfig, WallClock};

#[cfg(test)]
mod time_properties;
#[cfg(test)]
mod debounce_tests;
#[cfg(test)]
mod scenario_tests;
#[cfg(test)]
mod concurrency_tests;

/// One button driven tick by tick, the way the fast-tick ISR and the
/// dispatcher drive it on the board
pub struct ButtonRig {
    pub button: Button<MockButton>,
    pub tone: MockBuzzer,
    pub config: ClockConfig,
    /// Every event with the tick it happened on, counted from 1
    pub events: Vec<(u32, ButtonEvent)>,
    /// Rising edges of the `action` flag
    pub actions: u32,
    level: bool,
    ticks: u32,
}

impl ButtonRig {
    pub fn new(id: ButtonId) -> Self {
        Self {
            button: Button::new(id, MockButton::new()),
            tone: MockBuzzer::new(),
            config: ClockConfig::default(),
            events: Vec::new(),
            actions: 0,
            level: false,
            ticks: 0,
        }
    }

    /// Keep the contact at `pressed` for `ticks` fast ticks. A level change
    /// raises the pin-change interrupt first.
    pub fn hold(&mut self, pressed: bool, ticks: u32) {
        if pressed != self.level {
            self.level = pressed;
            self.button.source_mut().set_pressed(pressed);
            self.button.on_edge();
        }
        for _ in 0..ticks {
            self.ticks += 1;
            let before = self.button.action();
            if let Some(event) = self.button.step(&self.config, &mut self.tone) {
                self.events.push((self.ticks, event));
            }
            if self.button.action() && !before {
                self.actions += 1;
            }
        }
    }

    /// Ticks of every occurrence of `event`
    pub fn ticks_of(&self, event: ButtonEvent) -> Vec<u32> {
        self.events
            .iter()
            .filter(|(_, e)| *e == event)
            .map(|(t, _)| *t)
            .collect()
    }
}

/// Shorthand for a valid 24-hour time
pub fn hms24(hour: u8, min: u8, sec: u8) -> WallClock {
    match WallClock::new_24h(hour, min, sec) {
        Ok(time) => time,
        Err(e) => panic!("{hour}:{min}:{sec}: {e}"),
    }
}
