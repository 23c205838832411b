//! Per-button debounce state machine
//!
//! One [`Button`] exists per physical button. The pin-change interrupt only
//! ever sets `query`; every other field is owned by [`Button::step`], which the
//! dispatcher calls once per fast tick while `query` is asserted. Behaviour
//! handlers read the flags and consume `action` (and `delay2` for repeats).

use crate::hal::{ButtonSource, Buzzer};
use crate::types::{ButtonId, ButtonState, ClockConfig};

/// Observable outcome of one debounce step
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonEvent {
    /// Stable press confirmed, `action` asserted
    Pressed,
    /// `delay1` asserted
    Hold,
    /// `delay2` (re-)asserted
    Repeat,
    /// `delay3` asserted
    LongHold,
    /// Level went back to released
    Released,
    /// Release spacing elapsed, back to idle with all flags cleared
    Settled,
    /// Idle counter fell back to zero without a press
    Noise,
}

/// Debounce record of one button bound to its level source
pub struct Button<S> {
    id: ButtonId,
    source: S,
    count: u16,
    state: ButtonState,
    delay1: bool,
    delay2: bool,
    delay3: bool,
    action: bool,
    lock: bool,
    query: bool,
}

impl<S: ButtonSource> Button<S> {
    pub const fn new(id: ButtonId, source: S) -> Self {
        Self {
            id,
            source,
            count: 0,
            state: ButtonState::Idle,
            delay1: false,
            delay2: false,
            delay3: false,
            action: false,
            lock: false,
            query: false,
        }
    }

    /// Pin-change interrupt side: request debouncing if the button reads
    /// pressed and no press is being tracked yet
    pub fn on_edge(&mut self) -> bool {
        if !self.lock && self.source.read() {
            self.query = true;
        }
        self.query
    }

    /// Advance the FSM by one fast tick. Does nothing unless `query` is set.
    pub fn step<B: Buzzer + ?Sized>(
        &mut self,
        config: &ClockConfig,
        tone: &mut B,
    ) -> Option<ButtonEvent> {
        if !self.query {
            return None;
        }
        let pressed = self.source.read();

        let event = match self.state {
            ButtonState::Idle => self.step_idle(pressed, config, tone),
            ButtonState::Pushed => self.step_pushed(pressed, config, tone),
            ButtonState::Released => self.step_released(pressed, config, tone),
        };

        #[cfg(feature = "defmt")]
        if let Some(event) = event {
            defmt::trace!("button {}: {}", self.id, event);
        }

        event
    }

    fn step_idle<B: Buzzer + ?Sized>(
        &mut self,
        pressed: bool,
        config: &ClockConfig,
        tone: &mut B,
    ) -> Option<ButtonEvent> {
        if pressed {
            self.count = self.count.saturating_add(1);
        } else {
            self.count = self.count.saturating_sub(1);
        }

        if self.count >= config.press_threshold {
            self.action = true;
            self.lock = true;
            self.count = 0;
            self.state = ButtonState::Pushed;
            tone.beep_on();
            Some(ButtonEvent::Pressed)
        } else if self.count == 0 {
            self.action = false;
            self.lock = false;
            self.query = false;
            Some(ButtonEvent::Noise)
        } else {
            None
        }
    }

    fn step_pushed<B: Buzzer + ?Sized>(
        &mut self,
        pressed: bool,
        config: &ClockConfig,
        tone: &mut B,
    ) -> Option<ButtonEvent> {
        if !pressed {
            // The release sample is the first of the spacing.
            self.count = 1;
            self.state = ButtonState::Released;
            return Some(ButtonEvent::Released);
        }

        // Past the last threshold the counter folds back to the long-hold
        // value so the repeat cadence keeps running.
        self.count = if self.count == u16::MAX {
            config.long_hold_ticks
        } else {
            self.count + 1
        };

        if self.count == config.beep_ticks {
            tone.beep_off();
        }

        let mut event = None;
        if self.count == config.hold_ticks {
            self.delay1 = true;
            event = Some(ButtonEvent::Hold);
        }
        if self.delay1 && self.count % config.repeat_ticks == 0 {
            self.delay2 = true;
            event = Some(ButtonEvent::Repeat);
        }
        if self.count >= config.long_hold_ticks && !self.delay3 {
            self.delay3 = true;
            event = Some(ButtonEvent::LongHold);
        }
        event
    }

    fn step_released<B: Buzzer + ?Sized>(
        &mut self,
        pressed: bool,
        config: &ClockConfig,
        tone: &mut B,
    ) -> Option<ButtonEvent> {
        if !pressed {
            self.count = self.count.saturating_add(1);
        }
        if self.count < config.release_ticks {
            return None;
        }

        self.count = 0;
        self.state = ButtonState::Idle;
        self.delay1 = false;
        self.delay2 = false;
        self.delay3 = false;
        self.action = false;
        self.lock = false;
        self.query = false;
        tone.beep_off();
        Some(ButtonEvent::Settled)
    }
}

impl<S> Button<S> {
    pub fn id(&self) -> ButtonId {
        self.id
    }

    pub fn state(&self) -> ButtonState {
        self.state
    }

    pub fn count(&self) -> u16 {
        self.count
    }

    pub fn action(&self) -> bool {
        self.action
    }

    pub fn delay1(&self) -> bool {
        self.delay1
    }

    pub fn delay2(&self) -> bool {
        self.delay2
    }

    pub fn delay3(&self) -> bool {
        self.delay3
    }

    pub fn locked(&self) -> bool {
        self.lock
    }

    pub fn query(&self) -> bool {
        self.query
    }

    /// Access to the bound level source
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Confirmed press still held down
    pub fn is_held(&self) -> bool {
        self.state == ButtonState::Pushed
    }

    /// Released before reaching `delay1`
    pub fn is_short_press(&self) -> bool {
        self.action && self.state == ButtonState::Released && !self.delay1
    }

    /// Held past `delay3`, whether or not it has been released
    pub fn is_long_press(&self) -> bool {
        self.action && self.delay3
    }

    /// Consume `action`, returning whether it was set
    pub fn take_action(&mut self) -> bool {
        core::mem::replace(&mut self.action, false)
    }

    pub fn take_short_press(&mut self) -> bool {
        self.is_short_press() && self.take_action()
    }

    pub fn take_long_press(&mut self) -> bool {
        self.is_long_press() && self.take_action()
    }

    /// Press of any kind that has been released
    pub fn take_release(&mut self) -> bool {
        self.action && self.state == ButtonState::Released && self.take_action()
    }

    /// Press seen before `delay1`, while still held or after release
    pub fn take_tap(&mut self) -> bool {
        self.action && !self.delay1 && self.take_action()
    }

    /// Press seen before `delay3`
    pub fn take_press(&mut self) -> bool {
        self.action && !self.delay3 && self.take_action()
    }

    /// Repeat tick while held: consumes `delay2` but keeps `action`
    pub fn take_repeat(&mut self) -> bool {
        if self.action && self.delay1 && self.delay2 {
            self.delay2 = false;
            true
        } else {
            false
        }
    }
}
