//! Sleep/wake power controller
//!
//! Entered only from [`SystemState::Sleep`]. One call to
//! [`PowerController::step`] executes one step of the sequence
//! `DisablePeripherals -> EnterLowPower -> Resume -> EnableSystem`, looping
//! back from `Resume` to `EnterLowPower` while external power is absent.

use crate::hal::{Buzzer, ClockHal, Console, Peripherals, PowerSupply, StatusLights, VoltageMonitor};
use crate::types::{ClockConfig, PowerMode, SleepDepth, SystemState};

/// Steps of the sleep sequence
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerStep {
    DisablePeripherals,
    EnterLowPower,
    Resume,
    EnableSystem,
}

/// Alarm status the controller needs when choosing a depth and a wake state
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct AlarmStatus {
    /// Enabled and not yet rung: the slow tick must keep running
    pub pending: bool,
    /// Rang while asleep
    pub triggered: bool,
}

/// Sole owner of [`PowerMode`]
#[derive(Debug)]
pub struct PowerController {
    step: PowerStep,
    mode: PowerMode,
    depth: SleepDepth,
}

impl PowerController {
    pub const fn new() -> Self {
        Self {
            step: PowerStep::DisablePeripherals,
            mode: PowerMode::RtcStopped,
            depth: SleepDepth::Deep,
        }
    }

    pub fn mode(&self) -> PowerMode {
        self.mode
    }

    pub fn current_step(&self) -> PowerStep {
        self.step
    }

    /// Depth chosen by the last `DisablePeripherals` step
    pub fn depth(&self) -> SleepDepth {
        self.depth
    }

    /// Power-up decision: the oscillator is kept only with external power
    pub fn boot(&mut self, external_power: bool) -> PowerMode {
        self.mode = if external_power {
            PowerMode::RtcRetained
        } else {
            PowerMode::RtcStopped
        };
        self.step = PowerStep::DisablePeripherals;
        self.mode
    }

    /// Used by the reset procedure
    pub fn force_rtc_stopped(&mut self) {
        self.mode = PowerMode::RtcStopped;
    }

    /// Restart the sequence; called when the dispatcher enters `Sleep`
    pub fn begin(&mut self) {
        self.step = PowerStep::DisablePeripherals;
    }

    /// Deep sleep stops the slow tick, so it is legal only in RTC-stopped
    /// mode with no alarm waiting for that tick.
    pub fn select_depth(mode: PowerMode, alarm_pending: bool) -> SleepDepth {
        match mode {
            PowerMode::RtcStopped if !alarm_pending => SleepDepth::Deep,
            _ => SleepDepth::Shallow,
        }
    }

    /// Run one step. Returns the state to leave `Sleep` for, if any.
    pub fn step<H: ClockHal>(
        &mut self,
        hal: &mut H,
        alarm: AlarmStatus,
        config: &ClockConfig,
    ) -> Option<SystemState> {
        match self.step {
            PowerStep::DisablePeripherals => {
                self.depth = Self::select_depth(self.mode, alarm.pending);

                #[cfg(feature = "defmt")]
                defmt::info!("sleep: mode {} depth {}", self.mode, self.depth);

                if self.mode == PowerMode::RtcRetained {
                    hal.console().write_str("\n\rGood Bye   ");
                }
                hal.buzzer().stop();
                hal.buzzer().beep_off();
                hal.lights().off();
                hal.peripherals().disable(self.depth == SleepDepth::Deep);
                self.step = PowerStep::EnterLowPower;
                None
            }
            PowerStep::EnterLowPower => {
                hal.peripherals().enter_sleep(self.depth);
                self.step = PowerStep::Resume;
                None
            }
            PowerStep::Resume => {
                self.step = if hal.power().external_power_present() {
                    self.mode = PowerMode::RtcRetained;
                    PowerStep::EnableSystem
                } else {
                    PowerStep::EnterLowPower
                };
                None
            }
            PowerStep::EnableSystem => {
                self.step = PowerStep::DisablePeripherals;
                hal.peripherals().enable();
                hal.power().set_boost(true);
                hal.console().write_str("\n\rWhat's Up!");
                hal.peripherals().delay_ms(config.settle_ms);

                let next = match hal.voltage().self_test() {
                    Err(_e) => {
                        #[cfg(feature = "defmt")]
                        defmt::warn!("voltage self-test failed after wake: {}", _e);
                        SystemState::Reset
                    }
                    Ok(()) if alarm.triggered => SystemState::AlarmTriggered,
                    Ok(()) => SystemState::Intro,
                };
                Some(next)
            }
        }
    }
}

impl Default for PowerController {
    fn default() -> Self {
        Self::new()
    }
}
