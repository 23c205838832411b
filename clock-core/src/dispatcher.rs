//! Tick-synchronised cooperative dispatcher
//!
//! One flat loop: every fast tick the dispatcher runs exactly one window for
//! the current [`SystemState`], then yields in [`Dispatcher::wait_for_tick`].
//! Handler states run entirely inside one critical section. `Sleep`, `Reset`
//! and `ProductionTest` run outside it because they block.

use heapless::Vec;

use crate::display::DisplayRecord;
use crate::handlers::{Context, Handlers};
use crate::hal::{
    ButtonSource, Buzzer, ClockHal, Console, Peripherals, PowerSupply, ProductionTester,
    StatusLights, VoltageMonitor,
};
use crate::power::{AlarmStatus, PowerController};
use crate::time::{Alarm, WallClock};
use crate::timebase::{Shared, REPORT_QUEUE};
use crate::types::{ClockConfig, PowerMode, SystemState};

/// Printed on the console at power-up
pub const BANNER: &str = concat!("\n\rFirmware Version: ", env!("CARGO_PKG_VERSION"), "\n\r");

const DISCONNECT: &str = "\n\r*** System going down. Please disconnect ***";

/// Heartbeat half-period while waiting for the adapter to be pulled
const RESET_BLINK_MS: u32 = 30;

/// Owner of the handlers and the power controller
pub struct Dispatcher<'a, S> {
    shared: &'a Shared<S>,
    handlers: Handlers,
    power: PowerController,
    config: ClockConfig,
    /// State whose `enter` has run
    active: Option<SystemState>,
}

impl<'a, S: ButtonSource> Dispatcher<'a, S> {
    pub fn new(shared: &'a Shared<S>, config: ClockConfig) -> Self {
        Self {
            shared,
            handlers: Handlers::new(),
            power: PowerController::new(),
            config,
            active: None,
        }
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    pub fn power_mode(&self) -> PowerMode {
        self.power.mode()
    }

    pub fn power(&self) -> &PowerController {
        &self.power
    }

    pub fn handlers(&self) -> &Handlers {
        &self.handlers
    }

    /// Power-up decision. Returns the first state.
    pub fn boot<H: ClockHal>(&mut self, hal: &mut H) -> SystemState {
        let external = hal.power().external_power_present();
        let _mode = self.power.boot(external);
        self.shared.with(|s| s.external_power = external);

        #[cfg(feature = "defmt")]
        defmt::info!("boot: external power {}, {}", external, _mode);

        let state = if external {
            hal.peripherals().enable();
            hal.power().set_boost(true);
            hal.console().write_str(BANNER);

            if hal.power().factory_jumper_present() {
                SystemState::ProductionTest
            } else {
                hal.peripherals().delay_ms(self.config.settle_ms);
                match hal.voltage().self_test() {
                    Ok(()) => SystemState::Intro,
                    Err(_e) => {
                        #[cfg(feature = "defmt")]
                        defmt::warn!("voltage self-test failed at boot: {}", _e);

                        hal.console().write_str(DISCONNECT);
                        SystemState::Reset
                    }
                }
            }
        } else {
            SystemState::Sleep
        };

        self.active = None;
        // A power edge seen during the settle delay or the self-test wins.
        self.shared.with(|s| {
            s.system = if s.external_power { state } else { SystemState::Sleep };
            s.system
        })
    }

    /// Run one dispatch window. Returns the state for the next window.
    pub fn cycle<H: ClockHal>(&mut self, hal: &mut H) -> SystemState {
        match self.shared.system() {
            SystemState::Sleep => self.sleep_step(hal),
            SystemState::Reset => self.reset(hal),
            SystemState::ProductionTest => self.production_test(hal),
            _ => self.dispatch(hal),
        }
        self.shared.system()
    }

    /// Yield until the next fast tick. Returns early once the state is `Sleep`.
    pub fn wait_for_tick(&self) {
        while !self.shared.fast_tick().take() {
            if self.shared.system() == SystemState::Sleep {
                return;
            }
            core::hint::spin_loop();
        }
    }

    pub fn run<H: ClockHal>(&mut self, hal: &mut H) -> ! {
        self.boot(hal);
        loop {
            self.cycle(hal);
            self.wait_for_tick();
        }
    }

    fn dispatch<H: ClockHal>(&mut self, hal: &mut H) {
        let Self { shared, handlers, config, active, .. } = self;
        let (tone, lights) = hal.outputs();
        let mut reports: Vec<WallClock, REPORT_QUEUE> = Vec::new();

        let _transition = shared.with(|s| {
            // Re-read: an interrupt may have moved the state since `cycle`.
            let state = s.system;
            if !state.is_stepped() {
                return None;
            }

            let entering = *active != Some(state);
            *active = Some(state);

            let next = {
                let mut ctx = Context {
                    shared: &mut *s,
                    buzzer: &mut *tone,
                    lights: &mut *lights,
                    config: &*config,
                };
                if entering {
                    handlers.enter(state, &mut ctx);
                }
                handlers.step(state, &mut ctx)
            };

            for button in s.buttons.iter_mut() {
                button.step(config, &mut *tone);
            }

            if let Some(next) = next {
                s.system = next;
            }

            if s.external_power {
                while let Some(time) = s.next_report() {
                    let _ = reports.push(time);
                }
            }

            next.map(|next| (state, next))
        });

        #[cfg(feature = "defmt")]
        if let Some((from, to)) = _transition {
            defmt::debug!("{} -> {}", from, to);
        }

        for time in &reports {
            let console = hal.console();
            console.write_str(time.format_hms().as_str());
            console.write_str("\n\r");
            hal.lights().toggle_heartbeat();
        }
    }

    fn sleep_step<H: ClockHal>(&mut self, hal: &mut H) {
        if self.active != Some(SystemState::Sleep) {
            self.power.begin();
            self.active = Some(SystemState::Sleep);
        }

        let alarm = self.shared.with(|s| AlarmStatus {
            pending: s.alarm.pending(),
            triggered: s.alarm.triggered(),
        });

        if let Some(next) = self.power.step(hal, alarm, &self.config) {
            #[cfg(feature = "defmt")]
            defmt::info!("wake -> {}", next);

            self.shared.with(|s| {
                s.external_power = true;
                if s.system == SystemState::Sleep {
                    s.system = next;
                }
            });
        }
    }

    /// Everything off, RTC stopped, heartbeat blinking until the adapter is
    /// removed. Then the records go back to their power-up contents and the
    /// clock boots again, which ends in deep sleep.
    fn reset<H: ClockHal>(&mut self, hal: &mut H) {
        #[cfg(feature = "defmt")]
        defmt::warn!("system reset");

        hal.buzzer().stop();
        hal.buzzer().beep_off();
        hal.lights().off();
        self.power.force_rtc_stopped();
        hal.peripherals().disable(true);
        hal.power().set_boost(false);

        while hal.power().external_power_present() {
            hal.lights().toggle_heartbeat();
            hal.peripherals().delay_ms(RESET_BLINK_MS);
        }

        self.shared.with(|s| {
            s.time = WallClock::new();
            s.alarm = Alarm::new();
            s.display = DisplayRecord::new();
        });
        self.handlers = Handlers::new();
        self.boot(hal);
    }

    fn production_test<H: ClockHal>(&mut self, hal: &mut H) {
        self.active = Some(SystemState::ProductionTest);
        let (tester, log) = hal.production();
        let _passed = tester.run(log);

        #[cfg(feature = "defmt")]
        defmt::info!("production test passed: {}", _passed);

        self.shared.with(|s| {
            if s.system == SystemState::ProductionTest {
                s.system = SystemState::Intro;
            }
        });
    }
}

/// Async dispatcher loop for embassy executors: the fast-tick wait yields to
/// the executor instead of spinning
#[cfg(feature = "embassy-time")]
pub async fn dispatcher_task<S: ButtonSource, H: ClockHal>(
    shared: &'static Shared<S>,
    mut hal: H,
    config: ClockConfig,
) {
    use embassy_time::{Duration, Timer};

    let mut dispatcher = Dispatcher::new(shared, config);
    dispatcher.boot(&mut hal);

    loop {
        dispatcher.cycle(&mut hal);

        while !shared.fast_tick().take() && shared.system() != SystemState::Sleep {
            Timer::after(Duration::from_micros(100)).await;
        }
    }
}
