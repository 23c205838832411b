//! Manufacturing test run when the factory jumper is fitted
//!
//! Supply rails and the RTC crystal are measured; the buzzer and the status
//! LEDs are judged by the operator with the buttons (X passes, Y fails).

use clock_core::{
    Buzzer, Console, HalError, Melody, ProductionTester, Rgb, StatusLights, TestCategory, TestLog,
    TestRecord,
};

/// Longest wait for the first RTC second
const RTC_TIMEOUT_MS: u32 = 3000;
/// Accepted SysTick milliseconds per RTC second, inclusive
const MS_PER_SECOND: (u32, u32) = (990, 1010);
/// Longest wait for an operator verdict
const OPERATOR_TIMEOUT_MS: u32 = 30_000;

const MELODIES: [Melody; 3] = [Melody::MajorScale, Melody::SimpleAlarm, Melody::SuperMario];
const COLORS: [(Rgb, &str); 4] = [
    (Rgb::new(255, 0, 0), "RED"),
    (Rgb::new(0, 255, 0), "GREEN"),
    (Rgb::new(0, 0, 255), "BLUE"),
    (Rgb::new(255, 255, 255), "WHITE"),
];

/// The parts of the running board the factory test drives
pub trait Fixture {
    type Tone: Buzzer;
    type Lights: StatusLights;
    type Serial: Console;

    /// Free-running SysTick milliseconds
    fn millis(&mut self) -> u32;
    /// Free-running RTC seconds
    fn rtc_seconds(&mut self) -> u32;
    /// Pass/fail of the high voltage, regulator and adapter rails
    fn rails(&mut self) -> [bool; 3];
    /// Button held by the operator, if any: `Some(true)` for X, `Some(false)` for Y
    fn verdict(&mut self) -> Option<bool>;
    /// Wait for the next interrupt
    fn idle(&mut self);

    fn buzzer(&mut self) -> &mut Self::Tone;
    fn lights(&mut self) -> &mut Self::Lights;
    fn console(&mut self) -> &mut Self::Serial;
}

/// Runs the four test steps against a [`Fixture`] and logs one record per
/// check
pub struct FactoryTester<F> {
    fixture: F,
}

impl<F: Fixture> FactoryTester<F> {
    pub const fn new(fixture: F) -> Self {
        Self { fixture }
    }

    pub fn fixture(&mut self) -> &mut F {
        &mut self.fixture
    }

    /// Millis at the next RTC second
    fn next_rtc_second(&mut self) -> Result<u32, HalError> {
        let f = &mut self.fixture;
        let second = f.rtc_seconds();
        let start = f.millis();
        while f.rtc_seconds() == second {
            if f.millis().wrapping_sub(start) > RTC_TIMEOUT_MS {
                return Err(HalError::ClockHalted);
            }
            f.idle();
        }
        Ok(f.millis())
    }

    /// SysTick milliseconds in one RTC second
    pub fn measure_rtc(&mut self) -> Result<u32, HalError> {
        let first = self.next_rtc_second()?;
        let second = self.next_rtc_second()?;
        Ok(second.wrapping_sub(first))
    }

    /// Wait for the operator to press X or Y and let go. `tick` runs once
    /// per idle period while waiting.
    fn ask(&mut self, mut tick: impl FnMut(&mut F)) -> Result<bool, HalError> {
        let start = self.fixture.millis();
        let mut answer = None;
        loop {
            let f = &mut self.fixture;
            match (answer, f.verdict()) {
                (None, Some(v)) => answer = Some(v),
                (Some(v), None) => return Ok(v),
                _ => {}
            }
            if f.millis().wrapping_sub(start) > OPERATOR_TIMEOUT_MS {
                return Err(HalError::Peripheral);
            }
            tick(f);
            f.idle();
        }
    }

    fn check_rails(&mut self) -> [bool; 3] {
        self.fixture.console().write_str("\n\r ( 1 ) SYSTEM VOLTAGES");
        let rails = self.fixture.rails();
        for (name, ok) in ["HV", "5V", "VIN"].iter().zip(rails) {
            let console = self.fixture.console();
            console.write_str("\n\r ");
            console.write_str(name);
            console.write_str(if ok { " - PASS" } else { " - FAIL!" });
        }
        rails
    }

    /// Oscillator running, then its rate against SysTick
    fn check_rtc(&mut self) -> [bool; 2] {
        self.fixture.console().write_str("\n\r ( 2 ) TIMING & CRYSTALS");
        match self.measure_rtc() {
            Ok(ms) => {
                let in_range = (MS_PER_SECOND.0..=MS_PER_SECOND.1).contains(&ms);
                #[cfg(feature = "defmt")]
                defmt::info!("{} ms per RTC second", ms);
                self.fixture
                    .console()
                    .write_str(if in_range { "\n\r rate - PASS" } else { "\n\r rate - FAIL!" });
                [true, in_range]
            }
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("RTC check: {}", _e);
                self.fixture.console().write_str("\n\r ===> FAIL! Clock signal halted");
                [false, false]
            }
        }
    }

    fn check_buzzer(&mut self) -> [bool; 3] {
        self.fixture.console().write_str("\n\r ( 3 ) BUZZER & MUSIC");
        let mut results = [false; 3];
        for (result, melody) in results.iter_mut().zip(MELODIES) {
            self.fixture.console().write_str("\n\r > Does it sound good? X yes / Y no");
            let verdict = self.ask(|f| {
                f.buzzer().play(melody);
            });
            self.fixture.buzzer().stop();
            *result = verdict.unwrap_or(false);
            if !*result {
                self.fixture
                    .console()
                    .write_str("\n\r - Buzzer FAIL! Please verify soldering");
                break;
            }
        }
        results
    }

    fn check_leds(&mut self) -> [bool; 4] {
        self.fixture.console().write_str("\n\r ( 4 ) LEDs COLORS & BRIGHTNESS");
        let mut results = [false; 4];
        for (result, (color, name)) in results.iter_mut().zip(COLORS) {
            self.fixture.lights().set(color);
            let console = self.fixture.console();
            console.write_str("\n\r > ");
            console.write_str(name);
            console.write_str(". Looks good? X yes / Y no");
            *result = self.ask(|_| {}).unwrap_or(false);
            self.fixture.lights().off();
        }
        results
    }
}

impl<F: Fixture> ProductionTester for FactoryTester<F> {
    fn run(&mut self, log: &mut dyn TestLog) -> bool {
        let Ok(_run) = log.begin_run() else {
            return false;
        };

        #[cfg(feature = "defmt")]
        defmt::info!("production test run {}", _run);

        let rails = self.check_rails();
        let rtc = self.check_rtc();
        let buzzer = self.check_buzzer();
        let leds = self.check_leds();

        let results = rails
            .iter()
            .map(|&ok| (TestCategory::Voltage, ok))
            .chain(rtc.iter().map(|&ok| (TestCategory::Rtc, ok)))
            .chain(buzzer.iter().map(|&ok| (TestCategory::Buzzer, ok)))
            .chain(leds.iter().map(|&ok| (TestCategory::Leds, ok)));

        let mut all_passed = true;
        let mut index = 0u8;
        let mut last = None;
        for (category, passed) in results {
            index = if last == Some(category) { index + 1 } else { 0 };
            last = Some(category);
            all_passed &= passed;
            if log.append(TestRecord { category, index, passed }).is_err() {
                return false;
            }
        }

        self.fixture
            .console()
            .write_str(if all_passed { "\n\r\n\r TEST PASSED" } else { "\n\r\n\r TEST FAILED" });
        all_passed
    }
}
