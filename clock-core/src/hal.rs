//! Hardware abstraction layer: the collaborators the core drives

use embedded_hal::digital::InputPin;

use crate::display::MuxFrame;
use crate::types::{Melody, Rgb, SleepDepth};

/// Error types for HAL operations
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// A supply rail is outside its window
    VoltageOutOfRange,
    /// The slow-tick oscillator is not advancing
    ClockHalted,
    /// Persistent test log has no room left
    StorageFull,
    /// Peripheral access failed or went unanswered
    Peripheral,
}

#[cfg(feature = "std")]
impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HalError::VoltageOutOfRange => write!(f, "Supply voltage out of range"),
            HalError::ClockHalted => write!(f, "Real-time oscillator not advancing"),
            HalError::StorageFull => write!(f, "Test log storage full"),
            HalError::Peripheral => write!(f, "Peripheral access failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

/// Raw level of one button, no debouncing
pub trait ButtonSource {
    /// True while the button is physically pressed
    fn read(&mut self) -> bool;
}

/// External power detection and the tube boost converter
pub trait PowerSupply {
    fn external_power_present(&mut self) -> bool;

    fn set_boost(&mut self, on: bool);

    /// Manufacturing jumper that selects the production test at boot
    fn factory_jumper_present(&mut self) -> bool;
}

/// Peripheral power gating and the CPU sleep instruction
pub trait Peripherals {
    /// Silence analog input, serial, buzzer, lights, the fast tick and the
    /// button interrupts. The slow-tick oscillator is halted only when
    /// `halt_rtc` is set.
    fn disable(&mut self, halt_rtc: bool);

    fn enable(&mut self);

    /// Halt the CPU until an interrupt allowed by `depth` fires
    fn enter_sleep(&mut self, depth: SleepDepth);

    /// Blocking delay
    fn delay_ms(&mut self, ms: u32);
}

/// Tube anode/cathode driver, called from the fast-tick interrupt
pub trait DisplayDriver {
    fn show(&mut self, frame: MuxFrame);
}

/// Tone and melody driver
pub trait Buzzer {
    /// Start the short acknowledgement tone
    fn beep_on(&mut self);

    fn beep_off(&mut self);

    /// Advance `melody` by one fast tick. Returns true when the melody has
    /// just finished; the next call starts it again.
    fn play(&mut self, melody: Melody) -> bool;

    /// Stop any melody and rewind it
    fn stop(&mut self);
}

/// RGB status LEDs and the on-board heartbeat LED
pub trait StatusLights {
    fn set(&mut self, color: Rgb);

    fn off(&mut self);

    fn toggle_heartbeat(&mut self);
}

/// Supply voltage self-test
pub trait VoltageMonitor {
    /// Blocking; called after the supply has settled
    fn self_test(&mut self) -> Result<(), HalError>;
}

/// Line-oriented serial output
pub trait Console {
    fn write_str(&mut self, s: &str);
}

/// Test categories recorded by the production test
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TestCategory {
    Voltage,
    Rtc,
    Buzzer,
    Leds,
}

/// One pass/fail entry of the persistent test log
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TestRecord {
    pub category: TestCategory,
    /// Sub-test number inside the category
    pub index: u8,
    pub passed: bool,
}

/// Append-only production test log
pub trait TestLog {
    /// Count a new test run and return the run number
    fn begin_run(&mut self) -> Result<u16, HalError>;

    fn append(&mut self, record: TestRecord) -> Result<(), HalError>;

    fn runs(&self) -> u16;
}

/// Operator-driven manufacturing test
pub trait ProductionTester {
    /// Blocking. Returns true if every test passed.
    fn run(&mut self, log: &mut dyn TestLog) -> bool;
}

/// Complete clock HAL interface used by the dispatcher
pub trait ClockHal {
    type Power: PowerSupply;
    type Periph: Peripherals;
    type Tone: Buzzer;
    type Lights: StatusLights;
    type Voltage: VoltageMonitor;
    type Serial: Console;
    type Tester: ProductionTester;
    type Log: TestLog;

    fn power(&mut self) -> &mut Self::Power;

    fn peripherals(&mut self) -> &mut Self::Periph;

    fn buzzer(&mut self) -> &mut Self::Tone;

    fn lights(&mut self) -> &mut Self::Lights;

    fn voltage(&mut self) -> &mut Self::Voltage;

    fn console(&mut self) -> &mut Self::Serial;

    /// Buzzer and lights together, for behaviour handlers
    fn outputs(&mut self) -> (&mut Self::Tone, &mut Self::Lights);

    /// Tester and its log together
    fn production(&mut self) -> (&mut Self::Tester, &mut Self::Log);
}

/// Button source for an embedded-hal input pin wired active low
pub struct PinButton<P> {
    pin: P,
}

impl<P: InputPin> PinButton<P> {
    pub const fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P: InputPin> ButtonSource for PinButton<P> {
    fn read(&mut self) -> bool {
        // Pulled up, grounded when pressed. A read error counts as released.
        self.pin.is_low().unwrap_or(false)
    }
}

/// Test log kept in RAM, for boards without EEPROM and for tests
#[derive(Debug)]
pub struct RamTestLog<const N: usize> {
    runs: u16,
    records: heapless::Vec<TestRecord, N>,
}

impl<const N: usize> RamTestLog<N> {
    pub const fn new() -> Self {
        Self {
            runs: 0,
            records: heapless::Vec::new(),
        }
    }

    pub fn records(&self) -> &[TestRecord] {
        &self.records
    }

    /// Most recent result for a category and sub-test
    pub fn latest(&self, category: TestCategory, index: u8) -> Option<bool> {
        self.records
            .iter()
            .rev()
            .find(|r| r.category == category && r.index == index)
            .map(|r| r.passed)
    }
}

impl<const N: usize> Default for RamTestLog<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TestLog for RamTestLog<N> {
    fn begin_run(&mut self) -> Result<u16, HalError> {
        self.runs = self.runs.checked_add(1).ok_or(HalError::StorageFull)?;
        Ok(self.runs)
    }

    fn append(&mut self, record: TestRecord) -> Result<(), HalError> {
        self.records.push(record).map_err(|_| HalError::StorageFull)
    }

    fn runs(&self) -> u16 {
        self.runs
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! Recording mock implementations for testing

    use super::*;
    use std::boxed::Box;
    use std::string::String;
    use std::vec::Vec;

    /// Callback fired from inside a blocking collaborator call, standing in
    /// for an interrupt that arrives meanwhile
    #[derive(Default)]
    pub struct InterruptHook(Option<Box<dyn FnMut() + Send>>);

    impl InterruptHook {
        pub fn new(hook: impl FnMut() + Send + 'static) -> Self {
            Self(Some(Box::new(hook)))
        }

        pub fn fire(&mut self) {
            if let Some(hook) = self.0.as_mut() {
                hook();
            }
        }
    }

    impl core::fmt::Debug for InterruptHook {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            f.debug_tuple("InterruptHook")
                .field(&self.0.is_some())
                .finish()
        }
    }

    /// Button whose level is set by the test
    #[derive(Default, Debug)]
    pub struct MockButton {
        pressed: bool,
        reads: u32,
    }

    impl MockButton {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_pressed(&mut self, pressed: bool) {
            self.pressed = pressed;
        }

        pub fn reads(&self) -> u32 {
            self.reads
        }
    }

    impl ButtonSource for MockButton {
        fn read(&mut self) -> bool {
            self.reads += 1;
            self.pressed
        }
    }

    #[derive(Default, Debug)]
    pub struct MockPower {
        pub present: bool,
        pub boost: bool,
        pub jumper: bool,
        /// Adapter is pulled after this many presence reads
        pub unplug_after: Option<u32>,
    }

    impl MockPower {
        pub fn new(present: bool) -> Self {
            Self {
                present,
                ..Self::default()
            }
        }
    }

    impl PowerSupply for MockPower {
        fn external_power_present(&mut self) -> bool {
            match self.unplug_after {
                Some(0) => {
                    self.present = false;
                    self.unplug_after = None;
                }
                Some(n) => self.unplug_after = Some(n - 1),
                None => {}
            }
            self.present
        }

        fn set_boost(&mut self, on: bool) {
            self.boost = on;
        }

        fn factory_jumper_present(&mut self) -> bool {
            self.jumper
        }
    }

    #[derive(Default, Debug)]
    pub struct MockPeripherals {
        pub enabled: bool,
        pub rtc_halted: bool,
        pub disable_calls: u32,
        pub enable_calls: u32,
        pub sleeps: Vec<SleepDepth>,
        pub delayed_ms: u64,
        /// Fired on every `delay_ms`
        pub during_delay: InterruptHook,
    }

    impl MockPeripherals {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn last_sleep(&self) -> Option<SleepDepth> {
            self.sleeps.last().copied()
        }
    }

    impl Peripherals for MockPeripherals {
        fn disable(&mut self, halt_rtc: bool) {
            self.enabled = false;
            self.rtc_halted = halt_rtc;
            self.disable_calls += 1;
        }

        fn enable(&mut self) {
            self.enabled = true;
            self.rtc_halted = false;
            self.enable_calls += 1;
        }

        fn enter_sleep(&mut self, depth: SleepDepth) {
            self.sleeps.push(depth);
        }

        fn delay_ms(&mut self, ms: u32) {
            self.delayed_ms += u64::from(ms);
            self.during_delay.fire();
        }
    }

    #[derive(Default, Debug)]
    pub struct MockDisplay {
        pub frames: u32,
        pub last: Option<MuxFrame>,
        /// Last digit seen on each tube, blanks ignored
        pub lit: [Option<u8>; 4],
    }

    impl MockDisplay {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl DisplayDriver for MockDisplay {
        fn show(&mut self, frame: MuxFrame) {
            self.frames += 1;
            if let (Some(digit), Some(slot)) = (frame.digit, self.lit.get_mut(frame.tube as usize)) {
                *slot = Some(digit);
            }
            self.last = Some(frame);
        }
    }

    /// Buzzer with melodies of a fixed length in ticks
    #[derive(Debug)]
    pub struct MockBuzzer {
        beeping: bool,
        pub beeps: u32,
        pub playing: Option<Melody>,
        pub melody_ticks: u32,
        pub melodies_finished: u32,
        pub stops: u32,
        position: u32,
    }

    impl MockBuzzer {
        pub fn new() -> Self {
            Self::with_melody_ticks(1000)
        }

        pub fn with_melody_ticks(melody_ticks: u32) -> Self {
            Self {
                beeping: false,
                beeps: 0,
                playing: None,
                melody_ticks: melody_ticks.max(1),
                melodies_finished: 0,
                stops: 0,
                position: 0,
            }
        }

        pub fn is_beeping(&self) -> bool {
            self.beeping
        }
    }

    impl Default for MockBuzzer {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Buzzer for MockBuzzer {
        fn beep_on(&mut self) {
            self.beeping = true;
            self.beeps += 1;
        }

        fn beep_off(&mut self) {
            self.beeping = false;
        }

        fn play(&mut self, melody: Melody) -> bool {
            if self.playing != Some(melody) {
                self.playing = Some(melody);
                self.position = 0;
            }
            self.position += 1;
            if self.position >= self.melody_ticks {
                self.position = 0;
                self.melodies_finished += 1;
                true
            } else {
                false
            }
        }

        fn stop(&mut self) {
            self.playing = None;
            self.position = 0;
            self.stops += 1;
        }
    }

    #[derive(Default, Debug)]
    pub struct MockLights {
        pub color: Rgb,
        pub on: bool,
        pub heartbeat: bool,
        pub heartbeat_toggles: u32,
    }

    impl MockLights {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl StatusLights for MockLights {
        fn set(&mut self, color: Rgb) {
            self.color = color;
            self.on = true;
        }

        fn off(&mut self) {
            self.color = Rgb::OFF;
            self.on = false;
        }

        fn toggle_heartbeat(&mut self) {
            self.heartbeat = !self.heartbeat;
            self.heartbeat_toggles += 1;
        }
    }

    #[derive(Debug)]
    pub struct MockVoltage {
        pub result: Result<(), HalError>,
        pub tests: u32,
    }

    impl MockVoltage {
        pub fn passing() -> Self {
            Self { result: Ok(()), tests: 0 }
        }

        pub fn failing() -> Self {
            Self {
                result: Err(HalError::VoltageOutOfRange),
                tests: 0,
            }
        }
    }

    impl VoltageMonitor for MockVoltage {
        fn self_test(&mut self) -> Result<(), HalError> {
            self.tests += 1;
            self.result
        }
    }

    #[derive(Default, Debug)]
    pub struct MockConsole {
        pub output: String,
    }

    impl MockConsole {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn lines(&self) -> Vec<&str> {
            self.output
                .split(['\n', '\r'])
                .filter(|line| !line.is_empty())
                .collect()
        }
    }

    impl Console for MockConsole {
        fn write_str(&mut self, s: &str) {
            self.output.push_str(s);
        }
    }

    /// Production tester that records one result per category
    #[derive(Debug)]
    pub struct MockTester {
        pub passes: bool,
        pub runs: u32,
        /// Fired once per run, before any record is written
        pub during_run: InterruptHook,
    }

    impl MockTester {
        pub fn new(passes: bool) -> Self {
            Self {
                passes,
                runs: 0,
                during_run: InterruptHook::default(),
            }
        }
    }

    impl ProductionTester for MockTester {
        fn run(&mut self, log: &mut dyn TestLog) -> bool {
            self.runs += 1;
            self.during_run.fire();
            if log.begin_run().is_err() {
                return false;
            }
            for category in [
                TestCategory::Voltage,
                TestCategory::Rtc,
                TestCategory::Buzzer,
                TestCategory::Leds,
            ] {
                let record = TestRecord {
                    category,
                    index: 0,
                    passed: self.passes,
                };
                if log.append(record).is_err() {
                    return false;
                }
            }
            self.passes
        }
    }

    /// Every mock bundled behind [`ClockHal`]
    #[derive(Debug)]
    pub struct MockHal {
        pub power: MockPower,
        pub peripherals: MockPeripherals,
        pub buzzer: MockBuzzer,
        pub lights: MockLights,
        pub voltage: MockVoltage,
        pub console: MockConsole,
        pub tester: MockTester,
        pub log: RamTestLog<32>,
    }

    impl MockHal {
        /// Healthy board, external power as given
        pub fn new(external_power: bool) -> Self {
            Self {
                power: MockPower::new(external_power),
                peripherals: MockPeripherals::new(),
                buzzer: MockBuzzer::new(),
                lights: MockLights::new(),
                voltage: MockVoltage::passing(),
                console: MockConsole::new(),
                tester: MockTester::new(true),
                log: RamTestLog::new(),
            }
        }
    }

    impl ClockHal for MockHal {
        type Power = MockPower;
        type Periph = MockPeripherals;
        type Tone = MockBuzzer;
        type Lights = MockLights;
        type Voltage = MockVoltage;
        type Serial = MockConsole;
        type Tester = MockTester;
        type Log = RamTestLog<32>;

        fn power(&mut self) -> &mut MockPower {
            &mut self.power
        }

        fn peripherals(&mut self) -> &mut MockPeripherals {
            &mut self.peripherals
        }

        fn buzzer(&mut self) -> &mut MockBuzzer {
            &mut self.buzzer
        }

        fn lights(&mut self) -> &mut MockLights {
            &mut self.lights
        }

        fn voltage(&mut self) -> &mut MockVoltage {
            &mut self.voltage
        }

        fn console(&mut self) -> &mut MockConsole {
            &mut self.console
        }

        fn outputs(&mut self) -> (&mut MockBuzzer, &mut MockLights) {
            (&mut self.buzzer, &mut self.lights)
        }

        fn production(&mut self) -> (&mut MockTester, &mut RamTestLog<32>) {
            (&mut self.tester, &mut self.log)
        }
    }
}
