//! CH32V203 board support
//!
//! 64KB Flash / 20KB RAM. Interrupt handlers latch port levels and ADC
//! samples into atomics; the collaborators below read those images and
//! write their outputs into register images that the peripheral handlers
//! push to the hardware.

use core::cell::RefCell;
use core::convert::Infallible;

use clock_core::{
    Buzzer, ClockHal, Console, DisplayDriver, HalError, Melody, MuxFrame, Peripherals,
    PowerSupply, RamTestLog, Rgb, SleepDepth, StatusLights, VoltageMonitor,
};
use critical_section::Mutex;
use embedded_hal::digital::{ErrorType, InputPin};
use heapless::Deque;
use portable_atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};

use crate::factory::{FactoryTester, Fixture};

/// Pin assignment, all on port A unless noted
pub mod pins {
    pub const BUTTON_X: u8 = 0;
    pub const BUTTON_Y: u8 = 1;
    pub const BUTTON_Z: u8 = 2;
    pub const EXT_PWR: u8 = 3;
    /// Shorted to ground on the test fixture
    pub const FACTORY_JUMPER: u8 = 4;
    /// Port B
    pub const BOOST_EN: u8 = 8;
    /// Port B, TIM4 channel 4
    pub const BUZZER: u8 = 9;
    /// Port C
    pub const HEARTBEAT: u8 = 13;
}

/// Input data register image of port A. Pulled up, so idle reads all ones.
static PORT_A: AtomicU16 = AtomicU16::new(0xFFFF);

/// Output images pushed by the timer and GPIO handlers
static TUBE_OUT: AtomicU16 = AtomicU16::new(0);
static RGB_OUT: AtomicU32 = AtomicU32::new(0);
static HEARTBEAT_OUT: AtomicBool = AtomicBool::new(false);
static BOOST_OUT: AtomicBool = AtomicBool::new(false);
static TONE_OUT: AtomicBool = AtomicBool::new(false);

/// Latest ADC conversions in millivolts: high voltage /100, regulator, input
static ADC_HV: AtomicU16 = AtomicU16::new(0);
static ADC_REG: AtomicU16 = AtomicU16::new(0);
static ADC_IN: AtomicU16 = AtomicU16::new(0);

/// Clock gating as last set by [`BoardPeripherals`]
static PERIPH_ENABLED: AtomicBool = AtomicBool::new(false);
static RTC_RUNNING: AtomicBool = AtomicBool::new(false);

/// Free-running counters of the SysTick and RTC second interrupts
static MILLIS: AtomicU32 = AtomicU32::new(0);
static RTC_SECONDS: AtomicU32 = AtomicU32::new(0);

const TX_QUEUE_LEN: usize = 128;

/// USART1 transmit queue, filled by [`Uart`] and drained by the TXE interrupt
static TX_QUEUE: Mutex<RefCell<Deque<u8, TX_QUEUE_LEN>>> = Mutex::new(RefCell::new(Deque::new()));

/// ADC reference and full scale
const VREF_MV: u32 = 3300;
const ADC_FULL_SCALE: u32 = 4095;
/// Divider ratios in front of the high voltage, regulator and input channels
const DIVIDERS: [u32; 3] = [1, 2, 5];

/// Port A change, called by the EXTI handler with the new input image
pub fn latch_port_a(levels: u16) {
    PORT_A.store(levels, Ordering::Release);
}

/// End of an ADC scan, in millivolts
fn latch_adc(hv: u16, regulator: u16, input: u16) {
    ADC_HV.store(hv, Ordering::Relaxed);
    ADC_REG.store(regulator, Ordering::Relaxed);
    ADC_IN.store(input, Ordering::Release);
}

/// Millivolts on a rail from a 12-bit conversion behind `divider`
pub fn rail_mv(raw: u16, divider: u32) -> u16 {
    let mv = u32::from(raw.min(ADC_FULL_SCALE as u16)) * VREF_MV * divider / ADC_FULL_SCALE;
    mv.min(u32::from(u16::MAX)) as u16
}

/// End of an injected ADC scan with raw counts in channel order
pub fn latch_adc_raw(raw: [u16; 3]) {
    let [hv, regulator, input] = [0, 1, 2].map(|i| rail_mv(raw[i], DIVIDERS[i]));
    latch_adc(hv, regulator, input);
}

pub fn peripherals_enabled() -> bool {
    PERIPH_ENABLED.load(Ordering::Acquire)
}

pub fn rtc_running() -> bool {
    RTC_RUNNING.load(Ordering::Acquire)
}

pub fn count_millisecond() {
    MILLIS.fetch_add(1, Ordering::AcqRel);
}

pub fn count_rtc_second() {
    RTC_SECONDS.fetch_add(1, Ordering::AcqRel);
}

/// Next byte for the USART1 data register
pub fn next_tx_byte() -> Option<u8> {
    critical_section::with(|cs| TX_QUEUE.borrow_ref_mut(cs).pop_front())
}

fn pin_high(pin: u8) -> bool {
    PORT_A.load(Ordering::Acquire) & (1 << pin) != 0
}

/// Raw level of one button pin
pub struct ButtonPin {
    pin: u8,
}

impl ButtonPin {
    pub const X: ButtonPin = ButtonPin { pin: pins::BUTTON_X };
    pub const Y: ButtonPin = ButtonPin { pin: pins::BUTTON_Y };
    pub const Z: ButtonPin = ButtonPin { pin: pins::BUTTON_Z };
}

impl ErrorType for ButtonPin {
    type Error = Infallible;
}

impl InputPin for ButtonPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(pin_high(self.pin))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!pin_high(self.pin))
    }
}

/// Adapter detection and the 170 V boost converter
pub struct BoardPower;

impl PowerSupply for BoardPower {
    fn external_power_present(&mut self) -> bool {
        pin_high(pins::EXT_PWR)
    }

    fn set_boost(&mut self, on: bool) {
        BOOST_OUT.store(on, Ordering::Release);
    }

    fn factory_jumper_present(&mut self) -> bool {
        !pin_high(pins::FACTORY_JUMPER)
    }
}

/// Clock gating of the peripherals the clock uses. The interrupt bodies
/// read the gating back through [`peripherals_enabled`] and [`rtc_running`].
pub struct BoardPeripherals;

impl Peripherals for BoardPeripherals {
    fn disable(&mut self, halt_rtc: bool) {
        PERIPH_ENABLED.store(false, Ordering::Release);
        if halt_rtc {
            RTC_RUNNING.store(false, Ordering::Release);
        }
        TONE_OUT.store(false, Ordering::Relaxed);
        RGB_OUT.store(0, Ordering::Relaxed);
        TUBE_OUT.store(0, Ordering::Release);
    }

    fn enable(&mut self) {
        RTC_RUNNING.store(true, Ordering::Release);
        PERIPH_ENABLED.store(true, Ordering::Release);
    }

    fn enter_sleep(&mut self, _depth: SleepDepth) {
        // Deep sleep differs only in the wake sources left armed by `disable`.
        #[cfg(target_arch = "riscv32")]
        riscv::asm::wfi();
    }

    fn delay_ms(&mut self, ms: u32) {
        #[cfg(target_arch = "riscv32")]
        embassy_time::block_for(embassy_time::Duration::from_millis(u64::from(ms)));
        #[cfg(not(target_arch = "riscv32"))]
        let _ = ms;
    }
}

/// Anode and cathode drivers. Bits 0..=3 select the tube, bits 4..=7 carry
/// the BCD cathode, 0xF blanks.
pub struct NixieDriver;

impl NixieDriver {
    pub fn encode(frame: MuxFrame) -> u16 {
        let cathode = frame.digit.map_or(0xF, u16::from);
        (1 << frame.tube) | (cathode << 4)
    }
}

impl DisplayDriver for NixieDriver {
    fn show(&mut self, frame: MuxFrame) {
        TUBE_OUT.store(Self::encode(frame), Ordering::Release);
    }
}

/// Notes in each built-in melody, one note per `NOTE_TICKS`
const NOTE_TICKS: u16 = 150;

fn melody_notes(melody: Melody) -> u16 {
    match melody {
        Melody::SimpleAlarm => 8,
        Melody::MajorScale => 16,
        Melody::StarWars => 39,
        Melody::ImperialMarch => 18,
        Melody::SuperMario => 25,
        Melody::UsaAnthem => 26,
        Melody::Diomedes => 32,
    }
}

/// Piezo on TIM4; melody note tables live with the timer handler
pub struct PwmBuzzer {
    melody: Option<Melody>,
    position: u16,
}

impl PwmBuzzer {
    pub const fn new() -> Self {
        Self {
            melody: None,
            position: 0,
        }
    }
}

impl Buzzer for PwmBuzzer {
    fn beep_on(&mut self) {
        TONE_OUT.store(true, Ordering::Release);
    }

    fn beep_off(&mut self) {
        TONE_OUT.store(false, Ordering::Release);
    }

    fn play(&mut self, melody: Melody) -> bool {
        if self.melody != Some(melody) {
            self.melody = Some(melody);
            self.position = 0;
        }
        self.position += 1;
        // Tone on for the first half of each note.
        TONE_OUT.store(self.position % NOTE_TICKS < NOTE_TICKS / 2, Ordering::Release);
        if self.position >= melody_notes(melody) * NOTE_TICKS {
            self.position = 0;
            return true;
        }
        false
    }

    fn stop(&mut self) {
        self.melody = None;
        self.position = 0;
        TONE_OUT.store(false, Ordering::Release);
    }
}

/// Three RGB LEDs on TIM2 PWM plus the heartbeat LED
pub struct RgbLeds;

impl RgbLeds {
    pub fn encode(color: Rgb) -> u32 {
        (u32::from(color.r) << 16) | (u32::from(color.g) << 8) | u32::from(color.b)
    }
}

impl StatusLights for RgbLeds {
    fn set(&mut self, color: Rgb) {
        RGB_OUT.store(Self::encode(color), Ordering::Release);
    }

    fn off(&mut self) {
        RGB_OUT.store(0, Ordering::Release);
    }

    fn toggle_heartbeat(&mut self) {
        HEARTBEAT_OUT.fetch_xor(true, Ordering::AcqRel);
    }
}

/// Acceptance window of one supply rail, inclusive
#[derive(Copy, Clone, Debug)]
pub struct Window {
    pub min: u16,
    pub max: u16,
}

impl Window {
    pub fn contains(&self, value: u16) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Supply checks on the high voltage, regulator and adapter rails
pub struct AdcMonitor {
    pub hv: Window,
    pub regulator: Window,
    pub input: Window,
}

impl AdcMonitor {
    pub const fn new() -> Self {
        Self {
            hv: Window { min: 1650, max: 1850 },
            regulator: Window { min: 4750, max: 5250 },
            input: Window { min: 10_500, max: 13_500 },
        }
    }

    /// Pass/fail per rail, in test-log order
    pub fn rails(&self) -> [bool; 3] {
        [
            self.hv.contains(ADC_HV.load(Ordering::Relaxed)),
            self.regulator.contains(ADC_REG.load(Ordering::Relaxed)),
            self.input.contains(ADC_IN.load(Ordering::Acquire)),
        ]
    }
}

impl VoltageMonitor for AdcMonitor {
    fn self_test(&mut self) -> Result<(), HalError> {
        if self.rails().iter().all(|&ok| ok) {
            Ok(())
        } else {
            Err(HalError::VoltageOutOfRange)
        }
    }
}

/// USART1 console. Output is best effort: a full queue drops the rest of
/// the string.
pub struct Uart;

impl Console for Uart {
    fn write_str(&mut self, s: &str) {
        critical_section::with(|cs| {
            let mut tx = TX_QUEUE.borrow_ref_mut(cs);
            for byte in s.bytes() {
                if tx.push_back(byte).is_err() {
                    break;
                }
            }
        });
        #[cfg(target_arch = "riscv32")]
        crate::vectors::start_transmit();
    }
}

/// The board as the factory test sees it: interrupt counters, the rails,
/// buttons X and Y as the operator's verdict, and its own outputs
pub struct BoardFixture {
    monitor: AdcMonitor,
    buzzer: PwmBuzzer,
    lights: RgbLeds,
    console: Uart,
}

impl Fixture for BoardFixture {
    type Tone = PwmBuzzer;
    type Lights = RgbLeds;
    type Serial = Uart;

    fn millis(&mut self) -> u32 {
        MILLIS.load(Ordering::Acquire)
    }

    fn rtc_seconds(&mut self) -> u32 {
        RTC_SECONDS.load(Ordering::Acquire)
    }

    fn rails(&mut self) -> [bool; 3] {
        self.monitor.rails()
    }

    fn verdict(&mut self) -> Option<bool> {
        // Buttons pull low when pressed.
        if !pin_high(pins::BUTTON_X) {
            Some(true)
        } else if !pin_high(pins::BUTTON_Y) {
            Some(false)
        } else {
            None
        }
    }

    fn idle(&mut self) {
        #[cfg(target_arch = "riscv32")]
        riscv::asm::wfi();
        #[cfg(not(target_arch = "riscv32"))]
        core::hint::spin_loop();
    }

    fn buzzer(&mut self) -> &mut PwmBuzzer {
        &mut self.buzzer
    }

    fn lights(&mut self) -> &mut RgbLeds {
        &mut self.lights
    }

    fn console(&mut self) -> &mut Uart {
        &mut self.console
    }
}

/// Every collaborator of the CH32V203 board
pub struct Board {
    power: BoardPower,
    peripherals: BoardPeripherals,
    buzzer: PwmBuzzer,
    lights: RgbLeds,
    voltage: AdcMonitor,
    console: Uart,
    tester: FactoryTester<BoardFixture>,
    log: RamTestLog<32>,
}

impl Board {
    pub const fn new() -> Self {
        Self {
            power: BoardPower,
            peripherals: BoardPeripherals,
            buzzer: PwmBuzzer::new(),
            lights: RgbLeds,
            voltage: AdcMonitor::new(),
            console: Uart,
            tester: FactoryTester::new(BoardFixture {
                monitor: AdcMonitor::new(),
                buzzer: PwmBuzzer::new(),
                lights: RgbLeds,
                console: Uart,
            }),
            log: RamTestLog::new(),
        }
    }
}

impl ClockHal for Board {
    type Power = BoardPower;
    type Periph = BoardPeripherals;
    type Tone = PwmBuzzer;
    type Lights = RgbLeds;
    type Voltage = AdcMonitor;
    type Serial = Uart;
    type Tester = FactoryTester<BoardFixture>;
    type Log = RamTestLog<32>;

    fn power(&mut self) -> &mut BoardPower {
        &mut self.power
    }

    fn peripherals(&mut self) -> &mut BoardPeripherals {
        &mut self.peripherals
    }

    fn buzzer(&mut self) -> &mut PwmBuzzer {
        &mut self.buzzer
    }

    fn lights(&mut self) -> &mut RgbLeds {
        &mut self.lights
    }

    fn voltage(&mut self) -> &mut AdcMonitor {
        &mut self.voltage
    }

    fn console(&mut self) -> &mut Uart {
        &mut self.console
    }

    fn outputs(&mut self) -> (&mut PwmBuzzer, &mut RgbLeds) {
        (&mut self.buzzer, &mut self.lights)
    }

    fn production(&mut self) -> (&mut FactoryTester<BoardFixture>, &mut RamTestLog<32>) {
        (&mut self.tester, &mut self.log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nixie_frame_encoding() {
        assert_eq!(NixieDriver::encode(MuxFrame { tube: 2, digit: Some(7) }), 0x74);
        assert_eq!(NixieDriver::encode(MuxFrame { tube: 0, digit: None }), 0xF1);
    }

    #[test]
    fn test_rgb_encoding() {
        assert_eq!(RgbLeds::encode(Rgb::new(0x12, 0x34, 0x56)), 0x12_3456);
    }

    #[test]
    fn test_buzzer_melody_length() {
        let mut buzzer = Board::new().buzzer;
        let ticks = u32::from(melody_notes(Melody::SimpleAlarm) * NOTE_TICKS);
        assert!(!(1..ticks).any(|_| buzzer.play(Melody::SimpleAlarm)));
        assert!(buzzer.play(Melody::SimpleAlarm));
    }

    #[test]
    fn test_rail_conversion() {
        assert_eq!(rail_mv(0, 1), 0);
        assert_eq!(rail_mv(4095, 1), 3300);
        assert_eq!(rail_mv(2110, 1), 1700);
        assert_eq!(rail_mv(3103, 2), 5001);
        assert_eq!(rail_mv(2978, 5), 11_999);
        assert_eq!(rail_mv(u16::MAX, 5), 16_500);
    }
}
