//! Display record and the tube multiplexer cursor

use crate::types::TransitionMode;

/// Number of tubes
pub const TUBES: usize = 4;

/// Brightness level of a fully lit tube
pub const FULL_BRIGHTNESS: u8 = 5;

/// Fast ticks each tube stays selected
pub const TUBE_DWELL_TICKS: u8 = 5;

/// A single tube value: 0-9 or blank
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Digit(u8);

impl Digit {
    pub const BLANK: Digit = Digit(0xFF);

    /// Values above 9 map to [`Digit::BLANK`]
    pub const fn new(value: u8) -> Self {
        if value <= 9 {
            Digit(value)
        } else {
            Digit::BLANK
        }
    }

    pub const fn value(&self) -> Option<u8> {
        if self.0 <= 9 {
            Some(self.0)
        } else {
            None
        }
    }

    pub const fn is_blank(&self) -> bool {
        self.0 > 9
    }
}

/// Shared display state written by the active handler and read by the
/// multiplexer on every fast tick
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayRecord {
    pub digits: [Digit; TUBES],
    pub enabled: bool,
    /// Per-tube brightness, 0 = off .. 5 = fully on
    pub fade: [u8; TUBES],
    /// Minute-change animation chosen in the transitions menu
    pub transition: TransitionMode,
}

impl DisplayRecord {
    pub const fn new() -> Self {
        Self {
            digits: [Digit::BLANK; TUBES],
            enabled: true,
            fade: [FULL_BRIGHTNESS; TUBES],
            transition: TransitionMode::Waterfall,
        }
    }

    pub fn show(&mut self, values: [u8; TUBES]) {
        for (digit, value) in self.digits.iter_mut().zip(values) {
            *digit = Digit::new(value);
        }
    }

    pub fn set_digit(&mut self, tube: usize, digit: Digit) {
        if let Some(slot) = self.digits.get_mut(tube) {
            *slot = digit;
        }
    }

    pub fn blank(&mut self) {
        self.digits = [Digit::BLANK; TUBES];
    }

    /// Blank one pair of tubes: the left pair (hours) or the right pair
    pub fn blank_pair(&mut self, left: bool) {
        let range = if left { 0..2 } else { 2..4 };
        for tube in range {
            self.digits[tube] = Digit::BLANK;
        }
    }

    pub fn set_brightness(&mut self, level: u8) {
        self.fade = [level.min(FULL_BRIGHTNESS); TUBES];
    }

    /// Dim every tube by one level. Returns true once all tubes are off.
    pub fn dim_step(&mut self) -> bool {
        for level in self.fade.iter_mut() {
            *level = level.saturating_sub(1);
        }
        self.fade.iter().all(|&level| level == 0)
    }
}

impl Default for DisplayRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// What the display collaborator must drive for one fast tick
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MuxFrame {
    /// Selected tube anode, 0..4
    pub tube: u8,
    /// Cathode to light, `None` for blank
    pub digit: Option<u8>,
}

/// Multiplexing cursor advanced once per fast tick
///
/// The anode moves to the next tube every [`TUBE_DWELL_TICKS`] ticks. The
/// fade phase cycles 1..=5 on every tick and a digit is lit only while the
/// phase does not exceed the tube's brightness level.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Multiplexer {
    tube: u8,
    dwell: u8,
    phase: u8,
}

impl Multiplexer {
    pub const fn new() -> Self {
        Self {
            tube: 0,
            dwell: 0,
            phase: FULL_BRIGHTNESS,
        }
    }

    pub fn advance(&mut self, record: &DisplayRecord) -> MuxFrame {
        if self.dwell == 0 {
            self.tube = (self.tube + 1) % TUBES as u8;
        }
        self.dwell = (self.dwell + 1) % TUBE_DWELL_TICKS;

        let index = self.tube as usize;
        let digit = if record.enabled && self.phase <= record.fade[index] {
            record.digits[index].value()
        } else {
            None
        };

        self.phase = if self.phase >= FULL_BRIGHTNESS { 1 } else { self.phase + 1 };

        MuxFrame { tube: self.tube, digit }
    }
}

impl Default for Multiplexer {
    fn default() -> Self {
        Self::new()
    }
}
