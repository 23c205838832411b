//! Wall-clock and alarm records
//!
//! Binary fields are private so that every mutation goes through a method
//! that recomputes the decimal digit decomposition in the same call.

use core::fmt::Write;
use heapless::String;

use crate::types::{DayPeriod, HourMode, Melody};

/// Decimal digits of hours, minutes and seconds
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Bcd {
    pub h_tens: u8,
    pub h_units: u8,
    pub m_tens: u8,
    pub m_units: u8,
    pub s_tens: u8,
    pub s_units: u8,
}

impl Bcd {
    pub const fn from_hms(hour: u8, min: u8, sec: u8) -> Self {
        Self {
            h_tens: hour / 10,
            h_units: hour % 10,
            m_tens: min / 10,
            m_units: min % 10,
            s_tens: sec / 10,
            s_units: sec % 10,
        }
    }

    /// Hours and minutes, as shown on the four tubes
    pub const fn hh_mm(&self) -> [u8; 4] {
        [self.h_tens, self.h_units, self.m_tens, self.m_units]
    }

    /// Minutes and seconds, as shown by the hidden calibration view
    pub const fn mm_ss(&self) -> [u8; 4] {
        [self.m_tens, self.m_units, self.s_tens, self.s_units]
    }
}

/// Which field a setting handler increments
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeField {
    Hour,
    Minute,
    Second,
}

/// Time of day with its decimal decomposition, hour mode and period
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WallClock {
    hour: u8,
    min: u8,
    sec: u8,
    bcd: Bcd,
    hour_mode: HourMode,
    period: DayPeriod,
}

impl WallClock {
    /// 12:00:00 AM in 12-hour mode, the power-up value
    pub const fn new() -> Self {
        Self {
            hour: 12,
            min: 0,
            sec: 0,
            bcd: Bcd::from_hms(12, 0, 0),
            hour_mode: HourMode::H12,
            period: DayPeriod::Am,
        }
    }

    /// Build a 12-hour time. Hours run 1..=12.
    pub fn new_12h(hour: u8, min: u8, sec: u8, period: DayPeriod) -> Result<Self, &'static str> {
        if !(1..=12).contains(&hour) {
            return Err("Hour must be between 1 and 12 in 12-hour mode");
        }
        Self::checked(hour, min, sec, HourMode::H12, period)
    }

    /// Build a 24-hour time. The period follows the hour.
    pub fn new_24h(hour: u8, min: u8, sec: u8) -> Result<Self, &'static str> {
        if hour > 23 {
            return Err("Hour must be between 0 and 23 in 24-hour mode");
        }
        let period = if hour >= 12 { DayPeriod::Pm } else { DayPeriod::Am };
        Self::checked(hour, min, sec, HourMode::H24, period)
    }

    fn checked(
        hour: u8,
        min: u8,
        sec: u8,
        hour_mode: HourMode,
        period: DayPeriod,
    ) -> Result<Self, &'static str> {
        if min > 59 || sec > 59 {
            return Err("Minutes and seconds must be between 0 and 59");
        }
        Ok(Self {
            hour,
            min,
            sec,
            bcd: Bcd::from_hms(hour, min, sec),
            hour_mode,
            period,
        })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.min
    }

    pub fn second(&self) -> u8 {
        self.sec
    }

    pub fn bcd(&self) -> Bcd {
        self.bcd
    }

    pub fn hour_mode(&self) -> HourMode {
        self.hour_mode
    }

    pub fn period(&self) -> DayPeriod {
        self.period
    }

    /// True when the decimal digits agree with the binary fields
    pub fn is_consistent(&self) -> bool {
        self.bcd == Bcd::from_hms(self.hour, self.min, self.sec)
    }

    fn refresh(&mut self) {
        self.bcd = Bcd::from_hms(self.hour, self.min, self.sec);
    }

    /// Advance by one second with carry into minutes and hours
    pub fn tick_second(&mut self) {
        self.sec += 1;
        if self.sec == 60 {
            self.sec = 0;
            self.min += 1;
            if self.min == 60 {
                self.min = 0;
                self.step_hour();
            }
        }
        self.refresh();
    }

    /// Increment one field without carrying into the next one, the way the
    /// setting menus do
    pub fn increment(&mut self, field: TimeField) {
        match field {
            TimeField::Hour => self.step_hour(),
            TimeField::Minute => self.min = if self.min == 59 { 0 } else { self.min + 1 },
            TimeField::Second => self.sec = if self.sec == 59 { 0 } else { self.sec + 1 },
        }
        self.refresh();
    }

    pub fn increment_hour(&mut self) {
        self.increment(TimeField::Hour);
    }

    pub fn increment_minute(&mut self) {
        self.increment(TimeField::Minute);
    }

    pub fn increment_second(&mut self) {
        self.increment(TimeField::Second);
    }

    /// Overwrite hours, minutes and seconds in the current hour mode. The
    /// period is kept in 12-hour mode and derived from the hour in 24-hour mode.
    pub fn set_hms(&mut self, hour: u8, min: u8, sec: u8) -> Result<(), &'static str> {
        *self = match self.hour_mode {
            HourMode::H12 => Self::new_12h(hour, min, sec, self.period)?,
            HourMode::H24 => Self::new_24h(hour, min, sec)?,
        };
        Ok(())
    }

    // 12h: 11 -> 12 toggles the period, 12 -> 1 does not.
    // 24h: 11 -> 12 enters PM, 23 -> 0 enters AM.
    fn step_hour(&mut self) {
        match self.hour_mode {
            HourMode::H12 => match self.hour {
                11 => {
                    self.hour = 12;
                    self.period = self.period.toggled();
                }
                12 => self.hour = 1,
                _ => self.hour += 1,
            },
            HourMode::H24 => match self.hour {
                11 => {
                    self.hour = 12;
                    self.period = DayPeriod::Pm;
                }
                23 => {
                    self.hour = 0;
                    self.period = DayPeriod::Am;
                }
                _ => self.hour += 1,
            },
        }
    }

    /// Switch between 12 and 24-hour notation keeping the same instant
    pub fn set_hour_mode(&mut self, mode: HourMode) {
        if mode == self.hour_mode {
            return;
        }
        match mode {
            HourMode::H12 => {
                if self.hour == 0 {
                    self.hour = 12;
                } else if self.hour >= 13 {
                    self.hour -= 12;
                }
            }
            HourMode::H24 => match self.period {
                DayPeriod::Am if self.hour == 12 => self.hour = 0,
                DayPeriod::Pm if self.hour != 12 => self.hour += 12,
                _ => {}
            },
        }
        self.hour_mode = mode;
        self.refresh();
    }

    /// Same hour, minute, second and period
    pub fn same_instant(&self, other: &WallClock) -> bool {
        self.hour == other.hour
            && self.min == other.min
            && self.sec == other.sec
            && self.period == other.period
    }

    /// `HH:MM:SS`, as written to the serial console every second
    pub fn format_hms(&self) -> String<8> {
        let mut out = String::new();
        let _ = write!(out, "{:02}:{:02}:{:02}", self.hour, self.min, self.sec);
        out
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

/// A snooze instant. Matched on hour, minute and second only.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SnoozeTime {
    pub hour: u8,
    pub min: u8,
    pub sec: u8,
}

impl SnoozeTime {
    pub fn matches(&self, time: &WallClock) -> bool {
        self.hour == time.hour() && self.min == time.minute() && self.sec == time.second()
    }
}

/// Alarm setting plus its one-shot trigger latch
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Alarm {
    pub time: WallClock,
    pub enabled: bool,
    pub melody: Melody,
    triggered: bool,
}

impl Alarm {
    /// 12:00:00 AM, disabled
    pub const fn new() -> Self {
        Self {
            time: WallClock::new(),
            enabled: false,
            melody: Melody::SimpleAlarm,
            triggered: false,
        }
    }

    /// Enabled alarm at the given time
    pub fn at(time: WallClock) -> Self {
        Self {
            time,
            enabled: true,
            ..Self::new()
        }
    }

    /// Match predicate: enabled and equal on hour, minute, second and period
    pub fn matches(&self, now: &WallClock) -> bool {
        self.enabled && self.time.same_instant(now)
    }

    /// Evaluate the predicate and latch `triggered` on a match
    pub fn check(&mut self, now: &WallClock) -> bool {
        let hit = self.matches(now);
        if hit {
            self.triggered = true;
        }
        hit
    }

    pub fn triggered(&self) -> bool {
        self.triggered
    }

    /// Latch `triggered` for a snooze instant that has been reached
    pub fn retrigger(&mut self) {
        self.triggered = true;
    }

    pub fn dismiss(&mut self) {
        self.triggered = false;
    }

    /// Enabled and not yet rung, i.e. the slow tick is still needed to fire it
    pub fn pending(&self) -> bool {
        self.enabled && !self.triggered
    }

    /// Snooze instant `n * minutes` after the alarm time, seconds zeroed.
    /// Hours wrap the way the alarm's hour mode counts them.
    pub fn snooze_time(&self, n: u8, minutes: u8) -> SnoozeTime {
        let total = u16::from(self.time.minute()) + u16::from(n) * u16::from(minutes);
        let carry = total / 60;
        let hour = u16::from(self.time.hour());
        let hour = match self.time.hour_mode() {
            HourMode::H24 => (hour + carry) % 24,
            HourMode::H12 => (hour + 11 + carry) % 12 + 1,
        };
        SnoozeTime {
            hour: hour as u8,
            min: (total % 60) as u8,
            sec: 0,
        }
    }
}

impl Default for Alarm {
    fn default() -> Self {
        Self::new()
    }
}

/// Change the hour mode of the clock and the alarm together
pub fn change_hour_mode(time: &mut WallClock, alarm: &mut Alarm, mode: HourMode) {
    time.set_hour_mode(mode);
    alarm.time.set_hour_mode(mode);
}
