//! Core data types for the clock firmware

/// Operating modes of the clock. Exactly one is active at a time and it is
/// the value threaded through every behaviour handler.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "std", derive(Hash))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SystemState {
    /// CPU halted, waiting for external power or the slow tick
    Sleep,
    /// Boot animation
    Intro,
    /// Normal operation: the time is shown
    DisplayTime,
    /// Configuration menu
    Menu,
    /// Menu option 1
    SetTime,
    /// Menu option 2
    SetAlarm,
    /// Menu option 3
    SetAlarmActive,
    /// Menu option 4
    SetHourMode,
    /// Menu option 5
    SetTransitions,
    /// Menu option 6
    SetAlarmTheme,
    /// Alarm is ringing or snoozing
    AlarmTriggered,
    /// User-accessible tube/LED/buzzer test
    UserTest,
    /// Operator-driven manufacturing test
    ProductionTest,
    /// Shut down outputs and wait for the power adapter to be removed
    Reset,
}

impl SystemState {
    /// All states, in their raw numbering order
    pub const ALL: [SystemState; 14] = [
        SystemState::Sleep,
        SystemState::Intro,
        SystemState::DisplayTime,
        SystemState::Menu,
        SystemState::SetTime,
        SystemState::SetAlarm,
        SystemState::SetAlarmActive,
        SystemState::SetHourMode,
        SystemState::AlarmTriggered,
        SystemState::SetTransitions,
        SystemState::SetAlarmTheme,
        SystemState::UserTest,
        SystemState::ProductionTest,
        SystemState::Reset,
    ];

    /// Decode a raw state number. Unknown values fall back to `DisplayTime`.
    pub fn from_raw(raw: u8) -> Self {
        Self::ALL
            .get(raw as usize)
            .copied()
            .unwrap_or(SystemState::DisplayTime)
    }

    /// Raw state number, the inverse of [`SystemState::from_raw`]
    pub fn as_raw(&self) -> u8 {
        Self::ALL.iter().position(|s| s == self).unwrap_or(2) as u8
    }

    /// Returns true for the six configuration sub-modes
    pub const fn is_setting(&self) -> bool {
        matches!(
            self,
            SystemState::SetTime
                | SystemState::SetAlarm
                | SystemState::SetAlarmActive
                | SystemState::SetHourMode
                | SystemState::SetTransitions
                | SystemState::SetAlarmTheme
        )
    }

    /// Returns true if this state owns the fast-tick window through a
    /// regular step handler
    pub const fn is_stepped(&self) -> bool {
        !matches!(
            self,
            SystemState::Sleep | SystemState::ProductionTest | SystemState::Reset
        )
    }
}

/// 12/24-hour display mode
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HourMode {
    H12,
    H24,
}

impl HourMode {
    pub const fn toggled(&self) -> HourMode {
        match self {
            HourMode::H12 => HourMode::H24,
            HourMode::H24 => HourMode::H12,
        }
    }

    /// Digits shown by the hour-mode menu
    pub const fn label(&self) -> [u8; 2] {
        match self {
            HourMode::H12 => [1, 2],
            HourMode::H24 => [2, 4],
        }
    }
}

/// Half of the day
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DayPeriod {
    Am,
    Pm,
}

impl DayPeriod {
    pub const fn toggled(&self) -> DayPeriod {
        match self {
            DayPeriod::Am => DayPeriod::Pm,
            DayPeriod::Pm => DayPeriod::Am,
        }
    }
}

/// Physical buttons
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "std", derive(Hash))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonId {
    /// Mode / enter / back
    X,
    /// Previous / show alarm / display off
    Y,
    /// Next / increment / lights
    Z,
}

impl ButtonId {
    pub const ALL: [ButtonId; 3] = [ButtonId::X, ButtonId::Y, ButtonId::Z];

    pub const fn index(&self) -> usize {
        match self {
            ButtonId::X => 0,
            ButtonId::Y => 1,
            ButtonId::Z => 2,
        }
    }
}

/// Debounce FSM states
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonState {
    /// Waiting for a stable press
    Idle,
    /// Press confirmed, counting hold time
    Pushed,
    /// Released, enforcing the minimum spacing before the next press
    Released,
}

/// RTC policy while asleep, decided by the presence of external power
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerMode {
    /// Slow-tick oscillator keeps running; time is kept
    RtcRetained,
    /// Slow-tick oscillator may be stopped (battery inserted first, or reset)
    RtcStopped,
}

/// Low-power sleep depth
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepDepth {
    /// Power-save: slow tick alive, any enabled interrupt wakes the CPU
    Shallow,
    /// Power-down: only the external-power pin change wakes the CPU
    Deep,
}

/// Alarm melodies, in menu order
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Melody {
    SimpleAlarm,
    MajorScale,
    StarWars,
    ImperialMarch,
    SuperMario,
    UsaAnthem,
    Diomedes,
}

impl Melody {
    pub const ALL: [Melody; 7] = [
        Melody::SimpleAlarm,
        Melody::MajorScale,
        Melody::StarWars,
        Melody::ImperialMarch,
        Melody::SuperMario,
        Melody::UsaAnthem,
        Melody::Diomedes,
    ];

    /// 1-based number shown on the last tube
    pub fn number(&self) -> u8 {
        Self::ALL.iter().position(|m| m == self).unwrap_or(0) as u8 + 1
    }

    pub fn next(&self) -> Melody {
        Self::ALL[(self.number() as usize) % Self::ALL.len()]
    }

    pub fn previous(&self) -> Melody {
        let n = Self::ALL.len();
        Self::ALL[(self.number() as usize + n - 2) % n]
    }
}

/// Minute-change animation selected in the transitions menu. Played by the
/// display animation collaborator.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransitionMode {
    Waterfall,
    SlotMachine,
    Wave,
    Rotating,
}

impl TransitionMode {
    pub const fn number(&self) -> u8 {
        match self {
            TransitionMode::Waterfall => 1,
            TransitionMode::SlotMachine => 2,
            TransitionMode::Wave => 3,
            TransitionMode::Rotating => 4,
        }
    }

    pub const fn next(&self) -> TransitionMode {
        match self {
            TransitionMode::Waterfall => TransitionMode::SlotMachine,
            TransitionMode::SlotMachine => TransitionMode::Wave,
            TransitionMode::Wave => TransitionMode::Rotating,
            TransitionMode::Rotating => TransitionMode::Waterfall,
        }
    }

    pub const fn previous(&self) -> TransitionMode {
        match self {
            TransitionMode::Waterfall => TransitionMode::Rotating,
            TransitionMode::SlotMachine => TransitionMode::Waterfall,
            TransitionMode::Wave => TransitionMode::SlotMachine,
            TransitionMode::Rotating => TransitionMode::Wave,
        }
    }
}

/// RGB status light colour (8-bit PWM duty per channel)
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Timing thresholds of the core, all counted in fast ticks (1 ms) unless
/// stated otherwise
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClockConfig {
    /// Consecutive pressed samples that confirm a press
    pub press_threshold: u16,
    /// Hold time after which the acknowledgement tone stops
    pub beep_ticks: u16,
    /// Hold time for `delay1`
    pub hold_ticks: u16,
    /// Repeat period for `delay2` once `delay1` is set
    pub repeat_ticks: u16,
    /// Hold time for `delay3` (long hold)
    pub long_hold_ticks: u16,
    /// Released samples required before the next press is accepted
    pub release_ticks: u16,
    /// Idle timeout of menu handlers
    pub idle_timeout_ticks: u32,
    /// Half-period of the blinking cursor
    pub blink_ticks: u32,
    /// How long the alarm rings before snoozing on its own
    pub ring_ticks: u32,
    /// Number of snoozes before the alarm gives up
    pub snooze_count: u8,
    /// Minutes between snoozes
    pub snooze_minutes: u8,
    /// Supply settle delay before the voltage self-test, in milliseconds
    pub settle_ms: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            press_threshold: 7,
            beep_ticks: 50,
            hold_ticks: 300,
            repeat_ticks: 65,
            long_hold_ticks: 2000,
            release_ticks: 30,
            idle_timeout_ticks: 30_000,
            blink_ticks: 100,
            ring_ticks: 60_000,
            snooze_count: 2,
            snooze_minutes: 5,
            settle_ms: 2000,
        }
    }
}

impl ClockConfig {
    /// Create a configuration with custom button timing, keeping the other
    /// reference values
    pub fn new(
        press_threshold: u16,
        hold_ticks: u16,
        repeat_ticks: u16,
        long_hold_ticks: u16,
        release_ticks: u16,
    ) -> Result<Self, &'static str> {
        if press_threshold == 0 || press_threshold > 100 {
            return Err("Press threshold must be between 1 and 100 ticks");
        }
        if repeat_ticks == 0 {
            return Err("Repeat period must be non-zero");
        }
        if hold_ticks <= press_threshold || long_hold_ticks <= hold_ticks {
            return Err("Hold thresholds must increase: press < hold < long hold");
        }
        if release_ticks == 0 {
            return Err("Release spacing must be non-zero");
        }

        Ok(Self {
            press_threshold,
            hold_ticks,
            repeat_ticks,
            long_hold_ticks,
            release_ticks,
            ..Self::default()
        })
    }

    /// Change the menu idle timeout
    pub fn with_idle_timeout(mut self, ticks: u32) -> Result<Self, &'static str> {
        if ticks < self.blink_ticks {
            return Err("Idle timeout must be longer than the blink period");
        }
        self.idle_timeout_ticks = ticks;
        Ok(self)
    }

    /// Change the snooze schedule. The last snooze must fall within the
    /// hour after the alarm.
    pub fn with_snooze(mut self, count: u8, minutes: u8) -> Result<Self, &'static str> {
        if minutes == 0 {
            return Err("Snooze interval must be non-zero");
        }
        if u16::from(count) * u16::from(minutes) > 59 {
            return Err("Snoozes must end within the hour after the alarm");
        }
        self.snooze_count = count;
        self.snooze_minutes = minutes;
        Ok(self)
    }
}
