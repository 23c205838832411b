//! Wall clock arithmetic: digit decomposition, carries and hour rollover

use clock_core::{change_hour_mode, Alarm, DayPeriod, HourMode, WallClock};
use proptest::prelude::*;
use rstest::rstest;
use tokio_test::{assert_err, assert_ok};

use crate::hms24;

fn hms12(hour: u8, min: u8, sec: u8, period: DayPeriod) -> WallClock {
    assert_ok!(WallClock::new_12h(hour, min, sec, period))
}

fn period() -> impl Strategy<Value = DayPeriod> {
    prop_oneof![Just(DayPeriod::Am), Just(DayPeriod::Pm)]
}

#[rstest]
#[case::h12_into_noon(hms12(11, 0, 0, DayPeriod::Am), 12, DayPeriod::Pm)]
#[case::h12_into_midnight(hms12(11, 0, 0, DayPeriod::Pm), 12, DayPeriod::Am)]
#[case::h12_past_twelve(hms12(12, 0, 0, DayPeriod::Pm), 1, DayPeriod::Pm)]
#[case::h12_morning(hms12(7, 0, 0, DayPeriod::Am), 8, DayPeriod::Am)]
#[case::h24_into_noon(hms24(11, 0, 0), 12, DayPeriod::Pm)]
#[case::h24_afternoon(hms24(12, 0, 0), 13, DayPeriod::Pm)]
#[case::h24_midnight(hms24(23, 0, 0), 0, DayPeriod::Am)]
fn test_hour_increment(#[case] mut time: WallClock, #[case] hour: u8, #[case] period: DayPeriod) {
    time.increment_hour();
    assert_eq!((time.hour(), time.period()), (hour, period));
    assert!(time.is_consistent());
}

#[rstest]
#[case::seconds_carry(hms24(10, 20, 59), hms24(10, 21, 0))]
#[case::minutes_carry(hms24(10, 59, 59), hms24(11, 0, 0))]
#[case::day_boundary(hms24(23, 59, 59), hms24(0, 0, 0))]
fn test_tick_second_carries(#[case] mut time: WallClock, #[case] expected: WallClock) {
    time.tick_second();
    assert_eq!(time, expected);
}

#[test]
fn test_3661_ticks_from_23_59_59() {
    let mut time = hms24(23, 59, 59);

    time.tick_second();
    assert_eq!((time.hour(), time.minute(), time.second()), (0, 0, 0));
    assert_eq!(time.period(), DayPeriod::Am);

    let mut period_changes = 0;
    for _ in 1..3661 {
        let before = time.period();
        time.tick_second();
        if time.period() != before {
            period_changes += 1;
        }
    }
    assert_eq!(time, hms24(1, 1, 0));
    assert_eq!(period_changes, 0);
}

#[test]
fn test_3601_ticks_from_23_59_59() {
    let mut time = hms24(23, 59, 59);
    for _ in 0..3601 {
        time.tick_second();
    }
    assert_eq!(time.format_hms().as_str(), "01:00:00");
}

#[test]
fn test_constructors_reject_out_of_range() {
    assert_err!(WallClock::new_12h(0, 0, 0, DayPeriod::Am));
    assert_err!(WallClock::new_12h(13, 0, 0, DayPeriod::Am));
    assert_err!(WallClock::new_24h(24, 0, 0));
    assert_err!(WallClock::new_24h(10, 60, 0));
    assert_err!(WallClock::new_24h(10, 0, 60));
}

#[test]
fn test_hour_mode_change_keeps_alarm_matching() {
    let mut time = hms12(7, 29, 59, DayPeriod::Pm);
    let mut alarm = Alarm::at(hms12(7, 30, 0, DayPeriod::Pm));

    change_hour_mode(&mut time, &mut alarm, HourMode::H24);
    assert_eq!(time.hour(), 19);
    assert_eq!(alarm.time.hour(), 19);

    time.tick_second();
    assert!(alarm.matches(&time));
}

proptest! {
    #[test]
    fn prop_digits_follow_every_tick_24h(
        hour in 0u8..24,
        min in 0u8..60,
        sec in 0u8..60,
        ticks in 0u32..5000,
    ) {
        let mut time = hms24(hour, min, sec);
        for _ in 0..ticks {
            time.tick_second();
            prop_assert!(time.is_consistent());
        }
    }

    #[test]
    fn prop_digits_follow_every_tick_12h(
        hour in 1u8..=12,
        min in 0u8..60,
        sec in 0u8..60,
        period in period(),
        ticks in 0u32..5000,
    ) {
        let mut time = hms12(hour, min, sec, period);
        for _ in 0..ticks {
            time.tick_second();
            prop_assert!(time.is_consistent());
            prop_assert!((1..=12).contains(&time.hour()));
        }
    }

    #[test]
    fn prop_twelve_hours_toggle_period_once(hour in 1u8..=12, period in period()) {
        let mut time = hms12(hour, 0, 0, period);
        for _ in 0..12 {
            time.increment_hour();
        }
        prop_assert_eq!(time.hour(), hour);
        prop_assert_eq!(time.period(), period.toggled());
    }

    #[test]
    fn prop_day_wraps_in_24h(hour in 0u8..24, min in 0u8..60) {
        let start = hms24(hour, min, 0);
        let mut time = start;
        for _ in 0..86_400 {
            time.tick_second();
        }
        prop_assert_eq!(time, start);
    }

    #[test]
    fn prop_hour_mode_round_trip_is_identity(hour in 1u8..=12, period in period()) {
        let start = hms12(hour, 15, 30, period);
        let mut time = start;
        time.set_hour_mode(HourMode::H24);
        prop_assert!(time.hour() < 24);
        prop_assert_eq!(time.period() == DayPeriod::Pm, time.hour() >= 12);
        time.set_hour_mode(HourMode::H12);
        prop_assert_eq!(time, start);
    }
}
