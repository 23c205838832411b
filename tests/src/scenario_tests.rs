//! Whole-core scenarios on the millisecond simulator

use clock_core::hal::mock::{InterruptHook, MockVoltage};
use clock_core::test_utils::{SimEvent, Simulator};
use clock_core::{Alarm, DayPeriod, SleepDepth, SystemState, WallClock};
use rstest::rstest;

use crate::hms24;

fn hms12(hour: u8, min: u8, sec: u8, period: DayPeriod) -> WallClock {
    match WallClock::new_12h(hour, min, sec, period) {
        Ok(time) => time,
        Err(e) => panic!("{e}"),
    }
}

fn clock_face_at(time: WallClock) -> Simulator {
    let mut sim = Simulator::new(true);
    assert_eq!(sim.boot(), SystemState::Intro);
    sim.force_state(SystemState::DisplayTime);
    sim.set_time(time);
    sim
}

#[rstest]
#[case::morning_12h(hms12(7, 29, 58, DayPeriod::Am), hms12(7, 30, 0, DayPeriod::Am))]
#[case::evening_24h(hms24(19, 29, 58), hms24(19, 30, 0))]
#[case::across_midnight(hms24(23, 59, 58), hms24(0, 0, 0))]
fn test_alarm_rings_on_the_matching_tick(#[case] start: WallClock, #[case] at: WallClock) {
    println!("⏰ alarm {} from {}", at.format_hms(), start.format_hms());
    let mut sim = clock_face_at(start);
    sim.set_alarm(Alarm::at(at));

    sim.run_ms(1999);
    assert_eq!(sim.system(), SystemState::DisplayTime);
    assert!(!sim.snapshot().alarm.triggered());

    assert_eq!(sim.step(), SystemState::AlarmTriggered);
    assert!(sim.snapshot().time.same_instant(&at));
    assert!(sim.hal.buzzer.playing.is_some());
}

#[test]
fn test_alarm_ignores_the_other_period() {
    let mut sim = clock_face_at(hms12(7, 29, 58, DayPeriod::Am));
    sim.set_alarm(Alarm::at(hms12(7, 30, 0, DayPeriod::Pm)));
    sim.run_ms(5000);
    assert_eq!(sim.system(), SystemState::DisplayTime);
}

#[test]
fn test_disabled_alarm_stays_silent() {
    let mut sim = clock_face_at(hms24(6, 59, 59));
    let mut alarm = Alarm::at(hms24(7, 0, 0));
    alarm.enabled = false;
    sim.set_alarm(alarm);
    sim.run_ms(3000);
    assert_eq!(sim.system(), SystemState::DisplayTime);
}

#[test]
fn test_seconds_report_on_the_console() {
    let mut sim = clock_face_at(hms24(10, 0, 0));
    sim.run_ms(3000);
    let lines = sim.hal.console.lines();
    assert_eq!(&lines[lines.len() - 3..], &["10:00:01", "10:00:02", "10:00:03"]);
    assert_eq!(sim.hal.lights.heartbeat_toggles, 3);
}

#[test]
fn test_battery_boot_sleeps_deep() {
    let mut sim = Simulator::new(false);
    assert_eq!(sim.boot(), SystemState::Sleep);
    sim.run_ms(10);
    assert_eq!(sim.hal.peripherals.last_sleep(), Some(SleepDepth::Deep));
    assert!(sim.hal.peripherals.rtc_halted);

    // Deep sleep stops the oscillator, so time stands still.
    let before = sim.snapshot().time;
    sim.run_ms(3000);
    assert_eq!(sim.snapshot().time, before);
}

#[test]
fn test_pending_alarm_keeps_the_oscillator() {
    let mut sim = Simulator::new(false);
    sim.set_alarm(Alarm::at(hms24(7, 0, 0)));
    assert_eq!(sim.boot(), SystemState::Sleep);
    sim.run_ms(10);
    assert!(sim
        .hal
        .peripherals
        .sleeps
        .iter()
        .all(|&depth| depth == SleepDepth::Shallow));
    assert!(!sim.hal.peripherals.rtc_halted);
}

#[test]
fn test_adapter_loss_keeps_time_and_wakes_on_replug() {
    let mut sim = clock_face_at(hms24(10, 0, 0));
    sim.schedule(500, SimEvent::Unplug);
    sim.run_ms(5500);

    assert_eq!(sim.system(), SystemState::Sleep);
    assert_eq!(sim.hal.peripherals.last_sleep(), Some(SleepDepth::Shallow));
    assert_eq!(sim.snapshot().time, hms24(10, 0, 5));
    assert!(sim.hal.console.output.contains("Good Bye"));

    sim.apply(SimEvent::Plug);
    assert!(sim.run_until_state(SystemState::Intro, 10));
    assert!(sim.hal.console.output.ends_with("What's Up!"));
    assert!(sim.hal.peripherals.enabled);
}

#[test]
fn test_alarm_while_unplugged_rings_on_replug() {
    let mut sim = clock_face_at(hms24(6, 59, 58));
    sim.set_alarm(Alarm::at(hms24(7, 0, 0)));
    sim.apply(SimEvent::Unplug);
    sim.run_ms(3000);

    assert_eq!(sim.system(), SystemState::Sleep);
    assert!(sim.snapshot().alarm.triggered());

    sim.apply(SimEvent::Plug);
    assert!(sim.run_until_state(SystemState::AlarmTriggered, 10));
}

#[test]
fn test_supply_fault_resets_to_power_up_records() {
    let mut sim = Simulator::new(true);
    sim.hal.voltage = MockVoltage::failing();
    sim.hal.power.unplug_after = Some(3);
    sim.set_time(hms24(15, 45, 0));

    assert_eq!(sim.boot(), SystemState::Reset);
    assert!(sim.hal.console.output.contains("Please disconnect"));

    sim.run_ms(5);
    assert_eq!(sim.system(), SystemState::Sleep);
    assert_eq!(sim.snapshot().time, WallClock::new());
    assert!(sim.hal.lights.heartbeat_toggles > 0);
    assert_eq!(sim.hal.peripherals.last_sleep(), Some(SleepDepth::Deep));
}

#[test]
fn test_adapter_pulled_during_boot_settle_sleeps_until_replug() {
    let mut sim = Simulator::new(true);
    let shared = sim.shared();
    sim.hal.peripherals.during_delay = InterruptHook::new(move || shared.on_power_edge(false));

    assert_eq!(sim.boot(), SystemState::Sleep);
    sim.hal.power.present = false;
    sim.hal.peripherals.during_delay = InterruptHook::default();

    assert_eq!(sim.run_ms(2000), SystemState::Sleep);
    assert!(!sim.hal.peripherals.sleeps.is_empty());
    assert!(sim.hal.console.output.contains("Good Bye"));

    sim.apply(SimEvent::Plug);
    assert!(sim.run_until_state(SystemState::Intro, 10));
    assert!(sim.hal.console.output.ends_with("What's Up!"));
}

#[test]
fn test_adapter_pulled_during_production_test_sleeps() {
    let mut sim = Simulator::new(true);
    sim.hal.power.jumper = true;
    let shared = sim.shared();
    sim.hal.tester.during_run = InterruptHook::new(move || shared.on_power_edge(false));

    assert_eq!(sim.boot(), SystemState::ProductionTest);
    sim.hal.power.present = false;

    assert_eq!(sim.run_ms(500), SystemState::Sleep);
    assert_eq!(sim.hal.tester.runs, 1);
    assert!(!sim.hal.peripherals.sleeps.is_empty());
    assert!(sim.hal.console.output.contains("Good Bye"));
}
