// Scenario runner: drives the simulated clock through a power-up, a day of
// time keeping and an alarm, printing what it sees.

use clock_core::test_utils::{SimEvent, Simulator};
use clock_core::{Alarm, ButtonId, SystemState};
use clock_tests::{hms24, ButtonRig};

fn main() {
    println!("🧪 Nixie Clock Core Scenarios (clock-core {})", clock_core::VERSION);

    // Scenario 1: power-up with the adapter
    boot_to_clock_face();

    // Scenario 2: one button press end to end
    debounce_one_press();

    // Scenario 3: alarm on the exact second
    alarm_on_time();

    // Scenario 4: adapter pulled and replugged
    sleep_and_wake();

    println!("✅ All scenarios passed!");
    println!();
    println!("📝 Run the full suite with: cargo test -p clock-tests");
}

fn boot_to_clock_face() {
    println!("🔌 Booting with external power...");
    let mut sim = Simulator::new(true);
    assert_eq!(sim.boot(), SystemState::Intro);
    assert!(sim.run_until_state(SystemState::DisplayTime, 20_000));
    println!("  ✅ Clock face after {} ms of intro", sim.now_ms());
}

fn debounce_one_press() {
    println!("🔘 Debouncing a press on X...");
    let mut rig = ButtonRig::new(ButtonId::X);
    rig.hold(true, 120);
    rig.hold(false, 30);
    assert_eq!(rig.actions, 1);
    println!("  ✅ Events: {:?}", rig.events);
}

fn alarm_on_time() {
    println!("⏰ Alarm at 07:30:00...");
    let mut sim = Simulator::new(true);
    sim.boot();
    sim.force_state(SystemState::DisplayTime);
    sim.set_time(hms24(7, 29, 55));
    sim.set_alarm(Alarm::at(hms24(7, 30, 0)));

    assert!(sim.run_until_state(SystemState::AlarmTriggered, 6000));
    println!(
        "  ✅ Ringing at {} ({} ms)",
        sim.snapshot().time.format_hms(),
        sim.now_ms()
    );

    sim.press(ButtonId::Y, 100);
    let ring = sim.dispatcher().handlers().alarm_ring();
    assert!(!ring.is_ringing());
    println!("  💤 Snoozed {} time(s)", ring.snoozes());
}

fn sleep_and_wake() {
    println!("🔋 Pulling the adapter...");
    let mut sim = Simulator::new(true);
    sim.boot();
    sim.schedule(100, SimEvent::Unplug);
    sim.schedule(4100, SimEvent::Plug);
    sim.run_ms(4000);
    assert_eq!(sim.system(), SystemState::Sleep);
    println!("  😴 Asleep, sleeps entered: {}", sim.hal.peripherals.sleeps.len());

    assert!(sim.run_until_state(SystemState::Intro, 200));
    println!("  ✅ Awake at {}", sim.snapshot().time.format_hms());
    for line in sim.hal.console.lines() {
        println!("    📟 {line}");
    }
}
