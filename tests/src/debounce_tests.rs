//! Debounce state machine driven through raw level sequences

use clock_core::{ButtonEvent, ButtonId, ButtonSource, ButtonState, PinButton};
use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};
use proptest::prelude::*;
use rstest::rstest;

use crate::ButtonRig;

fn assert_settled(rig: &ButtonRig) {
    let b = &rig.button;
    assert_eq!(b.state(), ButtonState::Idle);
    assert!(!b.action() && !b.delay1() && !b.delay2() && !b.delay3());
    assert!(!b.locked() && !b.query());
}

#[rstest]
#[case::x(ButtonId::X)]
#[case::y(ButtonId::Y)]
#[case::z(ButtonId::Z)]
fn test_minimal_press_gives_one_action(#[case] id: ButtonId) {
    let mut rig = ButtonRig::new(id);
    rig.hold(true, 7);
    assert_eq!(rig.ticks_of(ButtonEvent::Pressed), [7]);
    assert!(rig.tone.is_beeping());

    rig.hold(false, 29);
    assert_eq!(rig.button.state(), ButtonState::Released);
    rig.hold(false, 1);

    assert_eq!(rig.actions, 1);
    assert_settled(&rig);
    assert!(!rig.tone.is_beeping());
}

#[test]
fn test_short_bounce_is_noise() {
    let mut rig = ButtonRig::new(ButtonId::X);
    rig.hold(true, 3);
    rig.hold(false, 3);
    assert_eq!(rig.actions, 0);
    assert_eq!(rig.ticks_of(ButtonEvent::Noise), [6]);
    assert_settled(&rig);
}

#[test]
fn test_bounce_during_press_still_counts_once() {
    let mut rig = ButtonRig::new(ButtonId::Y);
    rig.hold(true, 4);
    rig.hold(false, 1);
    rig.hold(true, 5);
    assert_eq!(rig.actions, 1);
    assert_eq!(rig.button.state(), ButtonState::Pushed);
}

#[test]
fn test_long_hold_and_repeat_cadence() {
    let mut rig = ButtonRig::new(ButtonId::Z);
    rig.hold(true, 7 + 2100);

    assert_eq!(rig.ticks_of(ButtonEvent::LongHold), [7 + 2000]);
    assert_eq!(rig.ticks_of(ButtonEvent::Hold), [7 + 300]);

    let repeats = rig.ticks_of(ButtonEvent::Repeat);
    assert_eq!(repeats[0], 7 + 325);
    assert!(repeats.windows(2).all(|w| w[1] - w[0] == 65));
    assert!(rig.button.delay3());

    rig.hold(false, 30);
    assert_settled(&rig);

    // A second hold asserts delay3 again, once.
    rig.hold(true, 7 + 2100);
    assert_eq!(rig.ticks_of(ButtonEvent::LongHold).len(), 2);
}

#[test]
fn test_repeat_is_consumed_without_dropping_action() {
    let mut rig = ButtonRig::new(ButtonId::X);
    rig.hold(true, 7 + 325);
    assert!(rig.button.take_repeat());
    assert!(!rig.button.delay2());
    assert!(rig.button.action());
    assert!(!rig.button.take_repeat());
}

#[test]
fn test_pin_button_reads_active_low() {
    let expectations = [
        Transaction::get(State::High),
        Transaction::get(State::Low),
    ];
    let mut pin = PinMock::new(&expectations);
    let mut source = PinButton::new(pin.clone());

    assert!(!source.read());
    assert!(source.read());
    pin.done();
}

proptest! {
    #[test]
    fn prop_press_then_release_is_one_action(
        press in 7u32..3000,
        release in 30u32..200,
        id in prop_oneof![Just(ButtonId::X), Just(ButtonId::Y), Just(ButtonId::Z)],
    ) {
        let mut rig = ButtonRig::new(id);
        rig.hold(true, press);
        rig.hold(false, release);

        prop_assert_eq!(rig.actions, 1);
        prop_assert_eq!(rig.ticks_of(ButtonEvent::Settled).len(), 1);
        prop_assert_eq!(rig.button.state(), ButtonState::Idle);
        prop_assert!(!rig.button.action() && !rig.button.locked() && !rig.button.query());
        prop_assert!(!rig.button.delay1() && !rig.button.delay2() && !rig.button.delay3());
    }

    #[test]
    fn prop_long_hold_fires_once_per_hold(press in 2007u32..6000) {
        let mut rig = ButtonRig::new(ButtonId::X);
        rig.hold(true, press);
        prop_assert_eq!(rig.ticks_of(ButtonEvent::LongHold).len(), 1);
    }
}
