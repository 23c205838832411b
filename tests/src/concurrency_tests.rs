//! Interrupt-versus-dispatcher races on a host with real threads
//!
//! The std `critical-section` implementation is a global lock, so the same
//! code that masks interrupts on the board serialises threads here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clock_core::hal::mock::{MockButton, MockDisplay};
use clock_core::{Alarm, Shared, SystemState};

use crate::hms24;

fn leaked_shared() -> &'static Shared<MockButton> {
    Box::leak(Box::new(Shared::new(
        MockButton::new(),
        MockButton::new(),
        MockButton::new(),
    )))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 3)]
async fn test_snapshots_never_see_torn_digits() {
    println!("🧵 slow tick vs. snapshot readers");
    let shared = leaked_shared();
    shared.with(|s| s.time = hms24(23, 59, 0));
    let done = Arc::new(AtomicBool::new(false));

    let ticker = {
        let done = done.clone();
        tokio::task::spawn_blocking(move || {
            for _ in 0..50_000 {
                shared.on_slow_tick();
            }
            done.store(true, Ordering::Release);
        })
    };

    let readers: Vec<_> = (0..2)
        .map(|_| {
            let done = done.clone();
            tokio::task::spawn_blocking(move || {
                let mut seen = 0u32;
                while !done.load(Ordering::Acquire) {
                    let snapshot = shared.snapshot();
                    assert!(snapshot.time.is_consistent(), "torn read: {:?}", snapshot.time);
                    seen += 1;
                }
                seen
            })
        })
        .collect();

    ticker.await.expect("ticker panicked");
    for reader in readers {
        let seen = reader.await.expect("reader panicked");
        println!("  ✅ {seen} consistent snapshots");
    }

    // 50 000 seconds after 23:59:00
    assert_eq!(shared.snapshot().time, hms24(13, 52, 20));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fast_tick_flag_is_never_lost_or_doubled() {
    let shared = leaked_shared();
    let raised = 10_000u32;

    let isr = tokio::task::spawn_blocking(move || {
        let mut display = MockDisplay::new();
        for _ in 0..raised {
            // One tick at a time: wait for the consumer before raising again.
            while shared.fast_tick().is_raised() {
                std::hint::spin_loop();
            }
            shared.on_fast_tick(&mut display);
        }
        display.frames
    });

    let consumer = tokio::task::spawn_blocking(move || {
        let mut taken = 0u32;
        while taken < raised {
            if shared.fast_tick().take() {
                taken += 1;
            }
        }
        taken
    });

    let frames = isr.await.expect("isr panicked");
    assert_eq!(consumer.await.expect("consumer panicked"), raised);
    assert_eq!(frames, raised);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_alarm_latch_survives_concurrent_power_edges() {
    let shared = leaked_shared();
    shared.with(|s| {
        s.system = SystemState::DisplayTime;
        s.time = hms24(6, 59, 59);
        s.alarm = Alarm::at(hms24(7, 0, 0));
    });

    let edges = tokio::task::spawn_blocking(move || {
        for i in 0..1000 {
            shared.on_power_edge(i % 2 == 1);
        }
    });
    let tick = tokio::task::spawn_blocking(move || shared.on_slow_tick());

    edges.await.expect("edges panicked");
    tick.await.expect("tick panicked");

    let snapshot = shared.snapshot();
    assert!(snapshot.alarm.triggered());
    assert!(matches!(
        snapshot.system,
        SystemState::Sleep | SystemState::AlarmTriggered
    ));
}
