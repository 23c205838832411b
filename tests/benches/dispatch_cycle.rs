use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use clock_core::hal::mock::MockDisplay;
use clock_core::test_utils::Simulator;
use clock_core::{ButtonId, SystemState};
use clock_tests::{hms24, ButtonRig};

fn clock_face() -> Simulator {
    let mut sim = Simulator::new(true);
    sim.boot();
    sim.force_state(SystemState::DisplayTime);
    sim.set_time(hms24(12, 34, 56));
    sim
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    group.bench_function("clock_face_millisecond", |b| {
        let mut sim = clock_face();
        b.iter(|| black_box(sim.step()));
    });

    group.bench_function("clock_face_second", |b| {
        b.iter_batched(clock_face, |mut sim| sim.run_ms(1000), BatchSize::SmallInput);
    });

    group.finish();
}

fn bench_isr(c: &mut Criterion) {
    let sim = clock_face();
    let shared = sim.shared();
    let mut display = MockDisplay::new();

    c.bench_function("fast_tick_isr", |b| {
        b.iter(|| {
            shared.on_fast_tick(&mut display);
            black_box(shared.fast_tick().take())
        })
    });

    c.bench_function("slow_tick_isr", |b| b.iter(|| shared.on_slow_tick()));
}

fn bench_debounce(c: &mut Criterion) {
    c.bench_function("debounce_press_release", |b| {
        b.iter(|| {
            let mut rig = ButtonRig::new(ButtonId::Y);
            rig.hold(true, 10);
            rig.hold(false, 30);
            black_box(rig.actions)
        })
    });
}

criterion_group!(benches, bench_dispatch, bench_isr, bench_debounce);
criterion_main!(benches);
