//! Embassy time driver on the 1 kHz SysTick
//!
//! One alarm, enough for the generic timer queue.

use core::cell::Cell;

use critical_section::Mutex;
use embassy_time_driver::{AlarmHandle, Driver};
use portable_atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Copy, Clone)]
struct AlarmCallback {
    f: fn(*mut ()),
    ctx: *mut (),
}

// Only touched inside critical sections on a single hart.
unsafe impl Send for AlarmCallback {}

pub struct SysTickDriver {
    ticks: AtomicU64,
    allocated: AtomicBool,
    alarm_at: AtomicU64,
    callback: Mutex<Cell<Option<AlarmCallback>>>,
}

impl SysTickDriver {
    const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            allocated: AtomicBool::new(false),
            alarm_at: AtomicU64::new(u64::MAX),
            callback: Mutex::new(Cell::new(None)),
        }
    }

    fn on_tick(&self) {
        let now = self.ticks.fetch_add(1, Ordering::AcqRel) + 1;
        if now >= self.alarm_at.load(Ordering::Acquire) {
            self.alarm_at.store(u64::MAX, Ordering::Release);
            let callback = critical_section::with(|cs| self.callback.borrow(cs).get());
            if let Some(AlarmCallback { f, ctx }) = callback {
                f(ctx);
            }
        }
    }
}

impl Driver for SysTickDriver {
    fn now(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    unsafe fn allocate_alarm(&self) -> Option<AlarmHandle> {
        if self.allocated.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(AlarmHandle::new(0))
        }
    }

    fn set_alarm_callback(&self, _alarm: AlarmHandle, callback: fn(*mut ()), ctx: *mut ()) {
        critical_section::with(|cs| {
            self.callback
                .borrow(cs)
                .set(Some(AlarmCallback { f: callback, ctx }));
        });
    }

    fn set_alarm(&self, _alarm: AlarmHandle, timestamp: u64) -> bool {
        if timestamp <= self.now() {
            return false;
        }
        self.alarm_at.store(timestamp, Ordering::Release);
        true
    }
}

embassy_time_driver::time_driver_impl!(static DRIVER: SysTickDriver = SysTickDriver::new());

/// Called from the SysTick handler
pub fn tick() {
    DRIVER.on_tick();
}

critical_section::set_impl!(MachineInterrupts);

struct MachineInterrupts;

unsafe impl critical_section::Impl for MachineInterrupts {
    unsafe fn acquire() -> u8 {
        let mstatus: usize;
        core::arch::asm!("csrrci {}, mstatus, 8", out(reg) mstatus);
        (mstatus & 8) as u8
    }

    unsafe fn release(was_active: u8) {
        if was_active != 0 {
            core::arch::asm!("csrsi mstatus, 8");
        }
    }
}
