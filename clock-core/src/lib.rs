#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! # Clock Core
//!
//! Tick-synchronised firmware core for a four-tube nixie clock: a 1 kHz fast
//! tick paces a cooperative dispatcher, a 1 Hz slow tick keeps the wall
//! clock, every button runs its own debounce state machine and a four-step
//! power controller handles sleep and wake. All state shared with interrupt
//! handlers lives behind one critical section.

pub mod types;
pub mod time;
pub mod display;
pub mod button;
pub mod hal;
pub mod timebase;
pub mod power;
pub mod handlers;
pub mod dispatcher;

#[cfg(feature = "test-utils")]
pub mod test_utils;


pub use types::*;
pub use time::{change_hour_mode, Alarm, Bcd, SnoozeTime, TimeField, WallClock};
pub use display::{Digit, DisplayRecord, Multiplexer, MuxFrame, FULL_BRIGHTNESS, TUBES};
pub use button::{Button, ButtonEvent};
pub use hal::*;
pub use timebase::{ClockSnapshot, Shared, SharedState, TickFlag};
pub use power::{AlarmStatus, PowerController, PowerStep};
pub use handlers::{Context, Handler, Handlers};
pub use dispatcher::Dispatcher;

#[cfg(feature = "embassy-time")]
pub use dispatcher::dispatcher_task;

/// Clock core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reference timing for a 1 kHz fast tick
pub fn default_config() -> ClockConfig {
    ClockConfig::default()
}
