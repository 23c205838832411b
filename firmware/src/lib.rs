#![cfg_attr(not(test), no_std)]

//! Nixie clock firmware for the CH32V203
//!
//! The interrupt entry points in [`interrupts`] feed the shared records in
//! [`SHARED`]; the dispatcher runs as a single embassy task on top of them.

pub mod board;
pub mod factory;

#[cfg(target_arch = "riscv32")]
pub mod time_driver;
#[cfg(target_arch = "riscv32")]
mod vectors;

pub use board::{Board, ButtonPin};
pub use clock_core::{default_config, ClockConfig, Shared, SystemState};

use clock_core::PinButton;

/// Records shared between the dispatcher task and the interrupt handlers
pub static SHARED: Shared<PinButton<ButtonPin>> = Shared::new(
    PinButton::new(ButtonPin::X),
    PinButton::new(ButtonPin::Y),
    PinButton::new(ButtonPin::Z),
);

/// Bodies of the interrupt handlers, called from the vector table entries
pub mod interrupts {
    use super::board::{self, latch_port_a, pins, NixieDriver};
    use super::SHARED;

    /// SysTick, 1 kHz. Multiplexing and the dispatch flag stop while the
    /// peripherals are gated.
    pub fn systick() {
        #[cfg(target_arch = "riscv32")]
        super::time_driver::tick();
        board::count_millisecond();
        if board::peripherals_enabled() {
            SHARED.on_fast_tick(&mut NixieDriver);
        }
    }

    /// RTC second interrupt
    pub fn rtc_second() {
        if board::rtc_running() {
            board::count_rtc_second();
            SHARED.on_slow_tick();
        }
    }

    /// EXTI0..=EXTI4 share this body. `port` is the input image of port A
    /// read by the handler.
    pub fn exti(port: u16, pending: u16) {
        latch_port_a(port);
        let buttons: u16 = (1 << pins::BUTTON_X) | (1 << pins::BUTTON_Y) | (1 << pins::BUTTON_Z);
        if pending & buttons != 0 {
            SHARED.on_button_edge();
        }
        if pending & (1 << pins::EXT_PWR) != 0 {
            SHARED.on_power_edge(port & (1 << pins::EXT_PWR) != 0);
        }
    }

    /// End of the injected ADC scan: raw counts of the high voltage,
    /// regulator and input channels
    pub fn adc_scan(raw: [u16; 3]) {
        board::latch_adc_raw(raw);
    }

    /// USART1 transmit register empty. `None` means the queue is drained and
    /// the handler should mask the interrupt.
    pub fn usart1_tx() -> Option<u8> {
        board::next_tx_byte()
    }
}

#[cfg(target_arch = "riscv32")]
pub mod tasks {
    use super::{Board, ClockConfig, SHARED};

    /// The dispatcher, forever
    #[embassy_executor::task]
    pub async fn clock_task(board: Board, config: ClockConfig) {
        #[cfg(feature = "defmt")]
        defmt::info!("clock task started");
        clock_core::dispatcher_task(&SHARED, board, config).await;
    }
}
