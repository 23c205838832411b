#![cfg_attr(target_arch = "riscv32", no_std, no_main)]

#[cfg(all(target_arch = "riscv32", feature = "defmt"))]
use defmt_rtt as _;
#[cfg(target_arch = "riscv32")]
use panic_halt as _;
#[cfg(target_arch = "riscv32")]
use riscv_rt as _;

#[cfg(target_arch = "riscv32")]
use embassy_executor::Spawner;
#[cfg(target_arch = "riscv32")]
use nixie_clock_firmware::{default_config, tasks::clock_task, Board};

#[cfg(target_arch = "riscv32")]
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    #[cfg(feature = "defmt")]
    defmt::info!("nixie clock firmware {}", clock_core::VERSION);

    spawner.must_spawn(clock_task(Board::new(), default_config()));
}

/// Host builds only carry the library; the binary just reports what it is.
#[cfg(not(target_arch = "riscv32"))]
fn main() {
    println!(
        "nixie-clock {} (clock-core {}): build for riscv32imac-unknown-none-elf to flash",
        env!("CARGO_PKG_VERSION"),
        clock_core::VERSION
    );
}
