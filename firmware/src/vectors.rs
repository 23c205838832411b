//! CH32V203 vector table entries
//!
//! Each entry reads and acknowledges its peripheral, then hands the values to
//! the bodies in [`crate::interrupts`]. The symbols are the ones the device
//! startup code links into the vector table.

use core::ptr::{read_volatile, write_volatile};

use crate::interrupts;

const STK_SR: u32 = 0xE000_F004;
const RTC_CTLRL: u32 = 0x4000_2804;
const EXTI_INTFR: u32 = 0x4001_0414;
const GPIOA_INDR: u32 = 0x4001_0808;
const ADC1_STATR: u32 = 0x4001_2400;
const ADC1_IDATAR1: u32 = 0x4001_243C;
const USART1_STATR: u32 = 0x4001_3800;
const USART1_DATAR: u32 = 0x4001_3804;
const USART1_CTLR1: u32 = 0x4001_380C;

const RTC_SECF: u32 = 1 << 0;
const ADC_JEOC: u32 = 1 << 2;
const USART_TXE: u32 = 1 << 7;
const USART_TXEIE: u32 = 1 << 7;
/// EXTI lines 0..=4: buttons, adapter detect, factory jumper
const EXTI_LINES: u32 = 0x1F;

fn read(addr: u32) -> u32 {
    unsafe { read_volatile(addr as *const u32) }
}

fn write(addr: u32, value: u32) {
    unsafe { write_volatile(addr as *mut u32, value) }
}

/// Unmask the TXE interrupt; the handler masks it again once the queue is empty
pub(crate) fn start_transmit() {
    critical_section::with(|_| write(USART1_CTLR1, read(USART1_CTLR1) | USART_TXEIE));
}

#[no_mangle]
extern "C" fn SysTick_Handler() {
    write(STK_SR, 0);
    interrupts::systick();
}

#[no_mangle]
extern "C" fn RTC_IRQHandler() {
    write(RTC_CTLRL, read(RTC_CTLRL) & !RTC_SECF);
    interrupts::rtc_second();
}

fn exti() {
    let pending = read(EXTI_INTFR) & EXTI_LINES;
    write(EXTI_INTFR, pending);
    interrupts::exti(read(GPIOA_INDR) as u16, pending as u16);
}

#[no_mangle]
extern "C" fn EXTI0_IRQHandler() {
    exti();
}

#[no_mangle]
extern "C" fn EXTI1_IRQHandler() {
    exti();
}

#[no_mangle]
extern "C" fn EXTI2_IRQHandler() {
    exti();
}

#[no_mangle]
extern "C" fn EXTI3_IRQHandler() {
    exti();
}

#[no_mangle]
extern "C" fn EXTI4_IRQHandler() {
    exti();
}

#[no_mangle]
extern "C" fn ADC1_2_IRQHandler() {
    write(ADC1_STATR, read(ADC1_STATR) & !ADC_JEOC);
    let raw = [0, 4, 8].map(|offset| read(ADC1_IDATAR1 + offset) as u16);
    interrupts::adc_scan(raw);
}

#[no_mangle]
extern "C" fn USART1_IRQHandler() {
    if read(USART1_STATR) & USART_TXE == 0 {
        return;
    }
    match interrupts::usart1_tx() {
        Some(byte) => write(USART1_DATAR, u32::from(byte)),
        None => write(USART1_CTLR1, read(USART1_CTLR1) & !USART_TXEIE),
    }
}
