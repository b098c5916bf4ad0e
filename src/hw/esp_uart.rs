// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Interrupt-driven USART2 link to the ESP8266.
//!
//! The `USART2` handler moves bytes between the data registers and two static [`ByteQueue`]s.
//! Foreground code only touches the queues inside critical sections, so [`EspUart`] never blocks:
//! reads return `None` on an empty queue and writes stop at the first byte that does not fit.
//!
//! Receive errors reported in `USART_ISR` are latched into the RX queue and surface through
//! [`Stream::take_errors`]. A full RX queue drops the byte and latches `OVERRUN`.

use core::cell::RefCell;

use cortex_m::interrupt::{self, Mutex};
use cortex_m::peripheral::NVIC;
use log::debug;
use stm32f7xx_hal::{
    pac::{self, interrupt},
    serial::Serial,
};

use super::queue::{ByteQueue, RxErrors};
use crate::protocol::Stream;

pub const RX_QUEUE_SIZE: usize = 256;
pub const TX_QUEUE_SIZE: usize = 256;

static RX: Mutex<RefCell<ByteQueue<RX_QUEUE_SIZE>>> = Mutex::new(RefCell::new(ByteQueue::new()));
static TX: Mutex<RefCell<ByteQueue<TX_QUEUE_SIZE>>> = Mutex::new(RefCell::new(ByteQueue::new()));

#[inline]
fn regs() -> &'static pac::usart1::RegisterBlock {
    // SAFETY: USART2 is owned by `EspUart`. Read-modify-write of CR1 happens inside critical
    // sections only.
    unsafe { &*pac::USART2::ptr() }
}

/// Owner of the configured USART2 peripheral. Holding it keeps the pins and clock claimed.
pub struct EspUart<PINS> {
    _serial: Serial<pac::USART2, PINS>,
}

impl<PINS> EspUart<PINS> {
    /// Enable the receive interrupt and unmask `USART2` in the NVIC.
    pub fn new(serial: Serial<pac::USART2, PINS>) -> Self {
        interrupt::free(|cs| {
            RX.borrow(cs).borrow_mut().clear();
            TX.borrow(cs).borrow_mut().clear();
            regs().cr1.modify(|_, w| w.rxneie().set_bit());
        });

        // SAFETY: the handler below only uses the queues through `interrupt::free`.
        unsafe { NVIC::unmask(pac::Interrupt::USART2) };
        debug!("ESP UART ready");

        Self { _serial: serial }
    }
}

impl<PINS> Stream for EspUart<PINS> {
    fn available(&mut self) -> usize {
        interrupt::free(|cs| RX.borrow(cs).borrow().len())
    }

    fn read(&mut self) -> Option<u8> {
        interrupt::free(|cs| RX.borrow(cs).borrow_mut().pop())
    }

    fn peek(&mut self) -> Option<u8> {
        interrupt::free(|cs| RX.borrow(cs).borrow().peek())
    }

    fn write(&mut self, bytes: &[u8]) -> usize {
        interrupt::free(|cs| {
            let mut tx = TX.borrow(cs).borrow_mut();
            let accepted = bytes.iter().take_while(|&&b| !tx.is_full() && tx.push(b)).count();
            if !tx.is_empty() {
                regs().cr1.modify(|_, w| w.txeie().set_bit());
            }
            accepted
        })
    }

    fn take_errors(&mut self) -> RxErrors {
        interrupt::free(|cs| RX.borrow(cs).borrow_mut().take_errors())
    }
}

#[interrupt]
fn USART2() {
    let usart = regs();
    let isr = usart.isr.read();

    interrupt::free(|cs| {
        let mut errors = RxErrors::empty();
        errors.set(RxErrors::PARITY, isr.pe().bit_is_set());
        errors.set(RxErrors::FRAMING, isr.fe().bit_is_set());
        errors.set(RxErrors::NOISE, isr.nf().bit_is_set());
        errors.set(RxErrors::OVERRUN, isr.ore().bit_is_set());

        let mut rx = RX.borrow(cs).borrow_mut();
        if !errors.is_empty() {
            rx.flag(errors);
            usart
                .icr
                .write(|w| w.pecf().set_bit().fecf().set_bit().ncf().set_bit().orecf().set_bit());
        }
        if isr.rxne().bit_is_set() {
            // Reading RDR clears RXNE
            rx.push(usart.rdr.read().rdr().bits() as u8);
        }

        if isr.txe().bit_is_set() && usart.cr1.read().txeie().bit_is_set() {
            match TX.borrow(cs).borrow_mut().pop() {
                Some(b) => usart.tdr.write(|w| unsafe { w.tdr().bits(u16::from(b)) }),
                None => usart.cr1.modify(|_, w| w.txeie().clear_bit()),
            }
        }
    });
}
