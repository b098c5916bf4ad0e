// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Fixed-capacity byte queue shared between a UART interrupt and the foreground loop.
//!
//! The interrupt handler is the only producer on the RX side and the only consumer on the TX side,
//! so no further locking is needed beyond the critical section that guards the queue itself.
//! Receive errors never block the producer: they are latched into [`RxErrors`] and read out of
//! band with [`ByteQueue::take_errors`].

use bitflags::bitflags;
use heapless::Deque;

bitflags! {
    /// Receive error flags, laid out like the low nibble of the STM32 `USART_ISR` register.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct RxErrors: u8 {
        /// Parity error.
        const PARITY  = 1 << 0;
        /// Framing error (missing stop bit).
        const FRAMING = 1 << 1;
        /// Noise detected on the line.
        const NOISE   = 1 << 2;
        /// Hardware overrun, or a byte dropped because the queue was full.
        const OVERRUN = 1 << 3;
    }
}

pub struct ByteQueue<const N: usize> {
    buf: Deque<u8, N>,
    errors: RxErrors,
}

impl<const N: usize> ByteQueue<N> {
    pub const fn new() -> Self {
        Self {
            buf: Deque::new(),
            errors: RxErrors::empty(),
        }
    }

    /// Append a byte. A full queue drops the byte and latches `OVERRUN`.
    pub fn push(&mut self, byte: u8) -> bool {
        match self.buf.push_back(byte) {
            Ok(()) => true,
            Err(_) => {
                self.errors |= RxErrors::OVERRUN;
                false
            }
        }
    }

    #[inline]
    pub fn pop(&mut self) -> Option<u8> {
        self.buf.pop_front()
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.buf.front().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.buf.is_full()
    }

    /// Drop all queued bytes and clear latched errors.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.errors = RxErrors::empty();
    }

    /// Latch hardware error flags observed alongside a received byte.
    #[inline]
    pub fn flag(&mut self, errors: RxErrors) {
        self.errors |= errors;
    }

    #[inline]
    pub fn errors(&self) -> RxErrors {
        self.errors
    }

    /// Return the latched error flags and clear them.
    pub fn take_errors(&mut self) -> RxErrors {
        core::mem::take(&mut self.errors)
    }
}

impl<const N: usize> Default for ByteQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}
