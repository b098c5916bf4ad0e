// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Collaborator traits consumed by the AT engine.
//!
//! [`Stream`] is the byte pipe to the ESP8266 and [`Clock`] the millisecond time base used for all
//! timeouts. Firmware implements both on top of the MCU peripherals in `hw`; tests use scripted
//! doubles.

use crate::hw::queue::RxErrors;

/// Byte stream to the WiFi co-processor.
pub trait Stream {
    /// Number of received bytes waiting to be read.
    fn available(&mut self) -> usize;

    /// Non-blocking read of one byte.
    fn read(&mut self) -> Option<u8>;

    /// Look at the next byte without consuming it.
    fn peek(&mut self) -> Option<u8>;

    /// Queue bytes for transmission. Returns how many were accepted.
    fn write(&mut self, bytes: &[u8]) -> usize;

    /// Receive error flags latched since the last call.
    fn take_errors(&mut self) -> RxErrors {
        RxErrors::empty()
    }
}

/// Monotonic millisecond time base. Values wrap at `u32::MAX`.
pub trait Clock {
    fn millis(&self) -> u32;

    /// Milliseconds elapsed since `start`, wrap-safe.
    #[inline]
    fn elapsed(&self, start: u32) -> u32 {
        self.millis().wrapping_sub(start)
    }

    /// Busy-wait for `ms` milliseconds.
    fn delay_ms(&self, ms: u32) {
        let start = self.millis();
        while self.elapsed(start) < ms {}
    }
}
