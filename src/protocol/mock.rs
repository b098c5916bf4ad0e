// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Host-side doubles for [`Stream`] and [`Clock`].
//!
//! `MockStream` releases one scripted reply into its receive buffer each time something is written,
//! which mirrors how the ESP8266 only answers after a command goes out. Unsolicited traffic such as
//! `+IPD` packets is injected directly. `MockClock` advances one millisecond per reading, so every
//! busy-wait terminates.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use crate::hw::queue::RxErrors;
use crate::protocol::stream::{Clock, Stream};

#[derive(Default)]
struct Inner {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    replies: VecDeque<Vec<u8>>,
    errors: RxErrors,
}

#[derive(Clone, Default)]
pub struct MockStream {
    inner: Rc<RefCell<Inner>>,
}

impl MockStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make bytes available to the reader immediately.
    pub fn inject(&self, bytes: &[u8]) {
        self.inner.borrow_mut().rx.extend(bytes.iter().copied());
    }

    /// Queue a reply released by the next write.
    pub fn reply(&self, bytes: &[u8]) {
        self.inner.borrow_mut().replies.push_back(bytes.to_vec());
    }

    /// Latch receive errors for the next `take_errors`.
    pub fn flag(&self, errors: RxErrors) {
        self.inner.borrow_mut().errors |= errors;
    }

    /// Everything written so far.
    pub fn written(&self) -> Vec<u8> {
        self.inner.borrow().tx.clone()
    }

    /// Everything written so far, as text.
    pub fn written_str(&self) -> std::string::String {
        std::string::String::from_utf8_lossy(&self.inner.borrow().tx).into_owned()
    }

    /// Drop everything still unread.
    pub fn clear(&self) {
        self.inner.borrow_mut().rx.clear();
    }

    pub fn clear_written(&self) {
        self.inner.borrow_mut().tx.clear();
    }

    /// Bytes still unread.
    pub fn pending(&self) -> usize {
        self.inner.borrow().rx.len()
    }
}

impl Stream for MockStream {
    fn available(&mut self) -> usize {
        self.inner.borrow().rx.len()
    }

    fn read(&mut self) -> Option<u8> {
        self.inner.borrow_mut().rx.pop_front()
    }

    fn peek(&mut self) -> Option<u8> {
        self.inner.borrow().rx.front().copied()
    }

    fn write(&mut self, bytes: &[u8]) -> usize {
        let mut inner = self.inner.borrow_mut();
        inner.tx.extend_from_slice(bytes);
        if let Some(reply) = inner.replies.pop_front() {
            inner.rx.extend(reply);
        }
        bytes.len()
    }

    fn take_errors(&mut self) -> RxErrors {
        core::mem::take(&mut self.inner.borrow_mut().errors)
    }
}

#[derive(Clone, Default)]
pub struct MockClock {
    now: Rc<Cell<u32>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time without advancing.
    pub fn now(&self) -> u32 {
        self.now.get()
    }
}

impl Clock for MockClock {
    fn millis(&self) -> u32 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(1));
        now
    }

    fn delay_ms(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}
