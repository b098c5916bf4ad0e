// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Sliding window over the most recent bytes of the response stream.
//!
//! The scanner only ever asks "does the stream end with this tag?", so the window keeps the last
//! `N` bytes and silently evicts the oldest one when full.

use heapless::{Deque, String, Vec};

use crate::protocol::Error;

/// Default window length. Long enough for every tag and for the short fields extracted between
/// tags (SSIDs, addresses, version strings).
pub const TAG_WINDOW_LEN: usize = 32;

pub struct TagWindow<const N: usize = TAG_WINDOW_LEN> {
    buf: Deque<u8, N>,
}

impl<const N: usize> TagWindow<N> {
    pub const fn new() -> Self {
        Self { buf: Deque::new() }
    }

    #[inline]
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Append a byte, evicting the oldest one if the window is full.
    pub fn push(&mut self, byte: u8) {
        if self.buf.is_full() {
            self.buf.pop_front();
        }
        let _ = self.buf.push_back(byte);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// True if the most recent bytes are exactly `tag`.
    pub fn ends_with(&self, tag: &[u8]) -> bool {
        if tag.is_empty() || tag.len() > self.buf.len() {
            return false;
        }
        let start = self.buf.len() - tag.len();
        self.buf.iter().skip(start).zip(tag).all(|(a, b)| a == b)
    }

    /// Copy the window contents, oldest first, without the trailing `skip` bytes.
    ///
    /// The result is truncated to `M` bytes.
    pub fn extract<const M: usize>(&self, skip: usize) -> Result<String<M>, Error> {
        let len = self.buf.len().saturating_sub(skip).min(M);
        let mut bytes: Vec<u8, M> = Vec::new();
        for &b in self.buf.iter().take(len) {
            // Cannot fail: len <= M
            let _ = bytes.push(b);
        }
        String::from_utf8(bytes).map_err(|_| Error::Parse)
    }
}

impl<const N: usize> Default for TagWindow<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill<const N: usize>(w: &mut TagWindow<N>, bytes: &[u8]) {
        for &b in bytes {
            w.push(b);
        }
    }

    #[test]
    fn ends_with_matches_suffix_only() {
        let mut w: TagWindow = TagWindow::new();
        fill(&mut w, b"AT\r\r\nOK\r\n");
        assert!(w.ends_with(b"\r\nOK\r\n"));
        assert!(!w.ends_with(b"\r\nERROR\r\n"));
        assert!(!w.ends_with(b""));
    }

    #[test]
    fn oldest_bytes_are_evicted() {
        let mut w: TagWindow<4> = TagWindow::new();
        fill(&mut w, b"abcdef");
        assert_eq!(w.len(), 4);
        assert!(w.ends_with(b"cdef"));
        assert!(!w.ends_with(b"bcdef"));
    }

    #[test]
    fn extract_skips_trailing_tag() {
        let mut w: TagWindow = TagWindow::new();
        fill(&mut w, b"192.168.4.1\"");
        let s: String<19> = w.extract(1).unwrap();
        assert_eq!(s.as_str(), "192.168.4.1");
    }

    #[test]
    fn extract_truncates_to_capacity() {
        let mut w: TagWindow = TagWindow::new();
        fill(&mut w, b"2.0.0(656edbf)\r\n");
        let s: String<5> = w.extract(2).unwrap();
        assert_eq!(s.as_str(), "2.0.0");
    }

    #[test]
    fn reset_empties_window() {
        let mut w: TagWindow = TagWindow::new();
        fill(&mut w, b"OK");
        w.reset();
        assert!(w.is_empty());
        assert!(!w.ends_with(b"K"));
    }
}
