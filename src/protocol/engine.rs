// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! AT command request/response engine.
//!
//! Commands are written as CRLF-terminated lines. Completion is detected by watching the tail of
//! the response stream for one of the known [`Tag`]s, or for a caller-supplied tag, until a
//! deadline expires. There is no line parser: the firmware's replies are loosely delimited, so the
//! engine only ever asks whether the bytes seen so far end with something it recognizes.

use core::fmt::{self, Write as _};

use heapless::String;
use log::{debug, trace, warn};

use crate::config::Timeouts;
use crate::protocol::messages::{Tag, CMD_BUFFER_SIZE, CRLF};
use crate::protocol::stream::{Clock, Stream};
use crate::protocol::window::TagWindow;
use crate::protocol::Error;

/// Outcome of a [`AtEngine::read_until`] scan.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScanResult {
    /// One of the known response tags terminated the stream.
    Matched(Tag),
    /// The caller-supplied tag was seen.
    Found,
    /// Nothing matched before the deadline.
    TimedOut,
}

/// A command line plus room for its CRLF terminator.
pub type CommandLine = String<{ CMD_BUFFER_SIZE + 2 }>;

/// Format a command into a fixed buffer.
///
/// Commands longer than [`CMD_BUFFER_SIZE`] are rejected rather than truncated.
pub fn format_command(cmd: fmt::Arguments<'_>) -> Result<CommandLine, Error> {
    let mut line = CommandLine::new();
    line.write_fmt(cmd)?;
    if line.len() > CMD_BUFFER_SIZE {
        return Err(Error::CommandTooLong);
    }
    Ok(line)
}

/// AT engine bound to a byte stream and a millisecond clock.
pub struct AtEngine<S, C> {
    stream: S,
    clock: C,
    window: TagWindow,
    timeouts: Timeouts,
    discarded: usize,
}

impl<S: Stream, C: Clock> AtEngine<S, C> {
    pub fn new(stream: S, clock: C) -> Self {
        Self {
            stream,
            clock,
            window: TagWindow::new(),
            timeouts: Timeouts::new(),
            discarded: 0,
        }
    }

    /// Replace the default timeouts.
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    #[inline]
    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    #[inline]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    #[inline]
    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// The bytes seen by the last scan.
    #[inline]
    pub fn window(&self) -> &TagWindow {
        &self.window
    }

    /// Bytes thrown away by [`AtEngine::empty_buf`] since the last call. Resets the count.
    #[inline]
    pub fn take_discarded(&mut self) -> usize {
        core::mem::take(&mut self.discarded)
    }

    pub fn free(self) -> (S, C) {
        (self.stream, self.clock)
    }

    /// Send a command and wait for any known tag.
    ///
    /// Stale input is discarded before the command goes out.
    pub fn send_command(&mut self, cmd: fmt::Arguments<'_>, timeout_ms: u32) -> Result<Tag, Error> {
        let mut line = format_command(cmd)?;
        self.empty_buf(true);

        debug!(">> {}", line.as_str());
        line.push_str(CRLF).map_err(|_| Error::CommandTooLong)?;
        self.write(line.as_bytes())?;

        let result = self.read_until(timeout_ms, None, true);
        debug!("<< {:?}", result);

        match result {
            ScanResult::Matched(tag) => Ok(tag),
            // No custom tag was requested, so anything else is a timeout
            _ => Err(Error::Timeout),
        }
    }

    /// Send a command that must be answered with `OK`.
    pub fn command_ok(&mut self, cmd: fmt::Arguments<'_>, timeout_ms: u32) -> Result<(), Error> {
        match self.send_command(cmd, timeout_ms)? {
            Tag::Ok => Ok(()),
            tag => Err(Error::Rejected(tag)),
        }
    }

    /// Send a command and return the text enclosed by `start` and `end` in its reply.
    ///
    /// At most `N` bytes are returned. After a successful extraction the rest of the response is
    /// drained so the next command starts clean.
    pub fn send_command_expect<const N: usize>(
        &mut self,
        cmd: &str,
        start: &[u8],
        end: &[u8],
    ) -> Result<String<N>, Error> {
        let mut line = format_command(format_args!("{}", cmd))?;
        self.empty_buf(true);

        debug!(">> {}", cmd);
        line.push_str(CRLF).map_err(|_| Error::CommandTooLong)?;
        self.write(line.as_bytes())?;

        let start_result = self.read_until(self.timeouts.expect_start, Some(start), true);
        let out = match start_result {
            ScanResult::Found => {
                match self.read_until(self.timeouts.expect_end, Some(end), true) {
                    ScanResult::Found => {
                        let out = self.window.extract::<N>(end.len());
                        let drain = self.timeouts.drain;
                        self.read_until(drain, None, true);
                        out
                    }
                    ScanResult::Matched(tag) => {
                        warn!("End tag not found");
                        Err(Error::NotFound(tag))
                    }
                    ScanResult::TimedOut => {
                        warn!("End tag not found");
                        Err(Error::Timeout)
                    }
                }
            }
            ScanResult::Matched(tag) => {
                debug!("No start tag found: {:?}", tag);
                Err(Error::NotFound(tag))
            }
            ScanResult::TimedOut => {
                warn!("No tag found");
                Err(Error::Timeout)
            }
        };

        if let Ok(text) = &out {
            debug!("<< {}", text.as_str());
        }
        out
    }

    /// Read until `tag` (if given) or, when `match_known` is set, any known tag ends the stream.
    ///
    /// The window is reset first. A custom tag is tested before the known tags, and known tags are
    /// tested in [`Tag::ALL`] order. Returns as soon as the matching byte is consumed.
    pub fn read_until(
        &mut self,
        timeout_ms: u32,
        tag: Option<&[u8]>,
        match_known: bool,
    ) -> ScanResult {
        self.window.reset();
        let start = self.clock.millis();

        while self.clock.elapsed(start) < timeout_ms {
            let Some(byte) = self.stream.read() else {
                continue;
            };
            trace!("{}", byte as char);
            self.window.push(byte);

            if let Some(tag) = tag {
                if self.window.ends_with(tag) {
                    return ScanResult::Found;
                }
            }
            if match_known {
                if let Some(known) = Tag::ALL.iter().find(|t| self.window.ends_with(t.as_bytes())) {
                    return ScanResult::Matched(*known);
                }
            }
        }

        warn!(">>> TIMEOUT >>>");
        ScanResult::TimedOut
    }

    /// Consume the stream up to and including `tag`.
    #[inline]
    pub fn find(&mut self, tag: &[u8], timeout_ms: u32) -> bool {
        self.read_until(timeout_ms, Some(tag), false) == ScanResult::Found
    }

    /// Write raw bytes, waiting for the transmit side to accept all of them.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let start = self.clock.millis();
        let mut rest = bytes;
        while !rest.is_empty() {
            let n = self.stream.write(rest);
            rest = &rest[n..];
            if n == 0 && self.clock.elapsed(start) >= self.timeouts.send {
                return Err(Error::Timeout);
            }
        }
        Ok(())
    }

    /// Write a line followed by CRLF.
    pub fn write_line(&mut self, line: &str) -> Result<(), Error> {
        let mut buf = format_command(format_args!("{}", line))?;
        buf.push_str(CRLF).map_err(|_| Error::CommandTooLong)?;
        self.write(buf.as_bytes())
    }

    /// Discard everything waiting in the stream. Returns the number of bytes dropped.
    pub fn empty_buf(&mut self, warn: bool) -> usize {
        let mut dropped = 0;
        while self.stream.available() > 0 {
            match self.stream.read() {
                Some(byte) => {
                    if warn {
                        trace!("{}", byte as char);
                    }
                    dropped += 1;
                }
                None => break,
            }
        }
        self.discarded = self.discarded.saturating_add(dropped);
        if dropped > 0 && warn {
            warn!("Dirty characters in the serial buffer! > {}", dropped);
        }

        let errors = self.stream.take_errors();
        if !errors.is_empty() {
            warn!("UART receive errors: {:?}", errors);
        }
        dropped
    }

    /// Read one byte, waiting up to `timeout_ms` for it.
    pub fn timed_read(&mut self, timeout_ms: u32) -> Option<u8> {
        let start = self.clock.millis();
        loop {
            if let Some(byte) = self.stream.read() {
                return Some(byte);
            }
            if self.clock.elapsed(start) >= timeout_ms {
                return None;
            }
        }
    }

    /// Peek at the next byte, waiting up to `timeout_ms` for it.
    pub fn timed_peek(&mut self, timeout_ms: u32) -> Option<u8> {
        let start = self.clock.millis();
        loop {
            if let Some(byte) = self.stream.peek() {
                return Some(byte);
            }
            if self.clock.elapsed(start) >= timeout_ms {
                return None;
            }
        }
    }

    /// Parse a signed decimal integer from the stream.
    ///
    /// Leading bytes that cannot start a number are skipped. Parsing stops at the first byte that
    /// is not a digit; that byte is left in the stream. Returns `None` if no digit arrives before
    /// the field timeout or the value does not fit in an `i32`.
    pub fn parse_int(&mut self) -> Option<i32> {
        let timeout = self.timeouts.field;

        let mut next = loop {
            let byte = self.timed_peek(timeout)?;
            if byte == b'-' || byte.is_ascii_digit() {
                break byte;
            }
            self.stream.read();
        };

        let mut negative = false;
        let mut value: i64 = 0;
        let mut digits = 0;
        loop {
            match next {
                b'-' if digits == 0 && !negative => negative = true,
                b'0'..=b'9' => {
                    value = value.checked_mul(10)?.checked_add(i64::from(next - b'0'))?;
                    digits += 1;
                }
                _ => break,
            }
            self.stream.read();
            match self.timed_peek(timeout) {
                Some(byte) => next = byte,
                None => break,
            }
        }

        if digits == 0 {
            return None;
        }
        i32::try_from(if negative { -value } else { value }).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::queue::RxErrors;
    use crate::protocol::mock::{MockClock, MockStream};

    fn engine() -> (AtEngine<MockStream, MockClock>, MockStream, MockClock) {
        let stream = MockStream::new();
        let clock = MockClock::new();
        (AtEngine::new(stream.clone(), clock.clone()), stream, clock)
    }

    #[test]
    fn every_known_tag_matches_at_its_index() {
        for tag in Tag::ALL {
            let (mut at, stream, _) = engine();
            stream.inject(tag.as_bytes());
            stream.inject(b"trailing bytes");

            assert_eq!(at.read_until(1_000, None, true), ScanResult::Matched(tag));
            assert_eq!(Tag::ALL[tag.index()], tag);
            // Scanner stops on the tag's last byte
            assert_eq!(stream.pending(), b"trailing bytes".len());
        }
    }

    #[test]
    fn tags_are_tested_in_fixed_order() {
        let (mut at, stream, _) = engine();
        stream.inject(b"busy p...\r\nERROR\r\n\r\nOK\r\n");
        assert_eq!(at.read_until(1_000, None, true), ScanResult::Matched(Tag::Error));
        assert_eq!(at.read_until(1_000, None, true), ScanResult::Matched(Tag::Ok));
    }

    #[test]
    fn no_tag_times_out_after_full_wait() {
        let (mut at, stream, clock) = engine();
        stream.inject(b"garbage without a terminator");

        let start = clock.now();
        assert_eq!(at.read_until(750, None, true), ScanResult::TimedOut);
        assert!(clock.now().wrapping_sub(start) >= 750);
    }

    #[test]
    fn custom_tag_is_found_without_known_tags() {
        let (mut at, stream, _) = engine();
        stream.inject(b"\r\nOK\r\n> ");
        assert_eq!(at.read_until(1_000, Some(b">"), false), ScanResult::Found);
        assert_eq!(stream.pending(), 1);
    }

    #[test]
    fn send_command_writes_crlf_and_returns_tag() {
        let (mut at, stream, _) = engine();
        stream.reply(b"AT\r\r\n\r\nOK\r\n");

        assert_eq!(at.send_command(format_args!("AT"), 1_000), Ok(Tag::Ok));
        assert_eq!(stream.written(), b"AT\r\n");
    }

    #[test]
    fn send_command_discards_stale_input() {
        let (mut at, stream, _) = engine();
        stream.inject(b"\r\nOK\r\n");
        stream.reply(b"\r\nFAIL\r\n");

        assert_eq!(at.send_command(format_args!("AT+CWQAP"), 1_000), Ok(Tag::Fail));
    }

    #[test]
    fn send_command_times_out() {
        let (mut at, _stream, _) = engine();
        assert_eq!(at.send_command(format_args!("AT"), 100), Err(Error::Timeout));
    }

    #[test]
    fn oversized_command_is_rejected_not_truncated() {
        let (mut at, stream, _) = engine();
        let long = [b'x'; CMD_BUFFER_SIZE + 1];
        let long = core::str::from_utf8(&long).unwrap();

        assert_eq!(
            at.send_command(format_args!("AT+CWJAP_CUR=\"{}\"", long), 1_000),
            Err(Error::CommandTooLong)
        );
        assert!(stream.written().is_empty());
    }

    #[test]
    fn command_ok_rejects_other_tags() {
        let (mut at, stream, _) = engine();
        stream.reply(b"\r\nERROR\r\n");
        assert_eq!(
            at.command_ok(format_args!("AT+CIPMUX=1"), 1_000),
            Err(Error::Rejected(Tag::Error))
        );
    }

    #[test]
    fn expect_extracts_between_tags_and_drains() {
        let (mut at, stream, _) = engine();
        stream.reply(b"AT version:1.2.0.0\r\nSDK version:2.0.0(656edbf)\r\n\r\nOK\r\n");

        let version: String<5> =
            at.send_command_expect("AT+GMR", b"SDK version:", b"\r\n").unwrap();
        assert_eq!(version.as_str(), "2.0.0");
        assert_eq!(stream.pending(), 0);
    }

    #[test]
    fn expect_with_missing_end_tag_fails_without_partial_text() {
        let (mut at, stream, _) = engine();
        stream.reply(b"+CIFSR:STAIP,\"192.168.1");

        let result: Result<String<19>, Error> =
            at.send_command_expect("AT+CIFSR", b":STAIP,\"", b"\"");
        assert_eq!(result, Err(Error::Timeout));
    }

    #[test]
    fn expect_reports_not_found_when_command_completes_first() {
        let (mut at, stream, _) = engine();
        stream.reply(b"STATUS:5\r\n\r\nOK\r\n");

        let result: Result<String<9>, Error> =
            at.send_command_expect("AT+CIPSTATUS", b"+CIPSTATUS:0,", b",");
        assert_eq!(result, Err(Error::NotFound(Tag::Ok)));
    }

    #[test]
    fn expect_distinguishes_empty_from_missing() {
        let (mut at, stream, _) = engine();
        stream.reply(b"+CWJAP:\"\"\r\n\r\nOK\r\n");

        let ssid: String<31> = at.send_command_expect("AT+CWJAP?", b"+CWJAP:\"", b"\"").unwrap();
        assert!(ssid.is_empty());
    }

    #[test]
    fn parse_int_skips_separators_and_keeps_terminator() {
        let (mut at, stream, _) = engine();
        stream.inject(b",\"-67,");
        assert_eq!(at.parse_int(), Some(-67));
        assert_eq!(stream.pending(), 1);
    }

    #[test]
    fn parse_int_times_out_on_empty_stream() {
        let (mut at, _stream, _) = engine();
        assert_eq!(at.parse_int(), None);
    }

    #[test]
    fn empty_buf_counts_dropped_bytes() {
        let (mut at, stream, _) = engine();
        stream.inject(b"WIFI GOT IP\r\n");
        assert_eq!(at.empty_buf(true), 13);
        assert_eq!(stream.pending(), 0);
        assert_eq!(at.take_discarded(), 13);
        assert_eq!(at.take_discarded(), 0);
    }

    #[test]
    fn parse_int_accepts_i32_range_only() {
        let (mut at, stream, _) = engine();
        stream.inject(b"-2147483648,");
        assert_eq!(at.parse_int(), Some(i32::MIN));

        stream.inject(b"2147483647,");
        assert_eq!(at.parse_int(), Some(i32::MAX));

        stream.inject(b"2147483648,");
        assert_eq!(at.parse_int(), None);

        stream.clear();
        stream.inject(b"99999999999999999999:");
        assert_eq!(at.parse_int(), None);
    }

    #[test]
    fn empty_buf_takes_receive_errors() {
        let (mut at, stream, _) = engine();
        stream.inject(b"x");
        stream.flag(RxErrors::OVERRUN | RxErrors::FRAMING);

        assert_eq!(at.empty_buf(false), 1);
        assert!(at.stream_mut().take_errors().is_empty());
    }
}
