// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Links, inbound packet draining and payload transmission.
//!
//! Inbound data is only noticed while polling: [`EspDrv::avail_data`] consumes a `+IPD` header
//! when bytes are waiting, and [`EspDrv::get_data`] hands out the payload one byte at a time. The
//! firmware reports a remote close by appending `<id>,CLOSED` right after the last payload byte.

use core::fmt;
use core::net::Ipv4Addr;

use log::{debug, error, warn};

use super::ipd::IpdPacket;
use super::types::ProtMode;
use super::EspDrv;
use crate::protocol::engine::format_command;
use crate::protocol::messages::{CLOSED_TRAILER, CRLF, IPD_PREAMBLE, SEND_PROMPT};
use crate::protocol::{Clock, Error, ScanResult, Stream, Tag};

/// One payload byte and whether the link closed right after it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Received {
    pub byte: u8,
    pub closed: bool,
}

impl<S: Stream, C: Clock> EspDrv<S, C> {
    /// Start the TCP server. The firmware supports a single listening socket.
    pub fn start_server(&mut self, port: u16) -> Result<(), Error> {
        debug!("> start_server {}", port);

        let timeout = self.at.timeouts().command;
        self.at.command_ok(format_args!("AT+CIPSERVER=1,{}", port), timeout)
    }

    /// Open link `sock` to `host:port`.
    ///
    /// UDP links use a dummy remote port and mode 2 so the destination can be chosen per packet
    /// in `AT+CIPSEND`.
    pub fn start_client(
        &mut self,
        host: impl fmt::Display,
        port: u16,
        sock: u8,
        mode: ProtMode,
    ) -> Result<(), Error> {
        debug!("> start_client {}:{}", host, port);

        let timeout = self.at.timeouts().connect;
        match mode {
            ProtMode::Tcp => self.at.command_ok(
                format_args!("AT+CIPSTART={},\"TCP\",\"{}\",{}", sock, host, port),
                timeout,
            ),
            ProtMode::Ssl => {
                // Not supported before firmware 1.4, so only sent when needed
                self.fire("AT+CIPSSLSIZE=4096");
                self.at.command_ok(
                    format_args!("AT+CIPSTART={},\"SSL\",\"{}\",{}", sock, host, port),
                    timeout,
                )
            }
            ProtMode::Udp => self.at.command_ok(
                format_args!("AT+CIPSTART={},\"UDP\",\"{}\",0,{},2", sock, host, port),
                timeout,
            ),
        }
    }

    /// Close link `sock`.
    pub fn stop_client(&mut self, sock: u8) -> Result<(), Error> {
        debug!("> stop_client {}", sock);

        let timeout = self.at.timeouts().close;
        self.at.command_ok(format_args!("AT+CIPCLOSE={}", sock), timeout)
    }

    /// Payload bytes pending for `link`, or for any link when `link` is `None`.
    ///
    /// A new `+IPD` header is only parsed once the previous packet is fully drained, so a packet
    /// for another link blocks this one until its owner reads it.
    pub fn avail_data(&mut self, link: Option<u8>) -> u16 {
        self.drop_stale_packet();
        if !self.packet.is_drained() {
            return if self.packet.matches(link) {
                self.packet.remaining
            } else {
                0
            };
        }

        if self.at.stream_mut().available() == 0 {
            return 0;
        }

        let timeout = self.at.timeouts().field;
        if !self.at.find(IPD_PREAMBLE, timeout) {
            return 0;
        }

        match IpdPacket::parse(&mut self.at) {
            Some(packet) => {
                debug!("Data packet {} {}", packet.conn_id, packet.remaining);
                self.packet = packet;
            }
            None => {
                warn!("Malformed +IPD header");
                self.packet = IpdPacket::default();
                return 0;
            }
        }

        if self.packet.matches(link) {
            self.packet.remaining
        } else {
            0
        }
    }

    /// Header of the packet being drained.
    #[inline]
    pub fn packet(&self) -> &IpdPacket {
        &self.packet
    }

    /// Read or peek the next payload byte of `link`.
    ///
    /// On timeout the pending packet is dropped.
    pub fn get_data(&mut self, link: u8, peek: bool) -> Result<Received, Error> {
        self.drop_stale_packet();
        if link != self.packet.conn_id || self.packet.is_drained() {
            return Err(Error::InvalidSocket);
        }

        let timeout = self.at.timeouts().data;
        let byte = if peek {
            self.at.timed_peek(timeout)
        } else {
            self.at.timed_read(timeout)
        };
        let Some(byte) = byte else {
            error!("TIMEOUT: {}", self.packet.remaining);
            self.packet = IpdPacket::default();
            return Err(Error::Timeout);
        };

        // A peek at the last byte leaves close detection to the read that consumes it
        let mut closed = false;
        if !peek {
            self.packet.remaining -= 1;
            if self.packet.is_drained() {
                closed = self.check_closed(link);
            }
        }
        Ok(Received { byte, closed })
    }

    /// Forget the pending packet if a command drained input while it was undrained. Its
    /// payload is gone, so the remaining count no longer describes the stream.
    fn drop_stale_packet(&mut self) {
        let discarded = self.at.take_discarded();
        if discarded > 0 && !self.packet.is_drained() {
            warn!(
                "Packet on link {} lost {} unread bytes",
                self.packet.conn_id, self.packet.remaining
            );
            self.packet = IpdPacket::default();
        }
    }

    /// Look for the close trailer that may follow the last byte of a packet.
    fn check_closed(&mut self, link: u8) -> bool {
        self.delay_ms(5);

        let next = self.at.stream_mut().peek();
        if next != Some(b'0'.wrapping_add(link)) && next != Some(b',') {
            return false;
        }

        let timeout = self.at.timeouts().closed;
        if !self.at.find(CLOSED_TRAILER, timeout) {
            error!("Tag CLOSED not found");
        }
        debug!("Connection closed");
        true
    }

    /// Read up to `buf.len()` payload bytes of `link`. Returns the number of bytes read.
    pub fn get_data_buf(&mut self, link: u8, buf: &mut [u8]) -> Result<usize, Error> {
        self.drop_stale_packet();
        if link != self.packet.conn_id {
            return Err(Error::InvalidSocket);
        }

        let n = buf.len().min(self.packet.remaining as usize);
        let timeout = self.at.timeouts().data;
        for slot in buf[..n].iter_mut() {
            let Some(byte) = self.at.timed_read(timeout) else {
                error!("TIMEOUT: {}", self.packet.remaining);
                self.packet = IpdPacket::default();
                return Err(Error::Timeout);
            };
            *slot = byte;
            self.packet.remaining -= 1;
        }
        Ok(n)
    }

    /// Send `data` on link `sock`.
    pub fn send_data(&mut self, sock: u8, data: &[u8]) -> Result<(), Error> {
        debug!("> send_data {} {}", sock, data.len());

        self.begin_send(format_args!("AT+CIPSEND={},{}", sock, data.len()))?;
        self.at.write(data)?;
        self.end_send()
    }

    /// Send `text` on link `sock`, optionally followed by CRLF.
    pub fn send_text(&mut self, sock: u8, text: &str, append_crlf: bool) -> Result<(), Error> {
        let len = text.len() + if append_crlf { CRLF.len() } else { 0 };
        debug!("> send_text {} {}", sock, len);

        self.begin_send(format_args!("AT+CIPSEND={},{}", sock, len))?;
        self.at.write(text.as_bytes())?;
        if append_crlf {
            self.at.write(CRLF.as_bytes())?;
        }
        self.end_send()
    }

    /// Send a datagram on UDP link `sock` to `host:port`.
    pub fn send_data_udp(
        &mut self,
        sock: u8,
        host: &str,
        port: u16,
        data: &[u8],
    ) -> Result<(), Error> {
        debug!("> send_data_udp {} {} {}:{}", sock, data.len(), host, port);

        self.begin_send(format_args!(
            "AT+CIPSEND={},{},\"{}\",{}",
            sock,
            data.len(),
            host,
            port
        ))?;
        self.at.write(data)?;
        self.end_send()
    }

    /// Issue a `CIPSEND` and wait for the payload prompt.
    ///
    /// The receive side is not drained first: it may hold `+IPD` data the caller has not read.
    fn begin_send(&mut self, cmd: fmt::Arguments<'_>) -> Result<(), Error> {
        let line = format_command(cmd)?;
        self.at.write_line(&line)?;

        let timeout = self.at.timeouts().prompt;
        if !self.at.find(SEND_PROMPT, timeout) {
            error!("Data packet send error (1)");
            return Err(Error::Prompt);
        }
        Ok(())
    }

    fn end_send(&mut self) -> Result<(), Error> {
        let timeout = self.at.timeouts().send;
        match self.at.read_until(timeout, None, true) {
            ScanResult::Matched(Tag::SendOk) => Ok(()),
            ScanResult::Matched(tag) => {
                error!("Data packet send error (2): {:?}", tag);
                Err(Error::Rejected(tag))
            }
            _ => {
                error!("Data packet send error (2)");
                Err(Error::Timeout)
            }
        }
    }

    /// Source address of the last inbound packet.
    #[inline]
    pub fn remote_ip(&self) -> Option<Ipv4Addr> {
        self.packet.remote_ip
    }

    /// Source port of the last inbound packet.
    #[inline]
    pub fn remote_port(&self) -> u16 {
        self.packet.remote_port
    }
}
