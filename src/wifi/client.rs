// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! TCP/SSL client handle.
//!
//! A `Client` is just a link id. Every operation takes the [`WiFi`] it belongs to, so the handle
//! can be copied around freely while the driver stays in one place.

use core::fmt;
use core::net::Ipv4Addr;

use log::{debug, error, info};

use super::WiFi;
use crate::drivers::esp8266::{ProtMode, TcpState};
use crate::protocol::{Clock, Error, Stream};

/// Pause after a failed send before the link is torn down.
const WRITE_FAIL_DELAY_MS: u32 = 4_000;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Client {
    sock: Option<u8>,
}

impl Client {
    /// An unbound client.
    pub const fn new() -> Self {
        Self { sock: None }
    }

    /// A client bound to a link the firmware already opened.
    pub(crate) const fn bound(sock: u8) -> Self {
        Self { sock: Some(sock) }
    }

    #[inline]
    pub fn sock(&self) -> Option<u8> {
        self.sock
    }

    /// True while the handle is bound to a link.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.sock.is_some()
    }

    /// Open a TCP connection on the highest free slot.
    pub fn connect<S: Stream, C: Clock>(
        &mut self,
        wifi: &mut WiFi<S, C>,
        host: impl fmt::Display,
        port: u16,
    ) -> Result<(), Error> {
        self.open(wifi, host, port, ProtMode::Tcp)
    }

    /// Open an SSL connection on the highest free slot.
    pub fn connect_ssl<S: Stream, C: Clock>(
        &mut self,
        wifi: &mut WiFi<S, C>,
        host: impl fmt::Display,
        port: u16,
    ) -> Result<(), Error> {
        self.open(wifi, host, port, ProtMode::Ssl)
    }

    fn open<S: Stream, C: Clock>(
        &mut self,
        wifi: &mut WiFi<S, C>,
        host: impl fmt::Display,
        port: u16,
        mode: ProtMode,
    ) -> Result<(), Error> {
        info!("Connecting to {}", host);

        let Some(sock) = wifi.sockets.free_socket() else {
            error!("No socket available");
            return Err(Error::NoSocket);
        };

        // The slot is only taken once the firmware accepted the link
        wifi.drv.start_client(&host, port, sock, mode)?;
        wifi.sockets.allocate(sock)?;
        self.sock = Some(sock);
        Ok(())
    }

    /// Send `buf`. A failed send closes the link.
    pub fn write<S: Stream, C: Clock>(
        &mut self,
        wifi: &mut WiFi<S, C>,
        buf: &[u8],
    ) -> Result<usize, Error> {
        let sock = self.sock.ok_or(Error::InvalidSocket)?;
        if buf.is_empty() {
            return Ok(0);
        }

        if let Err(e) = wifi.drv.send_data(sock, buf) {
            self.write_failed(wifi, sock);
            return Err(e);
        }
        Ok(buf.len())
    }

    /// Send `text`.
    pub fn print<S: Stream, C: Clock>(
        &mut self,
        wifi: &mut WiFi<S, C>,
        text: &str,
    ) -> Result<usize, Error> {
        self.send_text(wifi, text, false)
    }

    /// Send `text` followed by CRLF in one packet.
    pub fn println<S: Stream, C: Clock>(
        &mut self,
        wifi: &mut WiFi<S, C>,
        text: &str,
    ) -> Result<usize, Error> {
        self.send_text(wifi, text, true)
    }

    fn send_text<S: Stream, C: Clock>(
        &mut self,
        wifi: &mut WiFi<S, C>,
        text: &str,
        crlf: bool,
    ) -> Result<usize, Error> {
        let sock = self.sock.ok_or(Error::InvalidSocket)?;
        if text.is_empty() && !crlf {
            return Ok(0);
        }

        if let Err(e) = wifi.drv.send_text(sock, text, crlf) {
            self.write_failed(wifi, sock);
            return Err(e);
        }
        Ok(text.len() + if crlf { 2 } else { 0 })
    }

    fn write_failed<S: Stream, C: Clock>(&mut self, wifi: &mut WiFi<S, C>, sock: u8) {
        error!("Failed to write to socket {}", sock);
        wifi.delay_ms(WRITE_FAIL_DELAY_MS);
        self.stop(wifi);
    }

    /// Payload bytes waiting for this link.
    pub fn available<S: Stream, C: Clock>(&mut self, wifi: &mut WiFi<S, C>) -> u16 {
        match self.sock {
            Some(sock) => wifi.drv.avail_data(Some(sock)),
            None => 0,
        }
    }

    /// Read one byte. A remote close seen after the byte releases the slot.
    pub fn read<S: Stream, C: Clock>(&mut self, wifi: &mut WiFi<S, C>) -> Option<u8> {
        self.get(wifi, false)
    }

    /// Look at the next byte without consuming it.
    pub fn peek<S: Stream, C: Clock>(&mut self, wifi: &mut WiFi<S, C>) -> Option<u8> {
        self.get(wifi, true)
    }

    fn get<S: Stream, C: Clock>(&mut self, wifi: &mut WiFi<S, C>, peek: bool) -> Option<u8> {
        if self.available(wifi) == 0 {
            return None;
        }
        let sock = self.sock?;
        let rx = wifi.drv.get_data(sock, peek).ok()?;
        if rx.closed {
            wifi.sockets.release(sock);
            self.sock = None;
        }
        Some(rx.byte)
    }

    /// Read into `buf`. Returns the number of bytes read, 0 if nothing is pending.
    pub fn read_buf<S: Stream, C: Clock>(
        &mut self,
        wifi: &mut WiFi<S, C>,
        buf: &mut [u8],
    ) -> Result<usize, Error> {
        if self.available(wifi) == 0 {
            return Ok(0);
        }
        let sock = self.sock.ok_or(Error::InvalidSocket)?;
        wifi.drv.get_data_buf(sock, buf)
    }

    /// Discard pending input. Returns false if data was still arriving after `max_wait_ms`.
    pub fn flush<S: Stream, C: Clock>(
        &mut self,
        wifi: &mut WiFi<S, C>,
        max_wait_ms: u32,
    ) -> bool {
        let start = wifi.drv.clock().millis();
        while self.available(wifi) > 0 {
            if wifi.drv.clock().elapsed(start) > max_wait_ms {
                return false;
            }
            self.read(wifi);
        }
        true
    }

    /// Close the link and free its slot. Does nothing on an unbound client.
    pub fn stop<S: Stream, C: Clock>(&mut self, wifi: &mut WiFi<S, C>) {
        let Some(sock) = self.sock.take() else {
            return;
        };
        info!("Disconnecting {}", sock);

        if let Err(e) = wifi.drv.stop_client(sock) {
            debug!("AT+CIPCLOSE={} -> {:?}", sock, e);
        }
        wifi.sockets.release(sock);
    }

    /// Link state. A link the firmware no longer lists is released.
    pub fn status<S: Stream, C: Clock>(&mut self, wifi: &mut WiFi<S, C>) -> TcpState {
        let Some(sock) = self.sock else {
            return TcpState::Closed;
        };
        if wifi.drv.avail_data(Some(sock)) > 0 {
            return TcpState::Established;
        }
        if wifi.drv.client_state(sock) == Ok(true) {
            return TcpState::Established;
        }

        wifi.sockets.release(sock);
        self.sock = None;
        TcpState::Closed
    }

    pub fn connected<S: Stream, C: Clock>(&mut self, wifi: &mut WiFi<S, C>) -> bool {
        self.status(wifi) == TcpState::Established
    }

    /// Source address of the last inbound packet.
    pub fn remote_ip<S: Stream, C: Clock>(&self, wifi: &WiFi<S, C>) -> Option<Ipv4Addr> {
        wifi.drv.remote_ip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wifi::tests::wifi;
    use crate::wifi::MAX_SOCK_NUM;

    #[test]
    fn connect_takes_highest_slot_on_ok() {
        let (mut wifi, stream, _) = wifi();
        stream.reply(b"3,CONNECT\r\n\r\nOK\r\n");

        let mut client = Client::new();
        client.connect(&mut wifi, "10.0.0.5", 80).unwrap();
        assert_eq!(client.sock(), Some(MAX_SOCK_NUM as u8 - 1));
        assert!(wifi.sockets().is_allocated(3));
    }

    #[test]
    fn failed_connect_leaves_slot_free() {
        let (mut wifi, stream, _) = wifi();
        stream.reply(b"\r\nERROR\r\n");

        let mut client = Client::new();
        assert!(client.connect(&mut wifi, "10.0.0.5", 81).is_err());
        assert!(!client.is_valid());
        assert_eq!(wifi.sockets().free_socket(), Some(3));
    }

    #[test]
    fn full_table_reports_no_socket() {
        let (mut wifi, stream, _) = wifi();
        for i in 0..MAX_SOCK_NUM as u8 {
            wifi.sockets_mut().allocate(i).unwrap();
        }

        let mut client = Client::new();
        assert_eq!(client.connect(&mut wifi, "10.0.0.5", 80), Err(Error::NoSocket));
        assert!(stream.written().is_empty());
    }

    #[test]
    fn remote_close_releases_slot() {
        let (mut wifi, stream, _) = wifi();
        wifi.sockets_mut().allocate(0).unwrap();
        stream.inject(b"+IPD,0,5,\"10.0.0.5\",1234:HELLO0,CLOSED\r\n");

        let mut client = Client::bound(0);
        assert_eq!(client.available(&mut wifi), 5);

        let mut text = std::vec::Vec::new();
        while let Some(byte) = client.read(&mut wifi) {
            text.push(byte);
        }
        assert_eq!(text, b"HELLO");
        assert!(!client.is_valid());
        assert!(!wifi.sockets().is_allocated(0));
    }

    #[test]
    fn failed_write_stops_client() {
        let (mut wifi, stream, clock) = wifi();
        wifi.sockets_mut().allocate(2).unwrap();
        stream.reply(b"link is not valid\r\n\r\nERROR\r\n");
        stream.reply(b"\r\nERROR\r\n");

        let mut client = Client::bound(2);
        let start = clock.now();
        assert_eq!(client.write(&mut wifi, b"data"), Err(Error::Prompt));
        assert!(clock.now().wrapping_sub(start) >= WRITE_FAIL_DELAY_MS);
        assert!(!client.is_valid());
        assert!(!wifi.sockets().is_allocated(2));
        assert!(stream.written_str().ends_with("AT+CIPCLOSE=2\r\n"));
    }

    #[test]
    fn println_counts_terminator() {
        let (mut wifi, stream, _) = wifi();
        stream.reply(b"> ");
        stream.reply(b"\r\nSEND OK\r\n");

        let mut client = Client::bound(1);
        assert_eq!(client.println(&mut wifi, "hi"), Ok(4));
        assert_eq!(stream.written_str(), "AT+CIPSEND=1,4\r\nhi\r\n");
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut wifi, stream, _) = wifi();
        wifi.sockets_mut().allocate(3).unwrap();
        stream.reply(b"3,CLOSED\r\n\r\nOK\r\n");

        let mut client = Client::bound(3);
        client.stop(&mut wifi);
        client.stop(&mut wifi);
        assert_eq!(stream.written_str(), "AT+CIPCLOSE=3\r\n");
        assert_eq!(client.status(&mut wifi), TcpState::Closed);
    }

    #[test]
    fn status_asks_firmware_when_idle() {
        let (mut wifi, stream, _) = wifi();
        wifi.sockets_mut().allocate(3).unwrap();
        let mut client = Client::bound(3);

        stream.reply(b"STATUS:3\r\n+CIPSTATUS:3,\"TCP\",\"10.0.0.5\",80,4096,0\r\n\r\nOK\r\n");
        assert!(client.connected(&mut wifi));

        stream.reply(b"STATUS:4\r\n\r\nOK\r\n");
        assert_eq!(client.status(&mut wifi), TcpState::Closed);
        assert!(!wifi.sockets().is_allocated(3));
    }

    #[test]
    fn flush_discards_pending_payload() {
        let (mut wifi, stream, _) = wifi();
        stream.inject(b"+IPD,1,3:abc");

        let mut client = Client::bound(1);
        assert!(client.flush(&mut wifi, 1_000));
        assert_eq!(client.available(&mut wifi), 0);
    }
}
