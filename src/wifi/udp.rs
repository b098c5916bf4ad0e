// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! UDP listener and sender.
//!
//! `begin` opens a UDP link to host `0` with a fixed local port; the firmware then delivers every
//! datagram for that port as `+IPD` on the link. Outbound datagrams name their destination in
//! `AT+CIPSEND`, so one link serves any number of peers.

use core::fmt::Write as _;
use core::net::Ipv4Addr;

use heapless::String;
use log::{debug, error};

use super::WiFi;
use crate::drivers::esp8266::ProtMode;
use crate::protocol::{Clock, Error, Stream};

/// Longest destination host name kept for outbound datagrams.
pub const MAX_HOST_LEN: usize = 64;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Udp {
    sock: Option<u8>,
    port: u16,
    remote_host: String<MAX_HOST_LEN>,
    remote_port: u16,
}

impl Udp {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn sock(&self) -> Option<u8> {
        self.sock
    }

    /// Local port passed to the last successful [`Udp::begin`].
    #[inline]
    pub fn local_port(&self) -> u16 {
        self.port
    }

    /// Listen on local `port`.
    pub fn begin<S: Stream, C: Clock>(
        &mut self,
        wifi: &mut WiFi<S, C>,
        port: u16,
    ) -> Result<(), Error> {
        let Some(sock) = wifi.sockets.free_socket() else {
            error!("No socket available");
            return Err(Error::NoSocket);
        };

        wifi.drv.start_client("0", port, sock, ProtMode::Udp)?;
        wifi.sockets.allocate(sock)?;
        wifi.sockets.set_port(sock, port)?;
        self.sock = Some(sock);
        self.port = port;
        debug!("UDP link {} on port {}", sock, port);
        Ok(())
    }

    /// Bytes left in the current datagram.
    pub fn available<S: Stream, C: Clock>(&mut self, wifi: &mut WiFi<S, C>) -> u16 {
        match self.sock {
            Some(sock) => wifi.drv.avail_data(Some(sock)),
            None => 0,
        }
    }

    /// Start processing the next datagram. Returns its size, 0 if none arrived.
    pub fn parse_packet<S: Stream, C: Clock>(&mut self, wifi: &mut WiFi<S, C>) -> u16 {
        self.available(wifi)
    }

    /// Set the destination of the following [`Udp::write`] calls.
    ///
    /// Takes a free slot if the handle has none yet.
    pub fn begin_packet<S: Stream, C: Clock>(
        &mut self,
        wifi: &mut WiFi<S, C>,
        host: &str,
        port: u16,
    ) -> Result<(), Error> {
        let host = String::try_from(host).map_err(|_| Error::CommandTooLong)?;
        let sock = match self.sock {
            Some(sock) => sock,
            None => wifi.sockets.free_socket().ok_or(Error::NoSocket)?,
        };

        wifi.sockets.allocate(sock)?;
        self.sock = Some(sock);
        self.remote_host = host;
        self.remote_port = port;
        Ok(())
    }

    /// [`Udp::begin_packet`] for an address.
    pub fn begin_packet_ip<S: Stream, C: Clock>(
        &mut self,
        wifi: &mut WiFi<S, C>,
        ip: Ipv4Addr,
        port: u16,
    ) -> Result<(), Error> {
        let mut host: String<15> = String::new();
        write!(host, "{}", ip)?;
        self.begin_packet(wifi, &host, port)
    }

    /// Datagrams go out on every write, so there is nothing left to send.
    pub fn end_packet(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Send `buf` to the destination set by [`Udp::begin_packet`].
    pub fn write<S: Stream, C: Clock>(
        &mut self,
        wifi: &mut WiFi<S, C>,
        buf: &[u8],
    ) -> Result<usize, Error> {
        let sock = self.sock.ok_or(Error::InvalidSocket)?;
        wifi.drv.send_data_udp(sock, &self.remote_host, self.remote_port, buf)?;
        Ok(buf.len())
    }

    pub fn read<S: Stream, C: Clock>(&mut self, wifi: &mut WiFi<S, C>) -> Option<u8> {
        self.get(wifi, false)
    }

    pub fn peek<S: Stream, C: Clock>(&mut self, wifi: &mut WiFi<S, C>) -> Option<u8> {
        self.get(wifi, true)
    }

    fn get<S: Stream, C: Clock>(&mut self, wifi: &mut WiFi<S, C>, peek: bool) -> Option<u8> {
        if self.available(wifi) == 0 {
            return None;
        }
        let sock = self.sock?;
        wifi.drv.get_data(sock, peek).ok().map(|rx| rx.byte)
    }

    /// Read into `buf` from the current datagram.
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

    /// Discard the rest of the current datagram.
    pub fn flush<S: Stream, C: Clock>(&mut self, wifi: &mut WiFi<S, C>) {
        for _ in 0..self.available(wifi) {
            if self.read(wifi).is_none() {
                break;
            }
        }
    }

    /// Close the link and return its slot.
    pub fn stop<S: Stream, C: Clock>(&mut self, wifi: &mut WiFi<S, C>) {
        let Some(sock) = self.sock else {
            return;
        };

        self.flush(wifi);
        if let Err(e) = wifi.drv.stop_client(sock) {
            debug!("AT+CIPCLOSE={} -> {:?}", sock, e);
        }
        wifi.sockets.release(sock);
        self.sock = None;
    }

    /// Source address of the last datagram.
    pub fn remote_ip<S: Stream, C: Clock>(&self, wifi: &WiFi<S, C>) -> Option<Ipv4Addr> {
        wifi.drv.remote_ip()
    }

    /// Source port of the last datagram.
    pub fn remote_port<S: Stream, C: Clock>(&self, wifi: &WiFi<S, C>) -> u16 {
        wifi.drv.remote_port()
    }
}
