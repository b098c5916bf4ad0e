// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! TCP server on the firmware's single listening link.

use heapless::Vec;
use log::{error, info};

use super::{Client, WiFi, MAX_SOCK_NUM, SERVER_SOCKET};
use crate::drivers::esp8266::TcpState;
use crate::protocol::{Clock, Error, Stream};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Server {
    port: u16,
    started: bool,
}

impl Server {
    pub const fn new(port: u16) -> Self {
        Self {
            port,
            started: false,
        }
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Reserve the server slot and start listening.
    pub fn begin<S: Stream, C: Clock>(&mut self, wifi: &mut WiFi<S, C>) -> Result<(), Error> {
        wifi.sockets.allocate(SERVER_SOCKET)?;

        let result = wifi.drv.start_server(self.port);
        self.started = result.is_ok();
        if self.started {
            info!("Server started on port {}", self.port);
        } else {
            error!("Server failed to start");
        }
        result
    }

    /// Hand out a client for the link that has data pending, if any.
    pub fn accept<S: Stream, C: Clock>(&mut self, wifi: &mut WiFi<S, C>) -> Option<Client> {
        if wifi.drv.avail_data(None) == 0 {
            return None;
        }

        let id = wifi.drv.packet().conn_id;
        info!("New client {}", id);
        wifi.sockets.allocate(id).ok()?;
        Some(Client::bound(id))
    }

    /// Send `buf` to every connected client. Returns the total number of bytes written.
    ///
    /// The listening slot itself is skipped.
    pub fn write<S: Stream, C: Clock>(&mut self, wifi: &mut WiFi<S, C>, buf: &[u8]) -> usize {
        let socks: Vec<u8, MAX_SOCK_NUM> = wifi
            .sockets
            .allocated()
            .filter(|&s| s != SERVER_SOCKET)
            .collect();

        socks
            .iter()
            .map(|&sock| Client::bound(sock).write(wifi, buf).unwrap_or(0))
            .sum()
    }

    /// The firmware exposes no listener state.
    pub fn status(&self) -> TcpState {
        TcpState::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wifi::tests::wifi;

    #[test]
    fn begin_binds_server_slot() {
        let (mut wifi, stream, _) = wifi();
        stream.reply(b"\r\nOK\r\n");

        let mut server = Server::new(23);
        server.begin(&mut wifi).unwrap();
        assert!(server.is_started());
        assert!(wifi.sockets().is_allocated(SERVER_SOCKET));
        assert_eq!(stream.written_str(), "AT+CIPSERVER=1,23\r\n");
    }

    #[test]
    fn failed_begin_is_reported() {
        let (mut wifi, stream, _) = wifi();
        stream.reply(b"no change\r\n\r\nERROR\r\n");

        let mut server = Server::new(23);
        assert!(server.begin(&mut wifi).is_err());
        assert!(!server.is_started());
    }

    #[test]
    fn accept_binds_reported_link() {
        let (mut wifi, stream, _) = wifi();
        let mut server = Server::new(23);
        assert_eq!(server.accept(&mut wifi), None);

        stream.inject(b"0,CONNECT\r\n\r\n+IPD,0,4,\"10.0.0.7\",50000:ping");
        let client = server.accept(&mut wifi).unwrap();
        assert_eq!(client.sock(), Some(0));
        assert!(wifi.sockets().is_allocated(0));
    }

    #[test]
    fn write_broadcasts_to_clients() {
        let (mut wifi, stream, _) = wifi();
        wifi.sockets_mut().allocate(SERVER_SOCKET).unwrap();
        wifi.sockets_mut().allocate(0).unwrap();
        wifi.sockets_mut().allocate(2).unwrap();
        for _ in 0..2 {
            stream.reply(b"> ");
            stream.reply(b"\r\nSEND OK\r\n");
        }

        let mut server = Server::new(23);
        assert_eq!(server.write(&mut wifi, b"tick"), 8);
        assert_eq!(
            stream.written_str(),
            "AT+CIPSEND=0,4\r\ntickAT+CIPSEND=2,4\r\ntick"
        );
    }
}
