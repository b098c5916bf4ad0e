// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Fixed socket table shared by clients, the server and UDP listeners.
//!
//! The ESP8266 hands out link ids for incoming connections in ascending order, so local
//! allocation scans from the top down. Slot ids and firmware link ids are the same numbers: a
//! caller always asks for the slot the firmware is expected to use.

use crate::protocol::Error;

/// Number of links the firmware multiplexes.
pub const MAX_SOCK_NUM: usize = 4;

/// Wire-level sentinel for "no socket"; [`SocketTable::free_socket`] returns `None` instead.
pub const SOCK_NOT_AVAIL: u8 = 255;

/// The only link the firmware lets a server listen on.
pub const SERVER_SOCKET: u8 = 1;

const NA_STATE: u8 = 255;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SocketTable {
    state: [u8; MAX_SOCK_NUM],
    server_port: [u16; MAX_SOCK_NUM],
}

impl SocketTable {
    pub const fn new() -> Self {
        Self {
            state: [NA_STATE; MAX_SOCK_NUM],
            server_port: [0; MAX_SOCK_NUM],
        }
    }

    /// Highest free slot, if any.
    pub fn free_socket(&self) -> Option<u8> {
        (0..MAX_SOCK_NUM)
            .rev()
            .find(|&i| self.state[i] == NA_STATE)
            .map(|i| i as u8)
    }

    /// Mark slot `sock` as used.
    pub fn allocate(&mut self, sock: u8) -> Result<(), Error> {
        let slot = self.state.get_mut(sock as usize).ok_or(Error::InvalidSocket)?;
        *slot = sock;
        Ok(())
    }

    /// Free slot `sock` and forget its port. Out-of-range ids are ignored.
    pub fn release(&mut self, sock: u8) {
        let i = sock as usize;
        if i < MAX_SOCK_NUM {
            self.state[i] = NA_STATE;
            self.server_port[i] = 0;
        }
    }

    #[inline]
    pub fn is_allocated(&self, sock: u8) -> bool {
        self.state.get(sock as usize).is_some_and(|&s| s != NA_STATE)
    }

    /// Allocated slot ids in ascending order.
    pub fn allocated(&self) -> impl Iterator<Item = u8> + '_ {
        (0..MAX_SOCK_NUM as u8).filter(|&i| self.is_allocated(i))
    }

    /// Record the local port a slot listens on.
    pub fn set_port(&mut self, sock: u8, port: u16) -> Result<(), Error> {
        let slot = self.server_port.get_mut(sock as usize).ok_or(Error::InvalidSocket)?;
        *slot = port;
        Ok(())
    }

    /// Local port bound to `sock`, 0 if none.
    pub fn port(&self, sock: u8) -> u16 {
        self.server_port.get(sock as usize).copied().unwrap_or(0)
    }
}

impl Default for SocketTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_is_descending() {
        let mut table = SocketTable::new();

        let first = table.free_socket().unwrap();
        table.allocate(first).unwrap();
        let second = table.free_socket().unwrap();

        assert_eq!(first, MAX_SOCK_NUM as u8 - 1);
        assert_eq!(second, MAX_SOCK_NUM as u8 - 2);
    }

    #[test]
    fn released_slot_is_reused_first() {
        let mut table = SocketTable::new();
        table.allocate(3).unwrap();
        table.allocate(2).unwrap();

        table.release(3);
        assert_eq!(table.free_socket(), Some(3));
    }

    #[test]
    fn full_table_has_no_free_socket() {
        let mut table = SocketTable::new();
        for i in 0..MAX_SOCK_NUM as u8 {
            table.allocate(i).unwrap();
        }
        assert_eq!(table.free_socket(), None);
        assert_eq!(table.allocated().count(), MAX_SOCK_NUM);
    }

    #[test]
    fn release_clears_port() {
        let mut table = SocketTable::new();
        table.allocate(2).unwrap();
        table.set_port(2, 8888).unwrap();
        assert_eq!(table.port(2), 8888);

        table.release(2);
        assert!(!table.is_allocated(2));
        assert_eq!(table.port(2), 0);
    }

    #[test]
    fn out_of_range_ids_are_rejected() {
        let mut table = SocketTable::new();
        assert_eq!(table.allocate(SOCK_NOT_AVAIL), Err(Error::InvalidSocket));
        assert_eq!(table.set_port(4, 1), Err(Error::InvalidSocket));
        table.release(9);
        assert!(!table.is_allocated(9));
    }
}
