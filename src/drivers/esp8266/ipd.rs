// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Inbound data packet descriptor.
//!
//! The firmware announces received data with
//!
//! ```text
//! +IPD,<link id>,<len>[,"<remote ip>",<remote port>]:<len bytes of payload>
//! ```
//!
//! The remote address is only present when `AT+CIPDINFO=1` is active, which `reset()` enables.

use core::net::Ipv4Addr;

use crate::protocol::{AtEngine, Clock, Stream};

/// Header of the packet currently being drained.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct IpdPacket {
    pub conn_id: u8,
    /// Payload bytes not yet consumed.
    pub remaining: u16,
    pub remote_ip: Option<Ipv4Addr>,
    pub remote_port: u16,
}

impl IpdPacket {
    /// Parse the header that follows `+IPD,`, consuming the `:` before the payload.
    ///
    /// Returns `None` if a mandatory field is missing or out of range.
    pub fn parse<S: Stream, C: Clock>(at: &mut AtEngine<S, C>) -> Option<Self> {
        let conn_id = u8::try_from(at.parse_int()?).ok()?;
        let remaining = u16::try_from(at.parse_int()?).ok()?;

        let timeout = at.timeouts().field;
        let mut packet = IpdPacket {
            conn_id,
            remaining,
            ..Default::default()
        };

        if at.timed_peek(timeout)? == b',' {
            let mut octets = [0u8; 4];
            for octet in octets.iter_mut() {
                *octet = u8::try_from(at.parse_int()?).ok()?;
            }
            packet.remote_ip = Some(Ipv4Addr::from(octets));
            packet.remote_port = u16::try_from(at.parse_int()?).ok()?;
        }

        if at.timed_read(timeout)? != b':' {
            return None;
        }
        Some(packet)
    }

    #[inline]
    pub fn is_drained(&self) -> bool {
        self.remaining == 0
    }

    /// True if this packet belongs to `link`, or to anyone when `link` is `None`.
    #[inline]
    pub fn matches(&self, link: Option<u8>) -> bool {
        link.map_or(true, |id| id == self.conn_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::mock::{MockClock, MockStream};

    fn parse(bytes: &[u8]) -> (Option<IpdPacket>, MockStream) {
        let stream = MockStream::new();
        stream.inject(bytes);
        let mut at = AtEngine::new(stream.clone(), MockClock::new());
        (IpdPacket::parse(&mut at), stream)
    }

    #[test]
    fn header_with_remote_info() {
        let (packet, stream) = parse(b"0,5,\"10.0.0.5\",1234:HELLO");
        let packet = packet.unwrap();
        assert_eq!(packet.conn_id, 0);
        assert_eq!(packet.remaining, 5);
        assert_eq!(packet.remote_ip, Some(Ipv4Addr::new(10, 0, 0, 5)));
        assert_eq!(packet.remote_port, 1234);
        assert_eq!(stream.pending(), 5);
    }

    #[test]
    fn header_without_remote_info() {
        let (packet, stream) = parse(b"3,12:payload-here");
        let packet = packet.unwrap();
        assert_eq!(packet.conn_id, 3);
        assert_eq!(packet.remaining, 12);
        assert_eq!(packet.remote_ip, None);
        assert_eq!(stream.pending(), 12);
    }

    #[test]
    fn truncated_header_is_rejected() {
        let (packet, _) = parse(b"1,");
        assert_eq!(packet, None);
    }

    #[test]
    fn out_of_range_length_is_rejected() {
        let (packet, _) = parse(b"0,-2147483648:x");
        assert_eq!(packet, None);

        let (packet, _) = parse(b"0,70000:x");
        assert_eq!(packet, None);
    }

    #[test]
    fn wildcard_matches_any_link() {
        let packet = IpdPacket {
            conn_id: 2,
            remaining: 1,
            ..Default::default()
        };
        assert!(packet.matches(None));
        assert!(packet.matches(Some(2)));
        assert!(!packet.matches(Some(0)));
    }
}
