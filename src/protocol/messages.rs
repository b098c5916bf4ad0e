// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! AT command protocol constants used to talk to the ESP8266.

/// Maximum size of a formatted AT command, excluding the CRLF terminator.
pub const CMD_BUFFER_SIZE: usize = 200;

/// Line terminator appended to every command.
pub const CRLF: &str = "\r\n";

/// Prompt sent by the firmware when it is ready for a `CIPSEND` payload.
pub const SEND_PROMPT: &[u8] = b">";

/// Preamble of an inbound data packet.
pub const IPD_PREAMBLE: &[u8] = b"+IPD,";

/// Trailer that follows a drained packet when the remote side closed the link.
pub const CLOSED_TRAILER: &[u8] = b",CLOSED";

/// Terminal response tags, in the order the scanner tests them.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tag {
    Ok,
    Error,
    Fail,
    SendOk,
    Connect,
}

impl Tag {
    /// All known tags in scan order. The first suffix match wins.
    pub const ALL: [Tag; 5] = [Tag::Ok, Tag::Error, Tag::Fail, Tag::SendOk, Tag::Connect];

    /// Exact byte sequence that terminates a response with this tag.
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            Tag::Ok => b"\r\nOK\r\n",
            Tag::Error => b"\r\nERROR\r\n",
            Tag::Fail => b"\r\nFAIL\r\n",
            Tag::SendOk => b"\r\nSEND OK\r\n",
            Tag::Connect => b" CONNECT\r\n",
        }
    }

    /// Position of this tag in [`Tag::ALL`].
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}
