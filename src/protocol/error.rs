// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

use crate::protocol::messages::Tag;

/// Error type for AT engine and ESP8266 driver operations.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// No recognized tag arrived before the deadline.
    Timeout,
    /// The command completed with a known tag before the expected start tag appeared.
    NotFound(Tag),
    /// The command completed, but with a tag other than the one the operation needs.
    Rejected(Tag),
    /// The formatted command does not fit in the command buffer.
    CommandTooLong,
    /// No free socket slot.
    NoSocket,
    /// The socket id is out of range, unbound, or not the owner of the pending packet.
    InvalidSocket,
    /// The firmware never sent the `>` prompt for a payload.
    Prompt,
    /// A reply arrived but a field in it could not be parsed.
    Parse,
}

impl From<core::fmt::Error> for Error {
    fn from(_: core::fmt::Error) -> Self {
        Error::CommandTooLong
    }
}
