// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # AT Command Protocol
//!
//! Request/response engine for the ESP8266 AT firmware.
//!
//! ## Modules
//!
//! - [`messages`] - Response tags and wire constants.
//! - [`window`] - Sliding tag window used for suffix matching.
//! - [`engine`] - Command formatting, tag scanning and field extraction.
//! - [`stream`] - Byte stream and clock traits the engine runs on.

pub mod engine;
pub mod error;
pub mod messages;
pub mod stream;
pub mod window;

#[cfg(test)]
pub(crate) mod mock;

pub use engine::{AtEngine, ScanResult};
pub use error::Error;
pub use messages::Tag;
pub use stream::{Clock, Stream};
