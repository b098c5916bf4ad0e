// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Board and protocol configuration.
//!
//! Network credentials and board settings are compile-time constants. AT timeouts live in
//! [`Timeouts`], which starts from the values the ESP8266 firmware is known to need and can be
//! adjusted per operation with the `with_*` setters.

use log::LevelFilter;

/// Baud rate of the ESP8266 link.
pub const ESP_BAUD: u32 = 115_200;

/// Baud rate of the debug console.
pub const DEBUG_BAUD: u32 = 115_200;

/// Maximum level forwarded to the debug console.
pub const LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Network joined at boot.
pub const WIFI_SSID: &str = "energyShield";
pub const WIFI_PASS: &str = "energyShield2";

/// Port of the TCP echo server started once the network is up.
pub const SERVER_PORT: u16 = 23;

/// Pause between join attempts.
pub const JOIN_RETRY_MS: u32 = 5_000;

/// Per-operation AT timeouts, in milliseconds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Timeouts {
    /// Plain commands (`AT`, `ATE0`, `AT+CIPMUX`, ...).
    pub command: u32,
    /// Wait for the start tag of an extracted field.
    pub expect_start: u32,
    /// Wait for the end tag once the start tag was seen.
    pub expect_end: u32,
    /// Drain the rest of a response after extraction.
    pub drain: u32,
    /// `AT+CWJAP_CUR`.
    pub join: u32,
    /// `AT+CWMODE_CUR` and `AT+CWSAP_CUR`.
    pub access_point: u32,
    /// Static IP configuration.
    pub static_ip: u32,
    /// First `+CWLAP` entry.
    pub scan: u32,
    /// Every field after the first `+CWLAP` entry, and single-field reads.
    pub field: u32,
    /// `AT+CIPSTART`.
    pub connect: u32,
    /// `AT+CIPCLOSE`.
    pub close: u32,
    /// `AT+PING`.
    pub ping: u32,
    /// `>` prompt before a payload.
    pub prompt: u32,
    /// `SEND OK` after a payload.
    pub send: u32,
    /// Next payload byte of an inbound packet.
    pub data: u32,
    /// `,CLOSED` trailer after a drained packet.
    pub closed: u32,
}

impl Timeouts {
    pub const fn new() -> Self {
        Self {
            command: 1_000,
            expect_start: 1_000,
            expect_end: 500,
            drain: 2_000,
            join: 20_000,
            access_point: 10_000,
            static_ip: 2_000,
            scan: 10_000,
            field: 1_000,
            connect: 5_000,
            close: 4_000,
            ping: 8_000,
            prompt: 1_000,
            send: 2_000,
            data: 2_000,
            closed: 500,
        }
    }

    /// Set the timeout for plain commands.
    pub fn with_command(mut self, ms: u32) -> Self {
        self.command = ms;
        self
    }

    /// Set the network join timeout.
    pub fn with_join(mut self, ms: u32) -> Self {
        self.join = ms;
        self
    }

    /// Set the socket open timeout.
    pub fn with_connect(mut self, ms: u32) -> Self {
        self.connect = ms;
        self
    }

    /// Set the inbound payload byte timeout.
    pub fn with_data(mut self, ms: u32) -> Self {
        self.data = ms;
        self
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::new()
    }
}
