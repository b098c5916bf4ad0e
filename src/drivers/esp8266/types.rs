// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Value types shared by the ESP8266 driver and the WiFi facade.

use core::fmt;

use heapless::String;

/// Maximum size of an SSID.
pub const WL_SSID_MAX_LENGTH: usize = 32;

/// Size of a MAC address or BSSID.
pub const WL_MAC_ADDR_LENGTH: usize = 6;

/// Maximum number of networks kept from a scan.
pub const WL_NETWORKS_LIST_MAXNUM: usize = 10;

/// Size of the firmware version buffer, terminator included.
pub const WL_FW_VER_LENGTH: usize = 6;

/// SSID as returned by the firmware, one byte short of the maximum so the window can still hold
/// the closing quote.
pub type Ssid = String<{ WL_SSID_MAX_LENGTH - 1 }>;

/// Firmware version prefix, e.g. `2.0.0`.
pub type FwVersion = String<{ WL_FW_VER_LENGTH - 1 }>;

/// MAC address in reversed byte order: `mac[5]` is the first octet the firmware prints.
pub type MacAddress = [u8; WL_MAC_ADDR_LENGTH];

/// Transport used by a link.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProtMode {
    Tcp,
    Udp,
    Ssl,
}

/// WiFi connection status.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WlStatus {
    /// The module does not answer.
    NoShield = 255,
    Idle = 0,
    Connected = 1,
    ConnectFailed = 2,
    Disconnected = 3,
}

/// Operating mode passed to `AT+CWMODE`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum EspMode {
    Station = 1,
    AccessPoint = 2,
    StationAndAccessPoint = 3,
}

/// Encryption type reported by `AT+CWLAP` and accepted by `AT+CWSAP`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum EncType {
    None = 0,
    Wep = 1,
    WpaPsk = 2,
    Wpa2Psk = 3,
    WpaWpa2Psk = 4,
    Wpa2Enterprise = 5,
}

impl EncType {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(EncType::None),
            1 => Some(EncType::Wep),
            2 => Some(EncType::WpaPsk),
            3 => Some(EncType::Wpa2Psk),
            4 => Some(EncType::WpaWpa2Psk),
            5 => Some(EncType::Wpa2Enterprise),
            _ => None,
        }
    }
}

/// TCP connection state as seen by a client handle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TcpState {
    Closed = 0,
    Listen = 1,
    SynSent = 2,
    SynRcvd = 3,
    Established = 4,
    FinWait1 = 5,
    FinWait2 = 6,
    CloseWait = 7,
    Closing = 8,
    LastAck = 9,
    TimeWait = 10,
}

/// One entry of the network scan cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanEntry {
    pub ssid: Ssid,
    pub rssi: i32,
    /// Raw encryption code; see [`ScanEntry::encryption`].
    pub enc: u8,
}

impl ScanEntry {
    #[inline]
    pub fn encryption(&self) -> Option<EncType> {
        EncType::from_raw(self.enc)
    }
}

/// Display adapter that escapes `"`, `,` and `\` the way AT string parameters require.
pub struct Escaped<'a>(pub &'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            if matches!(c, '"' | ',' | '\\') {
                f.write_str("\\")?;
            }
            fmt::Write::write_char(f, c)?;
        }
        Ok(())
    }
}

/// Parse `aa:bb:cc:dd:ee:ff` into reversed byte order.
pub fn parse_mac(text: &str) -> Option<MacAddress> {
    let mut mac = [0u8; WL_MAC_ADDR_LENGTH];
    let mut parts = text.split(':');
    for i in (0..WL_MAC_ADDR_LENGTH).rev() {
        mac[i] = u8::from_str_radix(parts.next()?, 16).ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(mac)
}
