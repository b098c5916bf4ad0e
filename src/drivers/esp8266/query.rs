// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Status and address queries, network scan and ping.

use core::fmt::Write as _;
use core::net::Ipv4Addr;
use core::str::FromStr;

use heapless::String;
use log::debug;

use super::types::{parse_mac, Escaped, FwVersion, MacAddress, ScanEntry, Ssid, WlStatus};
use super::EspDrv;
use crate::protocol::{Clock, Error, ScanResult, Stream};

/// Room for a dotted quad or a MAC address.
type AddrText = String<19>;

const CWLAP_ENTRY: &[u8] = b"+CWLAP:(";

impl<S: Stream, C: Clock> EspDrv<S, C> {
    /// WiFi link status from `AT+CIPSTATUS`.
    pub fn connection_status(&mut self) -> WlStatus {
        debug!("> connection_status");

        // 2: got IP, 3: connected, 4: link closed, 5: not associated
        let reply = self.at.send_command_expect::<9>("AT+CIPSTATUS", b"STATUS:", b"\r\n");
        let Ok(text) = reply else {
            return WlStatus::NoShield;
        };
        match text.trim().parse::<u8>() {
            Ok(2..=4) => WlStatus::Connected,
            Ok(5) => WlStatus::Disconnected,
            _ => WlStatus::Idle,
        }
    }

    /// True while the firmware lists link `sock` in `AT+CIPSTATUS`.
    pub fn client_state(&mut self, sock: u8) -> Result<bool, Error> {
        debug!("> client_state {}", sock);

        let mut tag: String<16> = String::new();
        write!(tag, "+CIPSTATUS:{},", sock)?;

        match self.at.send_command_expect::<9>("AT+CIPSTATUS", tag.as_bytes(), b",") {
            Ok(_) => Ok(true),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Station MAC address, `mac[5]` first.
    pub fn mac_address(&mut self) -> Result<MacAddress, Error> {
        debug!("> mac_address");

        let text: AddrText = self.at.send_command_expect("AT+CIFSR", b":STAMAC,\"", b"\"")?;
        parse_mac(&text).ok_or(Error::Parse)
    }

    /// Station IPv4 address.
    pub fn local_ip(&mut self) -> Result<Ipv4Addr, Error> {
        debug!("> local_ip");
        self.query_addr("AT+CIFSR", b":STAIP,\"")
    }

    /// Soft-AP IPv4 address.
    pub fn local_ip_ap(&mut self) -> Result<Ipv4Addr, Error> {
        debug!("> local_ip_ap");
        self.query_addr("AT+CIPAP?", b"+CIPAP:ip:\"")
    }

    pub fn netmask(&mut self) -> Result<Ipv4Addr, Error> {
        debug!("> netmask");
        self.query_addr("AT+CIPSTA?", b"+CIPSTA:netmask:\"")
    }

    pub fn gateway(&mut self) -> Result<Ipv4Addr, Error> {
        debug!("> gateway");
        self.query_addr("AT+CIPSTA?", b"+CIPSTA:gateway:\"")
    }

    fn query_addr(&mut self, cmd: &str, start: &[u8]) -> Result<Ipv4Addr, Error> {
        let text: AddrText = self.at.send_command_expect(cmd, start, b"\"")?;
        Ipv4Addr::from_str(&text).map_err(|_| Error::Parse)
    }

    /// SSID of the joined network.
    pub fn current_ssid(&mut self) -> Result<Ssid, Error> {
        debug!("> current_ssid");
        self.at.send_command_expect("AT+CWJAP?", b"+CWJAP:\"", b"\"")
    }

    /// BSSID of the joined network, `bssid[5]` first.
    pub fn current_bssid(&mut self) -> Result<MacAddress, Error> {
        debug!("> current_bssid");

        let text: AddrText = self.at.send_command_expect("AT+CWJAP?", b",\"", b"\",")?;
        parse_mac(&text).ok_or(Error::Parse)
    }

    /// Signal strength of the joined network in dBm.
    pub fn current_rssi(&mut self) -> Result<i32, Error> {
        debug!("> current_rssi");

        let text: String<9> = self.at.send_command_expect("AT+CWJAP?", b",-", b"\r\n")?;
        let digits = text.split(|c: char| !c.is_ascii_digit()).next().unwrap_or("");
        digits.parse::<i32>().map(|v| -v).map_err(|_| Error::Parse)
    }

    /// Firmware SDK version, also cached for [`EspDrv::cached_firmware_version`].
    pub fn firmware_version(&mut self) -> Result<FwVersion, Error> {
        debug!("> firmware_version");

        self.fw_version.clear();
        let version: FwVersion = self.at.send_command_expect("AT+GMR", b"SDK version:", b"\r\n")?;
        self.fw_version = version.clone();
        Ok(version)
    }

    /// Version read by the last [`EspDrv::firmware_version`] call.
    #[inline]
    pub fn cached_firmware_version(&self) -> &str {
        &self.fw_version
    }

    /// Scan for networks with `AT+CWLAP`, keeping at most ten entries.
    ///
    /// Returns the number of entries cached. The cache is cleared even if the scan fails.
    pub fn scan_networks(&mut self) -> Result<usize, Error> {
        debug!("> scan_networks");

        self.networks.clear();
        self.at.empty_buf(true);
        self.at.write_line("AT+CWLAP")?;

        let field = self.at.timeouts().field;
        let scan = self.at.timeouts().scan;
        let mut result = self.at.read_until(scan, Some(CWLAP_ENTRY), true);

        while result == ScanResult::Found {
            // +CWLAP:(<enc>,"<ssid>",<rssi>,"<mac>",<ch>,...)
            let enc = self.at.parse_int().unwrap_or(0);
            self.at.read_until(field, Some(b"\""), true);

            let mut ssid = Ssid::new();
            if self.at.read_until(field, Some(b"\""), false) == ScanResult::Found {
                ssid = self.at.window().extract(1).unwrap_or_default();
            }

            self.at.read_until(field, Some(b","), true);
            let rssi = self.at.parse_int().unwrap_or(0);

            let entry = ScanEntry {
                ssid,
                rssi,
                enc: u8::try_from(enc).unwrap_or(0),
            };
            if self.networks.push(entry).is_err() || self.networks.is_full() {
                break;
            }

            result = self.at.read_until(field, Some(CWLAP_ENTRY), true);
        }

        if result == ScanResult::TimedOut {
            return Err(Error::Timeout);
        }
        debug!("Found {} networks", self.networks.len());
        Ok(self.networks.len())
    }

    /// Entries of the last scan.
    #[inline]
    pub fn networks(&self) -> &[ScanEntry] {
        &self.networks
    }

    /// Entry `i` of the last scan, if there is one.
    #[inline]
    pub fn network(&self, i: usize) -> Option<&ScanEntry> {
        self.networks.get(i)
    }

    /// Ping a host name or address.
    pub fn ping(&mut self, host: &str) -> Result<(), Error> {
        debug!("> ping");

        let timeout = self.at.timeouts().ping;
        self.at.command_ok(format_args!("AT+PING=\"{}\"", Escaped(host)), timeout)
    }
}
