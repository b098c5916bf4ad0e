// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # ESP8266 AT Firmware Driver
//!
//! `EspDrv` owns the [`AtEngine`] and the little state the AT firmware does not keep for us: the
//! header of the inbound packet being drained, the firmware version and the last network scan.
//!
//! The module is driven in multiplexed mode (`AT+CIPMUX=1`) with remote info enabled on `+IPD`
//! (`AT+CIPDINFO=1`); [`EspDrv::reset`] configures both.
//!
//! ## Modules
//!
//! - [`types`] - Status enums, scan entries and string helpers.
//! - [`ipd`] - `+IPD` packet header parsing.
//! - `query` - Status and address queries, network scan, ping.
//! - `data` - Sockets, inbound data and payload transmission.

use core::net::Ipv4Addr;

use heapless::Vec;
use log::{debug, error, info, warn};

use crate::protocol::{AtEngine, Clock, Error, Stream, Tag};

mod data;
pub mod ipd;
mod query;
pub mod types;

pub use data::Received;
pub use ipd::IpdPacket;
pub use types::{
    EncType, EspMode, FwVersion, MacAddress, ProtMode, ScanEntry, Ssid, TcpState, WlStatus,
};

use types::{Escaped, WL_NETWORKS_LIST_MAXNUM};

/// Number of `AT` probes sent before giving up on the module.
const INIT_ATTEMPTS: usize = 5;

/// ESP8266 driver over an AT engine.
pub struct EspDrv<S, C> {
    at: AtEngine<S, C>,
    packet: IpdPacket,
    fw_version: FwVersion,
    networks: Vec<ScanEntry, WL_NETWORKS_LIST_MAXNUM>,
}

impl<S: Stream, C: Clock> EspDrv<S, C> {
    pub fn new(at: AtEngine<S, C>) -> Self {
        Self {
            at,
            packet: IpdPacket::default(),
            fw_version: FwVersion::new(),
            networks: Vec::new(),
        }
    }

    #[inline]
    pub fn at(&mut self) -> &mut AtEngine<S, C> {
        &mut self.at
    }

    #[inline]
    pub fn clock(&self) -> &C {
        self.at.clock()
    }

    /// Block for `ms` milliseconds on the driver clock.
    #[inline]
    pub fn delay_ms(&self, ms: u32) {
        self.at.clock().delay_ms(ms);
    }

    /// Probe the module, reset it and read the firmware version.
    ///
    /// Returns [`Error::Timeout`] if the module never answers `AT`.
    pub fn init(&mut self) -> Result<(), Error> {
        debug!("> init");

        let timeout = self.at.timeouts().command;
        let mut alive = false;
        for _ in 0..INIT_ATTEMPTS {
            if self.at.send_command(format_args!("AT"), timeout) == Ok(Tag::Ok) {
                alive = true;
                break;
            }
            self.delay_ms(1_000);
        }
        if !alive {
            error!("Cannot initialize ESP module");
            return Err(Error::Timeout);
        }

        self.reset();

        let version = self.firmware_version().unwrap_or_default();
        let bytes = version.as_bytes();
        if bytes.len() < 2 || !matches!(bytes[0], b'1' | b'2') || bytes[1] != b'.' {
            warn!("Unsupported firmware: {}", version.as_str());
        } else {
            info!("Initialization successful - {}", version.as_str());
        }
        Ok(())
    }

    /// Restart the module and put it in multiplexed station mode with DHCP.
    ///
    /// Individual command failures are logged and ignored; the module is usable as long as it
    /// answered the init probe.
    pub fn reset(&mut self) {
        debug!("> reset");

        self.fire("AT+RST");
        self.delay_ms(3_000);
        self.at.empty_buf(false);

        self.fire("ATE0");
        self.fire("AT+CWMODE=1");
        self.delay_ms(200);
        self.fire("AT+CIPMUX=1");
        self.fire("AT+CIPDINFO=1");
        self.fire("AT+CWAUTOCONN=0");
        self.fire("AT+CWDHCP=1,1");
        self.delay_ms(200);

        self.packet = IpdPacket::default();
    }

    /// Join an access point. The configuration is not stored in flash.
    pub fn join(&mut self, ssid: &str, pass: &str) -> Result<(), Error> {
        debug!("> join");

        let timeout = self.at.timeouts().join;
        let result = self.at.command_ok(
            format_args!("AT+CWJAP_CUR=\"{}\",\"{}\"", Escaped(ssid), Escaped(pass)),
            timeout,
        );

        match result {
            Ok(()) => info!("Connected to {}", ssid),
            Err(e) => {
                warn!("Failed connecting to {}: {:?}", ssid, e);
                // The firmware keeps logging after FAIL
                self.delay_ms(1_000);
                self.at.empty_buf(false);
            }
        }
        result
    }

    /// Start a soft access point. `mode` selects AP only or AP plus station.
    pub fn start_ap(
        &mut self,
        ssid: &str,
        pass: &str,
        channel: u8,
        enc: EncType,
        mode: EspMode,
    ) -> Result<(), Error> {
        debug!("> start_ap");

        let timeout = self.at.timeouts().access_point;
        if let Err(e) = self.at.command_ok(format_args!("AT+CWMODE_CUR={}", mode as u8), timeout) {
            warn!("Failed to set AP mode {}", ssid);
            return Err(e);
        }

        let started = self.at.command_ok(
            format_args!(
                "AT+CWSAP_CUR=\"{}\",\"{}\",{},{}",
                Escaped(ssid),
                Escaped(pass),
                channel,
                enc as u8
            ),
            timeout,
        );
        if let Err(e) = started {
            warn!("Failed to start AP {}", ssid);
            return Err(e);
        }

        match mode {
            EspMode::AccessPoint => self.fire("AT+CWDHCP_CUR=0,1"),
            EspMode::StationAndAccessPoint => self.fire("AT+CWDHCP_CUR=2,1"),
            EspMode::Station => {}
        }

        info!("Access point started {}", ssid);
        Ok(())
    }

    /// Leave the current network. The status is always [`WlStatus::Disconnected`].
    pub fn disconnect(&mut self) -> WlStatus {
        debug!("> disconnect");

        let timeout = self.at.timeouts().command;
        if self.at.command_ok(format_args!("AT+CWQAP"), timeout).is_err() {
            self.delay_ms(2_000);
            self.at.empty_buf(false);
        }
        WlStatus::Disconnected
    }

    /// Use a static station address.
    pub fn config(&mut self, ip: Ipv4Addr) -> Result<(), Error> {
        debug!("> config");

        self.fire("AT+CWDHCP_CUR=1,0");
        self.set_address("AT+CIPSTA_CUR", ip)
    }

    /// Use a static soft-AP address.
    pub fn config_ap(&mut self, ip: Ipv4Addr) -> Result<(), Error> {
        debug!("> config_ap");

        self.fire("AT+CWMODE_CUR=2");
        self.fire("AT+CWDHCP_CUR=2,0");
        self.set_address("AT+CIPAP_CUR", ip)
    }

    fn set_address(&mut self, cmd: &str, ip: Ipv4Addr) -> Result<(), Error> {
        self.delay_ms(500);

        let timeout = self.at.timeouts().static_ip;
        let result = self.at.command_ok(format_args!("{}=\"{}\"", cmd, ip), timeout);
        self.delay_ms(500);

        if result.is_ok() {
            info!("IP address set {}", ip);
        }
        result
    }

    /// Send a setup command whose outcome only matters for the log.
    fn fire(&mut self, cmd: &str) {
        let timeout = self.at.timeouts().command;
        if let Err(e) = self.at.command_ok(format_args!("{}", cmd), timeout) {
            debug!("{} -> {:?}", cmd, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::mock::{MockClock, MockStream};

    pub(super) fn driver() -> (EspDrv<MockStream, MockClock>, MockStream, MockClock) {
        let stream = MockStream::new();
        let clock = MockClock::new();
        let drv = EspDrv::new(AtEngine::new(stream.clone(), clock.clone()));
        (drv, stream, clock)
    }

    #[test]
    fn join_sends_credentials_and_accepts_ok() {
        let (mut drv, stream, _) = driver();
        stream.reply(b"WIFI CONNECTED\r\nWIFI GOT IP\r\n\r\nOK\r\n");

        assert_eq!(drv.join("home", "secret"), Ok(()));
        assert_eq!(stream.written_str(), "AT+CWJAP_CUR=\"home\",\"secret\"\r\n");
    }

    #[test]
    fn join_reports_fail_and_drains_late_output() {
        let (mut drv, stream, clock) = driver();
        stream.reply(b"+CWJAP:1\r\n\r\nFAIL\r\n");

        let start = clock.now();
        assert_eq!(drv.join("home", "secret"), Err(Error::Rejected(Tag::Fail)));
        assert!(clock.now().wrapping_sub(start) >= 1_000);
    }

    #[test]
    fn join_escapes_special_characters() {
        let (mut drv, stream, _) = driver();
        stream.reply(b"\r\nOK\r\n");

        drv.join("my,net", "pa\"ss").unwrap();
        assert_eq!(stream.written_str(), "AT+CWJAP_CUR=\"my\\,net\",\"pa\\\"ss\"\r\n");
    }

    #[test]
    fn init_gives_up_after_five_probes() {
        let (mut drv, stream, _) = driver();
        assert_eq!(drv.init(), Err(Error::Timeout));
        assert_eq!(stream.written_str().matches("AT\r\n").count(), INIT_ATTEMPTS);
    }

    #[test]
    fn init_resets_and_reads_version() {
        let (mut drv, stream, _) = driver();
        stream.reply(b"\r\nOK\r\n"); // AT
        for _ in 0..7 {
            stream.reply(b"\r\nOK\r\n"); // reset sequence
        }
        stream.reply(b"AT version:1.3.0.0\r\nSDK version:2.0.0(5a875ba)\r\n\r\nOK\r\n");

        assert_eq!(drv.init(), Ok(()));
        let written = stream.written_str();
        assert!(written.starts_with("AT\r\nAT+RST\r\nATE0\r\nAT+CWMODE=1\r\nAT+CIPMUX=1\r\n"));
        assert!(written.contains("AT+CIPDINFO=1\r\nAT+CWAUTOCONN=0\r\nAT+CWDHCP=1,1\r\n"));
        assert!(written.ends_with("AT+GMR\r\n"));
        assert_eq!(drv.fw_version.as_str(), "2.0.0");
    }

    #[test]
    fn start_ap_enables_dhcp_for_mode() {
        let (mut drv, stream, _) = driver();
        stream.reply(b"\r\nOK\r\n");
        stream.reply(b"\r\nOK\r\n");
        stream.reply(b"\r\nOK\r\n");

        let mode = EspMode::StationAndAccessPoint;
        drv.start_ap("shield", "12345678", 10, EncType::Wpa2Psk, mode).unwrap();
        assert_eq!(
            stream.written_str(),
            "AT+CWMODE_CUR=3\r\nAT+CWSAP_CUR=\"shield\",\"12345678\",10,3\r\nAT+CWDHCP_CUR=2,1\r\n"
        );
    }

    #[test]
    fn start_ap_stops_when_mode_is_rejected() {
        let (mut drv, stream, _) = driver();
        stream.reply(b"\r\nERROR\r\n");

        assert_eq!(
            drv.start_ap("shield", "", 1, EncType::None, EspMode::AccessPoint),
            Err(Error::Rejected(Tag::Error))
        );
        assert_eq!(stream.written_str(), "AT+CWMODE_CUR=2\r\n");
    }

    #[test]
    fn disconnect_always_reports_disconnected() {
        let (mut drv, stream, _) = driver();
        stream.reply(b"\r\nERROR\r\n");
        assert_eq!(drv.disconnect(), WlStatus::Disconnected);
    }

    #[test]
    fn config_disables_dhcp_before_setting_address() {
        let (mut drv, stream, _) = driver();
        stream.reply(b"\r\nOK\r\n");
        stream.reply(b"\r\nOK\r\n");

        drv.config(Ipv4Addr::new(192, 168, 1, 50)).unwrap();
        assert_eq!(
            stream.written_str(),
            "AT+CWDHCP_CUR=1,0\r\nAT+CIPSTA_CUR=\"192.168.1.50\"\r\n"
        );
    }
}
