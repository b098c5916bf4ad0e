// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # WiFi Facade
//!
//! Arduino-style network API on top of [`EspDrv`]. `WiFi` owns the driver and the socket table;
//! [`Client`], [`Server`] and [`Udp`] are small handles that borrow it per call, so any number of
//! them can share one module.
//!
//! ## Modules
//!
//! - [`sockets`] - Four-slot socket table.
//! - [`client`] - TCP/SSL client handle.
//! - [`server`] - TCP server on the single listening link.
//! - [`udp`] - UDP listener and sender.

use core::net::Ipv4Addr;

use log::info;

use crate::drivers::esp8266::{
    EncType, EspDrv, EspMode, FwVersion, MacAddress, ScanEntry, Ssid, WlStatus,
};
use crate::protocol::{Clock, Error, Stream};

pub mod client;
pub mod server;
pub mod sockets;
pub mod udp;

pub use client::Client;
pub use server::Server;
pub use sockets::{SocketTable, MAX_SOCK_NUM, SERVER_SOCKET, SOCK_NOT_AVAIL};
pub use udp::Udp;

/// Default soft-AP channel.
pub const DEFAULT_AP_CHANNEL: u8 = 10;

pub struct WiFi<S, C> {
    drv: EspDrv<S, C>,
    sockets: SocketTable,
    mode: Option<EspMode>,
}

impl<S: Stream, C: Clock> WiFi<S, C> {
    pub fn new(drv: EspDrv<S, C>) -> Self {
        Self {
            drv,
            sockets: SocketTable::new(),
            mode: None,
        }
    }

    /// Bring the module up. Expects the enable and reset lines to be released already.
    pub fn init(&mut self) -> Result<(), Error> {
        info!("Initializing ESP module");
        self.drv.init()
    }

    #[inline]
    pub fn drv(&mut self) -> &mut EspDrv<S, C> {
        &mut self.drv
    }

    #[inline]
    pub fn sockets(&self) -> &SocketTable {
        &self.sockets
    }

    #[inline]
    pub fn sockets_mut(&mut self) -> &mut SocketTable {
        &mut self.sockets
    }

    /// Mode selected by the last `begin*` call.
    #[inline]
    pub fn mode(&self) -> Option<EspMode> {
        self.mode
    }

    #[inline]
    pub fn delay_ms(&self, ms: u32) {
        self.drv.delay_ms(ms);
    }

    /// Join a network in station mode.
    pub fn begin(&mut self, ssid: &str, pass: &str) -> WlStatus {
        self.mode = Some(EspMode::Station);
        match self.drv.join(ssid, pass) {
            Ok(()) => WlStatus::Connected,
            Err(_) => WlStatus::ConnectFailed,
        }
    }

    /// Start a soft access point, alone or next to the station interface.
    pub fn begin_ap(
        &mut self,
        ssid: &str,
        channel: u8,
        pass: &str,
        enc: EncType,
        ap_only: bool,
    ) -> WlStatus {
        let mode = if ap_only {
            EspMode::AccessPoint
        } else {
            EspMode::StationAndAccessPoint
        };
        self.mode = Some(mode);
        match self.drv.start_ap(ssid, pass, channel, enc, mode) {
            Ok(()) => WlStatus::Connected,
            Err(_) => WlStatus::ConnectFailed,
        }
    }

    /// Open soft access point on the default channel.
    pub fn begin_ap_open(&mut self, ssid: &str) -> WlStatus {
        self.begin_ap(ssid, DEFAULT_AP_CHANNEL, "", EncType::None, true)
    }

    pub fn config(&mut self, ip: Ipv4Addr) -> Result<(), Error> {
        self.drv.config(ip)
    }

    pub fn config_ap(&mut self, ip: Ipv4Addr) -> Result<(), Error> {
        self.drv.config_ap(ip)
    }

    pub fn disconnect(&mut self) -> WlStatus {
        self.drv.disconnect()
    }

    pub fn reset(&mut self) {
        self.drv.reset();
    }

    pub fn status(&mut self) -> WlStatus {
        self.drv.connection_status()
    }

    pub fn mac_address(&mut self) -> Result<MacAddress, Error> {
        self.drv.mac_address()
    }

    /// Station address in station mode, soft-AP address otherwise.
    pub fn local_ip(&mut self) -> Result<Ipv4Addr, Error> {
        match self.mode {
            Some(EspMode::Station) => self.drv.local_ip(),
            _ => self.drv.local_ip_ap(),
        }
    }

    /// Station netmask, unspecified outside station mode.
    pub fn subnet_mask(&mut self) -> Result<Ipv4Addr, Error> {
        match self.mode {
            Some(EspMode::Station) => self.drv.netmask(),
            _ => Ok(Ipv4Addr::UNSPECIFIED),
        }
    }

    /// Station gateway, unspecified outside station mode.
    pub fn gateway_ip(&mut self) -> Result<Ipv4Addr, Error> {
        match self.mode {
            Some(EspMode::Station) => self.drv.gateway(),
            _ => Ok(Ipv4Addr::UNSPECIFIED),
        }
    }

    pub fn ssid(&mut self) -> Result<Ssid, Error> {
        self.drv.current_ssid()
    }

    pub fn bssid(&mut self) -> Result<MacAddress, Error> {
        self.drv.current_bssid()
    }

    pub fn rssi(&mut self) -> Result<i32, Error> {
        self.drv.current_rssi()
    }

    pub fn scan_networks(&mut self) -> Result<usize, Error> {
        self.drv.scan_networks()
    }

    /// Entry `i` of the last scan.
    pub fn network(&self, i: usize) -> Option<&ScanEntry> {
        self.drv.network(i)
    }

    pub fn firmware_version(&mut self) -> Result<FwVersion, Error> {
        self.drv.firmware_version()
    }

    pub fn ping(&mut self, host: &str) -> Result<(), Error> {
        self.drv.ping(host)
    }
}
