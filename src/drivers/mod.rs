// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Device-Specific Drivers
//!
//! This module contains device-specific drivers that sit above the [`protocol`](crate::protocol)
//! engine and below the [`wifi`](crate::wifi) facade.
//!
//! ## Existing drivers
//!
//! - [`esp8266`] – Espressif ESP8266 running the AT command firmware

pub mod esp8266;

pub use esp8266::EspDrv;
