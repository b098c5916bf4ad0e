// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # energyShield WiFi Firmware
//!
//! This crate drives the ESP8266 WiFi co-processor of the energyShield board over its AT command
//! firmware, written in Rust, targeting an STM32F767 MCU.
//!
//! ## Crate Structure
//!
//! | Module | Purpose |
//! | ------ | -------- |
//! | [`hw`] | MCU-level wrappers around USART, SysTick, GPIO |
//! | [`protocol`] | AT command engine (tag scanning, timeouts, field extraction) |
//! | [`drivers`] | ESP8266 driver (WiFi management, sockets, `+IPD` data) |
//! | [`wifi`] | Socket table with client, server and UDP handles |
//! | [`config`] | Board constants and AT timeouts |
//!
//! Everything except the MCU glue in [`hw`] is target-independent and tested on the host.
//!
//! ## Getting Started
//!
//! Build docs:
//!
//! ```bash
//! cargo doc --no-deps --open
//! ```
//!
//! Run the host tests:
//!
//! ```bash
//! cargo test --lib
//! ```
//!
//! Flash the board:
//!
//! ```bash
//! cargo run --release --target thumbv7em-none-eabihf
//! ```
//!
//! ## License
//!
//! Licensed under the **MIT License**.
//! See the `LICENSE` file in the repository root for full terms.
//!
//! © 2025–2026 Christopher Liu

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod drivers;
pub mod hw;
pub mod protocol;
pub mod wifi;
