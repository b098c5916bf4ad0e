// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # MCU Glue
//!
//! Thin wrappers around the STM32F7 peripherals the firmware uses. Only [`queue`] is
//! target-independent; everything else builds for the ARM target alone.
//!
//! ## Modules
//!
//! - [`queue`] - Byte queue with latched receive error flags.
//! - [`esp_uart`] - Interrupt-driven USART2 link to the ESP8266.
//! - [`esp_ctrl`] - ESP8266 enable and reset lines.
//! - [`clock`] - SysTick millisecond clock.
//! - [`usart`] - Blocking debug console.
//! - [`logger`] - `log` backend on the debug console.
//! - [`led`] - Status LED.
//! - [`pins`] - Board pin map.

pub mod queue;

#[cfg(target_arch = "arm")]
pub mod clock;
#[cfg(target_arch = "arm")]
pub mod esp_ctrl;
#[cfg(target_arch = "arm")]
pub mod esp_uart;
#[cfg(target_arch = "arm")]
pub mod led;
#[cfg(target_arch = "arm")]
pub mod logger;
#[cfg(target_arch = "arm")]
pub mod pins;
#[cfg(target_arch = "arm")]
pub mod usart;

pub use queue::{ByteQueue, RxErrors};

#[cfg(target_arch = "arm")]
pub use clock::SysTickClock;
#[cfg(target_arch = "arm")]
pub use esp_ctrl::EspControl;
#[cfg(target_arch = "arm")]
pub use esp_uart::EspUart;
#[cfg(target_arch = "arm")]
pub use led::Led;
#[cfg(target_arch = "arm")]
pub use usart::Usart;
