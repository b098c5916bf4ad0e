// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Pin definitions for the STM32F767 board carrying the energyShield ESP8266 module.

use stm32f7xx_hal::{
    gpio::{gpioa, gpiob, gpiod, Alternate, Output, PushPull},
    pac,
    prelude::*,
};

/// All board pins. Construct this once at startup using:
///
/// ```rust,ignore
/// let pins = BoardPins::new(dp.GPIOA, dp.GPIOB, dp.GPIOD);
/// ```
pub struct BoardPins {
    pub esp: EspPins,
    pub usart3: Usart3Pins,
    pub led: gpiob::PB0<Output<PushPull>>,
}

/// USART2 link and control lines of the ESP8266.
pub struct EspPins {
    pub tx: gpioa::PA2<Alternate<7>>,
    pub rx: gpioa::PA3<Alternate<7>>,
    pub enable: gpioa::PA8<Output<PushPull>>,
    pub reset: gpioa::PA10<Output<PushPull>>,
}

/// Debug console, routed to the ST-LINK virtual COM port.
pub struct Usart3Pins {
    pub tx: gpiod::PD8<Alternate<7>>,
    pub rx: gpiod::PD9<Alternate<7>>,
}

impl BoardPins {
    /// Create all named pins from raw GPIO peripherals.
    pub fn new(gpioa: pac::GPIOA, gpiob: pac::GPIOB, gpiod: pac::GPIOD) -> Self {
        let gpioa = gpioa.split();
        let gpiob = gpiob.split();
        let gpiod = gpiod.split();

        Self {
            esp: EspPins {
                tx: gpioa.pa2.into_alternate::<7>(),
                rx: gpioa.pa3.into_alternate::<7>().internal_pull_up(true),
                enable: gpioa.pa8.into_push_pull_output(),
                reset: gpioa.pa10.into_push_pull_output(),
            },

            usart3: Usart3Pins {
                tx: gpiod.pd8.into_alternate::<7>(),
                rx: gpiod.pd9.into_alternate::<7>(),
            },

            led: gpiob.pb0.into_push_pull_output(),
        }
    }
}
