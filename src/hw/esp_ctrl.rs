// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! ESP8266 enable (`CH_PD`) and reset lines.

use log::info;
use stm32f7xx_hal::gpio::{self, Output, PinState, PushPull};

use crate::protocol::Clock;

/// Width of the reset pulse.
pub const RESET_PULSE_MS: u32 = 10;

/// Enable on `P{EN}`, active-low reset on `Q{RN}`.
pub struct EspControl<const P: char, const EN: u8, const Q: char, const RN: u8> {
    enable: gpio::Pin<P, EN, Output<PushPull>>,
    reset: gpio::Pin<Q, RN, Output<PushPull>>,
}

impl<const P: char, const EN: u8, const Q: char, const RN: u8> EspControl<P, EN, Q, RN> {
    /// Take both pins with the module powered down and held in reset.
    pub fn new<M1, M2>(enable: gpio::Pin<P, EN, M1>, reset: gpio::Pin<Q, RN, M2>) -> Self {
        let mut enable = enable.into_push_pull_output();
        let mut reset = reset.into_push_pull_output();
        enable.set_state(PinState::Low);
        reset.set_state(PinState::Low);
        Self { enable, reset }
    }

    /// Enable the module and release it from reset after a short pulse.
    pub fn power_on<C: Clock>(&mut self, clock: &C) {
        self.enable.set_high();
        self.reset.set_low();
        clock.delay_ms(RESET_PULSE_MS);
        self.reset.set_high();
        info!("ESP8266 powered on");
    }

    /// Pulse the reset line with the module enabled.
    pub fn hard_reset<C: Clock>(&mut self, clock: &C) {
        self.reset.set_low();
        clock.delay_ms(RESET_PULSE_MS);
        self.reset.set_high();
    }

    pub fn power_off(&mut self) {
        self.enable.set_low();
    }
}
