// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! SysTick millisecond clock.

use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m::peripheral::{syst::SystClkSource, SYST};
use cortex_m_rt::exception;
use stm32f7xx_hal::rcc::Clocks;

use crate::protocol::Clock;

static MILLIS: AtomicU32 = AtomicU32::new(0);

/// Clock driven by a 1 kHz SysTick interrupt. Owns `SYST` so nothing else reprograms it.
pub struct SysTickClock {
    _syst: SYST,
}

impl SysTickClock {
    pub fn new(mut syst: SYST, clocks: &Clocks) -> Self {
        syst.set_clock_source(SystClkSource::Core);
        syst.set_reload(clocks.sysclk().raw() / 1_000 - 1);
        syst.clear_current();
        syst.enable_counter();
        syst.enable_interrupt();
        Self { _syst: syst }
    }
}

impl Clock for SysTickClock {
    #[inline]
    fn millis(&self) -> u32 {
        MILLIS.load(Ordering::Relaxed)
    }

    /// Sleep between ticks instead of spinning.
    fn delay_ms(&self, ms: u32) {
        let start = self.millis();
        while self.elapsed(start) < ms {
            cortex_m::asm::wfi();
        }
    }
}

#[exception]
fn SysTick() {
    MILLIS.fetch_add(1, Ordering::Relaxed);
}
