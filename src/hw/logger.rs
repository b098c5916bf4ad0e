// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! `log` backend that prints `[LEVEL] message` lines on the debug console.

use core::cell::RefCell;
use core::fmt::Write as _;

use cortex_m::interrupt::{self, Mutex};
use log::{LevelFilter, Log, Metadata, Record};
use stm32f7xx_hal::pac::USART3;

use super::Usart;

/// Console type the logger writes to.
pub type Console = Usart<USART3>;

static CONSOLE: Mutex<RefCell<Option<Console>>> = Mutex::new(RefCell::new(None));
static LOGGER: ConsoleLogger = ConsoleLogger;

struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        interrupt::free(|cs| {
            if let Some(console) = CONSOLE.borrow(cs).borrow_mut().as_mut() {
                let _ = write!(console, "[{}] {}\r\n", record.level(), record.args());
            }
        });
    }

    fn flush(&self) {
        interrupt::free(|cs| {
            if let Some(console) = CONSOLE.borrow(cs).borrow_mut().as_mut() {
                console.flush();
            }
        });
    }
}

/// Install the console logger. A second call only replaces the console and level.
pub fn init(console: Console, level: LevelFilter) {
    interrupt::free(|cs| *CONSOLE.borrow(cs).borrow_mut() = Some(console));
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}
