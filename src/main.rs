// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! energyShield WiFi bring-up.
//!
//! Powers the ESP8266, joins `WIFI_SSID` and echoes whatever TCP clients send to
//! `SERVER_PORT`. The green LED is lit while a client is being served.

#![cfg_attr(target_arch = "arm", no_std)]
#![cfg_attr(target_arch = "arm", no_main)]

#[cfg(target_arch = "arm")]
mod firmware {
    use cortex_m_rt::entry;
    use log::{error, info, warn};
    use panic_halt as _;

    use hal::{
        pac,
        prelude::*,
        serial::{Config, Serial},
    };
    use stm32f7xx_hal as hal;

    use energyshield_wifi::{
        config::{DEBUG_BAUD, ESP_BAUD, JOIN_RETRY_MS, LOG_LEVEL, SERVER_PORT, WIFI_PASS, WIFI_SSID},
        drivers::esp8266::{EspDrv, WlStatus},
        hw::{logger, pins::BoardPins, EspControl, EspUart, Led, SysTickClock, Usart},
        protocol::AtEngine,
        wifi::{Server, WiFi},
    };

    /// Bytes echoed per round trip.
    const ECHO_CHUNK: usize = 64;

    /// LED blink period while the module is unreachable.
    const FAULT_BLINK_MS: u32 = 200;

    #[entry]
    fn main() -> ! {
        // Peripherals
        let dp = pac::Peripherals::take().unwrap();
        let cp = cortex_m::Peripherals::take().unwrap();

        // Clocks
        let rcc = dp.RCC.constrain();
        let clocks = rcc.cfgr.sysclk(216.MHz()).freeze();
        let clock = SysTickClock::new(cp.SYST, &clocks);

        let pins = BoardPins::new(dp.GPIOA, dp.GPIOB, dp.GPIOD);

        // USART3 (DBG)
        let dbg_cfg = Config {
            baud_rate: DEBUG_BAUD.bps(),
            ..Default::default()
        };
        let dbg = Serial::new(dp.USART3, (pins.usart3.tx, pins.usart3.rx), &clocks, dbg_cfg);
        logger::init(Usart::new(dbg), LOG_LEVEL);
        info!("energyShield WiFi starting");

        let mut led = Led::active_high(pins.led);

        // ESP8266
        let mut esp_ctrl = EspControl::new(pins.esp.enable, pins.esp.reset);
        esp_ctrl.power_on(&clock);

        let esp_cfg = Config {
            baud_rate: ESP_BAUD.bps(),
            ..Default::default()
        };
        let esp = Serial::new(dp.USART2, (pins.esp.tx, pins.esp.rx), &clocks, esp_cfg);
        let at = AtEngine::new(EspUart::new(esp), clock);
        let mut wifi = WiFi::new(EspDrv::new(at));

        if let Err(e) = wifi.init() {
            error!("ESP8266 not responding: {:?}", e);
            loop {
                led.toggle();
                wifi.delay_ms(FAULT_BLINK_MS);
            }
        }

        while wifi.begin(WIFI_SSID, WIFI_PASS) != WlStatus::Connected {
            warn!("Join {} failed, retrying", WIFI_SSID);
            wifi.delay_ms(JOIN_RETRY_MS);
        }
        match wifi.local_ip() {
            Ok(ip) => info!("Joined {} as {}", WIFI_SSID, ip),
            Err(e) => warn!("Joined {}, address unknown: {:?}", WIFI_SSID, e),
        }

        let mut server = Server::new(SERVER_PORT);
        if let Err(e) = server.begin(&mut wifi) {
            error!("Echo server not started: {:?}", e);
        }

        let mut buf = [0u8; ECHO_CHUNK];
        loop {
            let Some(mut client) = server.accept(&mut wifi) else {
                continue;
            };

            led.on();
            loop {
                match client.read_buf(&mut wifi, &mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if let Err(e) = client.write(&mut wifi, &buf[..n]) {
                            warn!("Echo failed: {:?}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Read failed: {:?}", e);
                        break;
                    }
                }
            }
            led.off();
        }
    }
}

#[cfg(not(target_arch = "arm"))]
fn main() {}
