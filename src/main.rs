//! Smart relay firmware entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HapServer          LogEventSink   NvsAdapter   SystemClock    │
//! │  (AccessoryServer)  (EventSink)    (Config+NVS) (Clock)        │
//! │  WifiAdapter        StatusLed      InputPin / OutputPin        │
//! │  (Network)          (LedPort)      (PeripheralRegistry)        │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Lifecycle · Catalog · Indicator · Button · Thermal    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Scheduler (delegate-driven) · EventQueue (FIFO, one thread)   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Result, anyhow};
use log::{info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{AnyIOPin, AnyOutputPin, PinDriver, Pull};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::wifi::EspWifi;

use smartrelay::adapters::device_id;
use smartrelay::adapters::hap_server::HapServer;
use smartrelay::adapters::log_sink::LogEventSink;
use smartrelay::adapters::network::WifiAdapter;
use smartrelay::adapters::nvs::NvsAdapter;
use smartrelay::adapters::time::SystemClock;
use smartrelay::app::events::PlatformEvent;
use smartrelay::app::ports::{AccessoryServerPort, Clock, ConfigPort, NetworkPort};
use smartrelay::app::service::{AppService, Ports};
use smartrelay::config::DeviceConfig;
use smartrelay::drivers::input_pin::{InputPin, PressTiming};
use smartrelay::drivers::output_pin::OutputPin;
use smartrelay::drivers::status_led::StatusLed;
use smartrelay::migrate::{self, MigrationEnv};
use smartrelay::peripherals::{Input, PeripheralRegistry};
use smartrelay::pins;
use smartrelay::sensors::temperature::NtcThermistor;

/// Main loop period.  Debounce and blink timing resolve to this.
const LOOP_PERIOD_MS: u32 = 10;

/// Peripheral id of the physical button (never a switch id).
const BUTTON_ID: i32 = -1;

fn build_registry(config: &DeviceConfig) -> Result<PeripheralRegistry> {
    let mut registry = PeripheralRegistry::new();
    let timing = PressTiming::from_button(&config.button);

    for sw in &config.switches {
        let Some(ch) = pins::channel(sw.id) else {
            warn!("Switch {}: no such channel on this board", sw.id);
            continue;
        };
        // SAFETY: board channel pins are used by nothing else.
        let relay = PinDriver::output(unsafe { AnyOutputPin::new(ch.relay_gpio) })?;
        let out = OutputPin::new(sw.id, relay, ch.relay_active_level)
            .map_err(|e| anyhow!("relay {}: {e}", sw.id))?;
        registry.add_output(Box::new(out));

        if ch.input_gpio >= 0 {
            // SAFETY: as above.
            let mut pin = PinDriver::input(unsafe { AnyIOPin::new(ch.input_gpio) })?;
            pin.set_pull(if ch.input_active_level { Pull::Down } else { Pull::Up })?;
            registry.add_input(Box::new(InputPin::new(
                sw.id,
                pin,
                ch.input_active_level,
                timing,
            )));
        }
    }

    match NtcThermistor::new(pins::SYS_TEMP_ADC_CHANNEL) {
        Ok(sensor) => registry.set_system_temp_sensor(Box::new(sensor)),
        Err(e) => warn!("System temperature sensor unavailable: {e}"),
    }
    Ok(registry)
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  SmartRelay v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let clock = SystemClock::new();

    // ── 2. Load and migrate config ────────────────────────────
    let nvs = NvsAdapter::new().map_err(|e| anyhow!("NVS init failed: {e}"))?;
    let mut config = nvs.load().unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        DeviceConfig::default()
    });

    let mut server = HapServer::new(nvs.clone());
    let mac = device_id::read_mac();
    let env = MigrationEnv {
        paired: server.is_paired(),
        mac,
    };
    if migrate::migrate(&mut config, &env, &nvs) {
        info!("Config now v{}", config.cfg_version);
    }
    config.device_id = device_id::expand_mac_placeholders(&config.device_id, &mac);
    config.name = device_id::expand_mac_placeholders(&config.name, &mac);
    config.host_name = device_id::expand_mac_placeholders(&config.host_name, &mac);
    info!("Device ID: {} (host: {})", config.device_id, config.host_name);

    // ── 3. Peripherals ────────────────────────────────────────
    let registry = build_registry(&config)?;

    let mut button = if config.button.gpio >= 0 {
        // SAFETY: the button pin is configured for nothing else.
        let mut pin = PinDriver::input(unsafe { AnyIOPin::new(config.button.gpio) })?;
        pin.set_pull(if config.button.on_value { Pull::Down } else { Pull::Up })?;
        Some(InputPin::new(
            BUTTON_ID,
            pin,
            config.button.on_value,
            PressTiming::from_button(&config.button),
        ))
    } else {
        None
    };

    let mut led = if config.status_led.gpio >= 0 {
        // SAFETY: the LED pin is configured for nothing else.
        let pin = PinDriver::output(unsafe { AnyOutputPin::new(config.status_led.gpio) })?;
        Some(StatusLed::new(pin, config.status_led.active_level))
    } else {
        None
    };

    // ── 4. Network ────────────────────────────────────────────
    let esp_wifi = EspWifi::new(peripherals.modem, sysloop, None)?;
    let mut wifi = WifiAdapter::new(esp_wifi, config.host_name.clone());
    if let Err(e) = wifi.apply(&config.network) {
        warn!("WiFi: initial configuration rejected: {e}");
    }

    // ── 5. Application service ────────────────────────────────
    let mut sink = LogEventSink::new();
    let mut app = AppService::new(config, registry);
    {
        let mut ports = Ports {
            server: &mut server,
            led: &mut led,
            network: &mut wifi,
            config: &nvs,
            sink: &mut sink,
        };
        app.boot(clock.now_ms(), &mut ports);
    }

    info!("System ready. Entering main loop.");

    // ── 6. Main loop ──────────────────────────────────────────
    loop {
        let now_ms = clock.now_ms();

        if let Some(btn) = button.as_mut() {
            for event in btn.poll(now_ms) {
                app.post(PlatformEvent::Button {
                    event,
                    pressed: btn.state(),
                });
            }
        }

        while let Some(state) = server.poll_state() {
            app.post(PlatformEvent::ServerStateChanged(state));
        }

        let mut ports = Ports {
            server: &mut server,
            led: &mut led,
            network: &mut wifi,
            config: &nvs,
            sink: &mut sink,
        };
        app.poll(now_ms, &mut ports);

        if let Some(l) = led.as_mut() {
            l.tick(now_ms);
        }

        FreeRtos::delay_ms(LOOP_PERIOD_MS);
    }
}
