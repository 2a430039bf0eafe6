//! Application service, the runtime context.
//!
//! [`AppService`] owns the configuration, the peripheral registry, the
//! accessory-server lifecycle (and through it the catalog), the thermal
//! guard, the status indicator, the button handler, the deferred-action
//! scheduler and the platform event queue.  All I/O flows through port
//! traits handed in per call via [`Ports`], so independent instances can
//! run side by side in tests.
//!
//! ```text
//!  EventQueue ──▶ ┌─────────────────────────────────┐ ──▶ EventSink
//!                 │            AppService           │
//!  Scheduler  ──▶ │ Lifecycle · Indicator · Button  │ ◀─▶ AccessoryServerPort
//!                 │ ThermalGuard · Registry/Catalog │ ──▶ LedPort / NetworkPort
//!                 └─────────────────────────────────┘ ◀─▶ ConfigPort
//! ```
//!
//! Everything runs on one logical thread: adapters only post events, and
//! [`AppService::poll`] drains them in FIFO order.

use log::{error, info, warn};

use crate::catalog::component::SOURCE_INPUT;
use crate::catalog::{Catalog, ComponentEffect};
use crate::config::{DeviceConfig, InitialState};
use crate::diagnostics::{HeapStats, RuntimeMetrics, StatusReport};
use crate::error::{ComponentError, Result, TemperatureError};
use crate::events::EventQueue;
use crate::peripherals::{Input, InputEvent, Output, PeripheralRegistry, PowerMeter};
use crate::safety::{SOURCE_OVERHEAT, ThermalAction, ThermalGuard};
use crate::scheduler::{DeferredAction, Scheduler};

use super::button::{
    ButtonAction, ButtonGestureHandler, RESET_DELAY_MS, RESET_IDENTIFY_COUNT, SOURCE_BUTTON,
    next_switch_states,
};
use super::commands::AppCommand;
use super::events::{AppEvent, PlatformEvent, UpdateDecision, UpdateStatus};
use super::indicator::{BlinkPattern, IndicatorInputs, StatusIndicator};
use super::lifecycle::{ServiceFlag, ServiceLifecycle};
use super::ports::{
    AccessoryServerPort, ConfigPort, EventSink, LedPort, NetworkPort, ServerState,
};

/// Application name the update engine must present.
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Identify blinks requested by a controller.
pub const IDENTIFY_COUNT: u8 = 3;

/// Housekeeping ticks between status reports.
pub const STATUS_REPORT_EVERY: u64 = 8;

/// Unsaved configuration is flushed after staying dirty this long.
pub const AUTO_SAVE_DELAY_MS: u64 = 5000;

/// Diagnostic tag for switch changes requested over RPC.
pub const SOURCE_RPC: &str = "rpc";

/// Collaborators handed to every service call.
pub struct Ports<'a> {
    pub server: &'a mut dyn AccessoryServerPort,
    pub led: &'a mut dyn LedPort,
    pub network: &'a mut dyn NetworkPort,
    pub config: &'a dyn ConfigPort,
    pub sink: &'a mut dyn EventSink,
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService {
    config: DeviceConfig,
    registry: PeripheralRegistry,
    lifecycle: ServiceLifecycle,
    thermal: ThermalGuard,
    indicator: StatusIndicator,
    button: ButtonGestureHandler,
    scheduler: Scheduler,
    queue: EventQueue,
    now_ms: u64,
    next_housekeeping_ms: u64,
    tick_count: u64,
    last_temperature_c: Option<i32>,
    config_dirty: bool,
    dirty_since_ms: u64,
}

impl AppService {
    /// Construct from a migrated configuration and a populated registry.
    ///
    /// Does **not** start anything; call [`boot`](Self::boot) next.
    pub fn new(config: DeviceConfig, registry: PeripheralRegistry) -> Self {
        let thermal = ThermalGuard::new(&config);
        Self {
            config,
            registry,
            lifecycle: ServiceLifecycle::new(),
            thermal,
            indicator: StatusIndicator::new(),
            button: ButtonGestureHandler::new(),
            scheduler: Scheduler::new(),
            queue: EventQueue::new(),
            now_ms: 0,
            next_housekeeping_ms: 0,
            tick_count: 0,
            last_temperature_c: None,
            config_dirty: false,
            dirty_since_ms: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// First start attempt and LED evaluation; arms the housekeeping tick.
    pub fn boot(&mut self, now_ms: u64, ports: &mut Ports<'_>) {
        self.now_ms = now_ms;
        ports.sink.emit(&AppEvent::Started {
            cfg_version: self.config.cfg_version,
        });
        info!("AppService started (cfg v{})", self.config.cfg_version);
        self.start_service(false, ports);
        self.refresh_indicator(ports);
        self.next_housekeeping_ms = now_ms + u64::from(self.config.housekeeping_interval_ms);
    }

    /// Post an event from a platform collaborator.  Returns `false` if dropped.
    pub fn post(&self, event: PlatformEvent) -> bool {
        self.queue.post(event)
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// One pass of the control loop: fire due timers, poll inputs, drain
    /// events, then run housekeeping if its period has elapsed.
    pub fn poll(&mut self, now_ms: u64, ports: &mut Ports<'_>) {
        self.now_ms = now_ms;
        self.scheduler.tick(now_ms, &mut self.queue);

        for (id, level, event) in self.registry.poll_inputs(now_ms) {
            self.queue.post(PlatformEvent::Input { id, event, level });
        }

        while let Some(event) = self.queue.pop() {
            self.handle_event(event, ports);
        }

        if now_ms >= self.next_housekeeping_ms {
            self.next_housekeeping_ms = now_ms + u64::from(self.config.housekeeping_interval_ms);
            self.housekeeping(ports);
        }
    }

    /// The periodic tick: legacy-layout check, deferred start, LED,
    /// thermal interlock, config auto-save and the status report.
    pub fn housekeeping(&mut self, ports: &mut Ports<'_>) {
        self.tick_count += 1;
        let temperature = self.system_temperature().ok();
        self.last_temperature_c = temperature;

        if self.config.legacy_hap_layout && !ports.server.is_paired() {
            self.restart_service(ports);
            return;
        }

        // Retry every tick; quiet because "not provisioned" is the norm.
        self.start_service(true, ports);
        self.refresh_indicator(ports);
        self.check_overheat(temperature, ports);
        self.auto_save_if_needed(ports.config);

        if self.tick_count % STATUS_REPORT_EVERY == 0 {
            let report = self.status_report(ports.server);
            info!("{report}");
            ports.sink.emit(&AppEvent::Status(report));
        }
    }

    // ── Service control ───────────────────────────────────────

    pub fn start_service(&mut self, quiet: bool, ports: &mut Ports<'_>) -> bool {
        self.lifecycle.start_service(
            quiet,
            ports.server,
            &mut self.registry,
            &self.config,
            ports.sink,
        )
    }

    pub fn stop_service(&mut self, ports: &mut Ports<'_>) {
        self.lifecycle.stop_service(ports.server, ports.sink);
    }

    pub fn restart_service(&mut self, ports: &mut Ports<'_>) {
        self.lifecycle
            .restart_service(ports.server, &mut self.config, ports.config, ports.sink);
    }

    // ── Event dispatch ────────────────────────────────────────

    fn handle_event(&mut self, event: PlatformEvent, ports: &mut Ports<'_>) {
        match event {
            PlatformEvent::ServerStateChanged(state) => {
                self.lifecycle.on_server_state(state, ports.sink);
            }
            PlatformEvent::Reboot | PlatformEvent::RebootAfter => self.on_reboot(ports),
            PlatformEvent::UpdateStatus(status) => {
                // On success a reboot follows anyway.
                if status == UpdateStatus::Error {
                    warn!("Firmware update failed");
                    self.lifecycle
                        .flags_mut()
                        .clear(ServiceFlag::FirmwareUpdate);
                }
            }
            PlatformEvent::Identify { aid } => {
                info!("Identify request for aid {aid}");
                self.indicator.identify(IDENTIFY_COUNT);
                self.refresh_indicator(ports);
            }
            PlatformEvent::Input { id, event, level } => self.on_input(id, event, level, ports),
            PlatformEvent::Button { event, pressed } => self.on_button(event, pressed, ports),
            PlatformEvent::Timer(DeferredAction::NetworkReset) => {
                if self.button.confirm_reset() {
                    self.network_reset(ports);
                }
            }
        }
    }

    fn on_reboot(&mut self, ports: &mut Ports<'_>) {
        self.lifecycle.flags_mut().set(ServiceFlag::RebootPending);
        if ports.server.state() == ServerState::Running {
            ports.server.stop();
        }
        self.force_save_if_dirty(ports.config);
    }

    fn on_input(&mut self, id: i32, event: InputEvent, level: bool, ports: &mut Ports<'_>) {
        let effects = self
            .lifecycle
            .catalog_mut()
            .dispatch_input(&mut self.registry, id, event, level);
        for (key, effect) in effects {
            match effect {
                ComponentEffect::StateChanged(on) => {
                    self.record_switch_state(key.id, on, SOURCE_INPUT, ports.sink);
                }
                ComponentEffect::Press(press) => {
                    ports.sink.emit(&AppEvent::ProgrammableSwitch { id: key.id, press });
                }
            }
        }
    }

    fn on_button(&mut self, event: InputEvent, pressed: bool, ports: &mut Ports<'_>) {
        match self.button.on_event(event, pressed) {
            Some(ButtonAction::RefreshIndicator) => self.refresh_indicator(ports),
            Some(ButtonAction::CycleSwitches) => self.cycle_switches(ports),
            Some(ButtonAction::BeginReset) => {
                if self.has_led() {
                    let p = BlinkPattern::IDENTIFY;
                    ports.led.blink(p.on_ms, p.off_ms);
                    self.indicator.invalidate();
                }
                self.scheduler.schedule_once(
                    DeferredAction::NetworkReset,
                    RESET_DELAY_MS,
                    self.now_ms,
                );
            }
            None => {}
        }
    }

    /// Increment the switch-type components' states as one binary number.
    fn cycle_switches(&mut self, ports: &mut Ports<'_>) {
        let catalog = self.lifecycle.catalog();
        let ids: Vec<i32> = catalog.switches().map(|c| c.id()).collect();
        if ids.is_empty() {
            return;
        }
        let states: Vec<bool> = catalog
            .switches()
            .map(|c| c.state(&self.registry).unwrap_or(false))
            .collect();
        let next = next_switch_states(&states);
        for ((id, old), new) in ids.into_iter().zip(states).zip(next) {
            let Some(comp) = self.lifecycle.catalog().switch_component(id) else {
                continue;
            };
            if let Err(e) = comp.set_state(&mut self.registry, new, SOURCE_BUTTON) {
                warn!("Switch {id}: {e}");
                continue;
            }
            if old != new {
                self.record_switch_state(id, new, SOURCE_BUTTON, ports.sink);
            }
        }
    }

    /// The deferred half of the long-press reset.
    fn network_reset(&mut self, ports: &mut Ports<'_>) {
        info!("Resetting network to AP provisioning mode");
        if self.has_led() {
            ports.led.blink(0, 0);
        }
        self.indicator.identify(RESET_IDENTIFY_COUNT);
        self.config.network.sta_enable = false;
        self.config.network.ap_enable = true;
        if let Err(e) = ports.config.save(&self.config) {
            error!("Failed to save network reset: {e}");
        }
        if let Err(e) = ports.network.apply(&self.config.network) {
            error!("Failed to apply network reset: {e}");
        }
        ports.sink.emit(&AppEvent::NetworkReset);
        self.indicator.invalidate();
        self.refresh_indicator(ports);
    }

    // ── Commands ──────────────────────────────────────────────

    /// Process a command from the diagnostics/RPC collaborator.
    pub fn handle_command(&mut self, cmd: AppCommand, ports: &mut Ports<'_>) -> Result<()> {
        match cmd {
            AppCommand::StartService => {
                self.start_service(false, ports);
            }
            AppCommand::StopService => self.stop_service(ports),
            AppCommand::RestartService => self.restart_service(ports),
            AppCommand::SetSwitch { id, on } => {
                let comp = self
                    .lifecycle
                    .catalog()
                    .switch_component(id)
                    .ok_or(ComponentError::NoOutput)?;
                let old = comp.state(&self.registry)?;
                comp.set_state(&mut self.registry, on, SOURCE_RPC)?;
                if old != on {
                    self.record_switch_state(id, on, SOURCE_RPC, ports.sink);
                }
            }
            AppCommand::Identify => {
                self.indicator.identify(IDENTIFY_COUNT);
                self.refresh_indicator(ports);
            }
            AppCommand::SaveConfig => self.force_save_if_dirty(ports.config),
        }
        Ok(())
    }

    /// Update-engine begin hook.  `prior` is the answer of hooks that ran
    /// before this one; an objection is passed through untouched.
    pub fn on_update_begin(
        &mut self,
        app_name: &str,
        prior: UpdateDecision,
        ports: &mut Ports<'_>,
    ) -> UpdateDecision {
        if prior != UpdateDecision::Proceed {
            return prior;
        }
        if app_name != APP_NAME {
            error!("Wrong app name '{app_name}'");
            ports.sink.emit(&AppEvent::UpdateRejected);
            return UpdateDecision::Abort;
        }
        self.lifecycle.flags_mut().set(ServiceFlag::FirmwareUpdate);
        if ports.server.state() != ServerState::Idle {
            self.stop_service(ports);
            return UpdateDecision::Wait;
        }
        info!("Starting firmware update");
        UpdateDecision::Proceed
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        self.lifecycle.catalog()
    }

    pub fn registry(&self) -> &PeripheralRegistry {
        &self.registry
    }

    pub fn find_input(&self, id: i32) -> Option<&dyn Input> {
        self.registry.input(id)
    }

    pub fn find_output(&self, id: i32) -> Option<&dyn Output> {
        self.registry.output(id)
    }

    pub fn find_power_meter(&self, id: i32) -> Option<&dyn PowerMeter> {
        self.registry.power_meter(id)
    }

    /// Current service flags as a bitset.
    pub fn service_flags(&self) -> u8 {
        self.lifecycle.flags().bits()
    }

    pub fn has_service_flag(&self, flag: ServiceFlag) -> bool {
        self.lifecycle.flags().contains(flag)
    }

    /// Best-effort system temperature (whole degrees Celsius).
    pub fn system_temperature(&mut self) -> core::result::Result<i32, TemperatureError> {
        match self.registry.read_system_temperature() {
            None => Err(TemperatureError::NotFound),
            Some(Err(e)) => Err(TemperatureError::Sensor(e)),
            Some(Ok(t)) => Ok(t as i32),
        }
    }

    /// Temperature seen by the last housekeeping tick.
    pub fn last_temperature(&self) -> Option<i32> {
        self.last_temperature_c
    }

    /// `"type.id: info; ..."` over all components.
    pub fn component_status(&self) -> String {
        self.lifecycle.catalog().status_string(&self.registry)
    }

    pub fn is_overheated(&self) -> bool {
        self.thermal.is_overheated()
    }

    pub fn is_reset_pending(&self) -> bool {
        self.button.is_reset_pending()
    }

    pub fn applied_pattern(&self) -> Option<BlinkPattern> {
        self.indicator.applied()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn status_report(&self, server: &dyn AccessoryServerPort) -> StatusReport {
        StatusReport {
            uptime_ms: self.now_ms,
            sessions: server.session_count(),
            cn: server.configuration_number().unwrap_or(0),
            heap: HeapStats::collect(),
            temperature_c: self.last_temperature_c,
            service_flags: self.service_flags(),
            components: self.component_status(),
        }
    }

    pub fn metrics(&self, server: &dyn AccessoryServerPort) -> RuntimeMetrics {
        RuntimeMetrics {
            uptime_secs: self.now_ms / 1000,
            housekeeping_ticks: self.tick_count,
            heap: HeapStats::collect(),
            sessions: server.session_count(),
            service_flags: self.service_flags(),
            overheated: self.thermal.is_overheated(),
            components: self.catalog().components().len(),
            accessories: self.catalog().accessories().len(),
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn has_led(&self) -> bool {
        self.config.status_led.gpio >= 0
    }

    fn refresh_indicator(&mut self, ports: &mut Ports<'_>) {
        if !self.has_led() {
            return;
        }
        let inputs = IndicatorInputs {
            identify_pending: false,
            button_held: self.button.is_held(),
            link: ports.network.link_state(),
            update_in_progress: self.lifecycle.flags().contains(ServiceFlag::FirmwareUpdate),
            server: ports.server.state(),
            ap_enabled: self.config.network.ap_enable,
            paired: ports.server.is_paired(),
        };
        self.indicator.evaluate(inputs, ports.led);
    }

    fn check_overheat(&mut self, temperature: Option<i32>, ports: &mut Ports<'_>) {
        match self.thermal.evaluate(temperature) {
            Some(ThermalAction::Trip) => {
                self.lifecycle.flags_mut().set(ServiceFlag::Overheat);
                self.stop_service(ports);
                self.registry.set_all_outputs(false, SOURCE_OVERHEAT);
                ports
                    .sink
                    .emit(&AppEvent::OverheatTripped(temperature.unwrap_or_default()));
            }
            Some(ThermalAction::Recover) => {
                self.lifecycle.flags_mut().clear(ServiceFlag::Overheat);
                ports
                    .sink
                    .emit(&AppEvent::OverheatCleared(temperature.unwrap_or_default()));
            }
            None => {}
        }
    }

    /// Emit the change and remember it for restore-last-state switches.
    fn record_switch_state(
        &mut self,
        id: i32,
        on: bool,
        source: &'static str,
        sink: &mut dyn EventSink,
    ) {
        sink.emit(&AppEvent::SwitchChanged {
            id,
            state: on,
            source,
        });
        let Some(sw) = self.config.switch_mut(id) else {
            return;
        };
        if sw.initial_state == InitialState::Last && sw.state != on {
            sw.state = on;
            self.mark_config_dirty();
        }
    }

    // ── Config dirty-flag management ──────────────────────────

    pub fn mark_config_dirty(&mut self) {
        if !self.config_dirty {
            self.config_dirty = true;
            self.dirty_since_ms = self.now_ms;
        }
    }

    /// Save once the config has been dirty for [`AUTO_SAVE_DELAY_MS`].
    /// Returns `true` if the config was saved.
    pub fn auto_save_if_needed(&mut self, storage: &dyn ConfigPort) -> bool {
        if !self.config_dirty {
            return false;
        }
        if self.now_ms.saturating_sub(self.dirty_since_ms) < AUTO_SAVE_DELAY_MS {
            return false;
        }
        match storage.save(&self.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config auto-saved");
                true
            }
            Err(e) => {
                warn!("Config auto-save failed: {}", e);
                false
            }
        }
    }

    /// Save now if dirty (reboot path, explicit request).
    pub fn force_save_if_dirty(&mut self, storage: &dyn ConfigPort) {
        if !self.config_dirty {
            return;
        }
        match storage.save(&self.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config force-saved");
            }
            Err(e) => {
                warn!("Config force-save failed: {}", e);
            }
        }
    }

    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }
}
