//! Mock collaborators for integration tests.
//!
//! Every port call is recorded so tests can assert on the full command
//! history without a protocol engine, WiFi stack or real GPIO.
//! Peripherals share their state through `Rc<Cell<_>>` handles, so a test
//! can still read and drive them after the registry has taken ownership.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use smartrelay::app::events::AppEvent;
use smartrelay::app::ports::{
    AccessoryServerPort, ConfigError, ConfigPort, EventSink, LedPort, LinkState, NetworkPort,
    ServerState,
};
use smartrelay::app::service::{AppService, Ports};
use smartrelay::catalog::Accessory;
use smartrelay::config::{DeviceConfig, NetworkConfig};
use smartrelay::error::{NetworkError, PeripheralError, ServerError};
use smartrelay::peripherals::{Input, Output, PeripheralRegistry, PowerMeter, TempSensor};

// ── Accessory server ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ServerCall {
    Start { aid: u64, services: usize },
    StartBridge { aids: Vec<u64> },
    Stop,
    IncrementCn,
}

pub struct MockServer {
    pub state: ServerState,
    pub paired: bool,
    pub provisioned: bool,
    pub cn: u16,
    pub sessions: usize,
    pub calls: Vec<ServerCall>,
}

impl MockServer {
    pub fn new() -> Self {
        Self {
            state: ServerState::Idle,
            paired: true,
            provisioned: true,
            cn: 1,
            sessions: 0,
            calls: Vec::new(),
        }
    }

    pub fn starts(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, ServerCall::Start { .. } | ServerCall::StartBridge { .. }))
            .count()
    }

    pub fn stops(&self) -> usize {
        self.calls.iter().filter(|c| **c == ServerCall::Stop).count()
    }
}

impl AccessoryServerPort for MockServer {
    fn state(&self) -> ServerState {
        self.state
    }

    fn is_paired(&self) -> bool {
        self.paired
    }

    fn is_provisioned(&self) -> bool {
        self.provisioned
    }

    fn start(&mut self, primary: &Accessory) {
        self.calls.push(ServerCall::Start {
            aid: primary.aid,
            services: primary.exposed_services().count(),
        });
        self.state = ServerState::Running;
    }

    fn start_bridge(&mut self, primary: &Accessory, bridged: &[Accessory]) {
        let aids = std::iter::once(primary.aid)
            .chain(bridged.iter().map(|a| a.aid))
            .collect();
        self.calls.push(ServerCall::StartBridge { aids });
        self.state = ServerState::Running;
    }

    fn stop(&mut self) {
        self.calls.push(ServerCall::Stop);
        self.state = ServerState::Stopping;
    }

    fn configuration_number(&self) -> Result<u16, ServerError> {
        Ok(self.cn)
    }

    fn increment_configuration_number(&mut self) -> Result<u16, ServerError> {
        self.calls.push(ServerCall::IncrementCn);
        self.cn += 1;
        Ok(self.cn)
    }

    fn session_count(&self) -> usize {
        self.sessions
    }
}

// ── Status LED ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedCall {
    Blink(u32, u32),
    Level(bool),
    Release,
}

#[derive(Default)]
pub struct MockLed {
    pub calls: Vec<LedCall>,
}

impl MockLed {
    pub fn last(&self) -> Option<LedCall> {
        self.calls.last().copied()
    }

    /// Last non-cancelling blink programmed.
    pub fn last_blink(&self) -> Option<(u32, u32)> {
        self.calls.iter().rev().find_map(|c| match c {
            LedCall::Blink(on, off) if *on != 0 || *off != 0 => Some((*on, *off)),
            _ => None,
        })
    }
}

impl LedPort for MockLed {
    fn blink(&mut self, on_ms: u32, off_ms: u32) {
        self.calls.push(LedCall::Blink(on_ms, off_ms));
    }

    fn set_level(&mut self, lit: bool) {
        self.calls.push(LedCall::Level(lit));
    }

    fn release(&mut self) {
        self.calls.push(LedCall::Release);
    }
}

// ── Network ──────────────────────────────────────────────────

pub struct MockNetwork {
    pub link: LinkState,
    pub applied: Vec<NetworkConfig>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self {
            link: LinkState::IpAcquired,
            applied: Vec::new(),
        }
    }
}

impl NetworkPort for MockNetwork {
    fn link_state(&self) -> LinkState {
        self.link
    }

    fn apply(&mut self, config: &NetworkConfig) -> Result<(), NetworkError> {
        self.applied.push(config.clone());
        Ok(())
    }
}

// ── Config storage ───────────────────────────────────────────

#[derive(Default)]
pub struct MockConfig {
    pub saved: RefCell<Vec<DeviceConfig>>,
    pub fail: Cell<bool>,
}

impl MockConfig {
    pub fn saves(&self) -> usize {
        self.saved.borrow().len()
    }

    pub fn last_saved(&self) -> Option<DeviceConfig> {
        self.saved.borrow().last().cloned()
    }
}

impl ConfigPort for MockConfig {
    fn load(&self) -> Result<DeviceConfig, ConfigError> {
        Ok(self.last_saved().unwrap_or_default())
    }

    fn save(&self, config: &DeviceConfig) -> Result<(), ConfigError> {
        if self.fail.get() {
            return Err(ConfigError::IoError);
        }
        self.saved.borrow_mut().push(config.clone());
        Ok(())
    }
}

// ── Event sink ───────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Peripherals ──────────────────────────────────────────────

pub struct MockOutput {
    pub id: i32,
    pub on: Rc<Cell<bool>>,
    pub sources: Rc<RefCell<Vec<String>>>,
}

impl Output for MockOutput {
    fn id(&self) -> i32 {
        self.id
    }

    fn state(&self) -> bool {
        self.on.get()
    }

    fn set_state(&mut self, on: bool, source: &str) -> Result<(), PeripheralError> {
        self.on.set(on);
        self.sources.borrow_mut().push(source.to_string());
        Ok(())
    }
}

pub struct MockInput {
    pub id: i32,
    pub level: Rc<Cell<bool>>,
}

impl Input for MockInput {
    fn id(&self) -> i32 {
        self.id
    }

    fn state(&self) -> bool {
        self.level.get()
    }
}

pub struct MockPowerMeter {
    pub id: i32,
    pub watts: f32,
}

impl PowerMeter for MockPowerMeter {
    fn id(&self) -> i32 {
        self.id
    }

    fn power_w(&self) -> Result<f32, PeripheralError> {
        Ok(self.watts)
    }

    fn energy_wh(&self) -> Result<f32, PeripheralError> {
        Ok(0.0)
    }
}

/// Temperature sensor whose reading the test controls; `None` = read error.
pub struct MockTempSensor(pub Rc<Cell<Option<f32>>>);

impl TempSensor for MockTempSensor {
    fn temperature_c(&mut self) -> Result<f32, PeripheralError> {
        self.0.get().ok_or(PeripheralError::AdcReadFailed)
    }
}

/// Handles into the peripherals owned by a registry.
#[derive(Default)]
pub struct Board {
    pub outputs: Vec<Rc<Cell<bool>>>,
    pub output_sources: Vec<Rc<RefCell<Vec<String>>>>,
    pub inputs: Vec<Rc<Cell<bool>>>,
    pub temperature: Rc<Cell<Option<f32>>>,
}

impl Board {
    pub fn output(&self, id: usize) -> bool {
        self.outputs[id].get()
    }

    pub fn set_input(&self, id: usize, level: bool) {
        self.inputs[id].set(level);
    }
}

/// Registry with `n` channels (input + output with ids `0..n`) and a
/// system temperature sensor reading 25 C.
pub fn registry(n: i32) -> (PeripheralRegistry, Board) {
    let mut reg = PeripheralRegistry::new();
    let mut board = Board::default();
    for id in 0..n {
        let on = Rc::new(Cell::new(false));
        let sources = Rc::new(RefCell::new(Vec::new()));
        let level = Rc::new(Cell::new(false));
        reg.add_output(Box::new(MockOutput {
            id,
            on: on.clone(),
            sources: sources.clone(),
        }));
        reg.add_input(Box::new(MockInput {
            id,
            level: level.clone(),
        }));
        board.outputs.push(on);
        board.output_sources.push(sources);
        board.inputs.push(level);
    }
    board.temperature.set(Some(25.0));
    reg.set_system_temp_sensor(Box::new(MockTempSensor(board.temperature.clone())));
    (reg, board)
}

// ── Harness ──────────────────────────────────────────────────

/// Every mock collaborator, lendable as a [`Ports`] bundle.
pub struct Harness {
    pub server: MockServer,
    pub led: MockLed,
    pub network: MockNetwork,
    pub config: MockConfig,
    pub sink: RecordingSink,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            server: MockServer::new(),
            led: MockLed::default(),
            network: MockNetwork::new(),
            config: MockConfig::default(),
            sink: RecordingSink::default(),
        }
    }

    pub fn ports(&mut self) -> Ports<'_> {
        Ports {
            server: &mut self.server,
            led: &mut self.led,
            network: &mut self.network,
            config: &self.config,
            sink: &mut self.sink,
        }
    }
}

/// Service over `channels` mock channels, booted at t = 0.
pub fn booted(config: DeviceConfig, channels: i32) -> (AppService, Board, Harness) {
    let (reg, board) = registry(channels);
    let mut app = AppService::new(config, reg);
    let mut h = Harness::new();
    app.boot(0, &mut h.ports());
    (app, board, h)
}

/// One control-loop pass at `now_ms`.
pub fn poll(app: &mut AppService, h: &mut Harness, now_ms: u64) {
    app.poll(now_ms, &mut h.ports());
}

/// Run housekeeping ticks `from..=to` (1 s interval).
pub fn run_ticks(app: &mut AppService, h: &mut Harness, from: u64, to: u64) {
    for t in from..=to {
        poll(app, h, t * 1000);
    }
}

/// Report the engine reached Idle and let the service process it.
pub fn server_went_idle(app: &mut AppService, h: &mut Harness, now_ms: u64) {
    h.server.state = ServerState::Idle;
    app.post(smartrelay::app::events::PlatformEvent::ServerStateChanged(ServerState::Idle));
    poll(app, h, now_ms);
}

/// Factory config with one switch per entry (`svc_type`, ids `0..n`) and
/// AP provisioning off, so a healthy device shows a dark LED.
pub fn config_with(svc_types: &[i32]) -> DeviceConfig {
    let mut c = DeviceConfig::default();
    c.network.ap_enable = false;
    c.switches.clear();
    for (i, t) in svc_types.iter().enumerate() {
        c.switches
            .push(smartrelay::config::SwitchConfig::new(i as i32, *t))
            .unwrap();
    }
    c
}
