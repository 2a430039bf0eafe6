//! Catalog construction from switch configuration entries.
//!
//! ```text
//!   SwitchConfig ──▶ resolve peripherals ──▶ Component::init
//!        │                                       │ err → log, skip
//!        ▼                                       ▼
//!   legacy layout? ── yes ──▶ attach to primary (category follows switch)
//!        │ no
//!        ▼
//!   hidden? ── yes ──▶ attach to primary, never advertised
//!        │ no
//!        ▼
//!   dedicated bridged accessory (aid = base + id)
//!        │
//!        ▼
//!   detached input? ──▶ stateless switch accessory (aid = 0x400 + id)
//! ```

use log::{error, info, warn};

use crate::config::{DeviceConfig, InitialState, InMode, StatelessSwitchConfig, SwitchConfig};
use crate::peripherals::PeripheralRegistry;

use super::Catalog;
use super::accessory::{Accessory, Category, Service};
use super::component::{Component, ComponentKind};

/// Diagnostic tag for outputs driven by the boot-time initial state.
pub const SOURCE_INIT: &str = "init";

/// Builds components and accessories against a peripheral registry.
pub struct AccessoryBuilder<'a> {
    registry: &'a mut PeripheralRegistry,
    apply_initial_state: bool,
}

impl<'a> AccessoryBuilder<'a> {
    /// `apply_initial_state` is set only for the first build after boot;
    /// rebuilds after teardown leave outputs untouched.
    pub fn new(registry: &'a mut PeripheralRegistry, apply_initial_state: bool) -> Self {
        Self {
            registry,
            apply_initial_state,
        }
    }

    /// Build the primary accessory and every configured switch.
    pub fn build(&mut self, config: &DeviceConfig) -> Catalog {
        info!("=== Creating accessories");
        let mut catalog = Catalog::new();
        catalog.push_accessory(Accessory::primary(&config.name));
        for sw in &config.switches {
            let ssw = config.stateless_switch(sw.id);
            self.add_switch(&mut catalog, sw, ssw, config.legacy_hap_layout);
        }
        catalog
    }

    /// Build one switch entry into `catalog`.  The catalog must already
    /// hold its primary accessory.
    pub fn add_switch(
        &mut self,
        catalog: &mut Catalog,
        cfg: &SwitchConfig,
        ssw_cfg: Option<&StatelessSwitchConfig>,
        to_primary: bool,
    ) {
        let Ok(aid_offset) = u64::try_from(cfg.id) else {
            error!("Switch {}: negative id, skipped", cfg.id);
            return;
        };
        let kind = ComponentKind::from_svc_type(cfg.svc_type);
        let mut comp = Component::new(cfg.id, kind, &cfg.name, cfg.in_mode);
        if let Err(e) = comp.init(self.registry) {
            error!("Error creating switch {}: {}", cfg.id, e);
            return;
        }
        if self.apply_initial_state {
            self.apply_initial(&comp, cfg);
        }

        let key = comp.key();
        if to_primary {
            // Multi-switch devices get several primary services here.
            // Already-paired controllers expect exactly this topology.
            comp.set_primary(true);
            catalog.push_component(comp);
            if let Some(pri) = catalog.primary_mut() {
                pri.set_category(kind.category());
                pri.add_service(Service::Component(key));
            }
            return;
        }

        catalog.push_component(comp);
        match kind.aid_base() {
            Some(base) if kind.is_exposed() => {
                let mut acc =
                    Accessory::new(base + aid_offset, Category::BridgedAccessory, &cfg.name);
                acc.add_service(Service::AccessoryInformation);
                acc.add_service(Service::Component(key));
                catalog.push_accessory(acc);
            }
            _ => {
                if let Some(pri) = catalog.primary_mut() {
                    pri.add_service(Service::Component(key));
                }
            }
        }

        if cfg.in_mode == InMode::Detached {
            if let Some(ssw) = ssw_cfg {
                info!("Creating a stateless switch for input {}", cfg.id);
                self.add_stateless_switch(catalog, ssw);
            }
        }
    }

    fn add_stateless_switch(&mut self, catalog: &mut Catalog, cfg: &StatelessSwitchConfig) {
        let Ok(aid_offset) = u64::try_from(cfg.id) else {
            error!("Stateless switch {}: negative id, skipped", cfg.id);
            return;
        };
        let kind = ComponentKind::StatelessSwitch;
        let mut comp = Component::new(cfg.id, kind, &cfg.name, InMode::Detached);
        if let Err(e) = comp.init(self.registry) {
            error!("Error creating stateless switch {}: {}", cfg.id, e);
            return;
        }
        let key = comp.key();
        catalog.push_component(comp);
        let base = kind.aid_base().unwrap_or_default();
        let mut acc = Accessory::new(base + aid_offset, Category::BridgedAccessory, &cfg.name);
        acc.add_service(Service::AccessoryInformation);
        acc.add_service(Service::Component(key));
        catalog.push_accessory(acc);
    }

    fn apply_initial(&mut self, comp: &Component, cfg: &SwitchConfig) {
        let on = match cfg.initial_state {
            InitialState::Off => false,
            InitialState::On => true,
            InitialState::Last => cfg.state,
            InitialState::Input => comp
                .input_id()
                .and_then(|id| self.registry.input(id))
                .is_some_and(|i| i.state()),
        };
        if let Err(e) = comp.set_state(self.registry, on, SOURCE_INIT) {
            warn!("Switch {}: initial state not applied: {}", cfg.id, e);
        }
    }
}
