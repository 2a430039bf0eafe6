//! Component catalog.
//!
//! The catalog exclusively owns every [`Component`] and [`Accessory`] built
//! for the current server run.  Everything else refers to them by
//! [`ComponentKey`] or aid.  Only the lifecycle teardown path clears it.

pub mod accessory;
pub mod builder;
pub mod component;

use core::fmt::Write;

use crate::peripherals::{InputEvent, PeripheralRegistry};

pub use accessory::{Accessory, Category, ComponentKey, Service};
pub use builder::AccessoryBuilder;
pub use component::{Component, ComponentEffect, ComponentKind};

#[derive(Debug, Default)]
pub struct Catalog {
    components: Vec<Component>,
    accessories: Vec<Accessory>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// No accessories built (first start or after teardown).
    pub fn is_empty(&self) -> bool {
        self.accessories.is_empty()
    }

    pub fn clear(&mut self) {
        self.components.clear();
        self.accessories.clear();
    }

    pub(crate) fn push_component(&mut self, c: Component) {
        self.components.push(c);
    }

    pub(crate) fn push_accessory(&mut self, a: Accessory) {
        self.accessories.push(a);
    }

    // ── Accessors ────────────────────────────────────────────

    /// Components in build order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Accessories in build order; the first is the primary.
    pub fn accessories(&self) -> &[Accessory] {
        &self.accessories
    }

    pub fn primary(&self) -> Option<&Accessory> {
        self.accessories.first()
    }

    pub fn primary_mut(&mut self) -> Option<&mut Accessory> {
        self.accessories.first_mut()
    }

    /// Every accessory after the primary (the bridge list).
    pub fn bridged(&self) -> &[Accessory] {
        self.accessories.get(1..).unwrap_or(&[])
    }

    pub fn accessory(&self, aid: u64) -> Option<&Accessory> {
        self.accessories.iter().find(|a| a.aid == aid)
    }

    pub fn component(&self, key: ComponentKey) -> Option<&Component> {
        self.components.iter().find(|c| c.key() == key)
    }

    /// First non-stateless component with this id.
    pub fn switch_component(&self, id: i32) -> Option<&Component> {
        self.components
            .iter()
            .find(|c| c.id() == id && c.kind() != ComponentKind::StatelessSwitch)
    }

    /// Switch-type components in catalog order.
    pub fn switches(&self) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(|c| c.kind().is_switch_type())
    }

    // ── Input routing ────────────────────────────────────────

    /// Deliver an input event to every component bound to input `id`.
    /// Returns the effects, keyed by component.
    pub fn dispatch_input(
        &mut self,
        reg: &mut PeripheralRegistry,
        id: i32,
        event: InputEvent,
        level: bool,
    ) -> Vec<(ComponentKey, ComponentEffect)> {
        let mut effects = Vec::new();
        for c in self.components.iter_mut().filter(|c| c.input_id() == Some(id)) {
            match c.handle_input(reg, event, level) {
                Ok(Some(fx)) => effects.push((c.key(), fx)),
                Ok(None) => {}
                Err(e) => log::warn!("Component {}.{}: input: {}", c.kind().type_code(), c.id(), e),
            }
        }
        effects
    }

    // ── Diagnostics ──────────────────────────────────────────

    /// `"type.id: info; type.id: info"` over all components.
    pub fn status_string(&self, reg: &PeripheralRegistry) -> String {
        let mut s = String::new();
        for c in &self.components {
            if !s.is_empty() {
                s.push_str("; ");
            }
            let _ = write!(s, "{}.{}: ", c.kind().type_code(), c.id());
            match c.info(reg) {
                Ok(info) => s.push_str(&info),
                Err(e) => {
                    let _ = write!(s, "{e}");
                }
            }
        }
        s
    }
}
