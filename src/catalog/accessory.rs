//! Accessories: externally addressable entities hosting component services.

use crate::config::Name;

use super::component::ComponentKind;

// ---------------------------------------------------------------------------
// Accessory ids
// ---------------------------------------------------------------------------

/// Aid of the primary accessory (bridge root or sole legacy accessory).
pub const AID_PRIMARY: u64 = 1;
/// Aid base ranges, one per exposed component type.  The component id is
/// added to the base, so ranges never overlap for ids below 0x100.
pub const AID_BASE_SWITCH: u64 = 0x100;
pub const AID_BASE_OUTLET: u64 = 0x200;
pub const AID_BASE_LOCK: u64 = 0x300;
pub const AID_BASE_STATELESS_SWITCH: u64 = 0x400;

/// Accessory category advertised to controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Category {
    BridgedAccessory = 0,
    Bridges = 2,
    Locks = 6,
    Outlets = 7,
    Switches = 8,
    ProgrammableSwitches = 15,
}

/// Identifies a component inside the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentKey {
    pub kind: ComponentKind,
    pub id: i32,
}

/// A service hosted by an accessory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// Standard identification service (name, model, identify routine).
    AccessoryInformation,
    /// Protocol version information (primary accessory only).
    ProtocolInformation,
    /// Pairing management (primary accessory only).
    Pairing,
    /// A component owned by the catalog.
    Component(ComponentKey),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Accessory {
    pub aid: u64,
    pub category: Category,
    pub name: Name,
    services: Vec<Service>,
}

impl Accessory {
    pub fn new(aid: u64, category: Category, name: &str) -> Self {
        Self {
            aid,
            category,
            name: crate::config::name(name),
            services: Vec::new(),
        }
    }

    /// The bridge root: identification, protocol and pairing services.
    pub fn primary(name: &str) -> Self {
        let mut acc = Self::new(AID_PRIMARY, Category::Bridges, name);
        acc.add_service(Service::AccessoryInformation);
        acc.add_service(Service::ProtocolInformation);
        acc.add_service(Service::Pairing);
        acc
    }

    pub fn set_category(&mut self, category: Category) {
        self.category = category;
    }

    pub fn add_service(&mut self, service: Service) {
        self.services.push(service);
    }

    /// Every hosted service in insertion order, hidden components included.
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Services advertised to controllers.  Hidden components are hosted
    /// for lifetime only and never advertised.
    pub fn exposed_services(&self) -> impl Iterator<Item = &Service> {
        self.services.iter().filter(|s| match s {
            Service::Component(key) => key.kind.is_exposed(),
            _ => true,
        })
    }

    pub fn hosts(&self, key: ComponentKey) -> bool {
        self.services.contains(&Service::Component(key))
    }
}
