//! Storage-backed accessory-server facade.
//!
//! Implements [`AccessoryServerPort`] on top of a [`StoragePort`]: the
//! configuration number, the setup code and the pairing count live in the
//! `hap` namespace.  The protocol engine proper (sessions, pairing
//! crypto, attribute database) sits behind this facade.
//!
//! ## State machine
//!
//! ```text
//!   Idle ──start()──▶ Running ──stop()──▶ Stopping ──poll_state()──▶ Idle
//! ```
//!
//! State changes are not delivered synchronously: [`HapServer::poll_state`]
//! returns each transition once, and the main loop posts it into the
//! service queue as `PlatformEvent::ServerStateChanged`.

use log::{info, warn};

use crate::app::ports::{AccessoryServerPort, ServerState, StorageError, StoragePort};
use crate::catalog::Accessory;
use crate::error::ServerError;

const NAMESPACE: &str = "hap";
const KEY_CN: &str = "cn";
const KEY_SETUP: &str = "setup";
const KEY_PAIRINGS: &str = "pairings";

/// Setup codes are `XXX-XX-XXX`, digits only.
pub const SETUP_CODE_LEN: usize = 10;

/// Codes the accessory protocol forbids.
const TRIVIAL_CODES: [&str; 12] = [
    "000-00-000",
    "111-11-111",
    "222-22-222",
    "333-33-333",
    "444-44-444",
    "555-55-555",
    "666-66-666",
    "777-77-777",
    "888-88-888",
    "999-99-999",
    "123-45-678",
    "876-54-321",
];

/// Check the `XXX-XX-XXX` format and reject trivial codes.
pub fn is_valid_setup_code(code: &str) -> bool {
    let b = code.as_bytes();
    if b.len() != SETUP_CODE_LEN {
        return false;
    }
    let shape_ok = b.iter().enumerate().all(|(i, c)| match i {
        3 | 6 => *c == b'-',
        _ => c.is_ascii_digit(),
    });
    shape_ok && !TRIVIAL_CODES.contains(&code)
}

/// Summary of the attribute database the server was last started with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishedDb {
    pub bridge: bool,
    /// Accessory ids in publication order, primary first.
    pub aids: Vec<u64>,
    /// Exposed services across all accessories.
    pub services: usize,
}

pub struct HapServer<S: StoragePort> {
    storage: S,
    state: ServerState,
    pending: Option<ServerState>,
    sessions: usize,
    published: Option<PublishedDb>,
}

impl<S: StoragePort> HapServer<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            state: ServerState::Idle,
            pending: None,
            sessions: 0,
            published: None,
        }
    }

    /// Next unreported state transition, completing a pending stop.
    pub fn poll_state(&mut self) -> Option<ServerState> {
        if self.state == ServerState::Stopping && self.sessions == 0 {
            self.transition(ServerState::Idle);
            self.published = None;
        }
        self.pending.take()
    }

    pub fn published(&self) -> Option<&PublishedDb> {
        self.published.as_ref()
    }

    /// Store the setup code that provisions the accessory.
    pub fn provision(&mut self, setup_code: &str) -> Result<(), ServerError> {
        if !is_valid_setup_code(setup_code) {
            warn!("HAP: rejected setup code");
            return Err(ServerError::InvalidState);
        }
        self.storage
            .write(NAMESPACE, KEY_SETUP, setup_code.as_bytes())?;
        info!("HAP: provisioned");
        Ok(())
    }

    /// Record a newly paired controller.
    pub fn add_pairing(&mut self) -> Result<u8, ServerError> {
        let n = self.pairing_count().saturating_add(1);
        self.storage.write(NAMESPACE, KEY_PAIRINGS, &[n])?;
        Ok(n)
    }

    /// Forget every controller (factory reset of the pairing store).
    pub fn clear_pairings(&mut self) -> Result<(), ServerError> {
        self.storage.delete(NAMESPACE, KEY_PAIRINGS)?;
        Ok(())
    }

    pub fn pairing_count(&self) -> u8 {
        let mut buf = [0u8; 1];
        match self.storage.read(NAMESPACE, KEY_PAIRINGS, &mut buf) {
            Ok(1) => buf[0],
            _ => 0,
        }
    }

    pub fn session_opened(&mut self) {
        self.sessions += 1;
    }

    pub fn session_closed(&mut self) {
        self.sessions = self.sessions.saturating_sub(1);
    }

    fn transition(&mut self, to: ServerState) {
        if self.state != to {
            self.state = to;
            self.pending = Some(to);
        }
    }

    fn publish(&mut self, bridge: bool, accessories: &[&Accessory]) {
        let db = PublishedDb {
            bridge,
            aids: accessories.iter().map(|a| a.aid).collect(),
            services: accessories.iter().map(|a| a.exposed_services().count()).sum(),
        };
        info!(
            "HAP: publishing {} accessories, {} services",
            db.aids.len(),
            db.services
        );
        self.published = Some(db);
        self.transition(ServerState::Running);
    }
}

impl<S: StoragePort> AccessoryServerPort for HapServer<S> {
    fn state(&self) -> ServerState {
        self.state
    }

    fn is_paired(&self) -> bool {
        self.pairing_count() > 0
    }

    fn is_provisioned(&self) -> bool {
        let mut buf = [0u8; SETUP_CODE_LEN];
        match self.storage.read(NAMESPACE, KEY_SETUP, &mut buf) {
            Ok(SETUP_CODE_LEN) => core::str::from_utf8(&buf).is_ok_and(is_valid_setup_code),
            _ => false,
        }
    }

    fn start(&mut self, primary: &Accessory) {
        if self.state != ServerState::Idle {
            warn!("HAP: start ignored in state {:?}", self.state);
            return;
        }
        self.publish(false, &[primary]);
    }

    fn start_bridge(&mut self, primary: &Accessory, bridged: &[Accessory]) {
        if self.state != ServerState::Idle {
            warn!("HAP: start ignored in state {:?}", self.state);
            return;
        }
        let all: Vec<&Accessory> = core::iter::once(primary).chain(bridged).collect();
        self.publish(true, &all);
    }

    fn stop(&mut self) {
        if self.state == ServerState::Running {
            self.transition(ServerState::Stopping);
        }
    }

    fn configuration_number(&self) -> Result<u16, ServerError> {
        let mut buf = [0u8; 2];
        match self.storage.read(NAMESPACE, KEY_CN, &mut buf) {
            Ok(2) => Ok(u16::from_le_bytes(buf)),
            Ok(_) => Err(ServerError::Storage),
            // Never written: the first published database is number 1.
            Err(StorageError::NotFound) => Ok(1),
            Err(e) => Err(e.into()),
        }
    }

    fn increment_configuration_number(&mut self) -> Result<u16, ServerError> {
        let cn = match self.configuration_number()?.wrapping_add(1) {
            0 => 1,
            n => n,
        };
        self.storage.write(NAMESPACE, KEY_CN, &cn.to_le_bytes())?;
        info!("HAP: configuration number now {cn}");
        Ok(cn)
    }

    fn session_count(&self) -> usize {
        self.sessions
    }
}
