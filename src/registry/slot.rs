//! Slot table
//!
//! Fixed-capacity storage for connection records. Pure data and allocation
//! logic; all access goes through the registry lock.

use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Notify;

use crate::services::AuthLevel;

/// Longest principal name a session will hold
pub const MAX_PRINCIPAL_LEN: usize = 63;

/// Close lever for a connection's socket.
///
/// The worker owns the stream itself and races every read against
/// [`SocketHandle::closed`]. Firing [`SocketHandle::close`] makes the worker
/// drop the stream on its next read.
#[derive(Debug, Clone, Default)]
pub struct SocketHandle {
    signal: Arc<Notify>,
}

impl SocketHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the owning worker to close the socket.
    ///
    /// Stores a permit when the worker is not currently waiting, so the
    /// signal is never lost.
    pub fn close(&self) {
        self.signal.notify_one();
    }

    /// Resolves once [`SocketHandle::close`] has been called.
    pub async fn closed(&self) {
        self.signal.notified().await;
    }
}

/// Per-connection session state mutated by request handlers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub authenticated: bool,
    pub principal: Option<String>,
    pub level: Option<AuthLevel>,
}

impl Session {
    /// Record a successful login. The principal is clipped to
    /// [`MAX_PRINCIPAL_LEN`] characters.
    pub fn login(&mut self, principal: &str, level: AuthLevel) {
        self.authenticated = true;
        self.principal = Some(principal.chars().take(MAX_PRINCIPAL_LEN).collect());
        self.level = Some(level);
    }
}

/// Identifies one specific acquisition of a slot.
///
/// Deliberately not `Clone`: the worker holding it is the slot's owner.
pub struct SlotHandle {
    pub(crate) index: usize,
    pub(crate) generation: u64,
    session: Arc<Mutex<Session>>,
}

impl SlotHandle {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Copy of the slot's session state.
    pub fn session(&self) -> Session {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Store session state back into the slot.
    ///
    /// Uses the slot's own session lock, not the registry lock. After the
    /// slot is released the session is detached, so a stale handle can only
    /// write to its own orphaned copy.
    pub fn store_session(&self, session: Session) {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = session;
    }
}

impl fmt::Debug for SlotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotHandle")
            .field("index", &self.index)
            .field("generation", &self.generation)
            .finish()
    }
}

/// One entry in the connection table
#[derive(Debug, Default)]
pub struct ConnectionSlot {
    pub(crate) id: usize,
    pub(crate) generation: u64,
    pub(crate) socket: Option<SocketHandle>,
    pub(crate) peer_address: Option<String>,
    pub(crate) session: Arc<Mutex<Session>>,
    pub(crate) active: bool,
}

impl ConnectionSlot {
    fn new(id: usize) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn peer_address(&self) -> Option<&str> {
        self.peer_address.as_deref()
    }

    pub(crate) fn session(&self) -> Session {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Fixed-size table of connection slots plus the live count
#[derive(Debug)]
pub struct SlotTable {
    slots: Vec<ConnectionSlot>,
    count: usize,
}

impl SlotTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(ConnectionSlot::new).collect(),
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Index of the first free slot, if any.
    pub fn find_free_slot(&self) -> Option<usize> {
        self.slots.iter().position(|slot| !slot.active)
    }

    /// Take a free slot for a new connection.
    ///
    /// Returns `None` when `index` is already active.
    pub fn occupy(&mut self, index: usize, socket: SocketHandle, peer: SocketAddr) -> Option<SlotHandle> {
        let slot = self.slots.get_mut(index)?;
        if slot.active {
            return None;
        }

        slot.generation = slot.generation.wrapping_add(1);
        slot.socket = Some(socket);
        slot.peer_address = Some(peer.to_string());
        slot.session = Arc::new(Mutex::new(Session::default()));
        slot.active = true;
        self.count += 1;

        Some(SlotHandle {
            index,
            generation: slot.generation,
            session: Arc::clone(&slot.session),
        })
    }

    /// Whether `handle` still names the acquisition currently in its slot.
    pub fn is_current(&self, handle: &SlotHandle) -> bool {
        self.slots
            .get(handle.index)
            .is_some_and(|slot| slot.active && slot.generation == handle.generation)
    }

    /// Clear a slot and mark it free, returning its socket handle.
    ///
    /// The generation is kept so outstanding handles stay stale.
    pub fn reset(&mut self, index: usize) -> Option<SocketHandle> {
        let slot = self.slots.get_mut(index)?;
        if !slot.active {
            return None;
        }

        slot.active = false;
        slot.peer_address = None;
        slot.session = Arc::new(Mutex::new(Session::default()));
        self.count -= 1;
        slot.socket.take()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConnectionSlot> {
        self.slots.iter()
    }

    pub fn active_indices(&self) -> Vec<usize> {
        self.slots
            .iter()
            .filter(|slot| slot.active)
            .map(|slot| slot.id)
            .collect()
    }
}
