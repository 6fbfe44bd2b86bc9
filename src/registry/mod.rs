//! Connection registry
//!
//! Owns the slot table behind a single mutex. The lock is held only for
//! table mutation, never across socket I/O.
//!
//! Handles are `(index, generation)` pairs. A handle outlives its
//! acquisition harmlessly: once the slot is released or reused, the
//! generation no longer matches and [`Registry::release`] ignores it.

pub mod slot;

use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::services::AuthLevel;

pub use slot::{ConnectionSlot, Session, SlotHandle, SlotTable, SocketHandle};

/// Every slot is taken; the caller must close the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("connection table full ({capacity} slots)")]
pub struct CapacityExceeded {
    pub capacity: usize,
}

/// Point-in-time copy of one active slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSnapshot {
    pub id: usize,
    pub peer_address: String,
    pub authenticated: bool,
    pub principal: Option<String>,
    pub level: Option<AuthLevel>,
}

/// Bounded table of live connections
#[derive(Debug)]
pub struct Registry {
    table: Mutex<SlotTable>,
}

impl Registry {
    /// Create a registry with `capacity` slots
    pub fn new(capacity: usize) -> Self {
        Self {
            table: Mutex::new(SlotTable::new(capacity)),
        }
    }

    fn table(&self) -> MutexGuard<'_, SlotTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit a connection into the first free slot.
    ///
    /// Fails immediately when the table is full; there is no queue.
    pub fn acquire(&self, socket: SocketHandle, peer: SocketAddr) -> Result<SlotHandle, CapacityExceeded> {
        let mut table = self.table();
        let capacity = table.capacity();

        let handle = table
            .find_free_slot()
            .and_then(|index| table.occupy(index, socket, peer))
            .ok_or(CapacityExceeded { capacity })?;

        tracing::debug!(
            slot = handle.index,
            generation = handle.generation,
            %peer,
            active = table.count(),
            "Slot acquired"
        );

        Ok(handle)
    }

    /// Free the slot held by `handle`.
    ///
    /// Returns `false` without touching the table when the handle is stale
    /// or was already released.
    pub fn release(&self, handle: &SlotHandle) -> bool {
        let mut table = self.table();

        if !table.is_current(handle) {
            tracing::trace!(slot = handle.index, generation = handle.generation, "Stale release ignored");
            return false;
        }

        table.reset(handle.index);
        tracing::debug!(slot = handle.index, active = table.count(), "Slot released");
        true
    }

    /// Signal every active socket to close and free all slots.
    ///
    /// Does not wait for workers; each one observes the close on its next
    /// read and its own release becomes a no-op. Returns the number of
    /// slots that were active.
    pub fn close_all(&self) -> usize {
        let mut table = self.table();
        let active = table.active_indices();

        for index in &active {
            if let Some(socket) = table.reset(*index) {
                socket.close();
            }
        }

        tracing::info!(closed = active.len(), "All connections closed");
        active.len()
    }

    /// Owned copies of every active slot, in index order.
    pub fn snapshot(&self) -> Vec<SlotSnapshot> {
        let table = self.table();

        table
            .iter()
            .filter(|slot| slot.is_active())
            .map(|slot| {
                let session = slot.session();
                SlotSnapshot {
                    id: slot.id(),
                    peer_address: slot.peer_address().unwrap_or_default().to_string(),
                    authenticated: session.authenticated,
                    principal: session.principal,
                    level: session.level,
                }
            })
            .collect()
    }

    /// Whether `handle` still owns its slot
    pub fn is_active(&self, handle: &SlotHandle) -> bool {
        self.table().is_current(handle)
    }

    /// Number of active slots
    pub fn len(&self) -> usize {
        self.table().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.table().capacity()
    }

    /// Count of slots flagged active, computed by scanning the table.
    ///
    /// Always equal to [`Registry::len`]; exposed for consistency checks.
    pub fn active_slots(&self) -> usize {
        self.table().iter().filter(|slot| slot.is_active()).count()
    }
}
