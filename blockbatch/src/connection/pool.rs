//! Bounded pool of reusable sessions.
//!
//! # Invariants
//!
//! - At most `size` sessions exist or are in use at any time (one per slot,
//!   gated by a semaphore with `size` permits).
//! - A slot is reconnected only while its lock is held, so two workers can
//!   never reconnect the same slot concurrently.
//! - A slot whose request was abandoned mid-flight (the caller's future was
//!   dropped by a timeout) is marked dirty and reconnected on next use, so a
//!   late response can never be read as the answer to a later command.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, Semaphore, SemaphorePermit};
use tracing::{debug, info};

use super::{ConnectionError, Connector, Session};

struct Slot {
    id: usize,
    session: Option<Box<dyn Session>>,
    dirty: bool,
}

/// Pool of sessions to a single server.
pub struct ConnectionPool {
    connector: Arc<dyn Connector>,
    slots: Vec<Mutex<Slot>>,
    permits: Semaphore,
    next_slot: AtomicUsize,
    connects: AtomicUsize,
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("target", &self.connector.target())
            .field("size", &self.slots.len())
            .field("connects", &self.connects.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl ConnectionPool {
    /// Create a pool with `size` slots (minimum 1). Sessions open lazily.
    pub fn new(connector: Arc<dyn Connector>, size: usize) -> Self {
        let size = size.max(1);
        let slots = (0..size)
            .map(|id| {
                Mutex::new(Slot {
                    id,
                    session: None,
                    dirty: false,
                })
            })
            .collect();

        Self {
            connector,
            slots,
            permits: Semaphore::new(size),
            next_slot: AtomicUsize::new(0),
            connects: AtomicUsize::new(0),
        }
    }

    /// Number of slots (maximum concurrent connections).
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Number of sessions opened over the pool's lifetime.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::Relaxed)
    }

    /// Borrow a slot, waiting if all are busy.
    pub async fn acquire(&self) -> Result<PooledSession<'_>, ConnectionError> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ConnectionError::PoolClosed)?;

        // Holding a permit guarantees a free slot; guards release the lock
        // before the permit (field order in PooledSession).
        let start = self.next_slot.fetch_add(1, Ordering::Relaxed) % self.slots.len();
        for offset in 0..self.slots.len() {
            let index = (start + offset) % self.slots.len();
            if let Ok(slot) = self.slots[index].try_lock() {
                return Ok(PooledSession {
                    slot,
                    connector: self.connector.as_ref(),
                    connects: &self.connects,
                    _permit: permit,
                });
            }
        }

        let slot = self.slots[start].lock().await;
        Ok(PooledSession {
            slot,
            connector: self.connector.as_ref(),
            connects: &self.connects,
            _permit: permit,
        })
    }

    /// Drop every open session and refuse further acquisitions.
    pub async fn close(&self) {
        self.permits.close();
        for slot in &self.slots {
            let mut slot = slot.lock().await;
            slot.session = None;
        }
        info!(target_addr = %self.connector.target(), "Connection pool closed");
    }
}

/// A borrowed pool slot.
pub struct PooledSession<'a> {
    slot: MutexGuard<'a, Slot>,
    connector: &'a dyn Connector,
    connects: &'a AtomicUsize,
    _permit: SemaphorePermit<'a>,
}

impl PooledSession<'_> {
    pub fn slot_id(&self) -> usize {
        self.slot.id
    }

    /// Send a command on this slot, connecting first if needed.
    ///
    /// Any error discards the session so the next use reconnects.
    pub async fn send(&mut self, command: &str) -> Result<String, ConnectionError> {
        let connector = self.connector;
        let connects = self.connects;
        let slot: &mut Slot = &mut self.slot;

        if slot.dirty {
            debug!(slot = slot.id, "Discarding session after abandoned request");
            slot.session = None;
            slot.dirty = false;
        }

        if slot.session.is_none() {
            debug!(slot = slot.id, target_addr = %connector.target(), "Connecting");
            let session = connector.connect().await?;
            connects.fetch_add(1, Ordering::Relaxed);
            slot.session = Some(session);
        }

        let Some(session) = slot.session.as_mut() else {
            return Err(ConnectionError::Closed);
        };

        slot.dirty = true;
        let result = session.send(command).await;
        slot.dirty = false;

        if let Err(e) = &result {
            if e.poisons_session() {
                slot.session = None;
            }
        }
        result
    }
}
