//! Configuration source: where the filter learns which port to drop.
//!
//! The filter only ever reads the configured port, through [`PortLookup`].
//! Ownership of the value lives with whoever drives the store -- in this
//! repo, the agent's control API. [`PortSlot`] is the single-slot in-memory
//! implementation: one optional port, readable concurrently without locks,
//! written atomically so a reader observes either the old or the new value,
//! never a mix of the two.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Port installed by [`PortSlot::seed_default`] when the slot has never
/// been written.
pub const DEFAULT_PORT: u16 = 4040;

/// Read access to the configured destination port.
///
/// An absent value is a normal state, not an error: a fresh store simply
/// has no port yet and the filter passes everything.
pub trait PortLookup {
    /// The configured port, or `None` if nothing has been set. One call
    /// yields one point-in-time snapshot.
    fn lookup(&self) -> Option<u16>;
}

impl<T: PortLookup + ?Sized> PortLookup for &T {
    fn lookup(&self) -> Option<u16> {
        (**self).lookup()
    }
}

impl<T: PortLookup + ?Sized> PortLookup for Arc<T> {
    fn lookup(&self) -> Option<u16> {
        (**self).lookup()
    }
}

/// Single-value port store.
///
/// `Option<u16>` packed into one `AtomicU32`: bit 16 marks the slot as set,
/// the low 16 bits hold the port. A lookup is a single atomic load, so reads
/// are wait-free and a torn value is impossible. Port 0 is representable --
/// "set to 0" and "unset" are distinct states.
#[derive(Debug, Default)]
pub struct PortSlot {
    cell: AtomicU32,
}

const EMPTY: u32 = 0;
const SET_BIT: u32 = 1 << 16;

impl PortSlot {
    /// Create an empty slot: no port configured, every lookup is `None`.
    pub const fn new() -> Self {
        Self {
            cell: AtomicU32::new(EMPTY),
        }
    }

    /// Configure the port to drop. Readers see the new value atomically.
    pub fn set(&self, port: u16) {
        self.cell.store(SET_BIT | u32::from(port), Ordering::Relaxed);
    }

    /// Remove the configured port; subsequent lookups return `None`.
    pub fn clear(&self) {
        self.cell.store(EMPTY, Ordering::Relaxed);
    }

    /// Install [`DEFAULT_PORT`] if the slot has never been written.
    ///
    /// Meant to run once during startup, before packet processing begins.
    /// Returns `true` if the default was installed, `false` if the slot
    /// already held a value.
    pub fn seed_default(&self) -> bool {
        self.cell
            .compare_exchange(
                EMPTY,
                SET_BIT | u32::from(DEFAULT_PORT),
                Ordering::Relaxed,
                Ordering::Relaxed,
            )
            .is_ok()
    }
}

impl PortLookup for PortSlot {
    fn lookup(&self) -> Option<u16> {
        let v = self.cell.load(Ordering::Relaxed);
        if v & SET_BIT != 0 {
            Some(v as u16)
        } else {
            None
        }
    }
}
