//! Transactional store shared by the slot and meeting engines.
//!
//! Slots and meetings are two independently-addressable tables that must be
//! updated together whenever a claim or release happens. A single `RwLock`
//! over both tables is the unit of work: an engine takes one write guard,
//! re-checks its preconditions against the locked state, applies every write,
//! and releases the guard. Either everything inside the guard lands or the
//! operation bailed out before touching anything.

use chrono::{NaiveDate, NaiveTime};
use std::collections::HashMap;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::meetings::Meeting;
use crate::shared::errors::CoreError;
use crate::slots::AvailabilitySlot;

#[derive(Debug, Default)]
pub struct Tables {
    pub slots: HashMap<Uuid, AvailabilitySlot>,
    pub meetings: HashMap<Uuid, Meeting>,
}

impl Tables {
    /// Uniqueness check for (project, date, start). Two slots for the same
    /// project may never occupy the same start instant.
    pub fn slot_taken(&self, project_id: Uuid, date: NaiveDate, start_time: NaiveTime) -> bool {
        self.slots.values().any(|s| {
            s.project_id == project_id && s.date == date && s.start_time == start_time
        })
    }

    /// Compare-and-set claim. The claimed flag is re-read here, under the
    /// write guard, so a racing booking that lost the lock observes
    /// `AlreadyClaimed` instead of overwriting the winner.
    pub fn claim_slot(
        &mut self,
        slot_id: Uuid,
        investor_id: Uuid,
        meeting_id: Uuid,
    ) -> Result<(), CoreError> {
        let slot = self
            .slots
            .get_mut(&slot_id)
            .ok_or_else(|| CoreError::NotFound(format!("Slot {} does not exist", slot_id)))?;
        if slot.claimed {
            return Err(CoreError::AlreadyClaimed(format!(
                "Slot {} is already claimed",
                slot_id
            )));
        }
        slot.claimed = true;
        slot.claimed_by = Some(investor_id);
        slot.meeting_id = Some(meeting_id);
        Ok(())
    }

    /// Clears a claim. No-op when the slot is already unclaimed or was
    /// deleted in the meantime; release races are tolerated.
    pub fn release_slot(&mut self, slot_id: Uuid) {
        if let Some(slot) = self.slots.get_mut(&slot_id) {
            slot.claimed = false;
            slot.claimed_by = None;
            slot.meeting_id = None;
        }
    }

    /// True when a non-terminal meeting already exists for the
    /// (project, investor) pair. Evaluated inside the booking transaction so
    /// two simultaneous bookings cannot both pass it.
    pub fn active_meeting_exists(&self, project_id: Uuid, investor_id: Uuid) -> bool {
        self.meetings.values().any(|m| {
            m.project_id == project_id && m.investor_id == investor_id && !m.status.is_terminal()
        })
    }
}

#[derive(Debug, Default)]
pub struct Store {
    tables: RwLock<Tables>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().await
    }
}
