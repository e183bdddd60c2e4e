//! Availability slots.
//!
//! A slot is a discrete bookable time window belonging to one project. The
//! entrepreneur publishes them (singly or as a dates × windows grid), an
//! investor claims one through the booking transaction, and the meeting state
//! machine hands it back when a negotiation releases it. Times are local wall
//! clock paired with an IANA timezone identifier; the identifier is stored,
//! not interpreted.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{delete, get},
    Router,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::shared::errors::CoreError;
use crate::shared::state::AppState;
use crate::store::Store;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: Uuid,
    pub project_id: Uuid,
    pub owner_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub timezone: String,
    pub note: Option<String>,
    pub claimed: bool,
    pub claimed_by: Option<Uuid>,
    pub meeting_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl AvailabilitySlot {
    pub fn new(project_id: Uuid, owner_id: Uuid, entry: SlotEntry) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            owner_id,
            date: entry.date,
            start_time: entry.start_time,
            end_time: entry.end_time,
            timezone: entry.timezone,
            note: entry.note,
            claimed: false,
            claimed_by: None,
            meeting_id: None,
            created_at: Utc::now(),
        }
    }
}

/// One concrete window to insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotEntry {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub timezone: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Expands a dates × windows grid into discrete entries. Bulk creation is
/// just this expansion fed into `create_slots`; the uniqueness check there
/// makes re-submitting the same grid idempotent.
pub fn expand_windows(
    dates: &[NaiveDate],
    windows: &[TimeWindow],
    timezone: &str,
    note: Option<&str>,
) -> Vec<SlotEntry> {
    let mut entries = Vec::with_capacity(dates.len() * windows.len());
    for date in dates {
        for window in windows {
            entries.push(SlotEntry {
                date: *date,
                start_time: window.start_time,
                end_time: window.end_time,
                timezone: timezone.to_string(),
                note: note.map(String::from),
            });
        }
    }
    entries
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotFilters {
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    #[serde(default)]
    pub unclaimed_only: bool,
}

#[derive(Clone)]
pub struct SlotEngine {
    store: Arc<Store>,
}

impl SlotEngine {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Inserts slots for a project. Entries colliding with an existing slot
    /// on (project, date, start) are silently skipped, duplicates within the
    /// batch included. Returns the slots actually created.
    pub async fn create_slots(
        &self,
        project_id: Uuid,
        owner_id: Uuid,
        entries: Vec<SlotEntry>,
    ) -> Result<Vec<AvailabilitySlot>, CoreError> {
        let mut tables = self.store.write().await;
        let mut created = Vec::new();
        for entry in entries {
            if tables.slot_taken(project_id, entry.date, entry.start_time) {
                continue;
            }
            let slot = AvailabilitySlot::new(project_id, owner_id, entry);
            tables.slots.insert(slot.id, slot.clone());
            created.push(slot);
        }
        info!(%project_id, count = created.len(), "created availability slots");
        Ok(created)
    }

    /// Slots for one project, ordered by (date, start_time) ascending.
    pub async fn list_slots(
        &self,
        project_id: Uuid,
        filters: SlotFilters,
    ) -> Result<Vec<AvailabilitySlot>, CoreError> {
        let tables = self.store.read().await;
        let mut slots: Vec<AvailabilitySlot> = tables
            .slots
            .values()
            .filter(|s| s.project_id == project_id)
            .filter(|s| filters.from_date.is_none_or(|from| s.date >= from))
            .filter(|s| filters.to_date.is_none_or(|to| s.date <= to))
            .filter(|s| !filters.unclaimed_only || !s.claimed)
            .cloned()
            .collect();
        slots.sort_by_key(|s| (s.date, s.start_time));
        Ok(slots)
    }

    /// Claims a slot for a meeting. Normally invoked from inside the booking
    /// transaction; exposed for callers that manage the meeting record
    /// themselves.
    pub async fn claim(
        &self,
        slot_id: Uuid,
        investor_id: Uuid,
        meeting_id: Uuid,
    ) -> Result<(), CoreError> {
        let mut tables = self.store.write().await;
        tables.claim_slot(slot_id, investor_id, meeting_id)
    }

    /// Hands a slot back to the pool. No-op when already unclaimed or gone.
    pub async fn release(&self, slot_id: Uuid) -> Result<(), CoreError> {
        let mut tables = self.store.write().await;
        tables.release_slot(slot_id);
        Ok(())
    }

    /// Deletes an unclaimed slot. Only the owner may delete, and never while
    /// a meeting holds the claim.
    pub async fn delete(&self, slot_id: Uuid, requesting_owner_id: Uuid) -> Result<(), CoreError> {
        let mut tables = self.store.write().await;
        let slot = tables
            .slots
            .get(&slot_id)
            .ok_or_else(|| CoreError::NotFound(format!("Slot {} does not exist", slot_id)))?;
        if slot.owner_id != requesting_owner_id {
            return Err(CoreError::Forbidden(
                "Only the slot owner may delete it".to_string(),
            ));
        }
        if slot.claimed {
            return Err(CoreError::Conflict(
                "Slot is claimed by a meeting and cannot be deleted".to_string(),
            ));
        }
        tables.slots.remove(&slot_id);
        Ok(())
    }
}

// HTTP Handlers

#[derive(Debug, Deserialize)]
pub struct CreateSlotsRequest {
    pub owner_id: Uuid,
    pub dates: Vec<NaiveDate>,
    pub windows: Vec<TimeWindow>,
    pub timezone: String,
    pub note: Option<String>,
}

pub async fn create_slots(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<CreateSlotsRequest>,
) -> Result<Json<Vec<AvailabilitySlot>>, CoreError> {
    let entries = expand_windows(
        &payload.dates,
        &payload.windows,
        &payload.timezone,
        payload.note.as_deref(),
    );
    let created = state
        .slots
        .create_slots(project_id, payload.owner_id, entries)
        .await?;
    Ok(Json(created))
}

pub async fn list_slots(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    Query(filters): Query<SlotFilters>,
) -> Result<Json<Vec<AvailabilitySlot>>, CoreError> {
    let slots = state.slots.list_slots(project_id, filters).await?;
    Ok(Json(slots))
}

#[derive(Debug, Deserialize)]
pub struct DeleteSlotQuery {
    pub owner_id: Uuid,
}

pub async fn delete_slot(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<Uuid>,
    Query(query): Query<DeleteSlotQuery>,
) -> Result<Json<serde_json::Value>, CoreError> {
    state.slots.delete(slot_id, query.owner_id).await?;
    Ok(Json(serde_json::json!({ "deleted": slot_id })))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/projects/{project_id}/slots",
            get(list_slots).post(create_slots),
        )
        .route("/api/slots/{slot_id}", delete(delete_slot))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SlotEngine {
        SlotEngine::new(Arc::new(Store::new()))
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, d).unwrap()
    }

    fn time(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    fn entry(d: u32, start: u32, end: u32) -> SlotEntry {
        SlotEntry {
            date: date(d),
            start_time: time(start),
            end_time: time(end),
            timezone: "America/Sao_Paulo".to_string(),
            note: None,
        }
    }

    #[test]
    fn test_expand_windows_cross_product() {
        let dates = [date(1), date(2), date(3)];
        let windows = [
            TimeWindow {
                start_time: time(9),
                end_time: time(10),
            },
            TimeWindow {
                start_time: time(14),
                end_time: time(15),
            },
        ];
        let entries = expand_windows(&dates, &windows, "UTC", Some("office hours"));
        assert_eq!(entries.len(), 6);
        assert!(entries.iter().all(|e| e.timezone == "UTC"));
        assert!(entries.iter().all(|e| e.note.as_deref() == Some("office hours")));
    }

    #[tokio::test]
    async fn test_create_slots_skips_duplicates() {
        let engine = engine();
        let project = Uuid::new_v4();
        let owner = Uuid::new_v4();

        let first = engine
            .create_slots(project, owner, vec![entry(1, 9, 10), entry(1, 14, 15)])
            .await
            .unwrap();
        assert_eq!(first.len(), 2);

        // Re-submitting the same grid creates nothing new; a fresh window does.
        let second = engine
            .create_slots(
                project,
                owner,
                vec![entry(1, 9, 10), entry(1, 14, 15), entry(2, 9, 10)],
            )
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].date, date(2));
    }

    #[tokio::test]
    async fn test_create_slots_dedups_within_batch() {
        let engine = engine();
        let created = engine
            .create_slots(
                Uuid::new_v4(),
                Uuid::new_v4(),
                vec![entry(1, 9, 10), entry(1, 9, 10)],
            )
            .await
            .unwrap();
        assert_eq!(created.len(), 1);
    }

    #[tokio::test]
    async fn test_same_start_different_project_allowed() {
        let engine = engine();
        let owner = Uuid::new_v4();
        let a = engine
            .create_slots(Uuid::new_v4(), owner, vec![entry(1, 9, 10)])
            .await
            .unwrap();
        let b = engine
            .create_slots(Uuid::new_v4(), owner, vec![entry(1, 9, 10)])
            .await
            .unwrap();
        assert_eq!(a.len() + b.len(), 2);
    }

    #[tokio::test]
    async fn test_list_slots_ordering_and_filters() {
        let engine = engine();
        let project = Uuid::new_v4();
        let owner = Uuid::new_v4();
        engine
            .create_slots(
                project,
                owner,
                vec![entry(3, 9, 10), entry(1, 14, 15), entry(1, 9, 10), entry(2, 9, 10)],
            )
            .await
            .unwrap();

        let all = engine
            .list_slots(project, SlotFilters::default())
            .await
            .unwrap();
        let keys: Vec<_> = all.iter().map(|s| (s.date, s.start_time)).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(all.len(), 4);

        let ranged = engine
            .list_slots(
                project,
                SlotFilters {
                    from_date: Some(date(2)),
                    to_date: Some(date(3)),
                    unclaimed_only: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(ranged.len(), 2);
    }

    #[tokio::test]
    async fn test_list_unclaimed_only_hides_claimed() {
        let engine = engine();
        let project = Uuid::new_v4();
        let created = engine
            .create_slots(project, Uuid::new_v4(), vec![entry(1, 9, 10), entry(1, 14, 15)])
            .await
            .unwrap();
        engine
            .claim(created[0].id, Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap();

        let open = engine
            .list_slots(
                project,
                SlotFilters {
                    unclaimed_only: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
        assert_ne!(open[0].id, created[0].id);
    }

    #[tokio::test]
    async fn test_delete_rules() {
        let engine = engine();
        let project = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let created = engine
            .create_slots(project, owner, vec![entry(1, 9, 10), entry(2, 9, 10)])
            .await
            .unwrap();

        let stranger = engine.delete(created[0].id, Uuid::new_v4()).await;
        assert!(matches!(stranger, Err(CoreError::Forbidden(_))));

        engine
            .claim(created[0].id, Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap();
        let claimed = engine.delete(created[0].id, owner).await;
        assert!(matches!(claimed, Err(CoreError::Conflict(_))));

        engine.delete(created[1].id, owner).await.unwrap();
        let missing = engine.delete(created[1].id, owner).await;
        assert!(matches!(missing, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_released_slot_is_bookable_again() {
        let engine = engine();
        let project = Uuid::new_v4();
        let created = engine
            .create_slots(project, Uuid::new_v4(), vec![entry(1, 9, 10)])
            .await
            .unwrap();
        let slot_id = created[0].id;

        engine.claim(slot_id, Uuid::new_v4(), Uuid::new_v4()).await.unwrap();
        engine.release(slot_id).await.unwrap();

        // A fresh claim succeeds after release.
        engine.claim(slot_id, Uuid::new_v4(), Uuid::new_v4()).await.unwrap();
    }
}
