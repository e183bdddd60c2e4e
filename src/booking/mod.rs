//! Booking transaction.
//!
//! The single entry point that turns "investor wants this slot" into a
//! committed meeting plus claimed slot, or fails cleanly with no partial
//! state. All preconditions are re-checked under the store's write guard, so
//! of N concurrent attempts on one slot exactly one commits; the rest observe
//! `SlotUnavailable` (precondition) or `AlreadyClaimed` (claim step).

use axum::{extract::State, response::Json, routing::post, Router};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::meetings::{Meeting, MeetingMedium};
use crate::notifications::{dispatch, NotificationEmitter, NotificationEvent, NotificationKind};
use crate::offers::{offer_summary, validate_offer, Offer};
use crate::shared::errors::CoreError;
use crate::shared::state::AppState;
use crate::store::Store;

#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub slot_id: Uuid,
    pub investor_id: Uuid,
    pub medium: MeetingMedium,
    pub note: Option<String>,
    pub offer: Offer,
}

#[derive(Clone)]
pub struct BookingEngine {
    store: Arc<Store>,
    notifier: Arc<dyn NotificationEmitter>,
}

impl BookingEngine {
    pub fn new(store: Arc<Store>, notifier: Arc<dyn NotificationEmitter>) -> Self {
        Self { store, notifier }
    }

    /// Books a slot. Preconditions, in order, each with its own error kind:
    /// offer validates, slot exists, slot unclaimed, no self-booking, no
    /// other active meeting for the same (project, investor) pair. On success
    /// the meeting insert and the slot claim commit together.
    pub async fn book(&self, req: BookingRequest) -> Result<Meeting, CoreError> {
        validate_offer(&req.offer).map_err(CoreError::InvalidOffer)?;

        let meeting = {
            let mut tables = self.store.write().await;
            let slot = tables
                .slots
                .get(&req.slot_id)
                .cloned()
                .ok_or_else(|| CoreError::NotFound(format!("Slot {} does not exist", req.slot_id)))?;
            if slot.claimed {
                return Err(CoreError::SlotUnavailable(format!(
                    "Slot {} is no longer available",
                    slot.id
                )));
            }
            if slot.owner_id == req.investor_id {
                return Err(CoreError::InvalidOperation(
                    "Cannot book a meeting on your own project".to_string(),
                ));
            }
            if tables.active_meeting_exists(slot.project_id, req.investor_id) {
                return Err(CoreError::Conflict(
                    "An active meeting request already exists for this project".to_string(),
                ));
            }

            let meeting = Meeting::new(&slot, req.investor_id, req.medium, req.note.clone(), req.offer.clone());
            tables.claim_slot(slot.id, req.investor_id, meeting.id)?;
            tables.meetings.insert(meeting.id, meeting.clone());
            meeting
        };

        info!(
            meeting = %meeting.id,
            slot = %req.slot_id,
            investor = %req.investor_id,
            "meeting booked"
        );

        // Best-effort: the booking is already committed.
        dispatch(
            self.notifier.as_ref(),
            NotificationEvent {
                recipient_id: meeting.entrepreneur_id,
                kind: NotificationKind::MeetingRequested,
                summary: "An investor requested a meeting".to_string(),
                meeting_id: meeting.id,
                project_id: meeting.project_id,
            },
        )
        .await;
        dispatch(
            self.notifier.as_ref(),
            NotificationEvent {
                recipient_id: meeting.entrepreneur_id,
                kind: NotificationKind::OfferPendingReview,
                summary: offer_summary(&meeting.offer),
                meeting_id: meeting.id,
                project_id: meeting.project_id,
            },
        )
        .await;

        Ok(meeting)
    }
}

// HTTP Handlers

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BookingRequest>,
) -> Result<Json<Meeting>, CoreError> {
    let meeting = state.booking.book(payload).await?;
    Ok(Json(meeting))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/meetings", post(create_booking))
        .with_state(state)
}
