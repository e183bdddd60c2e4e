//! Meeting negotiation state machine.
//!
//! A meeting is created in `pending` by the booking transaction and from then
//! on only moves through the transitions here: confirm, reject,
//! counterpropose, cancel. Counterproposal states encode whose turn it is to
//! respond: `counterproposal_entrepreneur` means the entrepreneur spoke last
//! and the investor must act next, and vice versa. Whenever a transition
//! takes a slot-bound meeting to rejected, cancelled or a counterproposal
//! state, the bound slot is released inside the same transaction so it
//! becomes bookable again. Meetings are never deleted; terminal records stay
//! as history.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::notifications::{dispatch, NotificationEmitter, NotificationEvent, NotificationKind};
use crate::offers::Offer;
use crate::shared::errors::CoreError;
use crate::shared::state::AppState;
use crate::slots::AvailabilitySlot;
use crate::store::Store;

pub const DEFAULT_REJECTION_REASON: &str = "No reason provided";
pub const DEFAULT_CANCELLATION_REASON: &str = "No reason provided";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    Pending,
    Confirmed,
    Rejected,
    Cancelled,
    /// The entrepreneur proposed a new time; the investor responds.
    CounterproposalEntrepreneur,
    /// The investor proposed a new time; the entrepreneur responds.
    CounterproposalInvestor,
    /// Reached only through administrative means, never by a transition here.
    Completed,
}

impl MeetingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled | Self::Completed)
    }

    /// Statuses from which reject, counterpropose and cancel are allowed.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingMedium {
    Video,
    Phone,
    InPerson,
}

/// Which side of the negotiation an actor id resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Entrepreneur,
    Investor,
}

impl Party {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Entrepreneur => "entrepreneur",
            Self::Investor => "investor",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: Uuid,
    pub project_id: Uuid,
    pub entrepreneur_id: Uuid,
    pub investor_id: Uuid,
    pub status: MeetingStatus,
    /// Local wall-clock start, interpreted in `timezone`.
    pub scheduled_at: NaiveDateTime,
    pub duration_minutes: i64,
    pub medium: MeetingMedium,
    pub timezone: String,
    pub investor_note: Option<String>,
    pub entrepreneur_note: Option<String>,
    /// Originating slot; detached once the slot is released.
    pub slot_id: Option<Uuid>,
    /// Frozen at creation; never re-validated or replaced afterwards.
    pub offer: Offer,
    pub counter_by: Option<Uuid>,
    pub counter_note: Option<String>,
    pub meeting_link: Option<String>,
    pub rejection_reason: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<Uuid>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meeting {
    pub fn new(
        slot: &AvailabilitySlot,
        investor_id: Uuid,
        medium: MeetingMedium,
        note: Option<String>,
        offer: Offer,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id: slot.project_id,
            entrepreneur_id: slot.owner_id,
            investor_id,
            status: MeetingStatus::Pending,
            scheduled_at: slot.date.and_time(slot.start_time),
            duration_minutes: (slot.end_time - slot.start_time).num_minutes(),
            medium,
            timezone: slot.timezone.clone(),
            investor_note: note,
            entrepreneur_note: None,
            slot_id: Some(slot.id),
            offer,
            counter_by: None,
            counter_note: None,
            meeting_link: None,
            rejection_reason: None,
            cancellation_reason: None,
            cancelled_by: None,
            confirmed_at: None,
            rejected_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn party_of(&self, actor_id: Uuid) -> Option<Party> {
        if actor_id == self.entrepreneur_id {
            Some(Party::Entrepreneur)
        } else if actor_id == self.investor_id {
            Some(Party::Investor)
        } else {
            None
        }
    }

    pub fn counterpart_id(&self, party: Party) -> Uuid {
        match party {
            Party::Entrepreneur => self.investor_id,
            Party::Investor => self.entrepreneur_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub actor_id: Uuid,
    pub meeting_link: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub actor_id: Uuid,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CounterproposalRequest {
    pub actor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub actor_id: Uuid,
    pub reason: Option<String>,
}

#[derive(Clone)]
pub struct MeetingEngine {
    store: Arc<Store>,
    notifier: Arc<dyn NotificationEmitter>,
}

impl MeetingEngine {
    pub fn new(store: Arc<Store>, notifier: Arc<dyn NotificationEmitter>) -> Self {
        Self { store, notifier }
    }

    pub async fn get(&self, meeting_id: Uuid) -> Result<Meeting, CoreError> {
        let tables = self.store.read().await;
        tables
            .meetings
            .get(&meeting_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("Meeting {} does not exist", meeting_id)))
    }

    /// Confirms the currently proposed time. The entrepreneur may confirm
    /// from `pending` or `counterproposal_investor`; the investor only from
    /// `counterproposal_entrepreneur` (turn-taking).
    pub async fn confirm(
        &self,
        meeting_id: Uuid,
        req: ConfirmRequest,
    ) -> Result<Meeting, CoreError> {
        let (updated, recipient, acted) = {
            let mut tables = self.store.write().await;
            let meeting = fetch_mut(&mut tables.meetings, meeting_id)?;
            let party = resolve_party(meeting, req.actor_id)?;
            let allowed = matches!(
                (meeting.status, party),
                (MeetingStatus::Pending, Party::Entrepreneur)
                    | (MeetingStatus::CounterproposalInvestor, Party::Entrepreneur)
                    | (MeetingStatus::CounterproposalEntrepreneur, Party::Investor)
            );
            if !allowed {
                return Err(CoreError::InvalidState(format!(
                    "The {} cannot confirm a meeting in status {:?}",
                    party.label(),
                    meeting.status
                )));
            }
            meeting.status = MeetingStatus::Confirmed;
            meeting.confirmed_at = Some(Utc::now());
            meeting.counter_by = None;
            meeting.counter_note = None;
            if req.meeting_link.is_some() {
                meeting.meeting_link = req.meeting_link;
            }
            if let Some(note) = req.note {
                match party {
                    Party::Entrepreneur => meeting.entrepreneur_note = Some(note),
                    Party::Investor => meeting.investor_note = Some(note),
                }
            }
            meeting.updated_at = Utc::now();
            (meeting.clone(), meeting.counterpart_id(party), party)
        };
        info!(meeting = %updated.id, by = acted.label(), "meeting confirmed");
        self.notify(
            &updated,
            recipient,
            NotificationKind::MeetingConfirmed,
            format!("The {} confirmed the meeting", acted.label()),
        )
        .await;
        Ok(updated)
    }

    /// Rejects the request. Available to either party from any active status;
    /// releases the bound slot in the same transaction.
    pub async fn reject(&self, meeting_id: Uuid, req: RejectRequest) -> Result<Meeting, CoreError> {
        let (updated, recipient, acted) = {
            let mut tables = self.store.write().await;
            let meeting = fetch_mut(&mut tables.meetings, meeting_id)?;
            let party = resolve_party(meeting, req.actor_id)?;
            require_active(meeting, "reject")?;
            meeting.status = MeetingStatus::Rejected;
            meeting.rejected_at = Some(Utc::now());
            meeting.rejection_reason = Some(
                req.reason
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string()),
            );
            meeting.counter_by = None;
            meeting.counter_note = None;
            meeting.updated_at = Utc::now();
            let released = meeting.slot_id.take();
            let snapshot = meeting.clone();
            let recipient = snapshot.counterpart_id(party);
            if let Some(slot_id) = released {
                tables.release_slot(slot_id);
            }
            (snapshot, recipient, party)
        };
        info!(meeting = %updated.id, by = acted.label(), "meeting rejected");
        self.notify(
            &updated,
            recipient,
            NotificationKind::MeetingRejected,
            format!(
                "The {} rejected the meeting: {}",
                acted.label(),
                updated.rejection_reason.as_deref().unwrap_or(DEFAULT_REJECTION_REASON)
            ),
        )
        .await;
        Ok(updated)
    }

    /// Replaces the proposed time with a free-form one and hands the turn to
    /// the other party. The previously bound slot (if any) is released; the
    /// new time is not tied to any slot record.
    pub async fn counterpropose(
        &self,
        meeting_id: Uuid,
        req: CounterproposalRequest,
    ) -> Result<Meeting, CoreError> {
        let (updated, recipient, acted) = {
            let mut tables = self.store.write().await;
            let meeting = fetch_mut(&mut tables.meetings, meeting_id)?;
            let party = resolve_party(meeting, req.actor_id)?;
            require_active(meeting, "counterpropose")?;

            meeting.scheduled_at = req.date.and_time(req.start_time);
            let recomputed = (req.end_time - req.start_time).num_minutes();
            // A degenerate window keeps the previous duration instead of
            // failing the proposal.
            if recomputed > 0 {
                meeting.duration_minutes = recomputed;
            }
            meeting.status = match party {
                Party::Entrepreneur => MeetingStatus::CounterproposalEntrepreneur,
                Party::Investor => MeetingStatus::CounterproposalInvestor,
            };
            meeting.counter_by = Some(req.actor_id);
            meeting.counter_note = req.note;
            meeting.updated_at = Utc::now();
            let released = meeting.slot_id.take();
            let snapshot = meeting.clone();
            let recipient = snapshot.counterpart_id(party);
            if let Some(slot_id) = released {
                tables.release_slot(slot_id);
            }
            (snapshot, recipient, party)
        };
        info!(meeting = %updated.id, by = acted.label(), "meeting time counterproposed");
        self.notify(
            &updated,
            recipient,
            NotificationKind::MeetingCounterproposed,
            format!(
                "The {} proposed a new meeting time: {} ({} min)",
                acted.label(),
                updated.scheduled_at,
                updated.duration_minutes
            ),
        )
        .await;
        Ok(updated)
    }

    /// Withdraws the request. Investor-exclusive; releases the bound slot.
    pub async fn cancel(&self, meeting_id: Uuid, req: CancelRequest) -> Result<Meeting, CoreError> {
        let (updated, recipient) = {
            let mut tables = self.store.write().await;
            let meeting = fetch_mut(&mut tables.meetings, meeting_id)?;
            let party = resolve_party(meeting, req.actor_id)?;
            if party != Party::Investor {
                return Err(CoreError::Forbidden(
                    "Only the investor may cancel a meeting request".to_string(),
                ));
            }
            require_active(meeting, "cancel")?;
            meeting.status = MeetingStatus::Cancelled;
            meeting.cancelled_at = Some(Utc::now());
            meeting.cancelled_by = Some(req.actor_id);
            meeting.cancellation_reason = Some(
                req.reason
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_CANCELLATION_REASON.to_string()),
            );
            meeting.counter_by = None;
            meeting.counter_note = None;
            meeting.updated_at = Utc::now();
            let released = meeting.slot_id.take();
            let snapshot = meeting.clone();
            let recipient = snapshot.entrepreneur_id;
            if let Some(slot_id) = released {
                tables.release_slot(slot_id);
            }
            (snapshot, recipient)
        };
        info!(meeting = %updated.id, "meeting cancelled by investor");
        self.notify(
            &updated,
            recipient,
            NotificationKind::MeetingCancelled,
            format!(
                "The investor cancelled the meeting: {}",
                updated
                    .cancellation_reason
                    .as_deref()
                    .unwrap_or(DEFAULT_CANCELLATION_REASON)
            ),
        )
        .await;
        Ok(updated)
    }

    async fn notify(
        &self,
        meeting: &Meeting,
        recipient_id: Uuid,
        kind: NotificationKind,
        summary: String,
    ) {
        dispatch(
            self.notifier.as_ref(),
            NotificationEvent {
                recipient_id,
                kind,
                summary,
                meeting_id: meeting.id,
                project_id: meeting.project_id,
            },
        )
        .await;
    }
}

fn fetch_mut(
    meetings: &mut std::collections::HashMap<Uuid, Meeting>,
    meeting_id: Uuid,
) -> Result<&mut Meeting, CoreError> {
    meetings
        .get_mut(&meeting_id)
        .ok_or_else(|| CoreError::NotFound(format!("Meeting {} does not exist", meeting_id)))
}

fn resolve_party(meeting: &Meeting, actor_id: Uuid) -> Result<Party, CoreError> {
    meeting.party_of(actor_id).ok_or_else(|| {
        CoreError::Forbidden("Actor is not a participant of this meeting".to_string())
    })
}

fn require_active(meeting: &Meeting, action: &str) -> Result<(), CoreError> {
    if meeting.status.is_active() {
        Ok(())
    } else {
        Err(CoreError::InvalidState(format!(
            "Cannot {} a meeting in status {:?}",
            action, meeting.status
        )))
    }
}

// HTTP Handlers

pub async fn get_meeting(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Meeting>, CoreError> {
    Ok(Json(state.meetings.get(id).await?))
}

pub async fn confirm_meeting(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Json<Meeting>, CoreError> {
    Ok(Json(state.meetings.confirm(id, payload).await?))
}

pub async fn reject_meeting(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectRequest>,
) -> Result<Json<Meeting>, CoreError> {
    Ok(Json(state.meetings.reject(id, payload).await?))
}

pub async fn counterpropose_meeting(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CounterproposalRequest>,
) -> Result<Json<Meeting>, CoreError> {
    Ok(Json(state.meetings.counterpropose(id, payload).await?))
}

pub async fn cancel_meeting(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelRequest>,
) -> Result<Json<Meeting>, CoreError> {
    Ok(Json(state.meetings.cancel(id, payload).await?))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/meetings/{id}", get(get_meeting))
        .route("/api/meetings/{id}/confirm", post(confirm_meeting))
        .route("/api/meetings/{id}/reject", post(reject_meeting))
        .route(
            "/api/meetings/{id}/counterproposal",
            post(counterpropose_meeting),
        )
        .route("/api/meetings/{id}/cancel", post(cancel_meeting))
        .with_state(state)
}
