//! Notification boundary.
//!
//! The core emits structured notification requests; rendering and delivery
//! belong to the surrounding application. Emission is fire-and-forget: a
//! failed emit is logged and never affects the transaction that produced it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    MeetingRequested,
    OfferPendingReview,
    MeetingConfirmed,
    MeetingRejected,
    MeetingCancelled,
    MeetingCounterproposed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub summary: String,
    pub meeting_id: Uuid,
    pub project_id: Uuid,
}

/// Injected into the engines; the core never talks to a concrete delivery
/// channel directly.
#[async_trait]
pub trait NotificationEmitter: Send + Sync {
    async fn emit(&self, event: NotificationEvent) -> anyhow::Result<()>;
}

/// Best-effort dispatch. Failures are logged at warn and swallowed.
pub async fn dispatch(emitter: &dyn NotificationEmitter, event: NotificationEvent) {
    let kind = event.kind;
    let meeting_id = event.meeting_id;
    if let Err(err) = emitter.emit(event).await {
        warn!(?kind, %meeting_id, "notification emission failed: {err:#}");
    }
}

/// Default emitter: writes the event to the log. Useful until a real delivery
/// channel (mail, chat) is wired in by the host application.
pub struct LogEmitter;

#[async_trait]
impl NotificationEmitter for LogEmitter {
    async fn emit(&self, event: NotificationEvent) -> anyhow::Result<()> {
        info!(
            recipient = %event.recipient_id,
            kind = ?event.kind,
            meeting = %event.meeting_id,
            project = %event.project_id,
            "notify: {}",
            event.summary
        );
        Ok(())
    }
}

/// Forwards events onto an unbounded channel. The receiving side decides what
/// delivery means; tests use this to assert on emissions.
pub struct ChannelEmitter {
    tx: mpsc::UnboundedSender<NotificationEvent>,
}

impl ChannelEmitter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NotificationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl NotificationEmitter for ChannelEmitter {
    async fn emit(&self, event: NotificationEvent) -> anyhow::Result<()> {
        self.tx
            .send(event)
            .map_err(|_| anyhow::anyhow!("notification channel closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_emitter_forwards_events() {
        let (emitter, mut rx) = ChannelEmitter::new();
        let event = NotificationEvent {
            recipient_id: Uuid::new_v4(),
            kind: NotificationKind::MeetingRequested,
            summary: "An investor requested a meeting".to_string(),
            meeting_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
        };
        emitter.emit(event.clone()).await.unwrap();
        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind, NotificationKind::MeetingRequested);
        assert_eq!(received.recipient_id, event.recipient_id);
    }

    #[tokio::test]
    async fn test_dispatch_swallows_closed_channel() {
        let (emitter, rx) = ChannelEmitter::new();
        drop(rx);
        // Must not panic or propagate.
        dispatch(
            &emitter,
            NotificationEvent {
                recipient_id: Uuid::new_v4(),
                kind: NotificationKind::MeetingRejected,
                summary: "x".to_string(),
                meeting_id: Uuid::new_v4(),
                project_id: Uuid::new_v4(),
            },
        )
        .await;
    }
}
