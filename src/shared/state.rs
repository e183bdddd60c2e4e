use std::sync::Arc;

use crate::booking::BookingEngine;
use crate::config::AppConfig;
use crate::meetings::MeetingEngine;
use crate::notifications::NotificationEmitter;
use crate::slots::SlotEngine;
use crate::store::Store;

/// Shared application state handed to every router. The engines share one
/// store, so a transition that touches both a meeting and its slot commits
/// under a single write guard no matter which engine drives it.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<Store>,
    pub slots: SlotEngine,
    pub booking: BookingEngine,
    pub meetings: MeetingEngine,
}

impl AppState {
    pub fn new(config: AppConfig, notifier: Arc<dyn NotificationEmitter>) -> Self {
        let store = Arc::new(Store::new());
        Self {
            config,
            slots: SlotEngine::new(Arc::clone(&store)),
            booking: BookingEngine::new(Arc::clone(&store), Arc::clone(&notifier)),
            meetings: MeetingEngine::new(Arc::clone(&store), notifier),
            store,
        }
    }
}
