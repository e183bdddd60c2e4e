use axum::{response::IntoResponse, Json};

/// Failure taxonomy for the scheduling core. Every engine operation returns one
/// of these kinds; the API layer maps each kind to a distinct status and a
/// stable machine-readable code so clients can react per kind (e.g. retry a
/// different slot on `SlotUnavailable` instead of retrying blindly).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Invalid offer: {0}")]
    InvalidOffer(String),
    #[error("Slot unavailable: {0}")]
    SlotUnavailable(String),
    #[error("Already claimed: {0}")]
    AlreadyClaimed(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl CoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::InvalidOperation(_) => "invalid_operation",
            Self::InvalidOffer(_) => "invalid_offer",
            Self::SlotUnavailable(_) => "slot_unavailable",
            Self::AlreadyClaimed(_) => "already_claimed",
            Self::Conflict(_) => "conflict",
            Self::InvalidState(_) => "invalid_state",
            Self::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::InvalidOperation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidOffer(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::SlotUnavailable(_) | Self::AlreadyClaimed(_) | Self::Conflict(_) => {
                StatusCode::CONFLICT
            }
            Self::InvalidState(_) => StatusCode::CONFLICT,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        }));
        (status, body).into_response()
    }
}
