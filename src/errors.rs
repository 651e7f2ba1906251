// src/errors.rs - Service error taxonomy
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Trade not found: {0}")]
    NotFound(String),

    #[error("Invalid trade state: {0}")]
    InvalidState(String),

    #[error("Trade store unavailable: {0}")]
    StoreUnavailable(String),
}

impl LedgerError {
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "validation_error",
            LedgerError::NotFound(_) => "not_found",
            LedgerError::InvalidState(_) => "invalid_state",
            LedgerError::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(e: reqwest::Error) -> Self {
        LedgerError::StoreUnavailable(e.to_string())
    }
}

impl ResponseError for LedgerError {
    fn error_response(&self) -> HttpResponse {
        let body = json!({
            "status": "error",
            "error": self.kind(),
            "message": self.to_string(),
        });

        match self {
            LedgerError::Validation(_) => HttpResponse::BadRequest().json(body),
            LedgerError::NotFound(_) => HttpResponse::NotFound().json(body),
            LedgerError::InvalidState(_) => HttpResponse::Conflict().json(body),
            LedgerError::StoreUnavailable(_) => {
                log::error!("Store failure: {}", self);
                HttpResponse::ServiceUnavailable().json(body)
            }
        }
    }
}
