use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::data::RoomId;

/// Errors surfaced by the planner. Empty or partial results are never errors.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("invalid data at row {row}: missing required field {field}")]
    MissingField { row: usize, field: &'static str },
    #[error("invalid data at row {row}: field {field} has unusable value {value:?}")]
    InvalidField {
        row: usize,
        field: &'static str,
        value: String,
    },
    #[error("room {0} does not exist")]
    UnknownRoom(RoomId),
    #[error("no collision-free schedule exists: {0}")]
    Infeasible(String),
    #[error("malformed snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
    #[error("planning task failed: {0}")]
    Worker(String),
}

impl PlannerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnknownRoom(_) => StatusCode::NOT_FOUND,
            Self::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for PlannerError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
