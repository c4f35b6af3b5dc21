//! HTTP error handling
//!
//! Every handler failure becomes an [`ApiError`]. Its response carries a
//! [`CapturedFailure`] extension that the failure-journal middleware picks
//! up, records in the journal, and turns into the final [`ErrorBody`] with the
//! assigned event id.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use thiserror::Error;
use treenodes_core::db::DatabaseError;
use treenodes_core::services::TreeServiceError;

/// Response `type` for failures whose message is shown verbatim
pub const SECURE_TYPE: &str = "Secure";

/// Response `type` for internal failures with an opaque message
pub const EXCEPTION_TYPE: &str = "Exception";

/// Boundary error covering every way a request can fail
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] TreeServiceError),

    /// Journal read failed in storage
    #[error("Storage operation failed")]
    Storage(#[from] DatabaseError),

    #[error("Journal record with event ID = {event_id} was not found")]
    JournalEntryNotFound { event_id: i64 },

    /// Request path, query or body could not be parsed
    #[error("{message}")]
    BadRequest { message: String },

    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Body stream failed before completing (client abort, I/O error)
    #[error("Failed to read request body")]
    UnreadableBody {
        #[source]
        source: axum::Error,
    },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Service(err) => match err {
                TreeServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
                TreeServiceError::InvalidParent { .. } | TreeServiceError::Validation(_) => {
                    StatusCode::BAD_REQUEST
                }
                TreeServiceError::NameConflict { .. } | TreeServiceError::HasChildren { .. } => {
                    StatusCode::CONFLICT
                }
                TreeServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::JournalEntryNotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } | Self::UnreadableBody { .. } => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Error kind recorded as the journal's exception type
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Service(err) => err.kind(),
            Self::Storage(_) => "StorageError",
            Self::JournalEntryNotFound { .. } => "NotFoundError",
            Self::BadRequest { .. } | Self::UnreadableBody { .. } => "BadRequestError",
            Self::PayloadTooLarge { .. } => "PayloadTooLargeError",
        }
    }

    pub fn is_user_facing(&self) -> bool {
        match self {
            Self::Service(err) => err.is_user_facing(),
            Self::Storage(_) => false,
            _ => true,
        }
    }

    /// The error and its full source chain, one cause per line
    pub fn trace(&self) -> String {
        let mut trace = format!("{}: {}", self.kind(), self);
        let mut source = self.source();
        while let Some(cause) = source {
            trace.push_str("\ncaused by: ");
            trace.push_str(&cause.to_string());
            source = cause.source();
        }
        trace
    }

    pub fn captured(&self) -> CapturedFailure {
        CapturedFailure {
            status: self.status(),
            kind: self.kind(),
            message: self.to_string(),
            trace: self.trace(),
            user_facing: self.is_user_facing(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

/// Failure details attached to an error response for the journal middleware
#[derive(Debug, Clone)]
pub struct CapturedFailure {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
    pub trace: String,
    pub user_facing: bool,
}

impl CapturedFailure {
    /// Build the client-facing body for this failure
    ///
    /// Internal failures never expose their message; they point at the
    /// journal event instead.
    pub fn body(&self, event_id: Option<i64>) -> ErrorBody {
        let (kind, message) = if self.user_facing {
            (SECURE_TYPE, self.message.clone())
        } else {
            let message = match event_id {
                Some(id) => format!("Internal server error ID = {}", id),
                None => "Internal server error".to_string(),
            };
            (EXCEPTION_TYPE, message)
        };

        ErrorBody {
            kind: kind.to_string(),
            id: event_id.map(|id| id.to_string()),
            data: ErrorData { message },
        }
    }
}

/// JSON error response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: String,
    /// Journal event id, absent if journaling failed
    pub id: Option<String>,
    pub data: ErrorData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let failure = self.captured();
        let mut response = (failure.status, Json(failure.body(None))).into_response();
        response.extensions_mut().insert(failure);
        response
    }
}
