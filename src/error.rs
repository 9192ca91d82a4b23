// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::warn;

use crate::envelope::EnvelopeError;
use crate::pipeline::{ErrorKind, PipelineError};
use crate::transport::TransportError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error_code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, error_code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            error_code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn bad_request(error_code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_code, message)
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let message = err.to_string();
        let (status, error_code) = match err.kind() {
            ErrorKind::InvalidDocument => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_document"),
            ErrorKind::MalformedInput => (StatusCode::UNPROCESSABLE_ENTITY, "malformed_document"),
            ErrorKind::Decryption => (StatusCode::FORBIDDEN, "wrong_key"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            ErrorKind::Upload => (StatusCode::BAD_GATEWAY, "upload_failed"),
            ErrorKind::Transport => (StatusCode::SERVICE_UNAVAILABLE, "network_unavailable"),
            ErrorKind::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "cancelled"),
            ErrorKind::Encryption => (StatusCode::INTERNAL_SERVER_ERROR, "encryption_failed"),
        };
        if status.is_server_error() {
            warn!(
                error_code,
                phase = %err.phase(),
                retryable = err.is_retryable(),
                error = %message,
                "Pipeline operation failed"
            );
        }
        Self::new(status, error_code, message)
    }
}

impl From<EnvelopeError> for ApiError {
    fn from(err: EnvelopeError) -> Self {
        Self::bad_request("invalid_key", err.to_string())
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::InvalidBlobId(_) => {
                Self::bad_request("invalid_blob_id", err.to_string())
            }
            TransportError::NotFound(_) => Self::not_found(err.to_string()),
            _ => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "network_unavailable",
                err.to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.error_code,
        });
        (self.status, body).into_response()
    }
}
