// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    envelope::SymmetricKey,
    error::ApiError,
    models::{OpenResumeRequest, PublishResumeRequest, PublishResumeResponse, ResumeDocument},
    pipeline::{PublishOptions, PublishReceipt, RetrieveOptions},
    state::AppState,
    transport::{BlobId, UploadMetadata},
};

fn publish_options(request: &PublishResumeRequest) -> PublishOptions {
    PublishOptions::encrypted(request.encrypt)
        .with_tags(UploadMetadata::from(request.tags.clone()))
}

fn response(
    receipt: PublishReceipt,
    document: &ResumeDocument,
    previous: Option<BlobId>,
) -> PublishResumeResponse {
    PublishResumeResponse {
        blob_id: receipt.blob_id.to_string(),
        encryption_key: receipt.key.as_ref().map(SymmetricKey::to_text),
        url: receipt.url,
        strategy: receipt.strategy.to_string(),
        previous_blob_id: previous.map(|id| id.to_string()),
        summary: document.summary(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/resumes",
    request_body = PublishResumeRequest,
    tag = "Resumes",
    responses(
        (status = 201, body = PublishResumeResponse),
        (status = 422, description = "Resume failed validation"),
        (status = 502, description = "Storage accepted the upload but returned no blob id"),
        (status = 503, description = "Storage network unavailable")
    )
)]
pub async fn publish_resume(
    State(state): State<AppState>,
    Json(request): Json<PublishResumeRequest>,
) -> Result<(StatusCode, Json<PublishResumeResponse>), ApiError> {
    let receipt = state
        .pipeline
        .publish(
            &request.document,
            &publish_options(&request),
            state.signer(),
            &state.shutdown,
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(response(receipt, &request.document, None)),
    ))
}

/// Publish a new version of a resume. The previous blob is not modified.
#[utoipa::path(
    put,
    path = "/v1/resumes/{blob_id}",
    params(
        ("blob_id" = String, Path, description = "Blob id of the version being replaced")
    ),
    request_body = PublishResumeRequest,
    tag = "Resumes",
    responses(
        (status = 201, body = PublishResumeResponse),
        (status = 400, description = "Invalid blob id"),
        (status = 422, description = "Resume failed validation")
    )
)]
pub async fn update_resume(
    Path(blob_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<PublishResumeRequest>,
) -> Result<(StatusCode, Json<PublishResumeResponse>), ApiError> {
    let previous = BlobId::parse(&blob_id)?;
    let receipt = state
        .pipeline
        .republish(
            &previous,
            &request.document,
            &publish_options(&request),
            state.signer(),
            &state.shutdown,
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(response(receipt, &request.document, Some(previous))),
    ))
}

/// Download and open a resume.
///
/// The key is sent in the body so it never appears in access logs.
#[utoipa::path(
    post,
    path = "/v1/resumes/{blob_id}/open",
    params(
        ("blob_id" = String, Path, description = "Blob id returned at publish time")
    ),
    request_body = OpenResumeRequest,
    tag = "Resumes",
    responses(
        (status = 200, body = ResumeDocument),
        (status = 400, description = "Invalid blob id or key"),
        (status = 403, description = "Wrong or missing key"),
        (status = 404, description = "Blob unknown or expired"),
        (status = 422, description = "Blob does not hold a resume"),
        (status = 503, description = "Storage network unavailable")
    )
)]
pub async fn open_resume(
    Path(blob_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<OpenResumeRequest>,
) -> Result<Json<ResumeDocument>, ApiError> {
    let blob_id = BlobId::parse(&blob_id)?;
    // An empty key is how unencrypted resumes are handed out.
    let key = request
        .encryption_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .map(SymmetricKey::parse)
        .transpose()?;
    let options = RetrieveOptions {
        key,
        source: request.source,
    };
    let document = state
        .pipeline
        .retrieve(&blob_id, &options, &state.shutdown)
        .await?;
    Ok(Json(document))
}
