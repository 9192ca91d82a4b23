// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{error::ApiError, models::BlobInfoResponse, state::AppState, transport::BlobId};

/// Check whether a blob is still stored, without downloading it.
#[utoipa::path(
    get,
    path = "/v1/blobs/{blob_id}",
    params(
        ("blob_id" = String, Path, description = "Blob id to probe")
    ),
    tag = "Blobs",
    responses(
        (status = 200, body = BlobInfoResponse),
        (status = 400, description = "Invalid blob id"),
        (status = 503, description = "Storage network unavailable")
    )
)]
pub async fn get_blob_info(
    Path(blob_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<BlobInfoResponse>, ApiError> {
    let blob_id = BlobId::parse(&blob_id)?;
    let info = state.pipeline.probe(&blob_id, &state.shutdown).await?;
    Ok(Json(BlobInfoResponse {
        url: state.pipeline.transport().blob_url(&blob_id),
        blob_id: blob_id.to_string(),
        exists: info.exists,
        size: info.size,
        content_type: info.content_type,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::transport::{BlobStore, MemoryNetwork};

    #[tokio::test]
    async fn probe_reports_stored_blob() {
        let network = Arc::new(MemoryNetwork::new());
        let state = AppState::in_memory(network.clone());
        let stored = network.upload_anonymous(b"resume bytes", 5).await.unwrap();

        let Json(info) = get_blob_info(Path(stored.blob_id.to_string()), State(state))
            .await
            .expect("probe succeeds");

        assert!(info.exists);
        assert_eq!(info.size, Some(12));
        assert!(info.url.ends_with(&format!("/v1/{}", stored.blob_id)));
    }

    #[tokio::test]
    async fn probe_reports_missing_blob() {
        let Json(info) = get_blob_info(Path("gone".to_string()), State(AppState::default()))
            .await
            .unwrap();
        assert!(!info.exists);
        assert_eq!(info.size, None);
    }

    #[tokio::test]
    async fn probe_rejects_invalid_id() {
        let err = get_blob_info(Path("a b".to_string()), State(AppState::default()))
            .await
            .unwrap_err();
        assert_eq!(err.error_code, "invalid_blob_id");
    }
}
