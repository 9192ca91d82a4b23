// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Body,
    http::Request,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info_span;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        BlobInfoResponse, CareerIdentity, Certificate, Degree, DesiredPosition, Education,
        EducationType, Gender, JobStatus, JobType, OpenResumeRequest, PersonalInfo,
        ProjectExperience, PublishResumeRequest, PublishResumeResponse, ResumeDocument,
        ResumeSummary, WorkExperience,
    },
    state::AppState,
    transport::DownloadSource,
};

pub mod blobs;
pub mod health;
pub mod resumes;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/resumes", post(resumes::publish_resume))
        .route("/resumes/{blob_id}", put(resumes::update_resume))
        .route("/resumes/{blob_id}/open", post(resumes::open_resume))
        .route("/blobs/{blob_id}", get(blobs::get_blob_info))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .extensions()
                        .get::<RequestId>()
                        .and_then(|id| id.header_value().to_str().ok())
                        .unwrap_or("-");
                    info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id,
                    )
                }))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        resumes::publish_resume,
        resumes::update_resume,
        resumes::open_resume,
        blobs::get_blob_info,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            ResumeDocument,
            PersonalInfo,
            DesiredPosition,
            WorkExperience,
            ProjectExperience,
            Education,
            Certificate,
            Gender,
            JobStatus,
            CareerIdentity,
            JobType,
            Degree,
            EducationType,
            ResumeSummary,
            PublishResumeRequest,
            PublishResumeResponse,
            OpenResumeRequest,
            DownloadSource,
            BlobInfoResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Resumes", description = "Encrypted resume publishing and retrieval"),
        (name = "Blobs", description = "Blob storage probes"),
        (name = "Health", description = "Liveness and readiness")
    )
)]
pub struct ApiDoc;
