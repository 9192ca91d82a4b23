// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use resume_vault::config::WalrusConfig;
use resume_vault::models::ResumeDocument;
use resume_vault::pipeline::{
    DocumentPipeline, ErrorKind, Phase, PipelineError, PublishOptions, RetrieveOptions,
};
use resume_vault::transport::{
    BlobId, BlobStore, BlobTransport, DownloadSource, JwtSigner, LazyClient, TransportError,
    UploadMetadata, UploadStrategy, WalrusClient,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHAIN_ID: &str = "4c78adac";
const BLOB_ID: &str = "M4hsZGQ1oCktdzegB6HnI6Mi28S2nqOPHxK-W7_4BUk";

fn config(mock: &MockServer) -> WalrusConfig {
    WalrusConfig::for_network(Default::default()).with_single_endpoint(mock.uri())
}

async fn mount_chain_id(mock: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({ "method": "sui_getChainIdentifier" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": CHAIN_ID
        })))
        .mount(mock)
        .await;
}

async fn connect(mock: &MockServer) -> WalrusClient {
    mount_chain_id(mock).await;
    WalrusClient::connect(&config(mock)).await.unwrap()
}

fn newly_created(blob_id: &str) -> serde_json::Value {
    json!({
        "newlyCreated": {
            "blobObject": {
                "id": "0x9c0d",
                "blobId": blob_id,
                "size": 1024,
                "storage": { "startEpoch": 10, "endEpoch": 15 }
            },
            "cost": 132300
        }
    })
}

fn lazy_walrus(config: WalrusConfig) -> LazyClient<WalrusClient> {
    LazyClient::new(move || {
        let config = config.clone();
        async move { WalrusClient::connect(&config).await }
    })
}

#[tokio::test]
async fn connect_discovers_chain_identifier() {
    let mock = MockServer::start().await;
    let client = connect(&mock).await;
    assert_eq!(client.chain_id(), CHAIN_ID);
}

#[tokio::test]
async fn connect_fails_on_rpc_error() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32601, "message": "Method not found" }
        })))
        .mount(&mock)
        .await;

    let err = WalrusClient::connect(&config(&mock)).await.unwrap_err();
    assert!(matches!(err, TransportError::Init(_)));
}

#[tokio::test]
async fn anonymous_publish_reads_newly_created_id() {
    let mock = MockServer::start().await;
    let client = connect(&mock).await;

    Mock::given(method("PUT"))
        .and(path("/v1/store"))
        .and(query_param("epochs", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(newly_created(BLOB_ID)))
        .expect(1)
        .mount(&mock)
        .await;

    let stored = client.upload_anonymous(b"sealed bytes", 5).await.unwrap();
    assert_eq!(stored.blob_id.as_str(), BLOB_ID);
    assert!(stored.provider_info.get("newlyCreated").is_some());
}

#[tokio::test]
async fn anonymous_publish_reads_already_certified_id() {
    let mock = MockServer::start().await;
    let client = connect(&mock).await;

    Mock::given(method("PUT"))
        .and(path("/v1/store"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "alreadyCertified": {
                "blobId": BLOB_ID,
                "event": { "txDigest": "4XQHFa9S324wTzYHF3vsBSwpUZuLpmwTHYMFv9nsttSs" },
                "endEpoch": 30
            }
        })))
        .mount(&mock)
        .await;

    let stored = client.upload_anonymous(b"same bytes", 5).await.unwrap();
    assert_eq!(stored.blob_id.as_str(), BLOB_ID);
}

#[tokio::test]
async fn response_without_blob_id_is_an_upload_error() {
    let mock = MockServer::start().await;
    mount_chain_id(&mock).await;

    Mock::given(method("PUT"))
        .and(path("/v1/store"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "markedInvalid": {} })))
        .mount(&mock)
        .await;

    let config = config(&mock);
    let pipeline = DocumentPipeline::new(BlobTransport::new(
        lazy_walrus(config.clone()),
        config.epochs,
        config.aggregator_url.clone(),
    ));

    let err = pipeline
        .publish(
            &sample_resume(),
            &PublishOptions::default(),
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upload);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn signed_write_sends_owner_and_bearer_token() {
    let mock = MockServer::start().await;
    let client = connect(&mock).await;

    Mock::given(method("PUT"))
        .and(path("/v1/blobs"))
        .and(query_param("epochs", "3"))
        .and(query_param("send_object_to", "0xowner"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(newly_created(BLOB_ID)))
        .expect(1)
        .mount(&mock)
        .await;

    let signer = JwtSigner::new("0xowner", b"publisher-secret").unwrap();
    let stored = client.upload_signed(b"bytes", 3, &signer).await.unwrap();
    assert_eq!(stored.blob_id.as_str(), BLOB_ID);
}

#[tokio::test]
async fn rejected_signed_write_falls_back_to_store() {
    let mock = MockServer::start().await;
    mount_chain_id(&mock).await;

    Mock::given(method("PUT"))
        .and(path("/v1/blobs"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/store"))
        .respond_with(ResponseTemplate::new(200).set_body_json(newly_created(BLOB_ID)))
        .expect(1)
        .mount(&mock)
        .await;

    let config = config(&mock);
    let transport = BlobTransport::new(
        lazy_walrus(config.clone()),
        config.epochs,
        config.aggregator_url.clone(),
    );
    let signer = JwtSigner::new("0xowner", b"publisher-secret").unwrap();

    let receipt = transport
        .upload(b"bytes", &UploadMetadata::new(), Some(&signer))
        .await
        .unwrap();
    assert_eq!(receipt.strategy, UploadStrategy::AnonymousPublish);
    assert_eq!(receipt.url, format!("{}/v1/{BLOB_ID}", mock.uri()));
}

#[tokio::test]
async fn downloads_use_network_and_gateway_paths() {
    let mock = MockServer::start().await;
    let client = connect(&mock).await;
    let id = BlobId::parse(BLOB_ID).unwrap();

    Mock::given(method("GET"))
        .and(path(format!("/v1/blobs/{BLOB_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"from network".to_vec()))
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/{BLOB_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"from gateway".to_vec()))
        .mount(&mock)
        .await;

    assert_eq!(client.download(&id).await.unwrap(), b"from network");
    assert_eq!(client.download_via_gateway(&id).await.unwrap(), b"from gateway");
}

#[tokio::test]
async fn missing_blob_is_not_found_on_both_paths() {
    let mock = MockServer::start().await;
    let client = connect(&mock).await;
    let id = BlobId::parse("unknown").unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("blob not found"))
        .mount(&mock)
        .await;

    assert_eq!(
        client.download(&id).await.unwrap_err(),
        TransportError::NotFound("unknown".to_string())
    );
    assert_eq!(
        client.download_via_gateway(&id).await.unwrap_err(),
        TransportError::NotFound("unknown".to_string())
    );
}

#[tokio::test]
async fn server_error_is_retryable_transport_error() {
    let mock = MockServer::start().await;
    let client = connect(&mock).await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("aggregator overloaded"))
        .mount(&mock)
        .await;

    let err = client
        .download(&BlobId::parse("abc").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Status { status: 503, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unreachable_aggregator_is_distinct_from_not_found() {
    let mock = MockServer::start().await;
    mount_chain_id(&mock).await;
    let mut config = config(&mock);
    config.aggregator_url = "http://127.0.0.1:9".to_string();
    let client = WalrusClient::connect(&config).await.unwrap();

    let err = client
        .download(&BlobId::parse("abc").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Connect(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn head_reads_size_and_content_type() {
    let mock = MockServer::start().await;
    let client = connect(&mock).await;

    Mock::given(method("HEAD"))
        .and(path(format!("/v1/{BLOB_ID}")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-length", "2048")
                .insert_header("content-type", "application/octet-stream"),
        )
        .mount(&mock)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/v1/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock)
        .await;

    let info = client.head(&BlobId::parse(BLOB_ID).unwrap()).await.unwrap();
    assert!(info.exists);
    assert_eq!(info.size, Some(2048));
    assert_eq!(info.content_type.as_deref(), Some("application/octet-stream"));

    let info = client.head(&BlobId::parse("gone").unwrap()).await.unwrap();
    assert!(!info.exists);
}

#[tokio::test]
async fn concurrent_first_calls_initialize_once() {
    let mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": CHAIN_ID }))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock)
        .await;

    let config = config(&mock);
    let transport = Arc::new(BlobTransport::new(
        lazy_walrus(config.clone()),
        config.epochs,
        config.aggregator_url.clone(),
    ));
    let id = BlobId::parse("abc").unwrap();

    let results = join_all((0..8).map(|_| transport.head_info(&id))).await;
    assert!(results.iter().all(|r| matches!(r, Ok(info) if !info.exists)));
    assert!(transport.is_ready());
    // MockServer verifies `.expect(1)` on drop.
}

#[tokio::test]
async fn encrypted_resume_round_trips_through_walrus_api() {
    let mock = MockServer::start().await;
    mount_chain_id(&mock).await;

    let config = config(&mock);
    let pipeline = DocumentPipeline::new(BlobTransport::new(
        lazy_walrus(config.clone()),
        config.epochs,
        config.aggregator_url.clone(),
    ));
    let cancel = CancellationToken::new();

    Mock::given(method("PUT"))
        .and(path("/v1/store"))
        .respond_with(ResponseTemplate::new(200).set_body_json(newly_created(BLOB_ID)))
        .mount(&mock)
        .await;

    let receipt = pipeline
        .publish(&sample_resume(), &PublishOptions::default(), None, &cancel)
        .await
        .unwrap();

    let uploaded = mock
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.method.as_str() == "PUT")
        .unwrap()
        .body;

    Mock::given(method("GET"))
        .and(path(format!("/v1/blobs/{BLOB_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(uploaded))
        .mount(&mock)
        .await;

    let document: ResumeDocument = pipeline
        .retrieve(
            &receipt.blob_id,
            &RetrieveOptions {
                key: receipt.key,
                source: DownloadSource::Network,
            },
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(document, sample_resume());
}

#[tokio::test]
async fn slow_publisher_is_not_cut_off_by_default() {
    let mock = MockServer::start().await;
    let client = connect(&mock).await;

    Mock::given(method("PUT"))
        .and(path("/v1/store"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(newly_created(BLOB_ID))
                .set_delay(Duration::from_millis(1500)),
        )
        .mount(&mock)
        .await;

    let stored = client.upload_anonymous(b"sealed bytes", 5).await.unwrap();
    assert_eq!(stored.blob_id.as_str(), BLOB_ID);
}

#[tokio::test]
async fn configured_request_timeout_applies() {
    let mock = MockServer::start().await;
    mount_chain_id(&mock).await;
    let mut config = config(&mock);
    config.request_timeout = Some(Duration::from_millis(200));
    let client = WalrusClient::connect(&config).await.unwrap();

    Mock::given(method("PUT"))
        .and(path("/v1/store"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(newly_created(BLOB_ID))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock)
        .await;

    let err = client.upload_anonymous(b"sealed bytes", 5).await.unwrap_err();
    assert!(matches!(err, TransportError::Timeout(_)));
}

#[tokio::test]
async fn cancel_during_upload_returns_no_blob() {
    let mock = MockServer::start().await;
    mount_chain_id(&mock).await;

    Mock::given(method("PUT"))
        .and(path("/v1/store"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(newly_created(BLOB_ID))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock)
        .await;

    let config = config(&mock);
    let pipeline = DocumentPipeline::new(BlobTransport::new(
        lazy_walrus(config.clone()),
        config.epochs,
        config.aggregator_url.clone(),
    ));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(3),
        pipeline.publish(&sample_resume(), &PublishOptions::default(), None, &cancel),
    )
    .await
    .expect("cancellation should end the publish before the publisher answers");

    let err = result.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Cancelled {
            phase: Phase::Uploading
        }
    ));
    assert!(err.blob_id().is_none());
}

#[tokio::test]
async fn cancel_during_download_stops_retrieve() {
    let mock = MockServer::start().await;
    mount_chain_id(&mock).await;

    Mock::given(method("GET"))
        .and(path(format!("/v1/blobs/{BLOB_ID}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"late".to_vec())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock)
        .await;

    let config = config(&mock);
    let pipeline = DocumentPipeline::new(BlobTransport::new(
        lazy_walrus(config.clone()),
        config.epochs,
        config.aggregator_url.clone(),
    ));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let id = BlobId::parse(BLOB_ID).unwrap();
    let err = tokio::time::timeout(
        Duration::from_secs(3),
        pipeline.retrieve::<ResumeDocument>(&id, &RetrieveOptions::default(), &cancel),
    )
    .await
    .expect("cancellation should end the retrieve before the aggregator answers")
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(err.phase(), Phase::Downloading);
}

fn sample_resume() -> ResumeDocument {
    serde_json::from_value(json!({
        "personal": {
            "name": "Ada Chen",
            "gender": "female",
            "birthDate": "1995-08",
            "workStartDate": "2017-07",
            "jobStatus": "employed",
            "identity": "professional",
            "phone": "+86 139 0000 0000",
            "wechat": "ada_c",
            "email": "ada@example.com"
        },
        "skills": "Rust, Move, distributed systems",
        "desiredPosition": {
            "jobType": "fulltime",
            "position": "Protocol Engineer",
            "industry": "Web3",
            "salaryMin": "35k",
            "salaryMax": "50k",
            "city": "Shenzhen"
        },
        "workExperience": [],
        "projectExperience": [],
        "education": [{
            "school": "Zhejiang University",
            "degree": "bachelor",
            "educationType": "fulltime",
            "major": "Software Engineering",
            "startDate": "2013-09",
            "endDate": "2017-06"
        }],
        "certificates": []
    }))
    .unwrap()
}
