//! Client against a live server on an ephemeral port

use collage_core::{CollageConfig, CollageOrchestrator};
use collage_server::{routes, AppState, CaptureBatch, ClientError, CollageClient, ListingCache};
use collage_store::MemoryArtifactStore;
use collage_test_utils::{chart_batch, png_bytes};
use std::sync::Arc;
use std::time::Duration;

fn spawn_server() -> String {
    let orchestrator =
        CollageOrchestrator::new(Arc::new(MemoryArtifactStore::new()), CollageConfig::new());
    let state = AppState::new(
        orchestrator,
        ListingCache::new(Some(Duration::from_secs(60))),
        16 * 1024 * 1024,
    );
    let (addr, server) = warp::serve(routes(state)).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    format!("http://{addr}")
}

fn capture(n: usize) -> CaptureBatch {
    CaptureBatch::from_buffers(chart_batch(n).into_iter().map(|img| img.bytes)).unwrap()
}

#[tokio::test]
async fn submit_then_list() {
    let client = CollageClient::new(spawn_server()).unwrap();

    let submission = client.submit(&capture(3)).await.unwrap();
    assert_eq!(
        (submission.artifact.width, submission.artifact.height),
        (800, 800)
    );
    assert!(submission.warnings.is_none());

    let listed = client.list().await.unwrap();
    assert_eq!(listed, vec![submission.artifact]);
}

#[tokio::test]
async fn every_submission_is_listed() {
    let client = CollageClient::new(spawn_server()).unwrap();

    let first = client.submit(&capture(2)).await.unwrap();
    let second = client.submit(&capture(1)).await.unwrap();

    let listed = client.list().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.contains(&first.artifact));
    assert!(listed.contains(&second.artifact));
}

#[tokio::test]
async fn empty_batch_is_a_server_error() {
    let client = CollageClient::new(spawn_server()).unwrap();

    let err = client.submit(&CaptureBatch::new()).await.unwrap_err();

    assert!(matches!(err, ClientError::Server { status: 400, .. }));
    assert_eq!(err.error_body().unwrap().kind, "empty_batch");
    assert!(client.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn off_size_charts_are_scaled_into_tiles() {
    let client = CollageClient::new(spawn_server()).unwrap();
    let batch = CaptureBatch::from_buffers(vec![
        png_bytes(120, 80, [200, 10, 10, 255]),
        png_bytes(400, 400, [10, 10, 200, 255]),
    ])
    .unwrap();

    let submission = client.submit(&batch).await.unwrap();
    assert_eq!(
        (submission.artifact.width, submission.artifact.height),
        (800, 400)
    );
}

#[tokio::test]
async fn unreachable_server() {
    let client = CollageClient::new("http://127.0.0.1:1").unwrap();
    assert!(matches!(client.list().await, Err(ClientError::Http(_))));
}
