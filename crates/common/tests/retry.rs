//! Integration tests for the single reconnect-and-retry on stale credentials

mod common;

use http::StatusCode;

use ::common::session::SessionStore;
use ::common::storage::{DeleteOptions, PutOptions, StorageError, WriteMode};

fn plain() -> PutOptions {
    PutOptions::new(WriteMode::Plain)
}

#[tokio::test]
async fn test_stale_token_reconnects_once() {
    let (hub, _, alice) = common::setup();

    alice.storage.put_file("a.txt", "1", &plain()).await.unwrap();
    let stale = alice.storage.session().hub_config().unwrap();
    assert_eq!(hub.hub_info_requests(), 1);

    hub.revoke_tokens();
    alice.storage.put_file("a.txt", "2", &plain()).await.unwrap();

    assert_eq!(hub.hub_info_requests(), 2);
    assert_eq!(hub.store_requests(), 3);
    let fresh = alice.storage.session().hub_config().unwrap();
    assert_ne!(stale.token, fresh.token);

    // the retry presented the new token, not the stale one
    let tokens = hub.tokens_seen();
    assert_eq!(tokens[1], stale.token);
    assert_eq!(tokens[2], fresh.token);
    assert_eq!(hub.stored(&alice.address, "a.txt").unwrap().as_ref(), b"2");
}

#[tokio::test]
async fn test_stale_legacy_token_reconnects_once() {
    let (hub, _, alice) =
        common::setup_with(common::MemoryHub::new(common::AuthScheme::Legacy));

    alice.storage.put_file("a.txt", "1", &plain()).await.unwrap();
    hub.revoke_tokens();
    alice.storage.put_file("a.txt", "2", &plain()).await.unwrap();

    assert_eq!(hub.hub_info_requests(), 2);
    assert_eq!(hub.stored(&alice.address, "a.txt").unwrap().as_ref(), b"2");
}

#[tokio::test]
async fn test_second_failure_surfaces_without_another_retry() {
    let (hub, _, alice) = common::setup();
    alice.storage.reconnect().await.unwrap();

    hub.fail_next(&[StatusCode::UNAUTHORIZED, StatusCode::UNAUTHORIZED]);
    let result = alice.storage.put_file("a.txt", "1", &plain()).await;

    assert!(matches!(result, Err(StorageError::Unauthorized(_))));
    assert_eq!(hub.store_requests(), 2);
    assert_eq!(hub.hub_info_requests(), 2);
    assert!(hub.stored(&alice.address, "a.txt").is_none());
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let (hub, _, alice) = common::setup();
    alice.storage.reconnect().await.unwrap();

    hub.fail_next(&[StatusCode::SERVICE_UNAVAILABLE]);
    alice.storage.put_file("a.txt", "1", &plain()).await.unwrap();
    assert_eq!(hub.store_requests(), 2);
}

#[tokio::test]
async fn test_precondition_failure_is_not_retried() {
    let (hub, _, alice) = common::setup();
    alice.storage.reconnect().await.unwrap();

    hub.fail_next(&[StatusCode::PRECONDITION_FAILED]);
    let result = alice.storage.put_file("a.txt", "1", &plain()).await;

    assert!(matches!(result, Err(StorageError::PreconditionFailed(_))));
    assert_eq!(hub.store_requests(), 1);
    assert_eq!(hub.hub_info_requests(), 1);
}

#[tokio::test]
async fn test_bad_request_surfaces_as_remote_service_error() {
    let (hub, _, alice) = common::setup();
    alice.storage.reconnect().await.unwrap();

    hub.fail_next(&[StatusCode::BAD_REQUEST]);
    match alice.storage.put_file("a.txt", "1", &plain()).await {
        Err(StorageError::RemoteService { status, body, .. }) => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, "forced failure");
        }
        other => panic!("expected RemoteService, got {:?}", other),
    }
    assert_eq!(hub.store_requests(), 1);
}

#[tokio::test]
async fn test_signed_put_retries_both_uploads() {
    let (hub, _, alice) = common::setup();
    alice.storage.reconnect().await.unwrap();
    hub.revoke_tokens();

    alice
        .storage
        .put_file(
            "a.txt",
            "1",
            &PutOptions::new(WriteMode::Signed { signing_key: None }),
        )
        .await
        .unwrap();
    assert_eq!(hub.hub_info_requests(), 2);
    assert!(hub.stored(&alice.address, "a.txt").is_some());
    assert!(hub.stored(&alice.address, "a.txt.sig").is_some());
}

#[tokio::test]
async fn test_delete_reconnects_once() {
    let (hub, _, alice) = common::setup();

    alice.storage.put_file("a.txt", "1", &plain()).await.unwrap();
    hub.revoke_tokens();
    alice
        .storage
        .delete_file("a.txt", &DeleteOptions::default())
        .await
        .unwrap();

    assert_eq!(hub.delete_requests(), 2);
    assert_eq!(hub.hub_info_requests(), 2);
    assert!(hub.stored(&alice.address, "a.txt").is_none());
}

#[tokio::test]
async fn test_list_reconnects_on_first_page() {
    let (hub, _, alice) = common::setup();

    alice.storage.put_file("a.txt", "1", &plain()).await.unwrap();
    hub.revoke_tokens();

    let count = alice.storage.list_files(|_| true).await.unwrap();
    assert_eq!(count, 1);
    assert_eq!(hub.list_requests(), 2);
    assert_eq!(hub.hub_info_requests(), 2);
}
