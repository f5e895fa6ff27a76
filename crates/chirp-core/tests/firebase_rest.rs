//! Integration tests for the Firebase REST backend against a mock server.

use std::time::Duration;

use bytes::Bytes;
use chirp_core::firebase::FirebaseEndpoints;
use chirp_core::{
    AuthErrorKind, AuthService, BlobStore, DocErrorKind, DocumentStore, FirebaseBackend,
};
use chirp_types::{CollectionPath, Comment, Direction, NewComment, ProfileUpdate};
use futures_util::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-key";
const PROJECT: &str = "demo";
const BUCKET: &str = "demo.appspot.com";

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn backend(server: &MockServer) -> FirebaseBackend {
    FirebaseBackend::new(
        FirebaseEndpoints::single_host(&server.uri(), API_KEY, PROJECT, BUCKET),
        Duration::from_millis(50),
    )
}

fn token_response(uid: &str, email: &str, display_name: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "localId": uid,
        "email": email,
        "displayName": display_name,
        "idToken": "id-1",
        "refreshToken": "refresh-1",
        "expiresIn": "3600"
    }))
}

async fn mount_sign_in(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .and(query_param("key", API_KEY))
        .and(body_partial_json(json!({ "email": "alice@x.io", "password": "secret1" })))
        .respond_with(token_response("u1", "alice@x.io", "alice"))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:lookup"))
        .and(body_partial_json(json!({ "idToken": "id-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [{
                "localId": "u1",
                "email": "alice@x.io",
                "displayName": "alice",
                "photoUrl": "https://cdn/alice.png"
            }]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_sign_in_populates_session_with_profile() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    mount_sign_in(&server).await;
    let backend = backend(&server);

    let identity = backend
        .sign_in_with_password("alice@x.io", "secret1")
        .await
        .unwrap();

    assert_eq!(identity.uid, "u1");
    assert_eq!(identity.display_name, "alice");
    assert_eq!(identity.photo_url, "https://cdn/alice.png");
    assert_eq!(backend.current_user(), Some(identity));

    backend.sign_out().await.unwrap();
    assert!(backend.current_user().is_none());
}

#[tokio::test]
async fn test_bad_credentials_leave_session_empty() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "INVALID_LOGIN_CREDENTIALS", "errors": [] }
        })))
        .mount(&server)
        .await;
    let backend = backend(&server);

    let err = backend
        .sign_in_with_password("alice@x.io", "wrong-pw")
        .await
        .unwrap_err();

    assert_eq!(err.kind, AuthErrorKind::InvalidCredentials);
    assert_eq!(err.message, "The email or password is incorrect.");
    assert!(backend.current_user().is_none());
}

#[tokio::test]
async fn test_sign_up_then_profile_without_photo_deletes_attribute() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signUp"))
        .respond_with(token_response("u2", "bob@x.io", ""))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:update"))
        .and(body_partial_json(json!({
            "idToken": "id-1",
            "displayName": "bob",
            "deleteAttribute": ["PHOTO_URL"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "localId": "u2",
            "email": "bob@x.io",
            "displayName": "bob"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let backend = backend(&server);

    let created = backend
        .create_account_with_password("bob@x.io", "secret1")
        .await
        .unwrap();
    let profile = ProfileUpdate {
        display_name: "bob".into(),
        photo_url: String::new(),
    };
    let updated = backend.update_profile(&created, &profile).await.unwrap();

    assert_eq!(updated.display_name, "bob");
    assert_eq!(updated.photo_url, "");
    assert_eq!(backend.current_user().unwrap().display_name, "bob");
}

#[tokio::test]
async fn test_federated_sign_in_is_unsupported() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let err = backend(&server)
        .sign_in_with_federated_popup()
        .await
        .unwrap_err();
    assert_eq!(err.kind, AuthErrorKind::Unsupported);
}

#[tokio::test]
async fn test_upload_and_download_url_use_session_token() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    mount_sign_in(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("/v0/b/{BUCKET}/o")))
        .and(query_param("uploadType", "media"))
        .and(query_param("name", "avatars/abc_me.png"))
        .and(header("authorization", "Firebase id-1"))
        .and(header("content-type", "image/png"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "avatars/abc_me.png" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v0/b/{BUCKET}/o/avatars%2Fabc_me.png")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "avatars/abc_me.png",
            "downloadTokens": "tok-1,tok-2"
        })))
        .mount(&server)
        .await;
    let backend = backend(&server);
    backend
        .sign_in_with_password("alice@x.io", "secret1")
        .await
        .unwrap();

    backend
        .upload("avatars/abc_me.png", Bytes::from_static(b"\x89PNG"), Some("image/png"))
        .await
        .unwrap();
    let url = backend.download_url("avatars/abc_me.png").await.unwrap();

    assert_eq!(
        url,
        format!(
            "{}/v0/b/{BUCKET}/o/avatars%2Fabc_me.png?alt=media&token=tok-1",
            server.uri()
        )
    );
}

#[tokio::test]
async fn test_upload_rejected_maps_to_unauthorized() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/v0/b/{BUCKET}/o")))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "Permission denied." }
        })))
        .mount(&server)
        .await;

    let err = backend(&server)
        .upload("avatars/x_me.png", Bytes::from_static(b"x"), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, chirp_core::StorageErrorKind::Unauthorized);
    assert_eq!(err.message, "HTTP 403: Permission denied.");
}

#[tokio::test]
async fn test_append_commits_with_server_time_transform() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/projects/demo/databases/(default)/documents:commit"))
        .and(body_partial_json(json!({
            "writes": [{
                "update": {
                    "fields": {
                        "text": { "stringValue": "nice post" },
                        "username": { "stringValue": "alice" }
                    }
                },
                "updateTransforms": [
                    { "fieldPath": "timestamp", "setToServerValue": "REQUEST_TIME" }
                ],
                "currentDocument": { "exists": false }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "writeResults": [{ "updateTime": "2021-03-04T18:20:07Z" }],
            "commitTime": "2021-03-04T18:20:07Z"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let backend = backend(&server);

    let record = NewComment {
        avatar: String::new(),
        text: "nice post".into(),
        user_name: "alice".into(),
    }
    .into_record(backend.server_timestamp());
    let id = backend
        .append(&CollectionPath::new("posts/p1/comments"), record)
        .await
        .unwrap();
    assert_eq!(id.len(), 32);
}

#[tokio::test]
async fn test_live_query_emits_decoded_snapshot() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let root = "projects/demo/databases/(default)/documents";
    Mock::given(method("POST"))
        .and(path(format!("/v1/{root}/posts/p1:runQuery")))
        .and(body_partial_json(json!({
            "structuredQuery": {
                "from": [{ "collectionId": "comments" }],
                "orderBy": [{ "field": { "fieldPath": "timestamp" }, "direction": "DESCENDING" }]
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "document": {
                    "name": format!("{root}/posts/p1/comments/c3"),
                    "fields": {
                        "text": { "stringValue": "three" },
                        "username": { "stringValue": "bob" },
                        "timestamp": { "timestampValue": "2021-03-04T18:20:09Z" }
                    }
                },
                "readTime": "2021-03-04T18:21:00Z"
            },
            {
                "document": {
                    "name": format!("{root}/posts/p1/comments/c1"),
                    "fields": {
                        "text": { "stringValue": "one" },
                        "username": { "stringValue": "bob" },
                        "timestamp": { "timestampValue": "2021-03-04T18:20:07Z" }
                    }
                },
                "readTime": "2021-03-04T18:21:00Z"
            }
        ])))
        .mount(&server)
        .await;
    let backend = backend(&server);

    let mut sub = backend
        .subscribe_ordered(
            &CollectionPath::new("posts/p1/comments"),
            "timestamp",
            Direction::Descending,
        )
        .unwrap();
    let snapshot = sub.next().await.unwrap().unwrap();
    let comments: Vec<Comment> = snapshot
        .iter()
        .map(|doc| Comment::from_document(doc).unwrap())
        .collect();

    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].id, "c3");
    assert_eq!(comments[1].text, "one");
    assert!(comments[0].timestamp > comments[1].timestamp);

    // Unchanged results are not re-emitted.
    let next = tokio::time::timeout(Duration::from_millis(200), sub.next()).await;
    assert!(next.is_err());
}

#[tokio::test]
async fn test_live_query_skips_undecodable_documents() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let root = "projects/demo/databases/(default)/documents";
    Mock::given(method("POST"))
        .and(path(format!("/v1/{root}:runQuery")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "document": {
                    "name": format!("{root}/posts/good"),
                    "fields": {
                        "text": { "stringValue": "hello" },
                        "username": { "stringValue": "alice" },
                        "timestamp": { "timestampValue": "2021-03-04T18:20:09Z" }
                    }
                }
            },
            {
                "document": {
                    "name": format!("{root}/posts/broken"),
                    "fields": {
                        "text": { "integerValue": "not-a-number" },
                        "timestamp": { "timestampValue": "2021-03-04T18:20:07Z" }
                    }
                }
            }
        ])))
        .mount(&server)
        .await;
    let backend = backend(&server);

    let mut sub = backend
        .subscribe_ordered(&CollectionPath::new("posts"), "timestamp", Direction::Descending)
        .unwrap();
    let snapshot = sub.next().await.unwrap().unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, "good");

    // The query stays open: no error and no end of stream follow.
    let next = tokio::time::timeout(Duration::from_millis(200), sub.next()).await;
    assert!(next.is_err());
}

#[tokio::test]
async fn test_live_query_error_ends_subscription() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/projects/demo/databases/(default)/documents:runQuery"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "Missing or insufficient permissions." }
        })))
        .mount(&server)
        .await;
    let backend = backend(&server);

    let mut sub = backend
        .subscribe_ordered(&CollectionPath::new("posts"), "timestamp", Direction::Descending)
        .unwrap();
    let err = sub.next().await.unwrap().unwrap_err();
    assert_eq!(err.kind, DocErrorKind::PermissionDenied);
    assert!(sub.next().await.is_none());
}
