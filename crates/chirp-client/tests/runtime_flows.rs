use std::time::Duration;

use bytes::Bytes;
use chirp_client::ClientRuntime;
use chirp_client::auth::{AuthMode, AvatarFile, SignUpRequest};
use chirp_client::comments::ThreadPhase;
use chirp_client::events::{CommentUiEvent, Intent, UiEvent};
use chirp_client::runtime::{COMMENTS_COLLECTION, create_account};
use chirp_core::memory::{DEMO_EMAIL, DEMO_PASSWORD};
use chirp_core::{AuthService, Backends, Config, MemoryBackend};
use chirp_types::{CollectionPath, ServerTimestamp, fields};
use chrono::{TimeZone, Utc};
use serde_json::{Map, Value};

const WAIT: Duration = Duration::from_secs(2);
const EMAIL: &str = "ada@example.com";
const PASSWORD: &str = "secret1";
const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

fn posts() -> CollectionPath {
    CollectionPath::new("posts")
}

fn comments_of(post_id: &str) -> CollectionPath {
    posts().child(post_id, COMMENTS_COLLECTION)
}

fn backend() -> MemoryBackend {
    MemoryBackend::new().with_account(EMAIL, PASSWORD, "Ada", "https://img/ada.png")
}

fn record(user: &str, text: &str) -> Map<String, Value> {
    let mut record = Map::new();
    record.insert(fields::AVATAR.into(), Value::String(String::new()));
    record.insert(fields::IMAGE.into(), Value::String(String::new()));
    record.insert(fields::TEXT.into(), Value::String(text.into()));
    record.insert(fields::TIMESTAMP.into(), ServerTimestamp::token());
    record.insert(fields::USERNAME.into(), Value::String(user.into()));
    record
}

fn insert_at(backend: &MemoryBackend, collection: &CollectionPath, secs: i64, text: &str) -> String {
    backend.set_server_time(Utc.timestamp_opt(secs, 0).unwrap());
    backend.insert(collection, record("bob", text))
}

async fn pump_until(runtime: &mut ClientRuntime, done: impl Fn(&ClientRuntime) -> bool) {
    tokio::time::timeout(WAIT, async {
        while !done(runtime) {
            runtime.next_event().await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Dispatches everything that arrives until the inbox stays quiet.
async fn settle(runtime: &mut ClientRuntime) -> usize {
    let mut count = 0;
    while tokio::time::timeout(Duration::from_millis(100), runtime.next_event())
        .await
        .is_ok()
    {
        count += 1;
    }
    count
}

async fn signed_in(backend: &MemoryBackend) -> ClientRuntime {
    let mut runtime = ClientRuntime::new(Backends::from(backend.clone()), "posts");
    runtime.state.auth.email = EMAIL.into();
    runtime.state.auth.password = PASSWORD.into();
    runtime.dispatch(Intent::SubmitAuth);
    pump_until(&mut runtime, |rt| {
        rt.state.session.is_signed_in() && rt.state.feed.subscription().is_some()
    })
    .await;
    settle(&mut runtime).await;
    runtime
}

async fn open_thread(runtime: &mut ClientRuntime, post_id: &str) {
    runtime.dispatch(Intent::ToggleComments {
        post_id: post_id.into(),
    });
    let id = post_id.to_string();
    pump_until(runtime, move |rt| {
        matches!(
            rt.state.feed.thread(&id).map(|t| &t.phase),
            Some(ThreadPhase::Live { .. })
        )
    })
    .await;
}

fn thread_texts(runtime: &ClientRuntime, post_id: &str) -> Vec<String> {
    runtime
        .state
        .feed
        .thread(post_id)
        .map(|thread| thread.comments().iter().map(|c| c.text.clone()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_sign_in_opens_live_feed() {
    let backend = backend();
    insert_at(&backend, &posts(), 10, "first post");

    let runtime = signed_in(&backend).await;

    let identity = runtime.state.session.identity().unwrap();
    assert_eq!(identity.display_name, "Ada");
    assert_eq!(runtime.state.feed.posts.len(), 1);
    assert_eq!(runtime.state.feed.posts[0].text, "first post");
    assert_eq!(backend.subscriber_count(&posts()), 1);
    assert!(runtime.state.auth.password.is_empty());
}

#[tokio::test]
async fn test_wrong_password_leaves_session_empty() {
    let backend = backend();
    let mut runtime = ClientRuntime::new(Backends::from(backend.clone()), "posts");
    runtime.state.auth.email = EMAIL.into();
    runtime.state.auth.password = "wrong-password".into();
    runtime.dispatch(Intent::SubmitAuth);

    pump_until(&mut runtime, |rt| rt.state.auth.error.is_some()).await;
    assert!(!runtime.state.session.is_signed_in());
    assert_eq!(
        runtime.state.auth.error.as_deref(),
        Some("The email or password is incorrect.")
    );
    assert_eq!(backend.total_subscribers(), 0);
}

#[tokio::test]
async fn test_sign_up_uploads_avatar_and_sets_profile() {
    let dir = tempfile::tempdir().unwrap();
    let avatar_path = dir.path().join("me.png");
    std::fs::write(&avatar_path, PNG_HEADER).unwrap();

    let backend = MemoryBackend::new();
    let mut runtime = ClientRuntime::new(Backends::from(backend.clone()), "posts");
    let form = &mut runtime.state.auth;
    form.mode = AuthMode::SignUp;
    form.display_name = "Grace".into();
    form.email = "grace@example.com".into();
    form.password = "cobol60".into();
    form.avatar_path = avatar_path.to_string_lossy().into_owned();

    runtime.dispatch(Intent::LoadAvatar);
    pump_until(&mut runtime, |rt| rt.state.auth.avatar.is_some()).await;
    runtime.dispatch(Intent::SubmitAuth);
    pump_until(&mut runtime, |rt| rt.state.session.is_signed_in()).await;

    let identity = runtime.state.session.identity().unwrap();
    assert_eq!(identity.display_name, "Grace");
    let object = identity
        .photo_url
        .strip_prefix("memory://blobs/")
        .expect("photo URL points at the blob store");
    assert!(object.starts_with("avatars/"));
    assert!(object.ends_with("_me.png"));
    let (bytes, content_type) = backend.blob(object).unwrap();
    assert_eq!(bytes.as_ref(), PNG_HEADER);
    assert_eq!(content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn test_sign_up_without_avatar_has_empty_photo_url() {
    let backend = MemoryBackend::new();
    let backends = Backends::from(backend.clone());
    let request = SignUpRequest {
        email: "grace@example.com".into(),
        password: "cobol60".into(),
        display_name: "Grace".into(),
        avatar: None,
    };

    let identity = create_account(&backends, request).await.unwrap();
    assert_eq!(identity.display_name, "Grace");
    assert_eq!(identity.photo_url, "");
}

#[tokio::test]
async fn test_sign_up_upload_failure_keeps_account() {
    let backend = MemoryBackend::new();
    backend.fail_uploads(true);
    let backends = Backends::from(backend.clone());
    let request = SignUpRequest {
        email: "grace@example.com".into(),
        password: "cobol60".into(),
        display_name: "Grace".into(),
        avatar: Some(AvatarFile {
            file_name: "me.png".into(),
            bytes: Bytes::from_static(PNG_HEADER),
            content_type: Some("image/png".into()),
        }),
    };

    let err = create_account(&backends, request).await.unwrap_err();
    assert!(format!("{err:#}").starts_with("Could not upload avatar"));
    let identity = backend
        .sign_in_with_password("grace@example.com", "cobol60")
        .await
        .unwrap();
    assert_eq!(identity.photo_url, "");
}

#[tokio::test]
async fn test_toggle_on_off_on_holds_one_subscription() {
    let backend = backend();
    let post_id = insert_at(&backend, &posts(), 10, "post");
    let mut runtime = signed_in(&backend).await;

    open_thread(&mut runtime, &post_id).await;
    runtime.dispatch(Intent::ToggleComments {
        post_id: post_id.clone(),
    });
    assert_eq!(backend.subscriber_count(&comments_of(&post_id)), 0);
    open_thread(&mut runtime, &post_id).await;

    assert_eq!(backend.subscriber_count(&comments_of(&post_id)), 1);
    assert_eq!(runtime.active_subscriptions(), 2);
}

#[tokio::test]
async fn test_submit_appends_one_comment_and_clears_input() {
    let backend = backend();
    let post_id = insert_at(&backend, &posts(), 10, "post");
    let mut runtime = signed_in(&backend).await;
    open_thread(&mut runtime, &post_id).await;

    runtime.state.feed.thread_mut(&post_id).draft = "   ".into();
    runtime.dispatch(Intent::SubmitComment {
        post_id: post_id.clone(),
    });
    settle(&mut runtime).await;
    assert!(backend.documents(&comments_of(&post_id)).is_empty());

    runtime.state.feed.thread_mut(&post_id).draft = "great post".into();
    runtime.dispatch(Intent::SubmitComment {
        post_id: post_id.clone(),
    });
    assert!(runtime.state.feed.thread(&post_id).unwrap().draft.is_empty());

    let id = post_id.clone();
    pump_until(&mut runtime, move |rt| thread_texts(rt, &id).len() == 1).await;
    let stored = backend.documents(&comments_of(&post_id));
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].str_field(fields::USERNAME), "Ada");
    assert_eq!(stored[0].str_field(fields::AVATAR), "https://img/ada.png");
    assert_eq!(stored[0].str_field(fields::TEXT), "great post");
    assert!(stored[0].timestamp_field(fields::TIMESTAMP).is_some());
}

#[tokio::test]
async fn test_comments_render_newest_first() {
    let backend = backend();
    let post_id = insert_at(&backend, &posts(), 10, "post");
    let mut runtime = signed_in(&backend).await;
    open_thread(&mut runtime, &post_id).await;

    let thread = comments_of(&post_id);
    insert_at(&backend, &thread, 3, "three");
    insert_at(&backend, &thread, 1, "one");
    insert_at(&backend, &thread, 2, "two");

    let id = post_id.clone();
    pump_until(&mut runtime, move |rt| thread_texts(rt, &id).len() == 3).await;
    assert_eq!(thread_texts(&runtime, &post_id), ["three", "two", "one"]);
}

#[tokio::test]
async fn test_teardown_stops_updates() {
    let backend = backend();
    let post_id = insert_at(&backend, &posts(), 10, "post");
    let mut runtime = signed_in(&backend).await;
    open_thread(&mut runtime, &post_id).await;
    let old = runtime
        .state
        .feed
        .thread(&post_id)
        .and_then(|t| t.subscription())
        .unwrap();

    runtime.dispatch(Intent::ToggleComments {
        post_id: post_id.clone(),
    });
    insert_at(&backend, &comments_of(&post_id), 20, "late");
    assert_eq!(settle(&mut runtime).await, 0);

    runtime.dispatch(UiEvent::Comments(CommentUiEvent::Snapshot {
        post_id: post_id.clone(),
        subscription: old,
        comments: Vec::new(),
    }));
    let thread = runtime.state.feed.thread(&post_id).unwrap();
    assert_eq!(thread.phase, ThreadPhase::Collapsed);
    assert_eq!(backend.subscriber_count(&comments_of(&post_id)), 0);
}

#[tokio::test]
async fn test_new_post_keeps_open_threads() {
    let backend = backend();
    let keep = insert_at(&backend, &posts(), 10, "keep");
    let mut runtime = signed_in(&backend).await;
    open_thread(&mut runtime, &keep).await;
    assert_eq!(backend.subscriber_count(&comments_of(&keep)), 1);

    insert_at(&backend, &posts(), 20, "newer");
    pump_until(&mut runtime, |rt| rt.state.feed.posts.len() == 2).await;
    assert_eq!(runtime.state.feed.posts[0].text, "newer");
    assert_eq!(backend.subscriber_count(&comments_of(&keep)), 1);
}

#[tokio::test]
async fn test_failed_append_restores_draft_and_notifies() {
    let backend = backend();
    let post_id = insert_at(&backend, &posts(), 10, "post");
    let mut runtime = signed_in(&backend).await;
    open_thread(&mut runtime, &post_id).await;
    backend.fail_appends(true);

    runtime.state.feed.thread_mut(&post_id).draft = "rejected".into();
    runtime.dispatch(Intent::SubmitComment {
        post_id: post_id.clone(),
    });
    pump_until(&mut runtime, |rt| rt.state.notice.is_some()).await;

    assert!(
        runtime
            .state
            .notice
            .as_deref()
            .unwrap()
            .starts_with("Comment not posted:")
    );
    assert_eq!(runtime.state.feed.thread(&post_id).unwrap().draft, "rejected");
    assert!(backend.documents(&comments_of(&post_id)).is_empty());
}

#[tokio::test]
async fn test_sign_out_releases_everything() {
    let backend = backend();
    let post_id = insert_at(&backend, &posts(), 10, "post");
    let mut runtime = signed_in(&backend).await;
    open_thread(&mut runtime, &post_id).await;
    assert_eq!(backend.total_subscribers(), 2);

    runtime.dispatch(Intent::SignOut);
    assert_eq!(backend.total_subscribers(), 0);
    assert_eq!(runtime.active_subscriptions(), 0);
    assert!(!runtime.state.session.is_signed_in());

    pump_until(&mut runtime, |rt| !rt.state.tasks.sign_out.is_running()).await;
    assert!(backend.current_user().is_none());
    assert!(runtime.state.notice.is_none());
}

#[tokio::test]
async fn test_start_restores_existing_session() {
    let backend = backend();
    backend.sign_in_with_password(EMAIL, PASSWORD).await.unwrap();

    let mut runtime = ClientRuntime::new(Backends::from(backend.clone()), "posts");
    runtime.start();

    assert!(runtime.state.session.is_signed_in());
    assert_eq!(backend.subscriber_count(&posts()), 1);
}

#[tokio::test]
async fn test_federated_sign_in() {
    let missing = MemoryBackend::new();
    let mut runtime = ClientRuntime::new(Backends::from(missing), "posts");
    runtime.dispatch(Intent::SignInFederated);
    pump_until(&mut runtime, |rt| rt.state.auth.error.is_some()).await;
    assert!(!runtime.state.session.is_signed_in());

    let backend = MemoryBackend::new().with_federated_identity(chirp_types::Identity {
        uid: "g-1".into(),
        email: Some("lin@example.com".into()),
        display_name: "Lin".into(),
        photo_url: "https://img/lin.png".into(),
    });
    let mut runtime = ClientRuntime::new(Backends::from(backend), "posts");
    runtime.dispatch(Intent::SignInFederated);
    pump_until(&mut runtime, |rt| rt.state.session.is_signed_in()).await;
    assert_eq!(
        runtime.state.session.identity().unwrap().display_name,
        "Lin"
    );
}

#[tokio::test]
async fn test_dropping_runtime_releases_queries() {
    let backend = backend();
    let post_id = insert_at(&backend, &posts(), 10, "post");
    let mut runtime = signed_in(&backend).await;
    open_thread(&mut runtime, &post_id).await;

    drop(runtime);
    assert_eq!(backend.total_subscribers(), 0);
}

#[tokio::test]
async fn test_memory_config_offers_demo_account() {
    let mut runtime = ClientRuntime::from_config(&Config::default()).unwrap();
    let hint = runtime.state.auth.account_hint.clone().unwrap();
    assert!(hint.contains(DEMO_EMAIL));
    assert!(hint.contains(DEMO_PASSWORD));

    runtime.state.auth.email = DEMO_EMAIL.into();
    runtime.state.auth.password = DEMO_PASSWORD.into();
    runtime.dispatch(Intent::SubmitAuth);
    pump_until(&mut runtime, |rt| rt.state.feed.posts.len() == 2).await;
    assert!(runtime.state.session.is_signed_in());
}
