//! Client runtime: owns state and backends, executes effects.
//!
//! This is the "Elm runtime" boundary: all side effects happen here.
//! The reducer stays pure and produces effects; this module executes them.
//!
//! ## Inbox Pattern
//!
//! - Handlers and live query forwarders send `UiEvent`s to `inbox_tx`
//! - The driver drains `inbox_rx` (each frame, or awaiting one event at a time)
//! - Every drained event goes through `update` and its effects run here
//!
//! ## Live Queries
//!
//! Each open subscription is registered under its `SubscriptionId` together
//! with a cancellation token for its forwarder task and the backend's release
//! guard. Removing the entry releases the query immediately and stops the
//! forwarder. Dropping the runtime removes every entry.
//!
//! The runtime holds no terminal; the `chirp` binary drives it and renders
//! `state` between drains.

mod handlers;
mod inbox;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use chirp_core::config::BackendKind;
use chirp_core::memory::{DEMO_EMAIL, DEMO_PASSWORD};
use chirp_core::{Backends, Config, DocError, DocErrorKind, DocResult, ReleaseGuard, Snapshot};
use chirp_types::{CollectionPath, Direction, fields};
use futures_util::StreamExt;
use inbox::{UiEventReceiver, UiEventSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::common::{SubscriptionId, TaskCompleted, TaskId, TaskKind};
use crate::effects::UiEffect;
use crate::events::{CommentUiEvent, FeedUiEvent, UiEvent};
use crate::state::AppState;
use crate::update;

pub use handlers::{MAX_AVATAR_BYTES, create_account, decode_comments, decode_posts, read_avatar};

/// Name of the per-post comment sub-collection.
pub const COMMENTS_COLLECTION: &str = "comments";

/// A registered live query. Dropping it releases the query and stops its
/// forwarder.
struct LiveQuery {
    cancel: CancellationToken,
    _release: ReleaseGuard,
}

impl Drop for LiveQuery {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Headless client runtime.
///
/// Must be used from within a Tokio runtime: effects spawn tasks.
pub struct ClientRuntime {
    /// Application state.
    pub state: AppState,
    backends: Backends,
    posts: CollectionPath,
    /// Inbox sender - handlers send events here.
    inbox_tx: UiEventSender,
    /// Inbox receiver - drained by the driver.
    inbox_rx: UiEventReceiver,
    subscriptions: HashMap<SubscriptionId, LiveQuery>,
}

impl ClientRuntime {
    pub fn new(backends: Backends, posts_collection: &str) -> Self {
        let (inbox_tx, inbox_rx) = inbox::channel();
        Self {
            state: AppState::new(),
            backends,
            posts: CollectionPath::new(posts_collection),
            inbox_tx,
            inbox_rx,
            subscriptions: HashMap::new(),
        }
    }

    /// Builds the backends selected in config.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backends = Backends::from_config(config)?;
        let mut runtime = Self::new(backends, &config.feed.posts_collection);
        if config.backend == BackendKind::Memory {
            runtime.state.auth.account_hint =
                Some(format!("Demo account: {DEMO_EMAIL} / {DEMO_PASSWORD}"));
        }
        Ok(runtime)
    }

    /// Picks up a session the auth provider already holds.
    pub fn start(&mut self) {
        self.execute_effect(UiEffect::RestoreSession);
    }

    /// Runs one event through the reducer and executes its effects.
    pub fn dispatch(&mut self, event: impl Into<UiEvent>) {
        let effects = update::update(&mut self.state, event.into());
        self.execute_effects(effects);
    }

    /// Dispatches every event currently in the inbox. Returns how many ran.
    pub fn drain_inbox(&mut self) -> usize {
        let mut count = 0;
        while let Ok(event) = self.inbox_rx.try_recv() {
            self.dispatch(event);
            count += 1;
        }
        count
    }

    /// Waits for the next inbox event and dispatches it.
    pub async fn next_event(&mut self) -> bool {
        match self.inbox_rx.recv().await {
            Some(event) => {
                self.dispatch(event);
                true
            }
            None => false,
        }
    }

    /// Number of live queries currently registered.
    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    /// Releases every live query.
    pub fn shutdown(&mut self) {
        if !self.subscriptions.is_empty() {
            debug!(count = self.subscriptions.len(), "releasing live queries");
            self.subscriptions.clear();
        }
    }

    // ========================================================================
    // Effect Dispatch
    // ========================================================================

    fn execute_effects(&mut self, effects: Vec<UiEffect>) {
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    /// Spawns an async effect and sends its result event to the inbox.
    fn spawn_effect<F, Fut>(&self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = UiEvent> + Send + 'static,
    {
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(f().await);
        });
    }

    /// Spawns a one-shot task whose result arrives as `TaskCompleted`.
    fn spawn_task<F, Fut>(&self, kind: TaskKind, id: TaskId, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = UiEvent> + Send + 'static,
    {
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let completed = TaskCompleted {
                id,
                result: Box::new(f().await),
            };
            let _ = tx.send(UiEvent::TaskCompleted { kind, completed });
        });
    }

    fn execute_effect(&mut self, effect: UiEffect) {
        match effect {
            UiEffect::Quit => {
                self.state.should_quit = true;
            }
            UiEffect::RestoreSession => {
                let event = handlers::restore_session(self.backends.auth.as_ref());
                self.dispatch(event);
            }

            // Auth
            UiEffect::SignIn {
                task,
                email,
                password,
            } => {
                let auth = Arc::clone(&self.backends.auth);
                self.spawn_task(TaskKind::Auth, task, move || {
                    handlers::sign_in(auth, email, password)
                });
            }
            UiEffect::SignUp { task, request } => {
                let backends = self.backends.clone();
                self.spawn_task(TaskKind::Auth, task, move || {
                    handlers::sign_up(backends, request)
                });
            }
            UiEffect::SignInFederated { task } => {
                let auth = Arc::clone(&self.backends.auth);
                self.spawn_task(TaskKind::Auth, task, move || {
                    handlers::sign_in_federated(auth)
                });
            }
            UiEffect::SignOut { task } => {
                let auth = Arc::clone(&self.backends.auth);
                self.spawn_task(TaskKind::SignOut, task, move || handlers::sign_out(auth));
            }
            UiEffect::LoadAvatar { task, path } => {
                self.spawn_task(TaskKind::AvatarLoad, task, move || {
                    handlers::load_avatar(path)
                });
            }

            // Live queries
            UiEffect::SubscribePosts { subscription } => {
                let posts = self.posts.clone();
                self.open_live_query(subscription, &posts, move |result| match result {
                    Ok(snapshot) => UiEvent::Feed(FeedUiEvent::Snapshot {
                        subscription,
                        posts: handlers::decode_posts(&snapshot),
                    }),
                    Err(err) => UiEvent::Feed(FeedUiEvent::Failed {
                        subscription,
                        error: err.message,
                    }),
                });
            }
            UiEffect::SubscribeComments {
                post_id,
                subscription,
            } => {
                let collection = self.posts.child(&post_id, COMMENTS_COLLECTION);
                self.open_live_query(subscription, &collection, move |result| match result {
                    Ok(snapshot) => UiEvent::Comments(CommentUiEvent::Snapshot {
                        post_id: post_id.clone(),
                        subscription,
                        comments: handlers::decode_comments(&snapshot),
                    }),
                    Err(err) => UiEvent::Comments(CommentUiEvent::Failed {
                        post_id: post_id.clone(),
                        subscription,
                        error: err.message,
                    }),
                });
            }
            UiEffect::Unsubscribe { subscription } => {
                if self.subscriptions.remove(&subscription).is_some() {
                    debug!(?subscription, "live query released");
                }
            }

            UiEffect::AppendComment { post_id, comment } => {
                let docs = Arc::clone(&self.backends.docs);
                let collection = self.posts.child(&post_id, COMMENTS_COLLECTION);
                self.spawn_effect(move || {
                    handlers::append_comment(docs, collection, post_id, comment)
                });
            }
        }
    }

    /// Opens a live query ordered newest first and forwards its snapshots to
    /// the inbox until it fails, closes, or is released.
    fn open_live_query<F>(&mut self, id: SubscriptionId, collection: &CollectionPath, to_event: F)
    where
        F: Fn(DocResult<Snapshot>) -> UiEvent + Send + 'static,
    {
        let subscription = match self.backends.docs.subscribe_ordered(
            collection,
            fields::TIMESTAMP,
            Direction::Descending,
        ) {
            Ok(subscription) => subscription,
            Err(err) => {
                warn!(collection = %collection, error = %err, "could not open live query");
                self.dispatch(to_event(Err(err)));
                return;
            }
        };
        debug!(?id, collection = %collection, "live query opened");

        let (mut snapshots, release) = subscription.into_parts();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    next = snapshots.next() => next,
                };
                let item = next.unwrap_or_else(|| {
                    Err(DocError::new(DocErrorKind::Closed, "Live query closed."))
                });
                let failed = item.is_err();
                if tx.send(to_event(item)).is_err() || failed {
                    break;
                }
            }
        });

        self.subscriptions.insert(
            id,
            LiveQuery {
                cancel,
                _release: release,
            },
        );
    }
}

impl Drop for ClientRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
