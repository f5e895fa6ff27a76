//! UI event types.
//!
//! This module defines the unified event enum for the client.
//! All external inputs (terminal, snapshots, async results) are converted to
//! `UiEvent` before being processed by the reducer.
//!
//! ## Inbox Pattern
//!
//! Async operations send events directly to the runtime's event inbox.
//! Results arrive as separate events and are applied on the next drain.
//!
//! ## Task Lifecycle
//!
//! One-shot async work (sign-in, sign-up, sign-out, avatar loading) is wrapped
//! in `UiEvent::TaskCompleted`. The reducer marks the task active when it
//! emits the effect and drops completions whose id is no longer active.
//!
//! ## Subscription Convention
//!
//! Live query results carry the `SubscriptionId` they were opened with. The
//! feed and comment slices ignore snapshots for any other id, so a snapshot
//! that was already queued when its subscription was torn down never reaches
//! state.

use chirp_types::{Comment, Identity, Post};
use crossterm::event::Event as CrosstermEvent;

use crate::auth::AvatarFile;
use crate::common::{SubscriptionId, TaskCompleted, TaskKind};

/// Results of authentication work.
#[derive(Debug)]
pub enum AuthUiEvent {
    /// Password sign-in finished.
    SignedIn(Result<Identity, String>),

    /// Account creation, avatar upload and profile update finished.
    SignedUp(Result<Identity, String>),

    /// Federated sign-in finished.
    FederatedSignedIn(Result<Identity, String>),

    /// Session the provider already held at startup.
    Restored(Option<Identity>),

    /// Provider sign-out finished. Local state is already cleared.
    SignedOut(Result<(), String>),

    /// Avatar file read from disk.
    AvatarLoaded {
        path: String,
        result: Result<AvatarFile, String>,
    },
}

/// Live post feed results.
#[derive(Debug)]
pub enum FeedUiEvent {
    /// Full ordered post list, newest first.
    Snapshot {
        subscription: SubscriptionId,
        posts: Vec<Post>,
    },

    /// The post query failed or closed.
    Failed {
        subscription: SubscriptionId,
        error: String,
    },
}

/// Comment thread results, keyed by the post the thread belongs to.
#[derive(Debug)]
pub enum CommentUiEvent {
    /// Full ordered comment list, newest first.
    Snapshot {
        post_id: String,
        subscription: SubscriptionId,
        comments: Vec<Comment>,
    },

    /// The comment query failed or closed.
    Failed {
        post_id: String,
        subscription: SubscriptionId,
        error: String,
    },

    /// An append finished. `text` is the submitted body, used to restore the
    /// draft when the write is rejected.
    Appended {
        post_id: String,
        text: String,
        result: Result<String, String>,
    },
}

/// User intents that do not depend on key bindings.
///
/// The terminal keymap translates keys into these; headless drivers dispatch
/// them directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    SubmitAuth,
    ToggleAuthMode,
    SignInFederated,
    LoadAvatar,
    SignOut,
    ReloadFeed,
    SelectNextPost,
    SelectPrevPost,
    ToggleComments { post_id: String },
    SubmitComment { post_id: String },
    DismissNotice,
    Quit,
}

/// Unified event enum for the client.
///
/// All inputs are converted to this type before processing.
/// The reducer (`update`) pattern-matches on these events to update state.
#[derive(Debug)]
pub enum UiEvent {
    /// Terminal input event (key, paste, resize).
    Terminal(CrosstermEvent),

    /// A user intent.
    Intent(Intent),

    Auth(AuthUiEvent),
    Feed(FeedUiEvent),
    Comments(CommentUiEvent),

    /// A one-shot task finished; the payload is the result event.
    TaskCompleted {
        kind: TaskKind,
        completed: TaskCompleted<Box<UiEvent>>,
    },
}

impl From<Intent> for UiEvent {
    fn from(intent: Intent) -> Self {
        UiEvent::Intent(intent)
    }
}
