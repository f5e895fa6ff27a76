//! UI effect types.
//!
//! Effects are commands returned by the reducer that the runtime executes.
//! They represent I/O, task spawning and subscription management only (no
//! direct state mutations).
//!
//! This keeps the reducer pure: it only mutates state and returns effects,
//! never performs I/O or spawns tasks directly.
//!
//! ## Subscription Effects
//!
//! The reducer allocates a `SubscriptionId` and records it in state before
//! emitting `SubscribePosts`/`SubscribeComments`. `Unsubscribe` releases the
//! live query registered under that id; unknown ids are ignored.

use chirp_types::NewComment;

use crate::auth::SignUpRequest;
use crate::common::{SubscriptionId, TaskId};

/// Effects returned by the reducer for the runtime to execute.
#[derive(Debug)]
pub enum UiEffect {
    /// Quit the application.
    Quit,

    /// Ask the auth provider for a session it already holds.
    RestoreSession,

    SignIn {
        task: TaskId,
        email: String,
        password: String,
    },

    /// Create an account, upload the avatar and write the profile.
    SignUp {
        task: TaskId,
        request: SignUpRequest,
    },

    SignInFederated {
        task: TaskId,
    },

    SignOut {
        task: TaskId,
    },

    /// Read an avatar image from disk.
    LoadAvatar {
        task: TaskId,
        path: String,
    },

    /// Open the live post feed.
    SubscribePosts {
        subscription: SubscriptionId,
    },

    /// Open the live comment list of one post.
    SubscribeComments {
        post_id: String,
        subscription: SubscriptionId,
    },

    /// Release a live query.
    Unsubscribe {
        subscription: SubscriptionId,
    },

    /// Append a comment to a post's thread.
    AppendComment {
        post_id: String,
        comment: NewComment,
    },
}
