//! Comment thread reducer.
//!
//! Each function mutates one thread and returns the effect the runtime must
//! run, if any. Subscriptions are only opened by `toggle` and only released
//! by `toggle`, `teardown` and `handle_failure`.

use chirp_types::Comment;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

use super::{CommentThreadState, ThreadPhase};
use crate::common::{SubscriptionId, SubscriptionSeq};
use crate::effects::UiEffect;
use crate::session::SessionState;

/// Expands a collapsed thread or collapses an expanded one.
pub fn toggle(
    thread: &mut CommentThreadState,
    post_id: &str,
    seq: &mut SubscriptionSeq,
) -> UiEffect {
    match thread.subscription() {
        Some(subscription) => {
            thread.phase = ThreadPhase::Collapsed;
            UiEffect::Unsubscribe { subscription }
        }
        None => {
            let subscription = seq.next_id();
            thread.phase = ThreadPhase::Loading { subscription };
            thread.error = None;
            UiEffect::SubscribeComments {
                post_id: post_id.to_string(),
                subscription,
            }
        }
    }
}

/// Collapses the thread, releasing its subscription if it holds one.
pub fn teardown(thread: &mut CommentThreadState) -> Option<UiEffect> {
    let subscription = thread.subscription()?;
    thread.phase = ThreadPhase::Collapsed;
    Some(UiEffect::Unsubscribe { subscription })
}

/// Replaces the comment list with a snapshot from the thread's current
/// subscription. Returns false (and changes nothing) for any other id.
pub fn apply_snapshot(
    thread: &mut CommentThreadState,
    subscription: SubscriptionId,
    comments: Vec<Comment>,
) -> bool {
    if thread.subscription() != Some(subscription) {
        debug!(?subscription, "dropping stale comment snapshot");
        return false;
    }
    thread.phase = ThreadPhase::Live {
        subscription,
        comments,
    };
    true
}

/// Collapses the thread with an error when its live query fails.
pub fn handle_failure(
    thread: &mut CommentThreadState,
    subscription: SubscriptionId,
    error: String,
) -> Option<UiEffect> {
    if thread.subscription() != Some(subscription) {
        return None;
    }
    thread.phase = ThreadPhase::Collapsed;
    thread.error = Some(error);
    Some(UiEffect::Unsubscribe { subscription })
}

/// Submits the draft as a comment by the signed-in user.
///
/// Whitespace-only drafts are a no-op. The draft is cleared as soon as the
/// append is dispatched.
pub fn submit(
    thread: &mut CommentThreadState,
    session: &SessionState,
    post_id: &str,
) -> Option<UiEffect> {
    if !thread.can_submit() {
        return None;
    }
    let Some(comment) = session.author_comment(thread.draft.clone()) else {
        thread.error = Some("Sign in to comment.".to_string());
        return None;
    };
    thread.draft.clear();
    thread.error = None;
    thread.sending += 1;
    Some(UiEffect::AppendComment {
        post_id: post_id.to_string(),
        comment,
    })
}

/// Records an append outcome. Returns a notice message when it failed.
///
/// A rejected comment goes back into the draft unless the user has started
/// typing a new one.
pub fn handle_appended(
    thread: &mut CommentThreadState,
    text: String,
    result: Result<String, String>,
) -> Option<String> {
    thread.sending = thread.sending.saturating_sub(1);
    match result {
        Ok(_) => None,
        Err(error) => {
            if thread.draft.is_empty() {
                thread.draft = text;
            }
            let notice = format!("Comment not posted: {error}");
            thread.error = Some(error);
            Some(notice)
        }
    }
}

/// Applies an editing key to the draft. Returns true if the key was used.
pub fn edit_draft(thread: &mut CommentThreadState, key: KeyEvent) -> bool {
    if !thread.is_expanded() || key.modifiers.contains(KeyModifiers::CONTROL) {
        return false;
    }
    match key.code {
        KeyCode::Char(c) => {
            thread.draft.push(c);
            true
        }
        KeyCode::Backspace => {
            thread.draft.pop();
            true
        }
        _ => false,
    }
}
