//! Feed reducer.

use chirp_types::Post;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

use super::{FeedPhase, FeedState};
use crate::comments;
use crate::common::{SubscriptionId, SubscriptionSeq};
use crate::effects::UiEffect;
use crate::events::Intent;

/// Opens the live post feed, replacing any previous subscription.
pub fn open(feed: &mut FeedState, seq: &mut SubscriptionSeq) -> Vec<UiEffect> {
    let mut effects = close(feed);
    let subscription = seq.next_id();
    feed.phase = FeedPhase::Loading { subscription };
    effects.push(UiEffect::SubscribePosts { subscription });
    effects
}

/// Releases the post subscription and every comment subscription, and
/// forgets all posts and threads.
pub fn close(feed: &mut FeedState) -> Vec<UiEffect> {
    let mut effects: Vec<UiEffect> = feed
        .threads
        .values_mut()
        .filter_map(comments::teardown)
        .collect();
    if let Some(subscription) = feed.subscription() {
        effects.push(UiEffect::Unsubscribe { subscription });
    }
    *feed = FeedState::default();
    effects
}

/// Replaces the post list with a snapshot from the current subscription.
///
/// Threads of posts that left the feed are torn down. The selection follows
/// the selected post when it is still present.
pub fn apply_snapshot(
    feed: &mut FeedState,
    subscription: SubscriptionId,
    posts: Vec<Post>,
) -> Vec<UiEffect> {
    if feed.subscription() != Some(subscription) {
        debug!(?subscription, "dropping stale post snapshot");
        return Vec::new();
    }

    let selected_id = feed.selected_post().map(|post| post.id.clone());
    feed.phase = FeedPhase::Live { subscription };
    feed.error = None;
    feed.posts = posts;

    let mut effects = Vec::new();
    let gone: Vec<String> = feed
        .threads
        .keys()
        .filter(|id| !feed.posts.iter().any(|post| &post.id == *id))
        .cloned()
        .collect();
    for id in gone {
        if let Some(mut thread) = feed.threads.remove(&id) {
            effects.extend(comments::teardown(&mut thread));
        }
    }

    feed.selected = selected_id
        .and_then(|id| feed.posts.iter().position(|post| post.id == id))
        .unwrap_or(feed.selected)
        .min(feed.posts.len().saturating_sub(1));
    effects
}

/// Drops the feed subscription after a query error. Posts already shown stay.
pub fn handle_failure(
    feed: &mut FeedState,
    subscription: SubscriptionId,
    error: String,
) -> Vec<UiEffect> {
    if feed.subscription() != Some(subscription) {
        return Vec::new();
    }
    feed.phase = FeedPhase::Idle;
    feed.error = Some(error);
    vec![UiEffect::Unsubscribe { subscription }]
}

/// Maps a key on the feed screen to an intent, editing the selected post's
/// comment draft directly.
pub fn handle_key(feed: &mut FeedState, key: KeyEvent) -> Option<Intent> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let post_id = feed.selected_post().map(|post| post.id.clone());

    match key.code {
        KeyCode::Char('o') if ctrl => Some(Intent::SignOut),
        KeyCode::Char('r') if ctrl => Some(Intent::ReloadFeed),
        KeyCode::Up => Some(Intent::SelectPrevPost),
        KeyCode::Down => Some(Intent::SelectNextPost),
        KeyCode::Tab => post_id.map(|post_id| Intent::ToggleComments { post_id }),
        KeyCode::Enter => post_id.map(|post_id| Intent::SubmitComment { post_id }),
        KeyCode::Esc => Some(Intent::DismissNotice),
        _ => {
            if let Some(post_id) = post_id {
                comments::edit_draft(feed.thread_mut(&post_id), key);
            }
            None
        }
    }
}
