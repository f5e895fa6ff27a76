use std::collections::HashMap;

use chirp_types::Post;

use crate::comments::CommentThreadState;
use crate::common::SubscriptionId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedPhase {
    /// No post subscription (signed out, or the last one failed).
    #[default]
    Idle,
    Loading {
        subscription: SubscriptionId,
    },
    Live {
        subscription: SubscriptionId,
    },
}

#[derive(Debug, Default)]
pub struct FeedState {
    pub phase: FeedPhase,
    /// Posts newest first, as delivered by the last snapshot.
    pub posts: Vec<Post>,
    pub selected: usize,
    /// Comment threads by post id. Entries exist once a thread was touched.
    pub threads: HashMap<String, CommentThreadState>,
    pub error: Option<String>,
}

impl FeedState {
    pub fn subscription(&self) -> Option<SubscriptionId> {
        match self.phase {
            FeedPhase::Idle => None,
            FeedPhase::Loading { subscription } | FeedPhase::Live { subscription } => {
                Some(subscription)
            }
        }
    }

    pub fn selected_post(&self) -> Option<&Post> {
        self.posts.get(self.selected)
    }

    pub fn thread(&self, post_id: &str) -> Option<&CommentThreadState> {
        self.threads.get(post_id)
    }

    pub fn thread_mut(&mut self, post_id: &str) -> &mut CommentThreadState {
        self.threads.entry(post_id.to_string()).or_default()
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.posts.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }
}
