use chirp_types::Comment;

use crate::common::SubscriptionId;

/// Lifecycle of a post's comment list.
///
/// A thread holds a live subscription exactly while it is `Loading` or `Live`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ThreadPhase {
    #[default]
    Collapsed,
    /// Expanded; waiting for the first snapshot.
    Loading { subscription: SubscriptionId },
    Live {
        subscription: SubscriptionId,
        comments: Vec<Comment>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct CommentThreadState {
    pub phase: ThreadPhase,
    /// Comment being typed. Survives collapsing.
    pub draft: String,
    pub error: Option<String>,
    /// Appends submitted but not yet acknowledged.
    pub sending: usize,
}

impl CommentThreadState {
    pub fn is_expanded(&self) -> bool {
        !matches!(self.phase, ThreadPhase::Collapsed)
    }

    pub fn subscription(&self) -> Option<SubscriptionId> {
        match &self.phase {
            ThreadPhase::Collapsed => None,
            ThreadPhase::Loading { subscription } | ThreadPhase::Live { subscription, .. } => {
                Some(*subscription)
            }
        }
    }

    /// Comments in display order (newest first). Empty unless live.
    pub fn comments(&self) -> &[Comment] {
        match &self.phase {
            ThreadPhase::Live { comments, .. } => comments,
            _ => &[],
        }
    }

    pub fn can_submit(&self) -> bool {
        self.is_expanded() && !self.draft.trim().is_empty()
    }
}
