//! Application state composition.
//!
//! ```text
//! AppState
//! ├── session: SessionState        (signed-in identity)
//! ├── auth: AuthFormState          (sign-in / sign-up form)
//! ├── feed: FeedState              (posts, selection, comment threads)
//! ├── task_seq / tasks             (one-shot async work)
//! ├── subscription_seq             (live query ids)
//! ├── notice: Option<String>       (single dismissible message)
//! └── should_quit
//! ```
//!
//! State holds no terminal handles or backends, so the reducer and renderers
//! can be exercised without I/O.

use crate::auth::AuthFormState;
use crate::common::{SubscriptionSeq, TaskSeq, Tasks};
use crate::feed::FeedState;
use crate::session::SessionState;

#[derive(Debug, Default)]
pub struct AppState {
    pub session: SessionState,
    pub auth: AuthFormState,
    pub feed: FeedState,
    pub task_seq: TaskSeq,
    pub tasks: Tasks,
    pub subscription_seq: SubscriptionSeq,
    /// Most recent message for the user; a new one replaces the old.
    pub notice: Option<String>,
    pub should_quit: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show_notice(&mut self, message: impl Into<String>) {
        self.notice = Some(message.into());
    }
}
