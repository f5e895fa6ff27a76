//! Feed feature: the live post list and the comment threads hanging off it.

mod render;
mod state;
mod update;

pub use render::{feed_lines, post_lines, render_feed};
pub use state::{FeedPhase, FeedState};
pub use update::{apply_snapshot, close, handle_failure, handle_key, open};
