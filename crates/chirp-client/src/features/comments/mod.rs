//! Comment thread feature: one live comment list per expanded post.

mod render;
mod state;
mod update;

pub use render::{comment_lines, thread_lines};
pub use state::{CommentThreadState, ThreadPhase};
pub use update::{
    apply_snapshot, edit_draft, handle_appended, handle_failure, submit, teardown, toggle,
};
