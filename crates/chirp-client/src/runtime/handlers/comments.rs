//! Comment writes.

use std::sync::Arc;

use chirp_core::DocumentStore;
use chirp_types::{CollectionPath, NewComment};
use tracing::{debug, warn};

use crate::events::{CommentUiEvent, UiEvent};

/// Appends a comment with a store-assigned timestamp.
pub async fn append_comment(
    docs: Arc<dyn DocumentStore>,
    collection: CollectionPath,
    post_id: String,
    comment: NewComment,
) -> UiEvent {
    let text = comment.text.clone();
    let record = comment.into_record(docs.server_timestamp());
    let result = docs
        .append(&collection, record)
        .await
        .inspect(|id| debug!(collection = %collection, id = %id, "comment appended"))
        .map_err(|err| {
            warn!(collection = %collection, kind = %err.kind, "comment append failed");
            err.message
        });
    UiEvent::Comments(CommentUiEvent::Appended {
        post_id,
        text,
        result,
    })
}
