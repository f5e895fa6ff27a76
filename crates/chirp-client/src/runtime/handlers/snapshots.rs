//! Snapshot decoding. Documents that do not decode are skipped.

use chirp_core::Snapshot;
use chirp_types::{Comment, DecodeError, Document, Post};
use tracing::warn;

pub fn decode_posts(snapshot: &Snapshot) -> Vec<Post> {
    decode_all(snapshot, Post::from_document)
}

pub fn decode_comments(snapshot: &Snapshot) -> Vec<Comment> {
    decode_all(snapshot, Comment::from_document)
}

fn decode_all<T>(
    snapshot: &Snapshot,
    decode: impl Fn(&Document) -> Result<T, DecodeError>,
) -> Vec<T> {
    snapshot
        .iter()
        .filter_map(|doc| {
            decode(doc)
                .inspect_err(|err| warn!(error = %err, "skipping undecodable document"))
                .ok()
        })
        .collect()
}
