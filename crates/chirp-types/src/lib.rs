//! Shared domain records for chirp (identities, posts, comments, timestamps).

mod document;
mod identity;
mod record;
mod timestamp;

pub use document::{CollectionPath, DecodeError, Direction, Document};
pub use identity::{Identity, ProfileUpdate};
pub use record::{Comment, NewComment, Post, fields};
pub use timestamp::ServerTimestamp;
