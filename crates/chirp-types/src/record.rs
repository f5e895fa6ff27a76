//! Typed feed records decoded from store documents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{DecodeError, Document, ServerTimestamp};

/// Field names used in stored post and comment records.
pub mod fields {
    pub const AVATAR: &str = "avatar";
    pub const IMAGE: &str = "image";
    pub const TEXT: &str = "text";
    pub const TIMESTAMP: &str = "timestamp";
    pub const USERNAME: &str = "username";
}

/// A feed post. Owned by the store; this client only reads posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub avatar: String,
    /// Attached image URL; empty when the post has no image.
    pub image: String,
    pub text: String,
    pub timestamp: ServerTimestamp,
    pub user_name: String,
}

impl Post {
    /// Decodes a post document.
    ///
    /// # Errors
    /// Returns an error if the timestamp is missing or unresolved.
    pub fn from_document(doc: &Document) -> Result<Self, DecodeError> {
        Ok(Self {
            id: doc.id.clone(),
            avatar: doc.str_field(fields::AVATAR),
            image: doc.str_field(fields::IMAGE),
            text: doc.str_field(fields::TEXT),
            timestamp: required_timestamp(doc)?,
            user_name: doc.str_field(fields::USERNAME),
        })
    }

    pub fn has_image(&self) -> bool {
        !self.image.is_empty()
    }
}

/// A comment in the sub-collection of exactly one post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub avatar: String,
    pub text: String,
    pub timestamp: ServerTimestamp,
    pub user_name: String,
}

impl Comment {
    /// Decodes a comment document.
    ///
    /// # Errors
    /// Returns an error if the timestamp is missing or unresolved.
    pub fn from_document(doc: &Document) -> Result<Self, DecodeError> {
        Ok(Self {
            id: doc.id.clone(),
            avatar: doc.str_field(fields::AVATAR),
            text: doc.str_field(fields::TEXT),
            timestamp: required_timestamp(doc)?,
            user_name: doc.str_field(fields::USERNAME),
        })
    }
}

/// A comment about to be written. The timestamp is supplied by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub avatar: String,
    pub text: String,
    pub user_name: String,
}

impl NewComment {
    /// Builds the stored record, with `timestamp` set to the store's token.
    pub fn into_record(self, timestamp: Value) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert(fields::AVATAR.into(), Value::String(self.avatar));
        record.insert(fields::TEXT.into(), Value::String(self.text));
        record.insert(fields::TIMESTAMP.into(), timestamp);
        record.insert(fields::USERNAME.into(), Value::String(self.user_name));
        record
    }
}

fn required_timestamp(doc: &Document) -> Result<ServerTimestamp, DecodeError> {
    doc.timestamp_field(fields::TIMESTAMP).ok_or_else(|| DecodeError {
        document_id: doc.id.clone(),
        field: fields::TIMESTAMP,
    })
}
