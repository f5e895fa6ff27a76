//! Store-level documents and collection addressing.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ServerTimestamp;

/// A stored record: its id within the collection plus its top-level fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Returns a string field, or an empty string when absent or not a string.
    pub fn str_field(&self, key: &str) -> String {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Returns a resolved server timestamp field.
    pub fn timestamp_field(&self, key: &str) -> Option<ServerTimestamp> {
        self.fields.get(key).and_then(ServerTimestamp::from_value)
    }
}

/// Sort direction for ordered live queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    Ascending,
    #[default]
    Descending,
}

/// Slash-separated path of a collection, e.g. `posts` or `posts/abc/comments`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(path.as_ref().trim_matches('/').to_string())
    }

    /// Path of a sub-collection nested under one document of this collection.
    #[must_use]
    pub fn child(&self, document_id: &str, collection: &str) -> Self {
        Self(format!("{}/{}/{}", self.0, document_id, collection))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment (the collection id).
    pub fn collection_id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Path of the owning document for nested collections (`None` at top level).
    pub fn parent_document(&self) -> Option<&str> {
        self.0.rsplit_once('/').map(|(parent, _)| parent)
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored document could not be decoded into a typed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub document_id: String,
    pub field: &'static str,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "document {} has a missing or invalid `{}` field",
            self.document_id, self.field
        )
    }
}

impl std::error::Error for DecodeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_paths() {
        let posts = CollectionPath::new("/posts/");
        assert_eq!(posts.as_str(), "posts");
        assert_eq!(posts.collection_id(), "posts");
        assert_eq!(posts.parent_document(), None);

        let comments = posts.child("p1", "comments");
        assert_eq!(comments.to_string(), "posts/p1/comments");
        assert_eq!(comments.collection_id(), "comments");
        assert_eq!(comments.parent_document(), Some("posts/p1"));
    }

    #[test]
    fn test_str_field_defaults_to_empty() {
        let mut fields = Map::new();
        fields.insert("text".into(), Value::from("hi"));
        fields.insert("count".into(), Value::from(3));
        let doc = Document::new("d1", fields);
        assert_eq!(doc.str_field("text"), "hi");
        assert_eq!(doc.str_field("count"), "");
        assert_eq!(doc.str_field("missing"), "");
    }
}
