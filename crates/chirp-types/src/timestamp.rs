//! Server-assigned timestamps.
//!
//! Records are ordered by a time the store assigns at commit, never by the
//! client's wall clock. Writers put a [`ServerTimestamp::token`] in the record;
//! the store replaces it with its own clock reading before the record becomes
//! visible to readers.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key of the write-side placeholder object.
const TOKEN_KEY: &str = "__server_timestamp__";

/// Display format for timestamps (local time, second precision).
const DISPLAY_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// A commit time resolved by the remote store.
///
/// Opaque on purpose: the only ways to obtain one are decoding a stored record
/// or a store resolving a write token. Ordering follows the store's clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServerTimestamp {
    seconds: i64,
    nanoseconds: u32,
}

impl ServerTimestamp {
    /// Creates a timestamp from the store's clock reading.
    ///
    /// Only store implementations should call this.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self {
            seconds: at.timestamp(),
            nanoseconds: at.timestamp_subsec_nanos(),
        }
    }

    /// Decodes a timestamp from its stored JSON shape (`{seconds, nanoseconds}`).
    pub fn from_value(value: &Value) -> Option<Self> {
        let parsed = Self::deserialize(value).ok()?;
        (parsed.nanoseconds < 1_000_000_000).then_some(parsed)
    }

    /// Stored JSON shape of this timestamp.
    pub fn to_value(self) -> Value {
        serde_json::json!({
            "seconds": self.seconds,
            "nanoseconds": self.nanoseconds,
        })
    }

    /// Converts to the viewer's local time zone for display.
    pub fn to_local(self) -> DateTime<Local> {
        DateTime::<Utc>::from_timestamp(self.seconds, self.nanoseconds)
            .unwrap_or(DateTime::UNIX_EPOCH)
            .with_timezone(&Local)
    }

    /// Human-readable local time, e.g. `2021/03/04 18:20:07`.
    pub fn display(self) -> String {
        self.to_local().format(DISPLAY_FORMAT).to_string()
    }

    /// The write-side placeholder the store resolves at commit time.
    pub fn token() -> Value {
        serde_json::json!({ TOKEN_KEY: true })
    }

    /// Returns true if `value` is the placeholder produced by [`Self::token`].
    pub fn is_token(value: &Value) -> bool {
        value
            .as_object()
            .is_some_and(|map| map.len() == 1 && map.get(TOKEN_KEY) == Some(&Value::Bool(true)))
    }
}
