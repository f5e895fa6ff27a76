//! Conversion between plain JSON records and Firestore typed values.
//!
//! Records travel through the client as `serde_json` maps. Firestore wraps
//! every value in a single-key object naming its type (`stringValue`,
//! `integerValue`, ...). Timestamps use the `{seconds, nanoseconds}` shape on
//! our side and RFC 3339 strings on the wire.

use chirp_types::ServerTimestamp;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};

use crate::error::{DocError, DocErrorKind, DocResult};

/// A record split into plain fields and fields the server must stamp.
#[derive(Debug, Default)]
pub struct EncodedRecord {
    pub fields: Map<String, Value>,
    /// Top-level field paths holding a server timestamp token.
    pub server_time_fields: Vec<String>,
}

/// Encodes a record for a commit write.
///
/// # Errors
/// Returns `InvalidRecord` if a server timestamp token is nested inside a map
/// or array.
pub fn encode_record(record: Map<String, Value>) -> DocResult<EncodedRecord> {
    let mut encoded = EncodedRecord::default();
    for (key, value) in record {
        if ServerTimestamp::is_token(&value) {
            encoded.server_time_fields.push(key);
        } else {
            let value = encode_value(&value, &key)?;
            encoded.fields.insert(key, value);
        }
    }
    Ok(encoded)
}

fn encode_value(value: &Value, path: &str) -> DocResult<Value> {
    if ServerTimestamp::is_token(value) {
        return Err(DocError::new(
            DocErrorKind::InvalidRecord,
            format!("Server timestamp is only supported on top-level fields ({path})"),
        ));
    }
    let encoded = match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values = items
                .iter()
                .map(|item| encode_value(item, path))
                .collect::<DocResult<Vec<_>>>()?;
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => match as_timestamp(map, value) {
            Some(ts) => json!({ "timestampValue": timestamp_to_rfc3339(ts) }),
            None => {
                let mut fields = Map::new();
                for (key, inner) in map {
                    fields.insert(key.clone(), encode_value(inner, &format!("{path}.{key}"))?);
                }
                json!({ "mapValue": { "fields": fields } })
            }
        },
    };
    Ok(encoded)
}

fn as_timestamp(map: &Map<String, Value>, value: &Value) -> Option<ServerTimestamp> {
    (map.len() == 2)
        .then(|| ServerTimestamp::from_value(value))
        .flatten()
}

fn timestamp_to_rfc3339(ts: ServerTimestamp) -> String {
    ts.to_local()
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Decodes the `fields` object of a Firestore document.
///
/// # Errors
/// Returns `Parse` if a value has an unknown or malformed type tag.
pub fn decode_fields(fields: &Map<String, Value>) -> DocResult<Map<String, Value>> {
    fields
        .iter()
        .map(|(key, value)| {
            decode_value(value)
                .map(|decoded| (key.clone(), decoded))
                .ok_or_else(|| {
                    DocError::new(
                        DocErrorKind::Parse,
                        format!("Unsupported Firestore value in field `{key}`"),
                    )
                })
        })
        .collect()
}

/// Decodes one typed value. Returns `None` for unknown or malformed values.
pub fn decode_value(value: &Value) -> Option<Value> {
    let (tag, inner) = value.as_object()?.iter().next()?;
    let decoded = match tag.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => Value::Bool(inner.as_bool()?),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok()?,
                other => other.as_i64()?,
            };
            Value::from(parsed)
        }
        "doubleValue" => Value::from(inner.as_f64()?),
        "stringValue" | "referenceValue" | "bytesValue" => Value::String(inner.as_str()?.into()),
        "timestampValue" => {
            let at = DateTime::parse_from_rfc3339(inner.as_str()?).ok()?;
            ServerTimestamp::from_datetime(at.with_timezone(&Utc)).to_value()
        }
        "geoPointValue" => inner.clone(),
        "arrayValue" => {
            let values = match inner.get("values") {
                Some(Value::Array(values)) => values
                    .iter()
                    .map(decode_value)
                    .collect::<Option<Vec<_>>>()?,
                _ => Vec::new(),
            };
            Value::Array(values)
        }
        "mapValue" => match inner.get("fields") {
            Some(Value::Object(fields)) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| decode_value(v).map(|d| (k.clone(), d)))
                    .collect::<Option<Map<_, _>>>()?,
            ),
            _ => Value::Object(Map::new()),
        },
        _ => return None,
    };
    Some(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_splits_server_time_fields() {
        let mut record = Map::new();
        record.insert("text".into(), json!("hi"));
        record.insert("likes".into(), json!(3));
        record.insert("timestamp".into(), ServerTimestamp::token());

        let encoded = encode_record(record).unwrap();
        assert_eq!(encoded.server_time_fields, ["timestamp"]);
        assert_eq!(encoded.fields["text"], json!({ "stringValue": "hi" }));
        assert_eq!(encoded.fields["likes"], json!({ "integerValue": "3" }));
        assert!(!encoded.fields.contains_key("timestamp"));
    }

    #[test]
    fn test_nested_token_is_rejected() {
        let mut record = Map::new();
        record.insert("meta".into(), json!({ "at": ServerTimestamp::token() }));
        let err = encode_record(record).unwrap_err();
        assert_eq!(err.kind, DocErrorKind::InvalidRecord);
    }

    #[test]
    fn test_decode_timestamp_value() {
        let decoded = decode_value(&json!({ "timestampValue": "2021-03-04T18:20:07.5Z" })).unwrap();
        assert_eq!(decoded, json!({ "seconds": 1_614_882_007, "nanoseconds": 500_000_000 }));
    }

    #[test]
    fn test_timestamp_encodes_as_rfc3339() {
        let ts = ServerTimestamp::from_value(&json!({ "seconds": 1_614_882_007, "nanoseconds": 0 }))
            .unwrap();
        let mut record = Map::new();
        record.insert("at".into(), ts.to_value());
        let encoded = encode_record(record).unwrap();
        assert_eq!(
            encoded.fields["at"],
            json!({ "timestampValue": "2021-03-04T18:20:07Z" })
        );
    }

    #[test]
    fn test_decode_nested_fields() {
        let fields = json!({
            "text": { "stringValue": "hello" },
            "count": { "integerValue": "42" },
            "tags": { "arrayValue": { "values": [{ "stringValue": "a" }] } },
            "empty": { "arrayValue": {} },
            "meta": { "mapValue": { "fields": { "ok": { "booleanValue": true } } } },
            "none": { "nullValue": null }
        });
        let decoded = decode_fields(fields.as_object().unwrap()).unwrap();
        assert_eq!(decoded["text"], "hello");
        assert_eq!(decoded["count"], 42);
        assert_eq!(decoded["tags"], json!(["a"]));
        assert_eq!(decoded["empty"], json!([]));
        assert_eq!(decoded["meta"], json!({ "ok": true }));
        assert_eq!(decoded["none"], Value::Null);
    }

    #[test]
    fn test_unknown_type_is_parse_error() {
        let fields = json!({ "x": { "mysteryValue": 1 } });
        let err = decode_fields(fields.as_object().unwrap()).unwrap_err();
        assert_eq!(err.kind, DocErrorKind::Parse);
    }
}
