//! Cloud Firestore: commit writes and polled ordered queries.

use chirp_types::{CollectionPath, Direction, Document};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use futures_util::stream;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use super::values::{decode_fields, encode_record};
use super::{FirebaseBackend, USER_AGENT, network_message};
use crate::backend::{DocumentStore, Snapshot, Subscription};
use crate::error::{AuthError, DocError, DocErrorKind, DocResult};

#[derive(Debug, Deserialize)]
struct QueryRow {
    #[serde(default)]
    document: Option<RawDocument>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl From<AuthError> for DocError {
    fn from(err: AuthError) -> Self {
        DocError::new(DocErrorKind::PermissionDenied, err.message)
    }
}

fn direction_name(direction: Direction) -> &'static str {
    match direction {
        Direction::Ascending => "ASCENDING",
        Direction::Descending => "DESCENDING",
    }
}

impl FirebaseBackend {
    /// `projects/{project}/databases/(default)/documents`
    fn database_root(&self) -> String {
        format!(
            "projects/{}/databases/(default)/documents",
            self.endpoints.project_id
        )
    }

    fn documents_url(&self, suffix: &str) -> String {
        format!(
            "{}/v1/{}{suffix}",
            self.endpoints.firestore_base_url,
            self.database_root()
        )
    }

    async fn post_documents(&self, url: String, body: &Value) -> DocResult<reqwest::Response> {
        let token = self.optional_id_token().await?;
        let mut request = self
            .http
            .post(url)
            .header("user-agent", USER_AGENT)
            .json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| DocError::new(DocErrorKind::Network, network_message(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(DocError::http_status(status.as_u16(), &error_body));
        }
        Ok(response)
    }

    /// Runs the ordered query once and returns the full result.
    async fn run_query(
        &self,
        collection: &CollectionPath,
        order_by: &str,
        direction: Direction,
    ) -> DocResult<Snapshot> {
        let url = match collection.parent_document() {
            Some(parent) => self.documents_url(&format!("/{parent}:runQuery")),
            None => self.documents_url(":runQuery"),
        };
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection.collection_id() }],
                "orderBy": [{
                    "field": { "fieldPath": order_by },
                    "direction": direction_name(direction),
                }],
            }
        });

        let rows: Vec<QueryRow> = self
            .post_documents(url, &body)
            .await?
            .json()
            .await
            .map_err(|e| DocError::new(DocErrorKind::Parse, format!("Invalid query response: {e}")))?;

        // undecodable documents are skipped, not fatal
        Ok(rows
            .into_iter()
            .filter_map(|row| row.document)
            .filter_map(|raw| {
                let id = raw.name.rsplit('/').next().unwrap_or_default().to_string();
                decode_fields(&raw.fields)
                    .inspect_err(|err| {
                        warn!(
                            collection = %collection,
                            id = %id,
                            error = %err,
                            "skipping undecodable document"
                        );
                    })
                    .ok()
                    .map(|fields| Document::new(id, fields))
            })
            .collect())
    }

    async fn commit_append(
        &self,
        collection: &CollectionPath,
        record: Map<String, Value>,
    ) -> DocResult<String> {
        let encoded = encode_record(record)?;
        let id = Uuid::new_v4().simple().to_string();
        let name = format!("{}/{}/{id}", self.database_root(), collection);
        let transforms: Vec<Value> = encoded
            .server_time_fields
            .iter()
            .map(|field| json!({ "fieldPath": field, "setToServerValue": "REQUEST_TIME" }))
            .collect();

        let mut write = json!({
            "update": { "name": name, "fields": encoded.fields },
            "currentDocument": { "exists": false },
        });
        if !transforms.is_empty() {
            write["updateTransforms"] = Value::Array(transforms);
        }

        self.post_documents(self.documents_url(":commit"), &json!({ "writes": [write] }))
            .await
            .inspect_err(|err| warn!(collection = %collection, kind = %err.kind, "append failed"))?;
        debug!(collection = %collection, id = %id, "append committed");
        Ok(id)
    }
}

impl DocumentStore for FirebaseBackend {
    fn subscribe_ordered(
        &self,
        collection: &CollectionPath,
        order_by: &str,
        direction: Direction,
    ) -> DocResult<Subscription> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            DocError::new(DocErrorKind::Closed, format!("No async runtime for polling: {e}"))
        })?;

        let (tx, rx) = mpsc::unbounded_channel::<DocResult<Snapshot>>();
        let cancel = CancellationToken::new();
        let poller_cancel = cancel.clone();
        let backend = self.clone();
        let collection = collection.clone();
        let order_by = order_by.to_string();
        let interval = self.poll_interval;

        handle.spawn(async move {
            let mut last: Option<Snapshot> = None;
            loop {
                let result = tokio::select! {
                    biased;
                    () = poller_cancel.cancelled() => break,
                    result = backend.run_query(&collection, &order_by, direction) => result,
                };
                match result {
                    Ok(snapshot) => {
                        if last.as_ref() != Some(&snapshot) {
                            if tx.send(Ok(snapshot.clone())).is_err() {
                                break;
                            }
                            last = Some(snapshot);
                        }
                    }
                    Err(err) => {
                        warn!(collection = %collection, error = %err, "live query failed");
                        let _ = tx.send(Err(err));
                        break;
                    }
                }
                tokio::select! {
                    biased;
                    () = poller_cancel.cancelled() => break,
                    () = tokio::time::sleep(interval) => {}
                }
            }
            debug!(collection = %collection, "live query poller stopped");
        });

        let snapshots = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(Subscription::new(snapshots, move || cancel.cancel()))
    }

    fn append<'a>(
        &'a self,
        collection: &'a CollectionPath,
        record: Map<String, Value>,
    ) -> BoxFuture<'a, DocResult<String>> {
        self.commit_append(collection, record).boxed()
    }
}
