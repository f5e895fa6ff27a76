//! In-process backend implementing all three collaborator contracts.
//!
//! Used by tests and by `backend = "memory"` for running the client without a
//! cloud project. Live queries are push-based: every append recomputes the
//! ordered snapshot for each open query on that collection.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use bytes::Bytes;
use chirp_types::{
    CollectionPath, Direction, Document, Identity, ProfileUpdate, ServerTimestamp, fields,
};
use chrono::{DateTime, Duration, Utc};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, ready};
use futures_util::stream;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::backend::{AuthService, BlobStore, DocumentStore, Snapshot, Subscription};
use crate::error::{
    AuthError, AuthErrorKind, AuthResult, DocError, DocErrorKind, DocResult, StorageError,
    StorageErrorKind, StorageResult,
};

/// Minimum password length accepted at account creation.
const MIN_PASSWORD_LEN: usize = 6;

/// Credentials of the account seeded by [`MemoryBackend::demo`].
pub const DEMO_EMAIL: &str = "demo@chirp.local";
pub const DEMO_PASSWORD: &str = "chirp-demo";

/// In-memory auth, blob and document store.
///
/// Cloning is cheap and clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    auth: Mutex<AuthTable>,
    blobs: Mutex<BlobTable>,
    docs: Mutex<DocTable>,
    /// Fixed server time; `None` follows the system clock.
    clock: Mutex<Option<DateTime<Utc>>>,
}

#[derive(Default)]
struct AuthTable {
    accounts: HashMap<String, Account>,
    current: Option<Identity>,
    federated: Option<Identity>,
}

struct Account {
    password: String,
    identity: Identity,
}

#[derive(Default)]
struct BlobTable {
    objects: BTreeMap<String, StoredBlob>,
    fail_uploads: bool,
}

#[derive(Debug, Clone)]
struct StoredBlob {
    bytes: Bytes,
    content_type: Option<String>,
}

#[derive(Default)]
struct DocTable {
    collections: HashMap<CollectionPath, Vec<Document>>,
    watchers: Vec<Watcher>,
    next_watcher: u64,
    fail_appends: bool,
}

struct Watcher {
    id: u64,
    collection: CollectionPath,
    order_by: String,
    direction: Direction,
    tx: mpsc::UnboundedSender<DocResult<Snapshot>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend seeded with a demo account and a few posts.
    pub fn demo() -> Self {
        let backend = Self::new()
            .with_account(DEMO_EMAIL, DEMO_PASSWORD, "demo", "")
            .with_federated_identity(Identity {
                uid: "federated-demo".to_string(),
                email: Some("federated@chirp.local".to_string()),
                display_name: "federated".to_string(),
                photo_url: String::new(),
            });
        let posts = CollectionPath::new("posts");
        let now = Utc::now();
        let seed = [
            ("ferris", "Hello from the in-memory feed!", 30),
            ("chirp", "Press Tab on a post to open its comments.", 10),
        ];
        for (user, text, minutes_ago) in seed {
            backend.set_server_time(now - Duration::minutes(minutes_ago));
            let mut record = Map::new();
            record.insert(fields::AVATAR.into(), Value::String(String::new()));
            record.insert(fields::IMAGE.into(), Value::String(String::new()));
            record.insert(fields::TEXT.into(), Value::String(text.to_string()));
            record.insert(fields::TIMESTAMP.into(), ServerTimestamp::token());
            record.insert(fields::USERNAME.into(), Value::String(user.to_string()));
            backend.insert(&posts, record);
        }
        backend.follow_system_clock();
        backend
    }

    /// Registers an account with a profile.
    #[must_use]
    pub fn with_account(
        self,
        email: &str,
        password: &str,
        display_name: &str,
        photo_url: &str,
    ) -> Self {
        {
            let mut auth = lock(&self.inner.auth);
            let identity = Identity {
                uid: Uuid::new_v4().simple().to_string(),
                email: Some(email.to_string()),
                display_name: display_name.to_string(),
                photo_url: photo_url.to_string(),
            };
            auth.accounts.insert(
                normalize_email(email),
                Account {
                    password: password.to_string(),
                    identity,
                },
            );
        }
        self
    }

    /// Identity returned by the federated flow. Without one the flow fails
    /// as if the user closed the popup.
    #[must_use]
    pub fn with_federated_identity(self, identity: Identity) -> Self {
        lock(&self.inner.auth).federated = Some(identity);
        self
    }

    /// Pins the store clock used to resolve server timestamps.
    pub fn set_server_time(&self, at: DateTime<Utc>) {
        *lock(&self.inner.clock) = Some(at);
    }

    pub fn follow_system_clock(&self) {
        *lock(&self.inner.clock) = None;
    }

    /// Makes subsequent uploads fail.
    pub fn fail_uploads(&self, fail: bool) {
        lock(&self.inner.blobs).fail_uploads = fail;
    }

    /// Makes subsequent appends fail.
    pub fn fail_appends(&self, fail: bool) {
        lock(&self.inner.docs).fail_appends = fail;
    }

    /// Number of open live queries on `collection`.
    pub fn subscriber_count(&self, collection: &CollectionPath) -> usize {
        lock(&self.inner.docs)
            .watchers
            .iter()
            .filter(|w| &w.collection == collection)
            .count()
    }

    /// Number of open live queries across all collections.
    pub fn total_subscribers(&self) -> usize {
        lock(&self.inner.docs).watchers.len()
    }

    /// Documents of a collection in insertion order.
    pub fn documents(&self, collection: &CollectionPath) -> Vec<Document> {
        lock(&self.inner.docs)
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Stored bytes and content type of an uploaded object.
    pub fn blob(&self, path: &str) -> Option<(Bytes, Option<String>)> {
        lock(&self.inner.blobs)
            .objects
            .get(path)
            .map(|b| (b.bytes.clone(), b.content_type.clone()))
    }

    /// Writes a record synchronously, resolving server timestamp tokens, and
    /// notifies live queries. Returns the new document id.
    pub fn insert(&self, collection: &CollectionPath, record: Map<String, Value>) -> String {
        let now = self.now();
        let fields = record
            .into_iter()
            .map(|(key, value)| {
                if ServerTimestamp::is_token(&value) {
                    (key, now.to_value())
                } else {
                    (key, value)
                }
            })
            .collect();
        let id = Uuid::new_v4().simple().to_string();
        let doc = Document::new(id.clone(), fields);

        let mut docs = lock(&self.inner.docs);
        docs.collections
            .entry(collection.clone())
            .or_default()
            .push(doc);
        docs.notify(collection);
        id
    }

    fn now(&self) -> ServerTimestamp {
        let at = lock(&self.inner.clock).unwrap_or_else(Utc::now);
        ServerTimestamp::from_datetime(at)
    }
}

impl DocTable {
    fn snapshot(&self, collection: &CollectionPath, order_by: &str, direction: Direction) -> Snapshot {
        let docs = self.collections.get(collection).map_or(&[][..], Vec::as_slice);
        ordered_snapshot(docs, order_by, direction)
    }

    fn notify(&mut self, collection: &CollectionPath) {
        self.watchers.retain(|w| !w.tx.is_closed());
        for watcher in self.watchers.iter().filter(|w| &w.collection == collection) {
            let docs = self.collections.get(collection).map_or(&[][..], Vec::as_slice);
            let snapshot = ordered_snapshot(docs, &watcher.order_by, watcher.direction);
            let _ = watcher.tx.send(Ok(snapshot));
        }
    }
}

/// Orders documents by a field; documents without the field are excluded.
fn ordered_snapshot(docs: &[Document], order_by: &str, direction: Direction) -> Snapshot {
    let mut ordered: Vec<Document> = docs
        .iter()
        .filter(|d| d.fields.contains_key(order_by))
        .cloned()
        .collect();
    ordered.sort_by(|a, b| compare_values(&a.fields[order_by], &b.fields[order_by]));
    if direction == Direction::Descending {
        ordered.reverse();
    }
    ordered
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    if let (Some(a), Some(b)) = (ServerTimestamp::from_value(a), ServerTimestamp::from_value(b)) {
        return a.cmp(&b);
    }
    if let (Some(a), Some(b)) = (a.as_f64(), b.as_f64()) {
        return a.partial_cmp(&b).unwrap_or(Ordering::Equal);
    }
    if let (Some(a), Some(b)) = (a.as_str(), b.as_str()) {
        return a.cmp(b);
    }
    Ordering::Equal
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

impl AuthService for MemoryBackend {
    fn sign_in_with_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, AuthResult<Identity>> {
        let mut auth = lock(&self.inner.auth);
        let result = match auth.accounts.get(&normalize_email(email)) {
            Some(account) if account.password == password => Ok(account.identity.clone()),
            _ => Err(AuthError::invalid_credentials()),
        };
        if let Ok(identity) = &result {
            auth.current = Some(identity.clone());
        }
        ready(result).boxed()
    }

    fn create_account_with_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, AuthResult<Identity>> {
        let key = normalize_email(email);
        let mut auth = lock(&self.inner.auth);
        let result = if !key.contains('@') {
            Err(AuthError::new(
                AuthErrorKind::InvalidEmail,
                "The email address is badly formatted.",
            ))
        } else if password.chars().count() < MIN_PASSWORD_LEN {
            Err(AuthError::new(
                AuthErrorKind::WeakPassword,
                "Password should be at least 6 characters.",
            ))
        } else if auth.accounts.contains_key(&key) {
            Err(AuthError::new(
                AuthErrorKind::EmailInUse,
                "The email address is already in use by another account.",
            ))
        } else {
            let identity = Identity {
                uid: Uuid::new_v4().simple().to_string(),
                email: Some(email.trim().to_string()),
                display_name: String::new(),
                photo_url: String::new(),
            };
            auth.accounts.insert(
                key,
                Account {
                    password: password.to_string(),
                    identity: identity.clone(),
                },
            );
            auth.current = Some(identity.clone());
            Ok(identity)
        };
        ready(result).boxed()
    }

    fn sign_in_with_federated_popup(&self) -> BoxFuture<'_, AuthResult<Identity>> {
        let mut auth = lock(&self.inner.auth);
        let result = match auth.federated.clone() {
            Some(identity) => {
                auth.current = Some(identity.clone());
                Ok(identity)
            }
            None => Err(AuthError::new(
                AuthErrorKind::PopupClosed,
                "The popup has been closed by the user before finalizing the operation.",
            )),
        };
        ready(result).boxed()
    }

    fn update_profile<'a>(
        &'a self,
        identity: &'a Identity,
        profile: &'a ProfileUpdate,
    ) -> BoxFuture<'a, AuthResult<Identity>> {
        let mut auth = lock(&self.inner.auth);
        let updated = auth
            .accounts
            .values_mut()
            .find(|a| a.identity.uid == identity.uid)
            .map(|account| {
                account.identity = account.identity.clone().with_profile(profile);
                account.identity.clone()
            });
        let result = match updated {
            Some(updated) => {
                if auth.current.as_ref().is_some_and(|c| c.uid == updated.uid) {
                    auth.current = Some(updated.clone());
                }
                Ok(updated)
            }
            None => Err(AuthError::not_signed_in()),
        };
        ready(result).boxed()
    }

    fn current_user(&self) -> Option<Identity> {
        lock(&self.inner.auth).current.clone()
    }

    fn sign_out(&self) -> BoxFuture<'_, AuthResult<()>> {
        lock(&self.inner.auth).current = None;
        ready(Ok(())).boxed()
    }
}

impl BlobStore for MemoryBackend {
    fn upload<'a>(
        &'a self,
        path: &'a str,
        file: Bytes,
        content_type: Option<&'a str>,
    ) -> BoxFuture<'a, StorageResult<()>> {
        let mut blobs = lock(&self.inner.blobs);
        let result = if blobs.fail_uploads {
            Err(StorageError::new(
                StorageErrorKind::Unauthorized,
                "User does not have permission to access this object.",
            ))
        } else {
            blobs.objects.insert(
                path.to_string(),
                StoredBlob {
                    bytes: file,
                    content_type: content_type.map(ToString::to_string),
                },
            );
            Ok(())
        };
        ready(result).boxed()
    }

    fn download_url<'a>(&'a self, path: &'a str) -> BoxFuture<'a, StorageResult<String>> {
        let result = if lock(&self.inner.blobs).objects.contains_key(path) {
            Ok(format!("memory://blobs/{path}"))
        } else {
            Err(StorageError::new(
                StorageErrorKind::NotFound,
                format!("Object '{path}' does not exist."),
            ))
        };
        ready(result).boxed()
    }
}

impl DocumentStore for MemoryBackend {
    fn subscribe_ordered(
        &self,
        collection: &CollectionPath,
        order_by: &str,
        direction: Direction,
    ) -> DocResult<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut docs = lock(&self.inner.docs);
            let id = docs.next_watcher;
            docs.next_watcher += 1;
            let _ = tx.send(Ok(docs.snapshot(collection, order_by, direction)));
            docs.watchers.push(Watcher {
                id,
                collection: collection.clone(),
                order_by: order_by.to_string(),
                direction,
                tx,
            });
            id
        };

        let snapshots = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(snapshots, move || {
            if let Some(inner) = inner.upgrade() {
                lock(&inner.docs).watchers.retain(|w| w.id != id);
            }
        }))
    }

    fn append<'a>(
        &'a self,
        collection: &'a CollectionPath,
        record: Map<String, Value>,
    ) -> BoxFuture<'a, DocResult<String>> {
        let result = if lock(&self.inner.docs).fail_appends {
            Err(DocError::new(
                DocErrorKind::PermissionDenied,
                "Missing or insufficient permissions.",
            ))
        } else {
            Ok(self.insert(collection, record))
        };
        ready(result).boxed()
    }
}
