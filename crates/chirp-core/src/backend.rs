//! Contracts for the remote collaborators.
//!
//! The client never talks to a concrete service directly: it holds a
//! [`Backends`] bundle of trait objects. Async methods return boxed futures so
//! the traits stay object-safe.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use anyhow::Result;
use bytes::Bytes;
use chirp_types::{CollectionPath, Direction, Document, Identity, ProfileUpdate, ServerTimestamp};
use futures_util::future::BoxFuture;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use serde_json::{Map, Value};

use crate::config::{BackendKind, Config};
use crate::error::{AuthResult, DocResult, StorageResult};
use crate::firebase::FirebaseBackend;
use crate::memory::MemoryBackend;

/// Full, ordered contents of a subscribed collection.
pub type Snapshot = Vec<Document>;

/// Authentication provider (password and federated sign-in).
pub trait AuthService: Send + Sync {
    fn sign_in_with_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, AuthResult<Identity>>;

    fn create_account_with_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, AuthResult<Identity>>;

    fn sign_in_with_federated_popup(&self) -> BoxFuture<'_, AuthResult<Identity>>;

    /// Writes display name and avatar URL onto the account.
    fn update_profile<'a>(
        &'a self,
        identity: &'a Identity,
        profile: &'a ProfileUpdate,
    ) -> BoxFuture<'a, AuthResult<Identity>>;

    /// Identity of the session the provider already holds, if any.
    fn current_user(&self) -> Option<Identity>;

    fn sign_out(&self) -> BoxFuture<'_, AuthResult<()>>;
}

/// Blob storage for uploaded files (avatars).
pub trait BlobStore: Send + Sync {
    /// Stores `file` at `path`. An existing object at `path` is overwritten.
    fn upload<'a>(
        &'a self,
        path: &'a str,
        file: Bytes,
        content_type: Option<&'a str>,
    ) -> BoxFuture<'a, StorageResult<()>>;

    /// Returns a URL from which the object at `path` can be fetched.
    fn download_url<'a>(&'a self, path: &'a str) -> BoxFuture<'a, StorageResult<String>>;
}

/// Document database with ordered live queries.
pub trait DocumentStore: Send + Sync {
    /// Opens a live query over `collection` ordered by `order_by`.
    ///
    /// The returned subscription yields a full snapshot on open and after every
    /// change. Dropping it releases the query.
    ///
    /// # Errors
    /// Returns an error if the query cannot be opened.
    fn subscribe_ordered(
        &self,
        collection: &CollectionPath,
        order_by: &str,
        direction: Direction,
    ) -> DocResult<Subscription>;

    /// Appends a record and returns the new document id.
    ///
    /// Fields holding [`DocumentStore::server_timestamp`] are resolved by the
    /// store at commit time.
    fn append<'a>(
        &'a self,
        collection: &'a CollectionPath,
        record: Map<String, Value>,
    ) -> BoxFuture<'a, DocResult<String>>;

    /// Placeholder for a timestamp assigned by the store's clock.
    fn server_timestamp(&self) -> Value {
        ServerTimestamp::token()
    }
}

/// Runs a release action exactly once, when dropped.
pub struct ReleaseGuard(Option<Box<dyn FnOnce() + Send>>);

impl ReleaseGuard {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(release)))
    }

    pub fn is_released(&self) -> bool {
        self.0.is_none()
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        if let Some(release) = self.0.take() {
            release();
        }
    }
}

impl fmt::Debug for ReleaseGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReleaseGuard")
            .field(&self.is_released())
            .finish()
    }
}

/// A live query: a stream of snapshots plus a release action.
///
/// The release action runs exactly once, when the subscription (or the guard
/// split off by [`Subscription::into_parts`]) is dropped. Every exit path of a
/// consumer (end of stream, error, cancellation, panic unwinding) therefore
/// unsubscribes.
pub struct Subscription {
    snapshots: BoxStream<'static, DocResult<Snapshot>>,
    release: ReleaseGuard,
}

impl Subscription {
    pub fn new<S, F>(snapshots: S, release: F) -> Self
    where
        S: Stream<Item = DocResult<Snapshot>> + Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        Self {
            snapshots: snapshots.boxed(),
            release: ReleaseGuard::new(release),
        }
    }

    /// Splits the snapshot stream from its release guard so the two can be
    /// owned by different parties. Dropping the guard releases the query even
    /// while the stream is still held elsewhere.
    pub fn into_parts(self) -> (BoxStream<'static, DocResult<Snapshot>>, ReleaseGuard) {
        (self.snapshots, self.release)
    }
}

impl Stream for Subscription {
    type Item = DocResult<Snapshot>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().snapshots.poll_next_unpin(cx)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("release", &self.release)
            .finish_non_exhaustive()
    }
}

/// The set of collaborators the client runs against.
#[derive(Clone)]
pub struct Backends {
    pub auth: Arc<dyn AuthService>,
    pub blobs: Arc<dyn BlobStore>,
    pub docs: Arc<dyn DocumentStore>,
}

impl Backends {
    /// Builds the backends selected in config.
    ///
    /// # Errors
    /// Returns an error if the Firebase settings are incomplete or invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.backend {
            BackendKind::Memory => Ok(Self::from(MemoryBackend::demo())),
            BackendKind::Firebase => Ok(Self::from(FirebaseBackend::from_config(config)?)),
        }
    }
}

impl From<MemoryBackend> for Backends {
    fn from(backend: MemoryBackend) -> Self {
        let shared = Arc::new(backend);
        Self {
            auth: Arc::clone(&shared) as Arc<dyn AuthService>,
            blobs: Arc::clone(&shared) as Arc<dyn BlobStore>,
            docs: shared,
        }
    }
}

impl From<FirebaseBackend> for Backends {
    fn from(backend: FirebaseBackend) -> Self {
        let shared = Arc::new(backend);
        Self {
            auth: Arc::clone(&shared) as Arc<dyn AuthService>,
            blobs: Arc::clone(&shared) as Arc<dyn BlobStore>,
            docs: shared,
        }
    }
}

impl fmt::Debug for Backends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}
