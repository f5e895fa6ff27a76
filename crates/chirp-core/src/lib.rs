//! Core services for chirp: collaborator contracts, backends, config and logging.

pub mod avatar;
pub mod backend;
pub mod config;
pub mod error;
pub mod firebase;
pub mod logging;
pub mod memory;

pub use backend::{
    AuthService, Backends, BlobStore, DocumentStore, ReleaseGuard, Snapshot, Subscription,
};
pub use config::Config;
pub use error::{
    AuthError, AuthErrorKind, AuthResult, DocError, DocErrorKind, DocResult, StorageError,
    StorageErrorKind, StorageResult,
};
pub use firebase::FirebaseBackend;
pub use memory::MemoryBackend;
