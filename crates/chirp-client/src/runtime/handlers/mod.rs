//! Effect handlers for the client runtime.
//!
//! These functions perform I/O against the backends. They do NOT mutate state.
//!
//! ## Pure Async Pattern
//!
//! Handlers are async functions that return `UiEvent`. The runtime spawns them
//! and sends the result to the inbox, so handlers stay focused on the backend
//! calls and their error mapping.
//!
//! ```ignore
//! // Handler: pure async, returns UiEvent
//! pub async fn sign_in(auth: Arc<dyn AuthService>, email: String, password: String) -> UiEvent { ... }
//!
//! // Runtime: spawns and sends to inbox
//! self.spawn_task(TaskKind::Auth, task, move || handlers::sign_in(auth, email, password));
//! ```

pub mod auth;
pub mod avatar;
pub mod comments;
pub mod snapshots;

pub use auth::*;
pub use avatar::*;
pub use comments::*;
pub use snapshots::*;
