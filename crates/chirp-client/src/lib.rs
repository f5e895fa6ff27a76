//! Chirp client core: state, reducer, effects runtime and rendering.
//!
//! The client follows the Elm architecture. [`state::AppState`] is the single
//! source of truth, [`update::update`] is the only function that mutates it,
//! and [`runtime::ClientRuntime`] executes the [`effects::UiEffect`]s the
//! reducer returns. Rendering is a pure function of state.

pub mod common;
pub mod effects;
pub mod events;
pub mod features;
pub mod render;
pub mod runtime;
pub mod state;
pub mod update;

pub use features::{auth, comments, feed, session};
pub use runtime::ClientRuntime;
