//! Feature slices for the client (state/update/render per slice).

pub mod auth;
pub mod comments;
pub mod feed;
pub mod session;
