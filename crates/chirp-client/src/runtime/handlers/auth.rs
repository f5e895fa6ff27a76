//! Auth handlers: password and federated sign-in, sign-up, sign-out.

use std::sync::Arc;

use anyhow::{Context, Result};
use chirp_core::avatar::avatar_object_path;
use chirp_core::{AuthService, Backends};
use chirp_types::{Identity, ProfileUpdate};
use tracing::{info, warn};

use crate::auth::SignUpRequest;
use crate::events::{AuthUiEvent, UiEvent};

pub async fn sign_in(auth: Arc<dyn AuthService>, email: String, password: String) -> UiEvent {
    let result = auth
        .sign_in_with_password(&email, &password)
        .await
        .inspect(|identity| info!(uid = %identity.uid, "signed in"))
        .map_err(|err| {
            warn!(kind = %err.kind, "sign-in failed");
            err.message
        });
    UiEvent::Auth(AuthUiEvent::SignedIn(result))
}

pub async fn sign_in_federated(auth: Arc<dyn AuthService>) -> UiEvent {
    let result = auth
        .sign_in_with_federated_popup()
        .await
        .inspect(|identity| info!(uid = %identity.uid, "signed in with federated provider"))
        .map_err(|err| {
            warn!(kind = %err.kind, "federated sign-in failed");
            err.message
        });
    UiEvent::Auth(AuthUiEvent::FederatedSignedIn(result))
}

pub async fn sign_up(backends: Backends, request: SignUpRequest) -> UiEvent {
    let result = create_account(&backends, request).await.map_err(|err| {
        let message = format!("{err:#}");
        warn!(error = %message, "sign-up failed");
        message
    });
    UiEvent::Auth(AuthUiEvent::SignedUp(result))
}

/// Creates the account, uploads the avatar and writes the profile.
///
/// Without an avatar the profile's photo URL is empty. A failed upload or
/// profile write leaves the created account as it is.
///
/// # Errors
/// Returns the first failing step, with context naming the step.
pub async fn create_account(backends: &Backends, request: SignUpRequest) -> Result<Identity> {
    let identity = backends
        .auth
        .create_account_with_password(&request.email, &request.password)
        .await
        .context("Could not create account")?;
    info!(uid = %identity.uid, "account created");

    let photo_url = match request.avatar {
        Some(avatar) => {
            let path = avatar_object_path(&avatar.file_name);
            backends
                .blobs
                .upload(&path, avatar.bytes, avatar.content_type.as_deref())
                .await
                .context("Could not upload avatar")?;
            backends
                .blobs
                .download_url(&path)
                .await
                .context("Could not get avatar URL")?
        }
        None => String::new(),
    };

    let profile = ProfileUpdate {
        display_name: request.display_name,
        photo_url,
    };
    backends
        .auth
        .update_profile(&identity, &profile)
        .await
        .context("Could not save profile")
}

pub async fn sign_out(auth: Arc<dyn AuthService>) -> UiEvent {
    let result = auth.sign_out().await.map_err(|err| {
        warn!(kind = %err.kind, "sign-out failed");
        err.message
    });
    if result.is_ok() {
        info!("signed out");
    }
    UiEvent::Auth(AuthUiEvent::SignedOut(result))
}

/// Reports the session the provider already holds, if any.
pub fn restore_session(auth: &dyn AuthService) -> UiEvent {
    let identity = auth.current_user();
    if let Some(identity) = &identity {
        info!(uid = %identity.uid, "restored session");
    }
    UiEvent::Auth(AuthUiEvent::Restored(identity))
}
