//! Identity Toolkit accounts API and secure token refresh.

use std::time::{Duration, Instant};

use chirp_types::{Identity, ProfileUpdate};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{AuthSession, FirebaseBackend, USER_AGENT, network_message};
use crate::backend::AuthService;
use crate::error::{AuthError, AuthErrorKind, AuthResult, api_error_message};

/// Token fields shared by `signInWithPassword`, `signUp` and `update`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<String>,
}

impl AccountResponse {
    fn identity(&self) -> Identity {
        Identity {
            uid: self.local_id.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone().unwrap_or_default(),
            photo_url: self.photo_url.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountResponse>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

/// Maps an Identity Toolkit error code to a kind and display message.
///
/// Codes arrive as `EMAIL_EXISTS` or `WEAK_PASSWORD : Password should be...`.
fn classify_auth_error(status: u16, body: &str) -> AuthError {
    let Some(raw) = api_error_message(body) else {
        return AuthError::new(AuthErrorKind::Http, format!("HTTP {status}")).with_details(body);
    };
    let code = raw
        .split([' ', ':'])
        .next()
        .unwrap_or_default()
        .to_string();
    let error = match code.as_str() {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            AuthError::invalid_credentials()
        }
        "EMAIL_EXISTS" => AuthError::new(
            AuthErrorKind::EmailInUse,
            "The email address is already in use by another account.",
        ),
        "WEAK_PASSWORD" => AuthError::new(
            AuthErrorKind::WeakPassword,
            "Password should be at least 6 characters.",
        ),
        "INVALID_EMAIL" | "MISSING_EMAIL" => AuthError::new(
            AuthErrorKind::InvalidEmail,
            "The email address is badly formatted.",
        ),
        "USER_DISABLED" => AuthError::new(
            AuthErrorKind::UserDisabled,
            "The user account has been disabled by an administrator.",
        ),
        "TOKEN_EXPIRED" | "INVALID_ID_TOKEN" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" => {
            AuthError::new(AuthErrorKind::NotSignedIn, "Your session has expired. Sign in again.")
        }
        _ => AuthError::new(AuthErrorKind::Http, format!("HTTP {status}: {raw}")),
    };
    error.with_details(raw)
}

fn expires_at(expires_in: Option<&str>) -> Instant {
    let seconds = expires_in
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(3600);
    Instant::now() + Duration::from_secs(seconds)
}

impl FirebaseBackend {
    fn accounts_url(&self, method: &str) -> String {
        format!(
            "{}/v1/accounts:{method}?key={}",
            self.endpoints.identity_base_url, self.endpoints.api_key
        )
    }

    async fn post_accounts<T: DeserializeOwned>(&self, method: &str, body: &Value) -> AuthResult<T> {
        let response = self
            .http
            .post(self.accounts_url(method))
            .header("user-agent", USER_AGENT)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::new(AuthErrorKind::Network, network_message(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let error = classify_auth_error(status.as_u16(), &error_body);
            warn!(method, kind = %error.kind, "accounts request failed");
            return Err(error);
        }

        response.json::<T>().await.map_err(|e| {
            AuthError::new(AuthErrorKind::Parse, format!("Invalid {method} response: {e}"))
        })
    }

    /// Starts a session from a token-bearing account response.
    fn start_session(&self, account: &AccountResponse, identity: Identity) -> AuthResult<()> {
        let (Some(id_token), Some(refresh_token)) = (&account.id_token, &account.refresh_token)
        else {
            return Err(AuthError::new(
                AuthErrorKind::Parse,
                "Auth response did not include tokens.",
            ));
        };
        *self.session() = Some(AuthSession {
            identity,
            id_token: id_token.clone(),
            refresh_token: refresh_token.clone(),
            expires_at: expires_at(account.expires_in.as_deref()),
        });
        Ok(())
    }

    /// Looks up the full profile (sign-in responses omit the photo URL).
    async fn lookup(&self, id_token: &str) -> AuthResult<Identity> {
        let response: LookupResponse = self
            .post_accounts("lookup", &json!({ "idToken": id_token }))
            .await?;
        response
            .users
            .first()
            .map(AccountResponse::identity)
            .ok_or_else(|| AuthError::new(AuthErrorKind::Parse, "Account lookup returned no user."))
    }

    /// Returns a valid ID token for the current user, refreshing it if it is
    /// about to expire.
    pub(super) async fn id_token(&self) -> AuthResult<String> {
        let session = self.session().clone().ok_or_else(AuthError::not_signed_in)?;
        if !session.needs_refresh() {
            return Ok(session.id_token);
        }

        debug!("refreshing id token");
        let url = format!(
            "{}/v1/token?key={}",
            self.endpoints.token_base_url, self.endpoints.api_key
        );
        let response = self
            .http
            .post(url)
            .header("user-agent", USER_AGENT)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", session.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::new(AuthErrorKind::Network, network_message(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(classify_auth_error(status.as_u16(), &error_body));
        }
        let refreshed: RefreshResponse = response.json().await.map_err(|e| {
            AuthError::new(AuthErrorKind::Parse, format!("Invalid token response: {e}"))
        })?;

        let mut guard = self.session();
        if let Some(current) = guard.as_mut() {
            current.id_token.clone_from(&refreshed.id_token);
            current.refresh_token = refreshed.refresh_token;
            current.expires_at = expires_at(Some(&refreshed.expires_in));
        }
        Ok(refreshed.id_token)
    }

    /// ID token if a user is signed in; anonymous requests otherwise.
    pub(super) async fn optional_id_token(&self) -> AuthResult<Option<String>> {
        if self.session().is_none() {
            return Ok(None);
        }
        self.id_token().await.map(Some)
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Identity> {
        let body = json!({ "email": email, "password": password, "returnSecureToken": true });
        let account: AccountResponse = self.post_accounts("signInWithPassword", &body).await?;
        let id_token = account.id_token.clone().unwrap_or_default();
        let identity = match self.lookup(&id_token).await {
            Ok(identity) => identity,
            Err(err) => {
                warn!(error = %err, "profile lookup failed; using sign-in response");
                account.identity()
            }
        };
        self.start_session(&account, identity.clone())?;
        Ok(identity)
    }

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<Identity> {
        let body = json!({ "email": email, "password": password, "returnSecureToken": true });
        let account: AccountResponse = self.post_accounts("signUp", &body).await?;
        let identity = account.identity();
        self.start_session(&account, identity.clone())?;
        Ok(identity)
    }

    async fn write_profile(&self, identity: &Identity, profile: &ProfileUpdate) -> AuthResult<Identity> {
        let id_token = self.id_token().await?;
        let mut body = json!({
            "idToken": id_token,
            "displayName": profile.display_name,
            "returnSecureToken": true,
        });
        if profile.photo_url.is_empty() {
            body["deleteAttribute"] = json!(["PHOTO_URL"]);
        } else {
            body["photoUrl"] = json!(profile.photo_url);
        }

        let account: AccountResponse = self.post_accounts("update", &body).await?;
        let updated = identity.clone().with_profile(profile);

        let mut guard = self.session();
        if let Some(current) = guard.as_mut() {
            current.identity = updated.clone();
            if let (Some(id_token), Some(refresh_token)) = (account.id_token, account.refresh_token) {
                current.id_token = id_token;
                current.refresh_token = refresh_token;
                current.expires_at = expires_at(account.expires_in.as_deref());
            }
        }
        Ok(updated)
    }
}

impl AuthService for FirebaseBackend {
    fn sign_in_with_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, AuthResult<Identity>> {
        self.sign_in(email, password).boxed()
    }

    fn create_account_with_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, AuthResult<Identity>> {
        self.sign_up(email, password).boxed()
    }

    fn sign_in_with_federated_popup(&self) -> BoxFuture<'_, AuthResult<Identity>> {
        async {
            Err(AuthError::new(
                AuthErrorKind::Unsupported,
                "Federated sign-in needs a browser; use email and password.",
            ))
        }
        .boxed()
    }

    fn update_profile<'a>(
        &'a self,
        identity: &'a Identity,
        profile: &'a ProfileUpdate,
    ) -> BoxFuture<'a, AuthResult<Identity>> {
        self.write_profile(identity, profile).boxed()
    }

    fn current_user(&self) -> Option<Identity> {
        self.session().as_ref().map(|s| s.identity.clone())
    }

    fn sign_out(&self) -> BoxFuture<'_, AuthResult<()>> {
        *self.session() = None;
        async { Ok(()) }.boxed()
    }
}
