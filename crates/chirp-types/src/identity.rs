use serde::{Deserialize, Serialize};

/// The authenticated user's profile, as issued by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Identity {
    /// Stable account id assigned by the auth service.
    pub uid: String,
    pub email: Option<String>,
    pub display_name: String,
    /// Avatar URL; empty when the user has no avatar.
    pub photo_url: String,
}

impl Identity {
    /// Returns a copy with the profile fields replaced.
    #[must_use]
    pub fn with_profile(mut self, profile: &ProfileUpdate) -> Self {
        self.display_name.clone_from(&profile.display_name);
        self.photo_url.clone_from(&profile.photo_url);
        self
    }
}

/// Profile fields written after sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: String,
    pub photo_url: String,
}
