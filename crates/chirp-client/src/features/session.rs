//! Session slice: who is signed in.
//!
//! Written only by auth results (sign-in, sign-up, restore) and sign-out.

use chirp_types::{Identity, NewComment};

#[derive(Debug, Default, Clone)]
pub struct SessionState {
    identity: Option<Identity>,
}

impl SessionState {
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }

    pub fn sign_in(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    pub fn clear(&mut self) {
        self.identity = None;
    }

    /// Builds a comment authored by the signed-in user.
    ///
    /// The comment carries the display name and avatar current at submit time.
    pub fn author_comment(&self, text: String) -> Option<NewComment> {
        self.identity.as_ref().map(|identity| NewComment {
            avatar: identity.photo_url.clone(),
            text,
            user_name: identity.display_name.clone(),
        })
    }
}
