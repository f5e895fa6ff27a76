use std::fmt;

use bytes::Bytes;

/// Passwords shorter than this never reach the auth provider.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

impl AuthMode {
    pub fn toggled(self) -> Self {
        match self {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            AuthMode::SignIn => "Sign in",
            AuthMode::SignUp => "Create account",
        }
    }

    /// Fields shown in this mode, in focus order.
    pub fn fields(self) -> &'static [AuthField] {
        match self {
            AuthMode::SignIn => &[AuthField::Email, AuthField::Password],
            AuthMode::SignUp => &[
                AuthField::DisplayName,
                AuthField::Email,
                AuthField::Password,
                AuthField::AvatarPath,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthField {
    DisplayName,
    #[default]
    Email,
    Password,
    AvatarPath,
}

impl AuthField {
    pub fn label(self) -> &'static str {
        match self {
            AuthField::DisplayName => "Name",
            AuthField::Email => "Email",
            AuthField::Password => "Password",
            AuthField::AvatarPath => "Avatar",
        }
    }
}

/// An avatar image read from disk, ready for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct AvatarFile {
    pub file_name: String,
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

impl fmt::Debug for AvatarFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvatarFile")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Everything sign-up needs. `avatar` is optional here; the form only
/// submits with one, but the flow itself handles both cases.
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub avatar: Option<AvatarFile>,
}

#[derive(Debug, Default)]
pub struct AuthFormState {
    pub mode: AuthMode,
    pub focus: AuthField,
    pub email: String,
    pub password: String,
    pub display_name: String,
    /// Path typed by the user; loaded into `avatar` on request.
    pub avatar_path: String,
    pub avatar: Option<AvatarFile>,
    pub error: Option<String>,
    /// Known credentials to show on the sign-in screen (local demo store).
    pub account_hint: Option<String>,
}

impl AuthFormState {
    pub fn fields(&self) -> &'static [AuthField] {
        self.mode.fields()
    }

    pub fn value(&self, field: AuthField) -> &str {
        match field {
            AuthField::DisplayName => &self.display_name,
            AuthField::Email => &self.email,
            AuthField::Password => &self.password,
            AuthField::AvatarPath => &self.avatar_path,
        }
    }

    fn value_mut(&mut self, field: AuthField) -> &mut String {
        match field {
            AuthField::DisplayName => &mut self.display_name,
            AuthField::Email => &mut self.email,
            AuthField::Password => &mut self.password,
            AuthField::AvatarPath => &mut self.avatar_path,
        }
    }

    pub fn focus_next(&mut self) {
        self.move_focus(1);
    }

    pub fn focus_prev(&mut self) {
        self.move_focus(self.fields().len() - 1);
    }

    fn move_focus(&mut self, step: usize) {
        let fields = self.fields();
        let current = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(current + step) % fields.len()];
    }

    pub fn insert_str(&mut self, text: &str) {
        let field = self.focus;
        self.value_mut(field).push_str(text);
        self.on_edit(field);
    }

    pub fn insert_char(&mut self, c: char) {
        let field = self.focus;
        self.value_mut(field).push(c);
        self.on_edit(field);
    }

    pub fn backspace(&mut self) {
        let field = self.focus;
        if self.value_mut(field).pop().is_some() {
            self.on_edit(field);
        }
    }

    fn on_edit(&mut self, field: AuthField) {
        self.error = None;
        if field == AuthField::AvatarPath {
            self.avatar = None;
        }
    }

    /// Switches between sign-in and sign-up. Typed values are kept.
    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
        self.error = None;
        if !self.fields().contains(&self.focus) {
            self.focus = AuthField::Email;
        }
    }

    pub fn password_ok(&self) -> bool {
        self.password.chars().count() >= MIN_PASSWORD_LEN
    }

    /// The first unmet submit requirement, if any.
    pub fn missing_requirement(&self) -> Option<&'static str> {
        if self.mode == AuthMode::SignUp && self.display_name.trim().is_empty() {
            return Some("Enter a display name.");
        }
        if self.email.trim().is_empty() {
            return Some("Enter your email.");
        }
        if !self.password_ok() {
            return Some("Password needs at least 6 characters.");
        }
        if self.mode == AuthMode::SignUp && self.avatar.is_none() {
            return Some("Load an avatar image (type a path, press Enter).");
        }
        None
    }

    pub fn can_submit(&self) -> bool {
        self.missing_requirement().is_none()
    }

    pub fn sign_up_request(&self) -> SignUpRequest {
        SignUpRequest {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            display_name: self.display_name.trim().to_string(),
            avatar: self.avatar.clone(),
        }
    }

    /// Wipes secrets once a session exists.
    pub fn clear_secrets(&mut self) {
        self.password.clear();
        self.error = None;
    }
}
