//! Auth feature: sign-in and sign-up form.

mod render;
mod state;
mod update;

pub use render::{auth_form_lines, render_auth_screen};
pub use state::{AuthField, AuthFormState, AuthMode, AvatarFile, MIN_PASSWORD_LEN, SignUpRequest};
pub use update::{handle_auth_result, handle_avatar_loaded, handle_key};
