//! Auth feature reducer.
//!
//! Handles form editing and auth result processing. Session and feed changes
//! that follow a successful sign-in are orchestrated by the top-level reducer.

use chirp_types::Identity;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::{AuthField, AuthFormState, AvatarFile};
use crate::events::Intent;

/// Applies a key to the form. Returns an intent for keys that trigger work.
pub fn handle_key(form: &mut AuthFormState, key: KeyEvent) -> Option<Intent> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('t') if ctrl => Some(Intent::ToggleAuthMode),
        KeyCode::Char('g') if ctrl => Some(Intent::SignInFederated),
        KeyCode::Char(_) if ctrl => None,
        KeyCode::Char(c) => {
            form.insert_char(c);
            None
        }
        KeyCode::Backspace => {
            form.backspace();
            None
        }
        KeyCode::Tab | KeyCode::Down => {
            form.focus_next();
            None
        }
        KeyCode::BackTab | KeyCode::Up => {
            form.focus_prev();
            None
        }
        KeyCode::Enter if form.focus == AuthField::AvatarPath => Some(Intent::LoadAvatar),
        KeyCode::Enter => Some(Intent::SubmitAuth),
        KeyCode::Esc => Some(Intent::DismissNotice),
        _ => None,
    }
}

/// Records the outcome of a sign-in or sign-up attempt on the form.
pub fn handle_auth_result(form: &mut AuthFormState, result: &Result<Identity, String>) {
    match result {
        Ok(_) => form.clear_secrets(),
        Err(message) => form.error = Some(message.clone()),
    }
}

/// Stores a loaded avatar, unless the path was edited while it was loading.
pub fn handle_avatar_loaded(
    form: &mut AuthFormState,
    path: &str,
    result: Result<AvatarFile, String>,
) {
    if form.avatar_path.trim() != path {
        return;
    }
    match result {
        Ok(file) => {
            form.avatar = Some(file);
            form.error = None;
        }
        Err(message) => {
            form.avatar = None;
            form.error = Some(message);
        }
    }
}
