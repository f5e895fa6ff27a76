//! Client reducer (update function).
//!
//! All state mutations happen here. The runtime calls `update(app, event)`
//! and executes the returned effects.
//!
//! Feature reducers own their slice; this module routes events to them and
//! handles the transitions that span slices (a sign-in opens the feed, a
//! sign-out closes it).

use chirp_types::Identity;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::debug;

use crate::auth::AuthMode;
use crate::common::TaskKind;
use crate::effects::UiEffect;
use crate::events::{AuthUiEvent, CommentUiEvent, FeedUiEvent, Intent, UiEvent};
use crate::state::AppState;
use crate::{auth, comments, feed};

/// The main reducer function.
///
/// Takes the current state and an event, mutates state, and returns effects
/// for the runtime to execute.
pub fn update(app: &mut AppState, event: UiEvent) -> Vec<UiEffect> {
    match event {
        UiEvent::Terminal(term_event) => handle_terminal_event(app, term_event),
        UiEvent::Intent(intent) => handle_intent(app, intent),
        UiEvent::Auth(event) => handle_auth_event(app, event),
        UiEvent::Feed(event) => handle_feed_event(app, event),
        UiEvent::Comments(event) => handle_comment_event(app, event),
        UiEvent::TaskCompleted { kind, completed } => {
            if app.tasks.state_mut(kind).finish_if_active(completed.id) {
                update(app, *completed.result)
            } else {
                debug!(?kind, id = completed.id.0, "dropping result of inactive task");
                vec![]
            }
        }
    }
}

fn handle_terminal_event(app: &mut AppState, event: Event) -> Vec<UiEffect> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key),
        Event::Paste(text) => {
            handle_paste(app, &text);
            vec![]
        }
        _ => vec![],
    }
}

fn handle_key(app: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return handle_intent(app, Intent::Quit);
    }
    let intent = if app.session.is_signed_in() {
        feed::handle_key(&mut app.feed, key)
    } else {
        auth::handle_key(&mut app.auth, key)
    };
    intent.map_or_else(Vec::new, |intent| handle_intent(app, intent))
}

fn handle_paste(app: &mut AppState, text: &str) {
    let text = text.replace(['\r', '\n'], " ");
    if !app.session.is_signed_in() {
        app.auth.insert_str(&text);
        return;
    }
    let Some(post_id) = app.feed.selected_post().map(|post| post.id.clone()) else {
        return;
    };
    let thread = app.feed.thread_mut(&post_id);
    if thread.is_expanded() {
        thread.draft.push_str(&text);
    }
}

fn handle_intent(app: &mut AppState, intent: Intent) -> Vec<UiEffect> {
    match intent {
        Intent::SubmitAuth => submit_auth(app),
        Intent::ToggleAuthMode => {
            if !app.tasks.auth.is_running() {
                app.auth.toggle_mode();
            }
            vec![]
        }
        Intent::SignInFederated => {
            if !can_start_auth(app) {
                return vec![];
            }
            let task = app.task_seq.next_id();
            app.tasks.state_mut(TaskKind::Auth).start(task);
            app.auth.error = None;
            vec![UiEffect::SignInFederated { task }]
        }
        Intent::LoadAvatar => {
            let path = app.auth.avatar_path.trim().to_string();
            if path.is_empty() {
                app.auth.error = Some("Type the path of an image file.".to_string());
                return vec![];
            }
            let task = app.task_seq.next_id();
            app.tasks.state_mut(TaskKind::AvatarLoad).start(task);
            vec![UiEffect::LoadAvatar { task, path }]
        }
        Intent::SignOut => sign_out(app),
        Intent::ReloadFeed => {
            if app.session.is_signed_in() && app.feed.subscription().is_none() {
                feed::open(&mut app.feed, &mut app.subscription_seq)
            } else {
                vec![]
            }
        }
        Intent::SelectNextPost => {
            app.feed.select_next();
            vec![]
        }
        Intent::SelectPrevPost => {
            app.feed.select_prev();
            vec![]
        }
        Intent::ToggleComments { post_id } => {
            if !has_post(app, &post_id) {
                return vec![];
            }
            let thread = app.feed.thread_mut(&post_id);
            vec![comments::toggle(thread, &post_id, &mut app.subscription_seq)]
        }
        Intent::SubmitComment { post_id } => {
            if !has_post(app, &post_id) {
                return vec![];
            }
            let thread = app.feed.thread_mut(&post_id);
            comments::submit(thread, &app.session, &post_id)
                .into_iter()
                .collect()
        }
        Intent::DismissNotice => {
            app.notice = None;
            vec![]
        }
        Intent::Quit => {
            app.should_quit = true;
            vec![UiEffect::Quit]
        }
    }
}

fn has_post(app: &AppState, post_id: &str) -> bool {
    app.feed.posts.iter().any(|post| post.id == post_id)
}

/// No new sign-in while one is in flight or a provider sign-out is pending.
fn can_start_auth(app: &AppState) -> bool {
    !app.session.is_signed_in() && !app.tasks.auth.is_running() && !app.tasks.sign_out.is_running()
}

fn submit_auth(app: &mut AppState) -> Vec<UiEffect> {
    if !can_start_auth(app) || !app.auth.can_submit() {
        return vec![];
    }
    let task = app.task_seq.next_id();
    app.tasks.state_mut(TaskKind::Auth).start(task);
    app.auth.error = None;

    match app.auth.mode {
        AuthMode::SignIn => vec![UiEffect::SignIn {
            task,
            email: app.auth.email.trim().to_string(),
            password: app.auth.password.clone(),
        }],
        AuthMode::SignUp => vec![UiEffect::SignUp {
            task,
            request: app.auth.sign_up_request(),
        }],
    }
}

/// Clears the session and releases every live query before the provider
/// sign-out runs.
fn sign_out(app: &mut AppState) -> Vec<UiEffect> {
    if !app.session.is_signed_in() {
        return vec![];
    }
    let mut effects = feed::close(&mut app.feed);
    app.session.clear();
    app.auth.clear_secrets();
    app.tasks.auth.clear();

    let task = app.task_seq.next_id();
    app.tasks.state_mut(TaskKind::SignOut).start(task);
    effects.push(UiEffect::SignOut { task });
    effects
}

fn establish_session(app: &mut AppState, identity: Identity) -> Vec<UiEffect> {
    app.session.sign_in(identity);
    feed::open(&mut app.feed, &mut app.subscription_seq)
}

fn handle_auth_event(app: &mut AppState, event: AuthUiEvent) -> Vec<UiEffect> {
    match event {
        AuthUiEvent::SignedIn(result)
        | AuthUiEvent::SignedUp(result)
        | AuthUiEvent::FederatedSignedIn(result) => {
            auth::handle_auth_result(&mut app.auth, &result);
            match result {
                Ok(identity) => establish_session(app, identity),
                Err(_) => vec![],
            }
        }
        AuthUiEvent::Restored(Some(identity)) if !app.session.is_signed_in() => {
            establish_session(app, identity)
        }
        AuthUiEvent::Restored(_) => vec![],
        AuthUiEvent::SignedOut(result) => {
            if let Err(error) = result {
                app.show_notice(format!("Sign-out failed: {error}"));
            }
            vec![]
        }
        AuthUiEvent::AvatarLoaded { path, result } => {
            auth::handle_avatar_loaded(&mut app.auth, &path, result);
            vec![]
        }
    }
}

fn handle_feed_event(app: &mut AppState, event: FeedUiEvent) -> Vec<UiEffect> {
    match event {
        FeedUiEvent::Snapshot {
            subscription,
            posts,
        } => feed::apply_snapshot(&mut app.feed, subscription, posts),
        FeedUiEvent::Failed {
            subscription,
            error,
        } => feed::handle_failure(&mut app.feed, subscription, error),
    }
}

fn handle_comment_event(app: &mut AppState, event: CommentUiEvent) -> Vec<UiEffect> {
    match event {
        CommentUiEvent::Snapshot {
            post_id,
            subscription,
            comments,
        } => {
            if let Some(thread) = app.feed.threads.get_mut(&post_id) {
                comments::apply_snapshot(thread, subscription, comments);
            }
            vec![]
        }
        CommentUiEvent::Failed {
            post_id,
            subscription,
            error,
        } => app
            .feed
            .threads
            .get_mut(&post_id)
            .and_then(|thread| comments::handle_failure(thread, subscription, error))
            .into_iter()
            .collect(),
        CommentUiEvent::Appended {
            post_id,
            text,
            result,
        } => {
            let notice = match app.feed.threads.get_mut(&post_id) {
                Some(thread) => comments::handle_appended(thread, text, result),
                None => result.err().map(|error| format!("Comment not posted: {error}")),
            };
            if let Some(notice) = notice {
                app.show_notice(notice);
            }
            vec![]
        }
    }
}
