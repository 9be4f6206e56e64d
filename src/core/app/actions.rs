use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::session::VerifyState;
use super::App;
use crate::api::identity::VerifyError;
use crate::api::models::CatalogError;
use crate::api::{Identity, ModelEntry};
use crate::core::catalog::Catalog;
use crate::core::chat_stream::StreamParams;
use crate::core::constants::{CATALOG_UNAVAILABLE_NOTICE, CHAT_TASK_TAG, UNSUPPORTED_TASK_NOTICE};

/// Everything that can happen to the session, user input and async
/// completions alike. Completion variants carry the epoch or stream id
/// captured when their work was started so stale results can be dropped.
pub enum AppAction {
    SubmitCredential {
        secret: String,
    },
    SelectTask {
        tag: String,
    },
    SelectModel {
        id: String,
    },
    SubmitMessage {
        text: String,
    },
    VerifyCompleted {
        result: Result<Identity, VerifyError>,
        epoch: u64,
    },
    CatalogLoaded {
        result: Result<Vec<ModelEntry>, CatalogError>,
        epoch: u64,
    },
    StreamStarted {
        stream_id: u64,
    },
    AppendStreamChunk {
        content: String,
        stream_id: u64,
    },
    StreamErrored {
        message: String,
        stream_id: u64,
    },
    StreamCompleted {
        stream_id: u64,
    },
}

#[derive(Clone)]
pub struct AppActionDispatcher {
    tx: mpsc::UnboundedSender<AppAction>,
}

impl AppActionDispatcher {
    pub fn new(tx: mpsc::UnboundedSender<AppAction>) -> Self {
        Self { tx }
    }

    pub fn dispatch(&self, action: AppAction) -> bool {
        self.tx.send(action).is_ok()
    }

    pub fn dispatch_many<I>(&self, actions: I)
    where
        I: IntoIterator<Item = AppAction>,
    {
        for action in actions.into_iter() {
            let _ = self.tx.send(action);
        }
    }
}

/// Side effects `apply_action` asks the caller to run. Applying actions
/// never touches the network itself.
pub enum AppCommand {
    Verify { token: String, epoch: u64 },
    FetchCatalog { token: String, epoch: u64 },
    SpawnStream(StreamParams),
}

pub fn apply_actions(
    app: &mut App,
    actions: impl IntoIterator<Item = AppAction>,
) -> Vec<AppCommand> {
    let mut commands = Vec::new();
    for action in actions {
        if let Some(cmd) = apply_action(app, action) {
            commands.push(cmd);
        }
    }
    commands
}

pub fn apply_action(app: &mut App, action: AppAction) -> Option<AppCommand> {
    match action {
        AppAction::SubmitCredential { secret } => submit_credential(app, secret),
        AppAction::SelectTask { tag } => {
            select_task(app, tag);
            None
        }
        AppAction::SelectModel { id } => {
            select_model(app, id);
            None
        }
        AppAction::SubmitMessage { text } => submit_message(app, text),
        AppAction::VerifyCompleted { result, epoch } => verify_completed(app, result, epoch),
        AppAction::CatalogLoaded { result, epoch } => {
            catalog_loaded(app, result, epoch);
            None
        }
        AppAction::StreamStarted { stream_id } => {
            if app.is_current_stream(stream_id) {
                app.conversation().mark_streaming();
            }
            None
        }
        AppAction::AppendStreamChunk { content, stream_id } => {
            append_stream_chunk(app, &content, stream_id);
            None
        }
        AppAction::StreamErrored { message, stream_id } => {
            stream_errored(app, &message, stream_id);
            None
        }
        AppAction::StreamCompleted { stream_id } => {
            if app.is_current_stream(stream_id) {
                app.conversation().finalize_response();
            }
            None
        }
    }
}

/// Every submission invalidates the previous credential: the epoch is
/// bumped, the live catalog is dropped, the selection falls back, and any
/// in-flight stream is cancelled. A blank secret stops there; anything
/// else starts a fresh verification round.
fn submit_credential(app: &mut App, secret: String) -> Option<AppCommand> {
    app.conversation().cancel_current_stream();

    app.session.credential_epoch += 1;
    app.live_catalog = None;
    app.catalog_loading = false;
    app.selection.on_credential_invalidated(&app.fallback_catalog);

    let token = secret.trim().to_string();
    if token.is_empty() {
        app.session.token.clear();
        app.session.verify = VerifyState::Unverified;
        return None;
    }

    debug!(
        epoch = app.session.credential_epoch,
        "Verifying submitted credential"
    );
    app.session.token = token.clone();
    app.session.verify = VerifyState::Verifying;
    Some(AppCommand::Verify {
        token,
        epoch: app.session.credential_epoch,
    })
}

fn select_task(app: &mut App, tag: String) {
    app.conversation().cancel_current_stream();
    let catalog = app.live_catalog.as_ref().unwrap_or(&app.fallback_catalog);
    app.selection.set_task(tag, catalog);
}

fn select_model(app: &mut App, id: String) {
    let catalog = app.live_catalog.as_ref().unwrap_or(&app.fallback_catalog);
    let changed = app.selection.model_id() != Some(id.as_str());
    match app.selection.set_model(id, catalog) {
        Ok(()) => {
            // A response in flight would be attributed to the wrong model.
            if changed {
                app.conversation().cancel_current_stream();
            }
        }
        Err(err) => warn!(error = %err, "Rejected model selection"),
    }
}

fn submit_message(app: &mut App, text: String) -> Option<AppCommand> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if app.is_stream_active() {
        warn!("Ignoring submission while a response is in flight");
        return None;
    }
    if !app.session.is_verified() || app.live_catalog.is_none() {
        warn!("Ignoring submission before credential and catalog are ready");
        return None;
    }
    let Some(model) = app.selection.model_id().map(str::to_string) else {
        warn!(task = %app.selection.task_tag(), "Ignoring submission with no model selected");
        return None;
    };

    let text = trimmed.to_string();
    if app.selection.task_tag() != CHAT_TASK_TAG {
        let mut conversation = app.conversation();
        conversation.append_user_message(text);
        conversation.append_assistant_message(UNSUPPORTED_TASK_NOTICE);
        return None;
    }

    let (cancel_token, stream_id, api_messages) = {
        let mut conversation = app.conversation();
        let (cancel_token, stream_id) = conversation.start_new_stream();
        let api_messages = conversation.add_user_message(text);
        (cancel_token, stream_id, api_messages)
    };

    Some(AppCommand::SpawnStream(app.build_stream_params(
        model,
        api_messages,
        cancel_token,
        stream_id,
    )))
}

fn verify_completed(
    app: &mut App,
    result: Result<Identity, VerifyError>,
    epoch: u64,
) -> Option<AppCommand> {
    if !app.is_current_epoch(epoch) {
        debug!(epoch, "Dropping verification result for a replaced credential");
        return None;
    }

    match result {
        Ok(identity) => {
            debug!(user = %identity.name, "Credential verified");
            app.session.verify = VerifyState::Verified(identity);
            app.catalog_loading = true;
            Some(AppCommand::FetchCatalog {
                token: app.session.token.clone(),
                epoch,
            })
        }
        Err(err) => {
            warn!(error = %err, "Credential verification failed");
            app.session.verify = VerifyState::Failed(err.to_string());
            None
        }
    }
}

fn catalog_loaded(app: &mut App, result: Result<Vec<ModelEntry>, CatalogError>, epoch: u64) {
    if !app.is_current_epoch(epoch) {
        debug!(epoch, "Dropping catalog for a replaced credential");
        return;
    }

    app.catalog_loading = false;
    match result {
        Ok(entries) => {
            let catalog = Catalog::from_entries(entries);
            debug!(
                tasks = catalog.len(),
                models = catalog.model_count(),
                "Model catalog loaded"
            );
            app.selection.on_catalog_replaced(&catalog);
            app.live_catalog = Some(catalog);
        }
        Err(err) => {
            // Signed in but unusable; gate sends the same way as a failed
            // verification so the session never streams against a catalog
            // it could not load.
            warn!(error = %err, "Model catalog fetch failed");
            app.session.verify = VerifyState::Failed(CATALOG_UNAVAILABLE_NOTICE.to_string());
        }
    }
}

fn append_stream_chunk(app: &mut App, content: &str, stream_id: u64) {
    if content.is_empty() {
        return;
    }
    if !app.is_current_stream(stream_id) {
        debug!(stream_id, "Dropping chunk from a superseded stream");
        return;
    }
    app.conversation().append_to_response(content);
}

fn stream_errored(app: &mut App, message: &str, stream_id: u64) {
    if !app.is_current_stream(stream_id) {
        debug!(stream_id, "Dropping error from a superseded stream");
        return;
    }
    warn!(error = %message, "Chat stream failed");
    app.conversation().fail_response();
}
