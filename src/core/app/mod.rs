use tokio_util::sync::CancellationToken;

use crate::api::ChatMessage;
use crate::core::builtin_models::builtin_catalog;
use crate::core::catalog::Catalog;
use crate::core::chat_stream::StreamParams;
use crate::core::config::Config;
use crate::core::constants::GREETING;
use crate::core::message::{Message, TranscriptRole};
use crate::core::selection::Selection;

pub mod actions;
pub mod conversation;
pub mod executors;
pub mod session;

pub use actions::{apply_action, apply_actions, AppAction, AppActionDispatcher, AppCommand};
pub use conversation::ConversationController;
pub use executors::{drain_stream_messages, execute_command, execute_commands};
pub use session::{SessionContext, VerifyState};

/// Where the session stands in one send/stream round trip. `Errored` is
/// passed through between the failure substitution and the stream's end
/// signal; the end signal always lands the session back on `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamPhase {
    #[default]
    Idle,
    Sending,
    Streaming { message_id: u64 },
    Errored,
}

/// The whole chat session: credential state, transcript, catalogs and the
/// task/model selection. Embedders mutate it exclusively through
/// `apply_action` and read whatever they need for rendering.
pub struct App {
    pub session: SessionContext,
    pub transcript: Vec<Message>,
    pub fallback_catalog: Catalog,
    pub live_catalog: Option<Catalog>,
    pub catalog_loading: bool,
    pub selection: Selection,
    pub stream_phase: StreamPhase,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let fallback_catalog = builtin_catalog();
        let selection = Selection::new(&fallback_catalog);
        let mut session = SessionContext::new(config);

        let greeting_id = session.allocate_message_id();
        let transcript = vec![Message::new(
            greeting_id,
            TranscriptRole::Assistant,
            GREETING,
        )];

        Self {
            session,
            transcript,
            fallback_catalog,
            live_catalog: None,
            catalog_loading: false,
            selection,
            stream_phase: StreamPhase::Idle,
        }
    }

    /// The catalog selections are validated against: the fetched one when
    /// present, the builtin fallback otherwise.
    pub fn effective_catalog(&self) -> &Catalog {
        self.live_catalog.as_ref().unwrap_or(&self.fallback_catalog)
    }

    pub fn is_fallback_catalog(&self) -> bool {
        self.live_catalog.is_none()
    }

    pub fn is_current_stream(&self, stream_id: u64) -> bool {
        self.session.current_stream_id == stream_id
    }

    pub fn is_current_epoch(&self, epoch: u64) -> bool {
        self.session.credential_epoch == epoch
    }

    pub fn is_stream_active(&self) -> bool {
        matches!(
            self.stream_phase,
            StreamPhase::Sending | StreamPhase::Streaming { .. }
        )
    }

    /// Whether a send would currently be accepted. Embedders can mirror
    /// this on their input surface.
    pub fn can_send(&self) -> bool {
        self.session.is_verified()
            && self.live_catalog.is_some()
            && !self.is_stream_active()
            && self.selection.model_id().is_some()
    }

    pub fn conversation(&mut self) -> ConversationController<'_> {
        ConversationController::new(
            &mut self.session,
            &mut self.transcript,
            &mut self.stream_phase,
        )
    }

    pub fn build_stream_params(
        &self,
        model: String,
        api_messages: Vec<ChatMessage>,
        cancel_token: CancellationToken,
        stream_id: u64,
    ) -> StreamParams {
        StreamParams {
            client: self.session.client.clone(),
            router_base_url: self.session.router_base_url.clone(),
            token: self.session.token.clone(),
            model,
            api_messages,
            idle_timeout: self.session.stream_idle_timeout,
            cancel_token,
            stream_id,
        }
    }
}
