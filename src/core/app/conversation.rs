use tokio_util::sync::CancellationToken;

use super::session::SessionContext;
use super::StreamPhase;
use crate::api::ChatMessage;
use crate::core::constants::STREAM_APOLOGY;
use crate::core::message::{Message, TranscriptRole};

/// Mutating view over one turn of the conversation: the transcript, the
/// stream bookkeeping on the session, and the phase machine. All edits to
/// the transcript go through here so the placeholder accounting and the
/// phase stay in step.
pub struct ConversationController<'a> {
    session: &'a mut SessionContext,
    transcript: &'a mut Vec<Message>,
    phase: &'a mut StreamPhase,
}

impl<'a> ConversationController<'a> {
    pub fn new(
        session: &'a mut SessionContext,
        transcript: &'a mut Vec<Message>,
        phase: &'a mut StreamPhase,
    ) -> Self {
        Self {
            session,
            transcript,
            phase,
        }
    }

    pub fn append_user_message(&mut self, content: impl Into<String>) -> u64 {
        let id = self.session.allocate_message_id();
        self.transcript
            .push(Message::new(id, TranscriptRole::User, content));
        id
    }

    pub fn append_assistant_message(&mut self, content: impl Into<String>) -> u64 {
        let id = self.session.allocate_message_id();
        self.transcript
            .push(Message::new(id, TranscriptRole::Assistant, content));
        id
    }

    /// Append the user message plus an empty assistant placeholder and
    /// build the API payload: every message before the placeholder, in
    /// transcript order, roles mapped to their wire strings.
    pub fn add_user_message(&mut self, content: String) -> Vec<ChatMessage> {
        self.append_user_message(content);

        let placeholder_id = self.append_assistant_message(String::new());
        self.session.pending_response_id = Some(placeholder_id);

        self.transcript
            .iter()
            .take(self.transcript.len() - 1)
            .map(|msg| ChatMessage {
                role: msg.role.to_api_role().to_string(),
                content: msg.content.clone(),
            })
            .collect()
    }

    /// Fold one streamed delta onto the placeholder, arrival order.
    pub fn append_to_response(&mut self, content: &str) {
        let Some(pending_id) = self.session.pending_response_id else {
            return;
        };
        if let Some(msg) = self
            .transcript
            .iter_mut()
            .rev()
            .find(|msg| msg.id == pending_id)
        {
            msg.content.push_str(content);
        }
    }

    /// First response byte arrived for the live stream.
    pub fn mark_streaming(&mut self) {
        if let Some(message_id) = self.session.pending_response_id {
            *self.phase = StreamPhase::Streaming { message_id };
        }
    }

    /// The turn is over, whichever way it went. The placeholder (if any)
    /// becomes an ordinary immutable message and the session is ready for
    /// the next submission.
    pub fn finalize_response(&mut self) {
        self.session.pending_response_id = None;
        self.session.stream_cancel_token = None;
        *self.phase = StreamPhase::Idle;
    }

    /// Drop the failed turn's placeholder with its partial content and
    /// substitute the fixed apology.
    pub fn fail_response(&mut self) {
        self.discard_pending_response();
        self.append_assistant_message(STREAM_APOLOGY);
        *self.phase = StreamPhase::Errored;
    }

    /// Remove the in-progress assistant turn, partial content included.
    pub fn discard_pending_response(&mut self) {
        if let Some(pending_id) = self.session.pending_response_id.take() {
            self.transcript.retain(|msg| msg.id != pending_id);
        }
    }

    /// Cancel whatever stream is in flight and clean its turn out of the
    /// transcript. No apology: invalidation is user-initiated. The id bump
    /// makes anything still queued from the old stream fail the staleness
    /// check.
    pub fn cancel_current_stream(&mut self) {
        if let Some(token) = self.session.stream_cancel_token.take() {
            token.cancel();
            self.session.current_stream_id += 1;
        }
        self.discard_pending_response();
        *self.phase = StreamPhase::Idle;
    }

    pub fn start_new_stream(&mut self) -> (CancellationToken, u64) {
        self.cancel_current_stream();

        self.session.current_stream_id += 1;

        let token = CancellationToken::new();
        self.session.stream_cancel_token = Some(token.clone());
        *self.phase = StreamPhase::Sending;

        (token, self.session.current_stream_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::constants::GREETING;

    fn fixture() -> (SessionContext, Vec<Message>, StreamPhase) {
        let mut session = SessionContext::new(&Config::default());
        let greeting_id = session.allocate_message_id();
        let transcript = vec![Message::new(greeting_id, TranscriptRole::Assistant, GREETING)];
        (session, transcript, StreamPhase::Idle)
    }

    #[test]
    fn add_user_message_builds_payload_excluding_placeholder() {
        let (mut session, mut transcript, mut phase) = fixture();
        let mut conversation =
            ConversationController::new(&mut session, &mut transcript, &mut phase);

        let api_messages = conversation.add_user_message("What is Rust?".to_string());

        // Greeting plus the new user text; the placeholder stays local.
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "assistant");
        assert_eq!(api_messages[0].content, GREETING);
        assert_eq!(api_messages[1].role, "user");
        assert_eq!(api_messages[1].content, "What is Rust?");

        assert_eq!(transcript.len(), 3);
        let placeholder = transcript.last().unwrap();
        assert!(placeholder.is_assistant());
        assert!(placeholder.content.is_empty());
        assert_eq!(session.pending_response_id, Some(placeholder.id));
    }

    #[test]
    fn deltas_fold_onto_the_placeholder_in_order() {
        let (mut session, mut transcript, mut phase) = fixture();
        let mut conversation =
            ConversationController::new(&mut session, &mut transcript, &mut phase);
        conversation.add_user_message("hi".to_string());

        for delta in ["Hel", "lo", " world"] {
            conversation.append_to_response(delta);
        }
        conversation.finalize_response();

        assert_eq!(transcript.last().unwrap().content, "Hello world");
        assert_eq!(session.pending_response_id, None);
        assert_eq!(phase, StreamPhase::Idle);
    }

    #[test]
    fn fail_response_swaps_partial_content_for_the_apology() {
        let (mut session, mut transcript, mut phase) = fixture();
        let mut conversation =
            ConversationController::new(&mut session, &mut transcript, &mut phase);
        conversation.add_user_message("hi".to_string());
        conversation.append_to_response("partial");

        conversation.fail_response();

        assert!(transcript.iter().all(|msg| !msg.content.contains("partial")));
        let apologies = transcript
            .iter()
            .filter(|msg| msg.content == STREAM_APOLOGY)
            .count();
        assert_eq!(apologies, 1);
        assert_eq!(phase, StreamPhase::Errored);
        assert_eq!(session.pending_response_id, None);
    }

    #[test]
    fn cancel_removes_the_turn_without_an_apology() {
        let (mut session, mut transcript, mut phase) = fixture();
        let mut conversation =
            ConversationController::new(&mut session, &mut transcript, &mut phase);
        conversation.add_user_message("hi".to_string());
        conversation.append_to_response("partial");
        let before_cancel = transcript.len();

        let mut conversation =
            ConversationController::new(&mut session, &mut transcript, &mut phase);
        conversation.cancel_current_stream();

        assert_eq!(transcript.len(), before_cancel - 1);
        assert!(transcript.iter().all(|msg| msg.content != STREAM_APOLOGY));
        assert!(transcript.iter().all(|msg| !msg.content.contains("partial")));
        assert_eq!(phase, StreamPhase::Idle);
        assert!(session.stream_cancel_token.is_none());
    }

    #[test]
    fn start_new_stream_bumps_id_and_cancels_the_predecessor() {
        let (mut session, mut transcript, mut phase) = fixture();
        let mut conversation =
            ConversationController::new(&mut session, &mut transcript, &mut phase);

        let (first_token, first_id) = conversation.start_new_stream();
        assert_eq!(phase, StreamPhase::Sending);

        let mut conversation =
            ConversationController::new(&mut session, &mut transcript, &mut phase);
        let (_second_token, second_id) = conversation.start_new_stream();

        assert!(second_id > first_id);
        assert!(first_token.is_cancelled());
    }
}
