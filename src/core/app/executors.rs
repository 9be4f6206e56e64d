//! Runs the side effects `apply_action` requests. Network work happens on
//! spawned tasks that report back through the action dispatcher, so the
//! session state itself is only ever touched between awaits.

use tokio::sync::mpsc;

use super::actions::{AppAction, AppActionDispatcher, AppCommand};
use super::App;
use crate::api::identity::verify_token;
use crate::api::models::fetch_models;
use crate::core::chat_stream::{ChatStreamService, StreamMessage};

pub fn spawn_verify(
    dispatcher: AppActionDispatcher,
    client: reqwest::Client,
    hub_base_url: String,
    token: String,
    epoch: u64,
) {
    tokio::spawn(async move {
        let result = verify_token(&client, &hub_base_url, &token).await;
        dispatcher.dispatch(AppAction::VerifyCompleted { result, epoch });
    });
}

pub fn spawn_catalog_fetch(
    dispatcher: AppActionDispatcher,
    client: reqwest::Client,
    hub_base_url: String,
    token: String,
    epoch: u64,
) {
    tokio::spawn(async move {
        let result = fetch_models(&client, &hub_base_url, &token).await;
        dispatcher.dispatch(AppAction::CatalogLoaded { result, epoch });
    });
}

pub fn execute_command(
    command: AppCommand,
    app: &App,
    dispatcher: &AppActionDispatcher,
    stream_service: &ChatStreamService,
) {
    match command {
        AppCommand::Verify { token, epoch } => spawn_verify(
            dispatcher.clone(),
            app.session.client.clone(),
            app.session.hub_base_url.clone(),
            token,
            epoch,
        ),
        AppCommand::FetchCatalog { token, epoch } => spawn_catalog_fetch(
            dispatcher.clone(),
            app.session.client.clone(),
            app.session.hub_base_url.clone(),
            token,
            epoch,
        ),
        AppCommand::SpawnStream(params) => stream_service.spawn_stream(params),
    }
}

pub fn execute_commands(
    commands: Vec<AppCommand>,
    app: &App,
    dispatcher: &AppActionDispatcher,
    stream_service: &ChatStreamService,
) {
    for command in commands {
        execute_command(command, app, dispatcher, stream_service);
    }
}

/// Drain everything the stream tasks have queued and translate it into
/// actions, merging consecutive chunks of the same stream into one append
/// so a fast stream does not cost one action per token. Ordering across
/// message kinds is preserved; staleness is judged later by
/// `apply_action`, not here.
pub fn drain_stream_messages(
    rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>,
) -> Vec<AppAction> {
    let mut actions = Vec::new();
    let mut chunk = String::new();
    let mut chunk_stream_id = None;

    while let Ok((message, stream_id)) = rx.try_recv() {
        match message {
            StreamMessage::Chunk(content) => {
                if chunk_stream_id.is_some_and(|id| id != stream_id) {
                    flush_chunk(&mut actions, &mut chunk, &mut chunk_stream_id);
                }
                chunk.push_str(&content);
                chunk_stream_id = Some(stream_id);
            }
            StreamMessage::Started => {
                flush_chunk(&mut actions, &mut chunk, &mut chunk_stream_id);
                actions.push(AppAction::StreamStarted { stream_id });
            }
            StreamMessage::Error(message) => {
                flush_chunk(&mut actions, &mut chunk, &mut chunk_stream_id);
                actions.push(AppAction::StreamErrored { message, stream_id });
            }
            StreamMessage::End => {
                flush_chunk(&mut actions, &mut chunk, &mut chunk_stream_id);
                actions.push(AppAction::StreamCompleted { stream_id });
            }
        }
    }
    flush_chunk(&mut actions, &mut chunk, &mut chunk_stream_id);

    actions
}

fn flush_chunk(
    actions: &mut Vec<AppAction>,
    chunk: &mut String,
    chunk_stream_id: &mut Option<u64>,
) {
    if let Some(stream_id) = chunk_stream_id.take() {
        if !chunk.is_empty() {
            actions.push(AppAction::AppendStreamChunk {
                content: std::mem::take(chunk),
                stream_id,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::identity::VerifyError;

    #[test]
    fn empty_token_verification_reports_back_without_network() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (tx, mut rx) = mpsc::unbounded_channel();
            spawn_verify(
                AppActionDispatcher::new(tx),
                reqwest::Client::new(),
                "http://127.0.0.1:9".to_string(),
                "   ".to_string(),
                3,
            );

            match rx.recv().await.expect("expected a completion action") {
                AppAction::VerifyCompleted { result, epoch } => {
                    assert_eq!(epoch, 3);
                    assert!(matches!(result, Err(VerifyError::EmptyToken)));
                }
                _ => panic!("expected a verification completion"),
            }
        });
    }

    #[test]
    fn failed_catalog_fetch_reports_back_through_the_dispatcher() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (tx, mut rx) = mpsc::unbounded_channel();
            spawn_catalog_fetch(
                AppActionDispatcher::new(tx),
                reqwest::Client::new(),
                "http://127.0.0.1:9".to_string(),
                "hf_token".to_string(),
                7,
            );

            match rx.recv().await.expect("expected a completion action") {
                AppAction::CatalogLoaded { result, epoch } => {
                    assert_eq!(epoch, 7);
                    assert!(result.is_err());
                }
                _ => panic!("expected a catalog completion"),
            }
        });
    }

    #[test]
    fn drain_merges_consecutive_chunks_per_stream() {
        let (service, mut rx) = ChatStreamService::new();
        service.send_for_test(StreamMessage::Started, 1);
        service.send_for_test(StreamMessage::Chunk("Hel".to_string()), 1);
        service.send_for_test(StreamMessage::Chunk("lo".to_string()), 1);
        service.send_for_test(StreamMessage::Error("boom".to_string()), 1);
        service.send_for_test(StreamMessage::Chunk("late".to_string()), 2);
        service.send_for_test(StreamMessage::End, 2);

        let actions = drain_stream_messages(&mut rx);

        assert_eq!(actions.len(), 5);
        assert!(matches!(
            &actions[0],
            AppAction::StreamStarted { stream_id: 1 }
        ));
        assert!(matches!(
            &actions[1],
            AppAction::AppendStreamChunk { content, stream_id: 1 } if content == "Hello"
        ));
        assert!(matches!(
            &actions[2],
            AppAction::StreamErrored { stream_id: 1, .. }
        ));
        assert!(matches!(
            &actions[3],
            AppAction::AppendStreamChunk { content, stream_id: 2 } if content == "late"
        ));
        assert!(matches!(
            &actions[4],
            AppAction::StreamCompleted { stream_id: 2 }
        ));
    }

    #[test]
    fn drain_on_an_empty_channel_produces_nothing() {
        let (_service, mut rx) = ChatStreamService::new();
        assert!(drain_stream_messages(&mut rx).is_empty());
    }
}
