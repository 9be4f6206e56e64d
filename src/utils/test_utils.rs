use crate::api::{Identity, ModelEntry};
use crate::core::app::{apply_action, App, AppAction, AppCommand};
use crate::core::config::Config;

pub fn create_test_app() -> App {
    App::new(&Config::default())
}

pub fn test_identity() -> Identity {
    Identity {
        name: "ada".to_string(),
        fullname: Some("Ada Lovelace".to_string()),
    }
}

pub fn test_entries() -> Vec<ModelEntry> {
    vec![
        ModelEntry {
            id: "acme/chat-small".to_string(),
            model_id: None,
            pipeline_tag: Some("text-generation".to_string()),
        },
        ModelEntry {
            id: "acme/chat-large".to_string(),
            model_id: Some("Acme Chat Large".to_string()),
            pipeline_tag: Some("text-generation".to_string()),
        },
        ModelEntry {
            id: "acme/painter".to_string(),
            model_id: None,
            pipeline_tag: Some("text-to-image".to_string()),
        },
    ]
}

/// An app driven through the whole happy path: credential submitted,
/// verified, catalog loaded. Ready to send.
pub fn create_verified_app() -> App {
    let mut app = create_test_app();

    let cmd = apply_action(
        &mut app,
        AppAction::SubmitCredential {
            secret: "hf_test_token".to_string(),
        },
    );
    assert!(matches!(cmd, Some(AppCommand::Verify { .. })));
    let epoch = app.session.credential_epoch;

    let cmd = apply_action(
        &mut app,
        AppAction::VerifyCompleted {
            result: Ok(test_identity()),
            epoch,
        },
    );
    assert!(matches!(cmd, Some(AppCommand::FetchCatalog { .. })));

    apply_action(
        &mut app,
        AppAction::CatalogLoaded {
            result: Ok(test_entries()),
            epoch,
        },
    );
    assert!(app.can_send());

    app
}
