use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::api::Identity;
use crate::core::config::Config;

/// Verification lifecycle of the session credential.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VerifyState {
    /// No credential, or the credential changed since the last check.
    #[default]
    Unverified,
    /// A verification call is in flight for the current epoch.
    Verifying,
    /// The identity check succeeded; the follow-up model listing may
    /// still be loading (see `App::catalog_loading`).
    Verified(Identity),
    /// Verification or the follow-up listing failed; the reason is shown
    /// to the user.
    Failed(String),
}

/// Connection-facing session state: the credential, its epoch, and the
/// plumbing a stream task needs. All mutation happens on the action path.
pub struct SessionContext {
    pub client: Client,
    pub hub_base_url: String,
    pub router_base_url: String,
    pub stream_idle_timeout: Duration,

    /// The secret as last submitted. Held in memory only.
    pub token: String,
    /// Bumped on every accepted credential change; async results carry
    /// the epoch they started under and are dropped when it moved on.
    pub credential_epoch: u64,
    pub verify: VerifyState,

    pub stream_cancel_token: Option<CancellationToken>,
    pub current_stream_id: u64,
    /// Transcript id of the assistant placeholder the live stream feeds.
    pub pending_response_id: Option<u64>,

    next_message_id: u64,
}

impl SessionContext {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            hub_base_url: config.hub_base_url.clone(),
            router_base_url: config.router_base_url.clone(),
            stream_idle_timeout: config.stream_idle_timeout(),
            token: String::new(),
            credential_epoch: 0,
            verify: VerifyState::Unverified,
            stream_cancel_token: None,
            current_stream_id: 0,
            pending_response_id: None,
            next_message_id: 1,
        }
    }

    pub fn allocate_message_id(&mut self) -> u64 {
        let id = self.next_message_id;
        self.next_message_id += 1;
        id
    }

    pub fn is_verified(&self) -> bool {
        matches!(self.verify, VerifyState::Verified(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match &self.verify {
            VerifyState::Verified(identity) => Some(identity),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_ids_are_monotonic_and_unique() {
        let mut session = SessionContext::new(&Config::default());
        let first = session.allocate_message_id();
        let second = session.allocate_message_id();
        let third = session.allocate_message_id();
        assert!(first < second && second < third);
    }

    #[test]
    fn fresh_sessions_start_unverified() {
        let session = SessionContext::new(&Config::default());
        assert_eq!(session.verify, VerifyState::Unverified);
        assert!(!session.is_verified());
        assert!(session.identity().is_none());
        assert_eq!(session.credential_epoch, 0);
        assert!(session.stream_cancel_token.is_none());
    }

    #[test]
    fn verified_state_exposes_the_identity() {
        let mut session = SessionContext::new(&Config::default());
        session.verify = VerifyState::Verified(Identity {
            name: "ada".to_string(),
            fullname: None,
        });
        assert!(session.is_verified());
        assert_eq!(session.identity().map(|i| i.name.as_str()), Some("ada"));
    }
}
