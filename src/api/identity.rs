//! Credential verification against the hub's identity endpoint.

use std::error::Error as StdError;
use std::fmt;

use crate::api::Identity;
use crate::utils::url::construct_api_url;

/// Why a credential could not be verified. Never fatal: the session stays
/// unverified and the fallback catalog remains in effect.
#[derive(Debug)]
pub enum VerifyError {
    /// The token was empty after trimming; no request was made.
    EmptyToken,

    /// The identity endpoint answered with a non-2xx status.
    Http {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The request could not be completed.
    Network(reqwest::Error),

    /// The 2xx response body was not a parseable identity.
    Parse(serde_json::Error),
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyError::EmptyToken => write!(f, "access token is empty"),
            VerifyError::Http { status, body } => {
                write!(f, "identity request failed with status {status}: {body}")
            }
            VerifyError::Network(source) => write!(f, "identity request failed: {source}"),
            VerifyError::Parse(source) => {
                write!(f, "identity response could not be parsed: {source}")
            }
        }
    }
}

impl StdError for VerifyError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            VerifyError::Network(source) => Some(source),
            VerifyError::Parse(source) => Some(source),
            VerifyError::EmptyToken | VerifyError::Http { .. } => None,
        }
    }
}

/// Exchange an access token for the account identity behind it.
///
/// Single-shot: one GET to `api/whoami-v2` under the hub base URL with the
/// token as a bearer header. No retries; callers re-invoke by re-submitting
/// the credential. A trim-empty token is rejected locally without touching
/// the network.
pub async fn verify_token(
    client: &reqwest::Client,
    hub_base_url: &str,
    token: &str,
) -> Result<Identity, VerifyError> {
    if token.trim().is_empty() {
        return Err(VerifyError::EmptyToken);
    }

    let whoami_url = construct_api_url(hub_base_url, "api/whoami-v2");
    let response = client
        .get(whoami_url)
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .map_err(VerifyError::Network)?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return Err(VerifyError::Http { status, body });
    }

    let body = response.text().await.map_err(VerifyError::Network)?;
    serde_json::from_str::<Identity>(&body).map_err(VerifyError::Parse)
}
