//! Model listing retrieval from the hub.

use std::error::Error as StdError;
use std::fmt;

use crate::api::ModelEntry;
use crate::core::constants::{MODELS_INFERENCE_FILTER, MODELS_PAGE_LIMIT};
use crate::utils::url::construct_api_url;

/// Why the model listing could not be retrieved. Surfaced to the session
/// as an overall non-verified state so send gating stays consistent.
#[derive(Debug)]
pub enum CatalogError {
    /// The listing endpoint answered with a non-2xx status.
    Http {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The request could not be completed.
    Network(reqwest::Error),

    /// The 2xx response body was not a parseable listing.
    Parse(serde_json::Error),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Http { status, body } => {
                write!(f, "model listing failed with status {status}: {body}")
            }
            CatalogError::Network(source) => write!(f, "model listing failed: {source}"),
            CatalogError::Parse(source) => {
                write!(f, "model listing could not be parsed: {source}")
            }
        }
    }
}

impl StdError for CatalogError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            CatalogError::Network(source) => Some(source),
            CatalogError::Parse(source) => Some(source),
            CatalogError::Http { .. } => None,
        }
    }
}

/// Fetch the raw model listing for a verified token.
///
/// One bounded GET against `api/models` under the hub base URL, restricted
/// to warm-deployed models. The caller groups the entries with
/// [`crate::core::catalog::Catalog::from_entries`].
pub async fn fetch_models(
    client: &reqwest::Client,
    hub_base_url: &str,
    token: &str,
) -> Result<Vec<ModelEntry>, CatalogError> {
    let models_url = format!(
        "{}?inference={}&limit={}",
        construct_api_url(hub_base_url, "api/models"),
        MODELS_INFERENCE_FILTER,
        MODELS_PAGE_LIMIT
    );

    let response = client
        .get(models_url)
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .map_err(CatalogError::Network)?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return Err(CatalogError::Http { status, body });
    }

    let body = response.text().await.map_err(CatalogError::Network)?;
    serde_json::from_str::<Vec<ModelEntry>>(&body).map_err(CatalogError::Parse)
}
