//! URL utilities for consistent endpoint construction
//!
//! The hub and router base URLs are operator-configurable, so they arrive
//! with or without trailing slashes. These helpers normalize them before
//! endpoints are appended.

/// Normalize a base URL by removing trailing slashes
///
/// # Examples
///
/// ```
/// use hugtry::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("https://huggingface.co"), "https://huggingface.co");
/// assert_eq!(normalize_base_url("https://huggingface.co/"), "https://huggingface.co");
/// assert_eq!(normalize_base_url("https://huggingface.co///"), "https://huggingface.co");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Construct a complete endpoint URL from a base URL and endpoint path
///
/// Normalizes the base URL and safely appends the endpoint, ensuring there
/// are no double slashes in the result.
///
/// # Examples
///
/// ```
/// use hugtry::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://huggingface.co", "api/whoami-v2"),
///     "https://huggingface.co/api/whoami-v2"
/// );
/// assert_eq!(
///     construct_api_url("https://router.huggingface.co/", "/v1/chat/completions"),
///     "https://router.huggingface.co/v1/chat/completions"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}
