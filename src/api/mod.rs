//! Wire-level payload types shared by the API calls and the stream service.
//!
//! Unknown fields in provider responses are ignored everywhere; only the
//! fields the session consumes are modeled.

use serde::{Deserialize, Serialize};

/// One message of the chat completions request body.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Request body for `POST /v1/chat/completions`.
#[derive(Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

#[derive(Deserialize)]
pub struct ChatResponseDelta {
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatResponseChoice {
    pub delta: ChatResponseDelta,
}

/// One SSE chunk of a streaming completion.
#[derive(Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatResponseChoice>,
}

/// One entry of the hub's model listing. `model_id` is the human-facing
/// repo name when the hub provides one; `pipeline_tag` drives grouping and
/// entries without it are dropped.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ModelEntry {
    pub id: String,
    #[serde(rename = "modelId")]
    pub model_id: Option<String>,
    pub pipeline_tag: Option<String>,
}

/// Identity returned by the hub's whoami endpoint.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub fullname: Option<String>,
}

pub mod identity;
pub mod models;
