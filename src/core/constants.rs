//! Shared constants used across the session core

/// The single pipeline tag whose models can be driven through the chat
/// completions endpoint. Submissions under any other tag are answered
/// locally with [`UNSUPPORTED_TASK_NOTICE`].
pub const CHAT_TASK_TAG: &str = "text-generation";

/// Assistant greeting seeded into every new transcript.
pub const GREETING: &str =
    "Hello! Welcome to HUG-N-TRY AI Assistant. How can I assist you today?";

/// Assistant message substituted for a turn whose stream failed. The
/// partial response is discarded; the error detail goes to the log.
pub const STREAM_APOLOGY: &str =
    "Sorry, something went wrong while generating a response. Please try sending your message again.";

/// Assistant message appended when the selected task is not chat-capable.
pub const UNSUPPORTED_TASK_NOTICE: &str =
    "Chat is only wired up for text-generation models so far. Pick a model under the text-generation task to continue.";

/// Verification status shown when the identity check passed but the model
/// listing could not be retrieved.
pub const CATALOG_UNAVAILABLE_NOTICE: &str = "signed in, but the model list could not be loaded";

/// Value of the `inference` query parameter on the model listing call;
/// restricts the listing to models with a warm inference deployment.
pub const MODELS_INFERENCE_FILTER: &str = "warm";

/// Upper bound on the number of entries requested from the model listing.
pub const MODELS_PAGE_LIMIT: u32 = 2000;
