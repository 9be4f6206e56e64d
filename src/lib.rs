//! Hugtry is the headless session core of the HUG-N-TRY chat client for the
//! Hugging Face inference platform.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns runtime state: the credential lifecycle, the model catalog
//!   and its embedded fallback, task/model selection, the transcript, and
//!   streaming orchestration.
//! - [`api`] defines the identity, model-listing, and chat-completion payloads
//!   together with the HTTP calls that produce them.
//! - [`utils`] carries URL construction and tracing setup shared across layers.
//!
//! Nothing here renders. A front end (terminal, GUI, web view) feeds
//! [`core::app::AppAction`] values into [`core::app::apply_action`], runs the
//! returned [`core::app::AppCommand`] values through the executors in
//! [`core::app::executors`], and reads the transcript, catalog, selection,
//! verification state, and stream phase back out of [`core::app::App`].

pub mod api;
pub mod core;
pub mod utils;
