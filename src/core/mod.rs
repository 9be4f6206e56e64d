pub mod app;
pub mod builtin_models;
pub mod catalog;
pub mod chat_stream;
pub mod config;
pub mod constants;
pub mod message;
pub mod selection;
