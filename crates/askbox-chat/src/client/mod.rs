//! HTTP client for the question-answering service.
//!
//! Implements the `AnswerClient` trait by POSTing an `AskRequest` as JSON
//! to the configured endpoint and decoding an `AskResponse`.

mod api;
mod config;
mod http;

pub use config::AnswerClientConfig;
pub use http::HttpAnswerClient;

pub(crate) use http::{status_error, transport_error};
