#![deny(missing_docs)]

//! Core library for the PDF question-answering assistant.

/// Grounded question answering and output cleanup.
pub mod answer;
/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Local PDF discovery.
pub mod documents;
/// Remote index creation and document upload.
pub mod indexing;
/// Structured logging and tracing setup.
pub mod logging;
/// Hosted retrieval service client.
pub mod openai;
/// User actions and the chat transcript.
pub mod session;
/// Persisted application state.
pub mod state;
