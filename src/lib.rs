//! ragdesk
//!
//! Client library for a local RAG ingestion/answering service. It uploads
//! documents, tracks long-running indexing jobs until they settle, and queries
//! the indexed corpus.

pub mod app_state;
pub mod config;
pub mod models;
pub mod services;
