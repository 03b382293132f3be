//! Tome: an agentic retrieval engine over a user's document corpus.
//!
//! The crate wires a tool-calling agent loop ([`agent::AgentLoop`]) to a
//! hybrid retrieval pipeline ([`retrieval::RetrievalPipeline`]), an NL-to-SQL
//! answerer, and a full-document analysis sub-agent. Storage, embedding, and
//! SQL execution are injected through the traits in [`store`]; model access
//! goes through [`providers::base::CompletionProvider`].

pub mod agent;
pub mod config;
pub mod errors;
pub mod models;
pub mod providers;
pub mod retrieval;
pub mod store;
pub mod subagent;
pub mod tools;
