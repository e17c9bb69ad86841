//! Shared LLM client library: provider configs (Ollama/OpenAI), thin HTTP
//! clients, a fast/slow/embedding profile router, health checks, and a
//! library-scoped tracing layer.
//!
//! Entry point for most callers is [`service_profiles::LlmServiceProfiles`].

pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod service_profiles;
pub mod services;
pub mod telemetry;
