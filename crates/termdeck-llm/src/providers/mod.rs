//! Concrete provider implementations

pub mod ollama;
pub mod openai_compat;
