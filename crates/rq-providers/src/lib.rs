//! rq-providers: LLM provider implementations for research-query
//!
//! This crate provides implementations of the Provider trait for chat
//! completion APIs.

pub mod openai;

pub use openai::{OpenAIProvider, DEFAULT_BASE_URL};
