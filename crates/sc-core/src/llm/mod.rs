//! Model provider client and wire types
//!
//! Supports OpenAI-compatible chat-completion APIs and the Claude
//! Messages API.

mod client;
mod types;

pub use client::{ChatModel, ModelClient};
pub use types::*;
