// LLM abstraction layer

pub mod client;
pub mod openai;
pub mod provider;
#[cfg(test)]
pub(crate) mod scripted;

pub use client::{ChatClient, ChatOptions};
pub use provider::*;
