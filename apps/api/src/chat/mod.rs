//! Chat flow: retrieval context in, generated answer out.
//!
//! Retrieval never fails the request and neither does generation: any LLM error
//! falls back to an answer assembled from the resume's own section text.

pub mod fallback;
pub mod handlers;
pub mod history;

use tracing::warn;

use crate::llm_client::prompts::{explain_message, system_prompt, user_message, EXPLAIN_SYSTEM};
use crate::llm_client::{LlmClient, MAX_RESPONSE_TOKENS};
use crate::retrieval::engine::RetrievalEngine;

const EXPLAIN_MAX_TOKENS: u32 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatMode {
    #[default]
    Strict,
    Open,
}

impl ChatMode {
    /// Anything other than `"open"` is strict.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|m| m.trim().to_ascii_lowercase()) {
            Some(m) if m == "open" => ChatMode::Open,
            _ => ChatMode::Strict,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Strict => "strict",
            ChatMode::Open => "open",
        }
    }
}

/// Answers `message` given already-assembled retrieval `context`.
pub async fn generate_answer(
    llm: &LlmClient,
    engine: &RetrievalEngine,
    message: &str,
    mode: ChatMode,
    context: &str,
    selected_text: &str,
) -> String {
    let system = system_prompt(mode == ChatMode::Strict);
    let user = user_message(message, selected_text, context);

    match llm.complete(&system, &user, MAX_RESPONSE_TOKENS).await {
        Ok(answer) => answer,
        Err(e) => {
            warn!("Chat generation failed, using fallback answer: {e}");
            fallback::fallback_answer(engine, message)
        }
    }
}

pub async fn explain_text(llm: &LlmClient, passage: &str, section: &str) -> String {
    let user = explain_message(passage, section);
    match llm.complete(EXPLAIN_SYSTEM, &user, EXPLAIN_MAX_TOKENS).await {
        Ok(explanation) => explanation,
        Err(e) => {
            warn!("Explain-text generation failed, using fallback: {e}");
            fallback::explain_fallback(passage, section)
        }
    }
}
