//! Keyword-routed answers used when the generation API is unavailable.

use crate::retrieval::engine::RetrievalEngine;
use crate::retrieval::prompts::section_not_found;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Experience,
    Skills,
    Education,
    Projects,
    General,
}

impl Topic {
    /// Section name understood by `RetrievalEngine::get_section_context`.
    fn section(&self) -> Option<&'static str> {
        match self {
            Topic::Experience => Some("experience"),
            Topic::Skills => Some("skills"),
            Topic::Education => Some("education"),
            Topic::Projects => Some("projects"),
            Topic::General => None,
        }
    }
}

const TOPIC_WORDS: &[(Topic, &[&str])] = &[
    (Topic::Experience, &["experience", "work", "job", "career"]),
    (Topic::Skills, &["skills", "technologies", "tools", "technical"]),
    (Topic::Education, &["education", "degree", "university"]),
    (Topic::Projects, &["project"]),
];

const GENERAL_ANSWER: &str = "I'm the assistant for this resume. Ask me about the candidate's \
    experience, skills, education or projects and I'll share what the resume says.";

/// First topic whose keywords appear in the lowercased message.
pub fn route_topic(message: &str) -> Topic {
    let lower = message.to_lowercase();
    TOPIC_WORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(topic, _)| *topic)
        .unwrap_or(Topic::General)
}

/// Quotes the matching resume section when the engine has it, else a generic prompt.
pub fn fallback_answer(engine: &RetrievalEngine, message: &str) -> String {
    let Some(section) = route_topic(message).section() else {
        return GENERAL_ANSWER.to_string();
    };
    if !engine.is_ready() {
        return GENERAL_ANSWER.to_string();
    }
    let context = engine.get_section_context(section);
    if context == section_not_found(section) {
        return GENERAL_ANSWER.to_string();
    }
    format!("Here is what the resume says about {section}: {context}")
}

pub fn follow_up_suggestions(message: &str) -> Vec<String> {
    let suggestions: [&str; 3] = match route_topic(message) {
        Topic::Experience => [
            "What was the most recent role?",
            "What was the biggest achievement at work?",
            "Which responsibilities stood out?",
        ],
        Topic::Skills => [
            "Which frameworks are used most?",
            "Tell me about the cloud experience",
            "What tools are used day to day?",
        ],
        Topic::Education => [
            "What is the academic background?",
            "Were there any academic achievements?",
            "What certifications are there?",
        ],
        Topic::Projects => [
            "Show me the recent projects",
            "What is the most impressive project?",
            "Which technologies were used in the projects?",
        ],
        Topic::General => [
            "What makes this candidate a strong engineer?",
            "Tell me about the work experience",
            "What are the core competencies?",
        ],
    };
    suggestions.iter().map(|s| s.to_string()).collect()
}

pub fn explain_fallback(passage: &str, section: &str) -> String {
    let section = section.trim();
    let scope = if section.is_empty() {
        String::new()
    } else {
        format!(" in the {section} section")
    };
    format!(
        "The passage \"{}\"{scope} describes hands-on work from the resume. \
         Ask a follow-up question about any part of it for more detail.",
        passage.trim()
    )
}
