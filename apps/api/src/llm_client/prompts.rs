// System prompts for the resume assistant, one per chat mode.

const BASE_SYSTEM: &str = "\
You are the AI assistant on a candidate's interactive resume website. \
You answer visitors' questions about the candidate's professional background \
using the resume context provided with each question. \
Do not invent facts that the context does not support.";

const STRICT_RULES: &str = "\
Rules: only answer questions about the candidate's resume, career, skills and \
professional background. Keep answers professional and focused on qualifications. \
If asked about unrelated topics, politely steer back to the candidate's profile.";

const OPEN_RULES: &str = "\
Rules: you may discuss any topic, but relate it back to the candidate's interests \
and skills where it fits. Keep a positive, helpful and engaging tone.";

/// System prompt used when explaining a selected resume passage.
pub const EXPLAIN_SYSTEM: &str = "\
You explain passages from a candidate's resume to readers who may not be technical. \
Break down jargon, explain the impact, and stay grounded in the passage.";

pub fn system_prompt(strict: bool) -> String {
    let rules = if strict { STRICT_RULES } else { OPEN_RULES };
    format!("{BASE_SYSTEM}\n\n{rules}")
}

/// User turn: question, then any visitor-selected text, then retrieved context.
pub fn user_message(question: &str, selected_text: &str, context: &str) -> String {
    let mut message = format!("User question: {question}\n");
    if !selected_text.trim().is_empty() {
        message.push_str(&format!("User selected this text: '{}'\n", selected_text.trim()));
    }
    if !context.trim().is_empty() {
        message.push_str(&format!("Relevant context from the resume: {}\n", context.trim()));
    }
    message.push_str("\nAnswer helpfully and concisely using the context above.");
    message
}

pub fn explain_message(passage: &str, section: &str) -> String {
    let mut message = format!("Explain this text from the resume in detail: \"{passage}\"\n");
    if !section.trim().is_empty() {
        message.push_str(&format!("Section context: {}\n", section.trim()));
    }
    message.push_str(
        "\nExplain technical terms, the impact of the work, and what it shows about the candidate.",
    );
    message
}
