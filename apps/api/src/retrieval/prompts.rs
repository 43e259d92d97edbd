// Fixed text fragments used by context assembly.

/// Static personal-context paragraph prepended to every assembled context.
/// Overridable per deployment via `RAG_PERSONAL_CONTEXT`.
pub const DEFAULT_PERSONAL_CONTEXT: &str = "\
The candidate is an engineer who enjoys building production systems and explaining \
complex technical ideas to non-technical audiences. They care about technology that \
helps people, keep learning continuously, and are known for a positive, collaborative attitude.";

/// Returned by context retrieval while no index is published.
pub const NOT_READY_CONTEXT: &str = "Retrieval is not ready. Using basic context.";

/// Returned by context retrieval when embedding or search fails at query time.
pub const QUERY_FAILURE_CONTEXT: &str = "Error retrieving context. Please try again.";

/// Keyword sets for keyword-based section lookup. Matching is plain substring
/// containment against lowercased document text.
pub const SECTION_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "experience",
        &["work", "job", "position", "role", "company", "responsibilities"],
    ),
    (
        "education",
        &["degree", "university", "college", "school", "academic", "study"],
    ),
    (
        "skills",
        &["skills", "technologies", "programming", "tools", "frameworks"],
    ),
    (
        "projects",
        &["project", "built", "developed", "created", "implemented"],
    ),
    (
        "certifications",
        &["certification", "certified", "credential", "license"],
    ),
    (
        "about",
        &["personal", "summary", "profile", "background", "interests"],
    ),
];

pub fn section_not_found(section: &str) -> String {
    format!("No specific information found for {section}.")
}
