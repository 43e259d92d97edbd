//! Document Synthesizer — turns a `ResumeRecord` into retrievable text chunks.
//!
//! Pure and deterministic: no I/O, no allocation order surprises. The position of
//! each document in the returned list is the join key into the embedding index,
//! so the section order below is a contract, not a presentation choice:
//!
//! personal info → experience → education → skills → projects → certifications
//! → core competencies.

use crate::models::resume::{
    CertificationEntry, EducationEntry, ExperienceEntry, PersonalInfo, ProjectEntry, ResumeRecord,
};

/// Converts a resume record into an ordered list of self-contained documents.
///
/// Absent or empty sections contribute nothing; this never fails.
pub fn synthesize(record: &ResumeRecord) -> Vec<String> {
    let mut documents = Vec::new();

    if let Some(personal) = &record.personal_info {
        documents.extend(personal_document(personal));
    }
    documents.extend(record.experience.iter().filter_map(experience_document));
    documents.extend(record.education.iter().filter_map(education_document));
    documents.extend(
        record
            .skills
            .iter()
            .filter_map(|(category, skills)| skills_document(category, skills)),
    );
    documents.extend(record.projects.iter().filter_map(project_document));
    documents.extend(record.certifications.iter().filter_map(certification_document));
    documents.extend(competencies_document(&record.core_competencies));

    documents
}

// ────────────────────────────────────────────────────────────────────────────
// Per-section builders
// ────────────────────────────────────────────────────────────────────────────

fn personal_document(personal: &PersonalInfo) -> Option<String> {
    let mut doc = Sentences::new("Personal Information:");

    match (present(&personal.name), present(&personal.title)) {
        (Some(name), Some(title)) => doc.push(format!("{name}, {title}.")),
        (Some(only), None) | (None, Some(only)) => doc.push(format!("{only}.")),
        (None, None) => {}
    }
    if let Some(summary) = present(&personal.summary) {
        doc.push(summary);
    }

    let contact: Vec<&str> = [
        &personal.email,
        &personal.phone,
        &personal.location,
        &personal.linkedin,
        &personal.github,
        &personal.website,
    ]
    .into_iter()
    .filter_map(present)
    .collect();
    if !contact.is_empty() {
        doc.push(format!("Contact: {}", contact.join(" | ")));
    }

    doc.finish()
}

fn experience_document(exp: &ExperienceEntry) -> Option<String> {
    let mut doc = Sentences::new("Work Experience:");

    match (present(&exp.title), present(&exp.company)) {
        (Some(title), Some(company)) => doc.push(format!("{title} at {company}")),
        (Some(only), None) | (None, Some(only)) => doc.push(only),
        (None, None) => {}
    }
    if let Some(range) = date_range(&exp.start_date, &exp.end_date, "from", "to") {
        doc.push(range);
    }
    doc.end_sentence();

    if let Some(location) = present(&exp.location) {
        doc.push(format!("Location: {location}."));
    }
    if let Some(text) = joined(&exp.responsibilities, " ") {
        doc.push(format!("Key responsibilities: {text}"));
    }
    if let Some(text) = joined(&exp.achievements, " ") {
        doc.push(format!("Achievements: {text}"));
    }

    doc.finish()
}

fn education_document(edu: &EducationEntry) -> Option<String> {
    let mut doc = Sentences::new("Education:");

    match (present(&edu.degree), present(&edu.field)) {
        (Some(degree), Some(field)) => doc.push(format!("{degree} in {field}")),
        (Some(only), None) | (None, Some(only)) => doc.push(only),
        (None, None) => {}
    }
    if let Some(institution) = present(&edu.institution) {
        doc.push(format!("from {institution}"));
    }
    if let Some(range) = date_range(&edu.start_date, &edu.end_date, "", "-") {
        doc.push(format!("({range})"));
    }
    doc.end_sentence();

    if let Some(location) = present(&edu.location) {
        doc.push(format!("Location: {location}."));
    }
    if let Some(gpa) = &edu.gpa {
        let gpa = gpa.to_string();
        if !gpa.is_empty() {
            doc.push(format!("GPA: {gpa}."));
        }
    }
    if let Some(text) = joined(&edu.achievements, " ") {
        doc.push(format!("Achievements: {text}"));
    }

    doc.finish()
}

fn skills_document(category: &str, skills: &[String]) -> Option<String> {
    let list = joined(skills, ", ")?;
    let category = category.trim();
    if category.is_empty() {
        Some(format!("Skills: {list}"))
    } else {
        Some(format!("Skills in {category}: {list}"))
    }
}

fn project_document(project: &ProjectEntry) -> Option<String> {
    let mut doc = Sentences::new("Project:");

    if let Some(title) = present(&project.title) {
        doc.push(format!("{title}."));
    }
    if let Some(description) = present(&project.description) {
        doc.push(format!("Description: {description}"));
    }
    if let Some(text) = joined(&project.technologies, ", ") {
        doc.push(format!("Technologies used: {text}."));
    }
    if let Some(text) = joined(&project.achievements, " ") {
        doc.push(format!("Key achievements: {text}"));
    }

    doc.finish()
}

fn certification_document(cert: &CertificationEntry) -> Option<String> {
    let mut doc = Sentences::new("Certification:");

    if let Some(name) = present(&cert.name) {
        doc.push(name);
    }
    if let Some(issuer) = present(&cert.issuer) {
        doc.push(format!("issued by {issuer}"));
    }
    if let Some(date) = present(&cert.date) {
        doc.push(format!("on {date}"));
    }

    doc.finish()
}

fn competencies_document(competencies: &[String]) -> Option<String> {
    joined(competencies, ", ").map(|text| format!("Core Competencies: {text}"))
}

// ────────────────────────────────────────────────────────────────────────────
// Text helpers
// ────────────────────────────────────────────────────────────────────────────

/// Accumulates space-separated fragments behind a section label.
/// Yields `None` when no fragment was pushed, so empty entries vanish.
struct Sentences {
    label: &'static str,
    parts: Vec<String>,
}

impl Sentences {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            parts: Vec::new(),
        }
    }

    fn push(&mut self, part: impl Into<String>) {
        self.parts.push(part.into());
    }

    /// Terminates the running sentence with a period if it does not end in one.
    fn end_sentence(&mut self) {
        if let Some(last) = self.parts.last_mut() {
            if !last.ends_with('.') {
                last.push('.');
            }
        }
    }

    fn finish(self) -> Option<String> {
        if self.parts.is_empty() {
            return None;
        }
        Some(format!("{} {}", self.label, self.parts.join(" ")))
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn joined(items: &[String], separator: &str) -> Option<String> {
    let items: Vec<&str> = items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items.join(separator))
    }
}

fn date_range(
    start: &Option<String>,
    end: &Option<String>,
    from: &str,
    to: &str,
) -> Option<String> {
    let range = match (present(start), present(end)) {
        (Some(s), Some(e)) => format!("{s} {to} {e}"),
        (Some(s), None) => format!("{s} {to} Present"),
        (None, Some(e)) => format!("until {e}"),
        (None, None) => return None,
    };
    if from.is_empty() || range.starts_with("until") {
        Some(range)
    } else {
        Some(format!("{from} {range}"))
    }
}
