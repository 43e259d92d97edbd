use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Structured resume data as served to the website and fed to retrieval.
///
/// Every section is optional. Unknown keys are ignored so the frontend can carry
/// presentation-only fields in the same document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResumeRecord {
    pub personal_info: Option<PersonalInfo>,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    /// Category label → skills. Insertion order is preserved and is part of the
    /// document ordering contract.
    pub skills: IndexMap<String, Vec<String>>,
    pub projects: Vec<ProjectEntry>,
    pub certifications: Vec<CertificationEntry>,
    pub core_competencies: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PersonalInfo {
    pub name: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExperienceEntry {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub responsibilities: Vec<String>,
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EducationEntry {
    pub degree: Option<String>,
    pub field: Option<String>,
    pub institution: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub gpa: Option<Gpa>,
    pub achievements: Vec<String>,
}

/// GPA appears both as a bare number (`3.9`) and as free text (`"3.9/4.0"`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Gpa {
    Number(f64),
    Text(String),
}

impl fmt::Display for Gpa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gpa::Number(n) => write!(f, "{n}"),
            Gpa::Text(s) => f.write_str(s.trim()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProjectEntry {
    pub title: Option<String>,
    pub description: Option<String>,
    pub technologies: Vec<String>,
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CertificationEntry {
    pub name: Option<String>,
    pub issuer: Option<String>,
    pub date: Option<String>,
}
