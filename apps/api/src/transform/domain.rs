//! Domain Classifier — closed-vocabulary keyword counting over five fixed domains.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Detected domain of a prompt. Drives role, context and criteria wording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    Business,
    Technology,
    Education,
    Creative,
    Analysis,
    #[default]
    General,
}

/// Evaluation order matters: ties resolve to the earlier entry.
const DOMAIN_KEYWORDS: &[(Domain, &[&str])] = &[
    (
        Domain::Business,
        &["business", "strategy", "market", "revenue", "profit", "customer", "plan"],
    ),
    (
        Domain::Technology,
        &["code", "software", "api", "database", "programming", "system", "develop"],
    ),
    (
        Domain::Education,
        &["learn", "teach", "course", "student", "education", "training"],
    ),
    (
        Domain::Creative,
        &["write", "create", "design", "story", "content", "creative"],
    ),
    (
        Domain::Analysis,
        &["analyze", "research", "data", "report", "study", "investigate"],
    ),
];

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Business => "Business",
            Domain::Technology => "Technology",
            Domain::Education => "Education",
            Domain::Creative => "Creative",
            Domain::Analysis => "Analysis",
            Domain::General => "General",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies text by counting case-insensitive keyword occurrences per domain.
///
/// The strictly highest score wins; ties go to the domain listed first; all-zero
/// scores yield `Domain::General`.
pub fn classify_domain(text: &str) -> Domain {
    let lower = text.to_lowercase();
    let mut best = (Domain::General, 0usize);

    for (domain, keywords) in DOMAIN_KEYWORDS {
        let score: usize = keywords.iter().map(|k| lower.matches(k).count()).sum();
        if score > best.1 {
            best = (*domain, score);
        }
    }

    best.0
}
