use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::Theme;

/// One accumulated validation failure. Accumulating instead of aborting lets
/// a single run surface every problem at once.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub subject: String,
    pub code: String,
    pub message: String,
}

/// Run-scoped accumulator for cross-record checks: the combined
/// theme/dataset identifier namespace and the category-title registry.
/// Passed explicitly through every validation step; once `failed` is set,
/// nothing may be written for the rest of the run.
#[derive(Debug, Default)]
pub struct ValidationRegistry {
    claimed_ids: BTreeMap<String, String>,
    category_titles: BTreeMap<String, String>,
    issues: Vec<ValidationIssue>,
    failed: bool,
}

impl ValidationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<ValidationIssue> {
        self.issues
    }

    pub fn record(&mut self, subject: &str, code: &str, message: String) {
        self.failed = true;
        self.issues.push(ValidationIssue {
            subject: subject.to_string(),
            code: code.to_string(),
            message,
        });
    }

    /// Claim an identifier in the combined theme + dataset namespace.
    pub fn claim_identifier(&mut self, id: &str, subject: &str) {
        if !is_valid_identifier(id) {
            self.record(
                subject,
                "invalid_identifier",
                format!("identifier {id:?} does not match the snake_case pattern"),
            );
            return;
        }
        if let Some(holder) = self.claimed_ids.get(id) {
            self.record(
                subject,
                "duplicate_identifier",
                format!("identifier {id:?} already claimed by {holder}"),
            );
            return;
        }
        self.claimed_ids.insert(id.to_string(), subject.to_string());
    }

    /// Require one stable title per category identifier across the run.
    pub fn register_category(&mut self, category_id: &str, category_title: &str, subject: &str) {
        if !is_valid_identifier(category_id) {
            self.record(
                subject,
                "invalid_category",
                format!("category identifier {category_id:?} does not match the snake_case pattern"),
            );
            return;
        }
        match self.category_titles.get(category_id) {
            Some(existing) if existing != category_title => {
                self.record(
                    subject,
                    "category_title_conflict",
                    format!(
                        "category {category_id:?} titled {category_title:?} here but {existing:?} elsewhere"
                    ),
                );
            }
            Some(_) => {}
            None => {
                self.category_titles
                    .insert(category_id.to_string(), category_title.to_string());
            }
        }
    }
}

/// `^[a-z][a-z0-9]*(_[a-z0-9]+)*$` without a regex engine.
pub fn is_valid_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(ch) if ch.is_ascii_lowercase() => {}
        _ => return false,
    }
    let mut previous_underscore = false;
    for ch in chars {
        if ch == '_' {
            if previous_underscore {
                return false;
            }
            previous_underscore = true;
        } else if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            previous_underscore = false;
        } else {
            return false;
        }
    }
    !previous_underscore
}

/// Fixed-width alphabetic entity code: exactly two ASCII uppercase letters.
pub fn is_valid_code(value: &str) -> bool {
    value.len() == 2 && value.chars().all(|ch| ch.is_ascii_uppercase())
}

/// Trim answers, drop blanks, drop duplicates, preserve first-seen order.
pub fn clean_answers(answers: &[String]) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    let mut cleaned = Vec::new();
    for answer in answers {
        let trimmed = answer.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            cleaned.push(trimmed.to_string());
        }
    }
    cleaned
}

/// Apply every theme-level gate and return the theme with cleaned answers.
/// Violations are recorded on the registry; the cleaned theme is returned
/// regardless, since nothing is written once the registry has failed.
pub fn validate_theme(theme: &Theme, registry: &mut ValidationRegistry) -> Theme {
    let subject = format!("theme {}", theme.id);
    registry.claim_identifier(&theme.id, &subject);
    registry.register_category(&theme.category_id, &theme.category_title, &subject);
    if theme.title.trim().is_empty() {
        registry.record(&subject, "empty_title", "theme title is empty".to_string());
    }

    let answers = clean_answers(&theme.answers);
    if answers.is_empty() {
        registry.record(
            &subject,
            "no_answers",
            "no answers survived trimming and deduplication".to_string(),
        );
    }

    Theme {
        answers,
        ..theme.clone()
    }
}
