use std::collections::BTreeSet;

use anyhow::Result;
use serde::Serialize;

use crate::config::ResolvedPaths;
use crate::derive::derive_themes;
use crate::dictionary::{IngestSummary, build_dictionary};
use crate::model::{EntityCandidate, MIN_ANSWERS, Theme};
use crate::persist::{WriteReport, render_artifact, stale_theme_artifacts, write_artifact};
use crate::sources::{Source, SourceBatch};
use crate::validate::{ValidationIssue, ValidationRegistry, validate_theme};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Validate and persist.
    Write,
    /// Validate everything, write nothing.
    Check,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Write => "write",
            Self::Check => "check",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub name: String,
    pub kind: Option<String>,
    pub records: usize,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PipelineReport {
    pub success: bool,
    pub mode: String,
    pub sources: Vec<SourceReport>,
    pub ingest: IngestSummary,
    pub themes_emitted: usize,
    pub suppressed: Vec<String>,
    pub issues: Vec<ValidationIssue>,
    pub write: Option<WriteReport>,
}

/// One full pipeline pass: collect from every source in fixed list order,
/// merge and validate the canonical dictionary, derive themes, run every
/// theme through the quality gates, and — only if nothing failed — persist
/// dataset and themes in sorted-identifier order. Collection keeps going
/// past a faulty source so a single run surfaces every problem, but any
/// fault leaves the failure flag set and nothing is written.
pub fn run_pipeline(
    paths: &ResolvedPaths,
    sources: &mut [Box<dyn Source>],
    mode: RunMode,
) -> Result<PipelineReport> {
    let mut registry = ValidationRegistry::new();
    let mut source_reports = Vec::new();
    let mut adapter_themes: Vec<Theme> = Vec::new();
    let mut entity_batches: Vec<Vec<EntityCandidate>> = Vec::new();

    for source in sources.iter_mut() {
        let name = source.name().to_string();
        let subject = format!("source {name}");
        let Some(capability) = source.capability() else {
            registry.record(
                &subject,
                "missing_capability",
                "source exposes neither theme nor dictionary collection".to_string(),
            );
            source_reports.push(SourceReport {
                name,
                kind: None,
                records: 0,
                error: Some("missing capability".to_string()),
            });
            continue;
        };
        match source.collect() {
            Ok(batch) if batch.kind() != capability => {
                registry.record(
                    &subject,
                    "capability_mismatch",
                    format!(
                        "declared {} but returned a {} batch",
                        capability.as_str(),
                        batch.kind().as_str()
                    ),
                );
                source_reports.push(SourceReport {
                    name,
                    kind: Some(capability.as_str().to_string()),
                    records: 0,
                    error: Some("capability mismatch".to_string()),
                });
            }
            Ok(batch) => {
                let records = batch.len();
                match batch {
                    SourceBatch::Themes(themes) => adapter_themes.extend(themes),
                    SourceBatch::Entities(entities) => entity_batches.push(entities),
                }
                source_reports.push(SourceReport {
                    name,
                    kind: Some(capability.as_str().to_string()),
                    records,
                    error: None,
                });
            }
            Err(error) => {
                registry.record(&subject, "collect_failed", format!("{error:#}"));
                source_reports.push(SourceReport {
                    name,
                    kind: Some(capability.as_str().to_string()),
                    records: 0,
                    error: Some(error.to_string()),
                });
            }
        }
    }

    let (dictionary, ingest) = build_dictionary(&entity_batches, &mut registry);
    registry.claim_identifier(&dictionary.id, &format!("dataset {}", dictionary.id));

    let derived = derive_themes(&dictionary);
    let mut suppressed = derived.suppressed;

    let mut emitted: Vec<Theme> = Vec::new();
    for theme in adapter_themes.iter().chain(derived.themes.iter()) {
        let cleaned = validate_theme(theme, &mut registry);
        if cleaned.answers.is_empty() {
            // already recorded as fatal
            continue;
        }
        if cleaned.answers.len() < MIN_ANSWERS {
            suppressed.push(format!("{}: {} answers", cleaned.id, cleaned.answers.len()));
            continue;
        }
        emitted.push(cleaned);
    }
    emitted.sort_by(|left, right| left.id.cmp(&right.id));

    let write = if !registry.failed() && mode == RunMode::Write {
        let mut report = WriteReport::default();
        let rendered = render_artifact(&dictionary)?;
        let dataset_path = paths.datasets_dir.join(format!("{}.json", dictionary.id));
        report.push(write_artifact(&dataset_path, &rendered)?);

        let mut written_ids = BTreeSet::new();
        for theme in &emitted {
            let rendered = render_artifact(theme)?;
            let theme_path = paths.themes_dir.join(format!("{}.json", theme.id));
            report.push(write_artifact(&theme_path, &rendered)?);
            written_ids.insert(theme.id.clone());
        }
        report.stale = stale_theme_artifacts(&paths.themes_dir, &written_ids)?;
        Some(report)
    } else {
        None
    };

    Ok(PipelineReport {
        success: !registry.failed(),
        mode: mode.as_str().to_string(),
        sources: source_reports,
        ingest,
        themes_emitted: emitted.len(),
        suppressed,
        issues: registry.into_issues(),
        write,
    })
}
