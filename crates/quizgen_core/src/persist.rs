use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use similar::{ChangeTag, TextDiff};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    Created,
    Updated,
    Unchanged,
}

impl WriteOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactWrite {
    pub path: String,
    pub outcome: WriteOutcome,
    pub content_hash: String,
    pub lines_added: usize,
    pub lines_removed: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WriteReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub artifacts: Vec<ArtifactWrite>,
    pub stale: Vec<String>,
}

impl WriteReport {
    pub fn push(&mut self, artifact: ArtifactWrite) {
        match artifact.outcome {
            WriteOutcome::Created => self.created += 1,
            WriteOutcome::Updated => self.updated += 1,
            WriteOutcome::Unchanged => self.unchanged += 1,
        }
        self.artifacts.push(artifact);
    }
}

/// Deterministic artifact rendering: serde struct order gives stable keys,
/// pretty-printing gives stable layout, and the trailing newline makes the
/// bytes diff-friendly.
pub fn render_artifact<T: Serialize>(value: &T) -> Result<String> {
    let mut rendered =
        serde_json::to_string_pretty(value).context("failed to serialize artifact")?;
    rendered.push('\n');
    Ok(rendered)
}

/// Idempotent, crash-safe write: read the prior content to classify the
/// outcome, write the new bytes to a process-and-time scoped temp sibling,
/// then rename over the final path. The final path only ever holds a
/// complete artifact.
pub fn write_artifact(final_path: &Path, content: &str) -> Result<ArtifactWrite> {
    let previous = read_if_present(final_path)?;

    if previous.as_deref() == Some(content) {
        return Ok(ArtifactWrite {
            path: display_path(final_path),
            outcome: WriteOutcome::Unchanged,
            content_hash: compute_hash(content),
            lines_added: 0,
            lines_removed: 0,
        });
    }

    if let Some(parent) = final_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let temp_path = temp_sibling(final_path);
    fs::write(&temp_path, content)
        .with_context(|| format!("failed to write {}", temp_path.display()))?;
    if let Err(error) = fs::rename(&temp_path, final_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(error)
            .with_context(|| format!("failed to move artifact into {}", final_path.display()));
    }

    let (outcome, lines_added, lines_removed) = match previous {
        Some(previous) => {
            let (added, removed) = diff_line_counts(&previous, content);
            (WriteOutcome::Updated, added, removed)
        }
        None => (WriteOutcome::Created, content.lines().count(), 0),
    };

    Ok(ArtifactWrite {
        path: display_path(final_path),
        outcome,
        content_hash: compute_hash(content),
        lines_added,
        lines_removed,
    })
}

/// Theme files on disk whose stem was not produced by this run. Reported
/// for operator cleanup, never deleted.
pub fn stale_theme_artifacts(themes_dir: &Path, written_ids: &BTreeSet<String>) -> Result<Vec<String>> {
    if !themes_dir.exists() {
        return Ok(Vec::new());
    }
    let mut stale = Vec::new();
    for entry in WalkDir::new(themes_dir).follow_links(false) {
        let entry =
            entry.with_context(|| format!("failed to walk {}", themes_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        if !written_ids.contains(stem) {
            stale.push(display_path(path));
        }
    }
    stale.sort();
    Ok(stale)
}

pub fn compute_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let mut output = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}

fn read_if_present(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
        Err(error) => {
            Err(error).with_context(|| format!("failed to read {}", path.display()))
        }
    }
}

fn temp_sibling(final_path: &Path) -> PathBuf {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0);
    let file_name = final_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "artifact".to_string());
    final_path.with_file_name(format!(
        "{file_name}.{}.{millis}.tmp",
        std::process::id()
    ))
}

fn diff_line_counts(previous: &str, current: &str) -> (usize, usize) {
    let diff = TextDiff::from_lines(previous, current);
    let mut added = 0;
    let mut removed = 0;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => added += 1,
            ChangeTag::Delete => removed += 1,
            ChangeTag::Equal => {}
        }
    }
    (added, removed)
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
