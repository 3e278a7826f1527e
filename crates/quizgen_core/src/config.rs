use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DIRECTORY_URL: &str = "https://restcountries.com/v3.1/all";
pub const DEFAULT_USER_AGENT: &str = "quizgen/0.1";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

pub const CONFIG_FILENAME: &str = "quizgen.toml";
pub const THEME_FIXTURE_FILENAME: &str = "themes.yaml";
pub const PREFECTURE_TABLE_FILENAME: &str = "ja_prefectures.json";

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct QuizgenConfig {
    #[serde(default)]
    pub pipeline: PipelineSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct PipelineSection {
    pub directory_url: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_ms: Option<u64>,
    pub output_dir: Option<String>,
    pub fixtures_dir: Option<String>,
}

impl QuizgenConfig {
    /// Resolve the directory endpoint: env > config > default.
    pub fn directory_url(&self) -> String {
        env_value(
            "QUIZGEN_DIRECTORY_URL",
            self.pipeline
                .directory_url
                .as_deref()
                .unwrap_or(DEFAULT_DIRECTORY_URL),
        )
    }

    pub fn user_agent(&self) -> String {
        env_value(
            "QUIZGEN_USER_AGENT",
            self.pipeline
                .user_agent
                .as_deref()
                .unwrap_or(DEFAULT_USER_AGENT),
        )
    }

    pub fn timeout_ms(&self) -> u64 {
        env_value_u64(
            "QUIZGEN_HTTP_TIMEOUT_MS",
            self.pipeline.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
        )
    }
}

/// Load the config file. A missing file is not an error; the defaults
/// stand in for it.
pub fn load_config(config_path: &Path) -> Result<QuizgenConfig> {
    if !config_path.exists() {
        return Ok(QuizgenConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: QuizgenConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub project_root: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub project_root: PathBuf,
    pub config_path: PathBuf,
    pub fixtures_dir: PathBuf,
    pub theme_fixture_path: PathBuf,
    pub prefecture_table_path: PathBuf,
    pub output_dir: PathBuf,
    pub themes_dir: PathBuf,
    pub datasets_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Runtime {
    pub paths: ResolvedPaths,
    pub config: QuizgenConfig,
}

/// Resolve the runtime layout: flag > environment > config file > default,
/// with relative paths anchored at the project root.
pub fn resolve_runtime(overrides: &PathOverrides) -> Result<Runtime> {
    let project_root = match overrides.project_root.clone().or_else(|| env_path("QUIZGEN_PROJECT_ROOT")) {
        Some(root) => root,
        None => env::current_dir().context("failed to read current directory")?,
    };

    let config_path = overrides
        .config
        .clone()
        .or_else(|| env_path("QUIZGEN_CONFIG"))
        .map(|path| absolutize(&path, &project_root))
        .unwrap_or_else(|| project_root.join(CONFIG_FILENAME));
    let config = load_config(&config_path)?;

    let fixtures_dir = env_path("QUIZGEN_FIXTURES_DIR")
        .or_else(|| config.pipeline.fixtures_dir.as_deref().map(PathBuf::from))
        .map(|path| absolutize(&path, &project_root))
        .unwrap_or_else(|| project_root.join("fixtures"));

    let output_dir = overrides
        .output_dir
        .clone()
        .or_else(|| env_path("QUIZGEN_OUTPUT_DIR"))
        .or_else(|| config.pipeline.output_dir.as_deref().map(PathBuf::from))
        .map(|path| absolutize(&path, &project_root))
        .unwrap_or_else(|| project_root.join("data"));

    let paths = ResolvedPaths {
        theme_fixture_path: fixtures_dir.join(THEME_FIXTURE_FILENAME),
        prefecture_table_path: fixtures_dir.join(PREFECTURE_TABLE_FILENAME),
        themes_dir: output_dir.join("themes"),
        datasets_dir: output_dir.join("datasets"),
        project_root,
        config_path,
        fixtures_dir,
        output_dir,
    };

    Ok(Runtime { paths, config })
}

fn absolutize(path: &Path, project_root: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn env_value(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}

fn env_value_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::{
        DEFAULT_DIRECTORY_URL, DEFAULT_TIMEOUT_MS, PathOverrides, QuizgenConfig, load_config,
        resolve_runtime,
    };
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    #[test]
    fn defaults_without_a_config_file() {
        let config = load_config(Path::new("/nonexistent/quizgen.toml")).expect("load");
        assert_eq!(config.directory_url(), DEFAULT_DIRECTORY_URL);
        assert_eq!(config.timeout_ms(), DEFAULT_TIMEOUT_MS);
        assert_eq!(config.user_agent(), "quizgen/0.1");
    }

    #[test]
    fn config_file_values_override_defaults() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("quizgen.toml");
        fs::write(
            &config_path,
            r#"
[pipeline]
directory_url = "https://directory.example.org/entries"
timeout_ms = 5000
user_agent = "test-agent/1.0"
"#,
        )
        .expect("write config");

        let config = load_config(&config_path).expect("load");
        assert_eq!(
            config.directory_url(),
            "https://directory.example.org/entries"
        );
        assert_eq!(config.timeout_ms(), 5000);
        assert_eq!(config.user_agent(), "test-agent/1.0");
    }

    #[test]
    fn invalid_config_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("quizgen.toml");
        fs::write(&config_path, "[pipeline\noops").expect("write config");
        let error = load_config(&config_path).expect_err("must fail");
        assert!(error.to_string().contains("failed to parse"));
    }

    #[test]
    fn tolerates_partial_config() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("quizgen.toml");
        fs::write(&config_path, "[other]\nkey = 1\n").expect("write config");
        let config = load_config(&config_path).expect("load");
        assert_eq!(config, QuizgenConfig::default());
    }

    #[test]
    fn layout_is_anchored_at_the_project_root() {
        let temp = tempdir().expect("tempdir");
        let runtime = resolve_runtime(&PathOverrides {
            project_root: Some(temp.path().to_path_buf()),
            ..PathOverrides::default()
        })
        .expect("resolve");

        assert_eq!(runtime.paths.fixtures_dir, temp.path().join("fixtures"));
        assert_eq!(runtime.paths.output_dir, temp.path().join("data"));
        assert_eq!(
            runtime.paths.themes_dir,
            temp.path().join("data").join("themes")
        );
        assert_eq!(
            runtime.paths.datasets_dir,
            temp.path().join("data").join("datasets")
        );
        assert_eq!(
            runtime.paths.theme_fixture_path,
            temp.path().join("fixtures").join("themes.yaml")
        );
    }

    #[test]
    fn output_dir_override_wins_over_config() {
        let temp = tempdir().expect("tempdir");
        fs::write(
            temp.path().join("quizgen.toml"),
            "[pipeline]\noutput_dir = \"generated\"\n",
        )
        .expect("write config");

        let from_config = resolve_runtime(&PathOverrides {
            project_root: Some(temp.path().to_path_buf()),
            ..PathOverrides::default()
        })
        .expect("resolve");
        assert_eq!(from_config.paths.output_dir, temp.path().join("generated"));

        let overridden = resolve_runtime(&PathOverrides {
            project_root: Some(temp.path().to_path_buf()),
            output_dir: Some(temp.path().join("elsewhere")),
            ..PathOverrides::default()
        })
        .expect("resolve");
        assert_eq!(overridden.paths.output_dir, temp.path().join("elsewhere"));
    }
}
