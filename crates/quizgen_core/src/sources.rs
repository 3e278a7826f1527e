use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::model::{EntityCandidate, Theme};

/// Which of the two pipeline operations a source implements. Declared up
/// front and checked against the batch the source actually returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Themes,
    Dictionary,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Themes => "themes",
            Self::Dictionary => "dictionary",
        }
    }
}

#[derive(Debug, Clone)]
pub enum SourceBatch {
    Themes(Vec<Theme>),
    Entities(Vec<EntityCandidate>),
}

impl SourceBatch {
    pub fn kind(&self) -> Capability {
        match self {
            Self::Themes(_) => Capability::Themes,
            Self::Entities(_) => Capability::Dictionary,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Themes(themes) => themes.len(),
            Self::Entities(entities) => entities.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A pipeline input. Sources only read; every write in the system goes
/// through the persistence layer. A `None` capability models an adapter
/// that exposes neither operation, which the pipeline reports as a
/// structural fault.
pub trait Source {
    fn name(&self) -> &str;
    fn capability(&self) -> Option<Capability>;
    fn collect(&mut self) -> Result<SourceBatch>;
}

#[derive(Debug, Deserialize)]
struct ThemeFixtureFile {
    themes: Vec<Theme>,
}

/// Bundled hand-authored themes, shipped as a YAML fixture.
pub struct FixtureThemes {
    path: PathBuf,
}

impl FixtureThemes {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Source for FixtureThemes {
    fn name(&self) -> &str {
        "fixture_themes"
    }

    fn capability(&self) -> Option<Capability> {
        Some(Capability::Themes)
    }

    fn collect(&mut self) -> Result<SourceBatch> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let parsed: ThemeFixtureFile = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        Ok(SourceBatch::Themes(parsed.themes))
    }
}

pub const PREFECTURE_THEME_ID: &str = "japan_prefectures";

/// Locale-data table of Japanese prefecture names, keyed by the two-digit
/// JIS code. Produces a single theme; the code keys fix the answer order.
pub struct PrefectureThemes {
    path: PathBuf,
}

impl PrefectureThemes {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Source for PrefectureThemes {
    fn name(&self) -> &str {
        "prefecture_themes"
    }

    fn capability(&self) -> Option<Capability> {
        Some(Capability::Themes)
    }

    fn collect(&mut self) -> Result<SourceBatch> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let table: BTreeMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        if table.is_empty() {
            bail!("prefecture table {} is empty", self.path.display());
        }
        let theme = Theme {
            id: PREFECTURE_THEME_ID.to_string(),
            title: "日本の都道府県".to_string(),
            category_id: "japan".to_string(),
            category_title: "日本".to_string(),
            answers: table.into_values().collect(),
        };
        Ok(SourceBatch::Themes(vec![theme]))
    }
}

/// Transport abstraction over the remote country directory, so tests run
/// against fixture entries instead of the network.
pub trait DirectoryApi {
    fn fetch_entries(&mut self) -> Result<Vec<Value>>;
}

#[derive(Debug, Clone)]
pub struct DirectoryClientConfig {
    pub endpoint: String,
    pub user_agent: String,
    pub timeout_ms: u64,
}

/// Blocking HTTP client with a hard timeout. One attempt per run: a broken
/// upstream fails the run loudly instead of retrying into partial data.
pub struct HttpDirectoryClient {
    client: Client,
    config: DirectoryClientConfig,
}

impl HttpDirectoryClient {
    pub fn new(config: DirectoryClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("failed to build directory HTTP client")?;
        Ok(Self { client, config })
    }
}

impl DirectoryApi for HttpDirectoryClient {
    fn fetch_entries(&mut self) -> Result<Vec<Value>> {
        let response = self
            .client
            .get(&self.config.endpoint)
            .header("User-Agent", self.config.user_agent.clone())
            .send()
            .with_context(|| format!("directory fetch failed for {}", self.config.endpoint))?;
        let status = response.status();
        if !status.is_success() {
            bail!("directory API request failed with HTTP {status}");
        }
        let payload: Value = response
            .json()
            .context("failed to decode directory API JSON response")?;
        match payload {
            Value::Array(entries) => Ok(entries),
            _ => bail!("directory API returned a non-array payload"),
        }
    }
}

/// Remote country-directory adapter: the only canonical-candidate producer
/// and the pipeline's single outbound network call.
pub struct WorldDirectory {
    api: Box<dyn DirectoryApi>,
}

impl WorldDirectory {
    pub fn new(api: Box<dyn DirectoryApi>) -> Self {
        Self { api }
    }
}

impl Source for WorldDirectory {
    fn name(&self) -> &str {
        "world_directory"
    }

    fn capability(&self) -> Option<Capability> {
        Some(Capability::Dictionary)
    }

    fn collect(&mut self) -> Result<SourceBatch> {
        let entries = self.api.fetch_entries()?;
        let candidates = entries.iter().map(candidate_from_entry).collect();
        Ok(SourceBatch::Entities(candidates))
    }
}

/// Map one directory entry onto a candidate record. A field that is missing
/// or not a value of the expected type becomes the explicit absent marker;
/// nothing is defaulted.
pub fn candidate_from_entry(entry: &Value) -> EntityCandidate {
    EntityCandidate {
        code: entry
            .get("cca2")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        name_en: entry
            .pointer("/name/common")
            .and_then(Value::as_str)
            .map(str::to_string),
        name_ja: entry
            .pointer("/translations/jpn/common")
            .and_then(Value::as_str)
            .map(str::to_string),
        region: entry.get("region").and_then(Value::as_str).map(str::to_string),
        subregion: entry
            .get("subregion")
            .and_then(Value::as_str)
            .map(str::to_string),
        landlocked: entry.get("landlocked").and_then(Value::as_bool),
        un_member: entry.get("unMember").and_then(Value::as_bool),
        capital: entry
            .get("capital")
            .and_then(Value::as_array)
            .and_then(|capitals| capitals.first())
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Capability, FixtureThemes, PREFECTURE_THEME_ID, PrefectureThemes, Source, SourceBatch,
        candidate_from_entry,
    };
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn fixture_source_parses_yaml_themes() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("themes.yaml");
        fs::write(
            &path,
            r#"
themes:
  - id: eu_members
    title: EU加盟国
    category_id: international_orgs
    category_title: 国際機構
    answers:
      - フランス
      - ドイツ
"#,
        )
        .expect("write fixture");

        let mut source = FixtureThemes::new(path);
        assert_eq!(source.capability(), Some(Capability::Themes));
        let batch = source.collect().expect("collect");
        let SourceBatch::Themes(themes) = batch else {
            panic!("expected a theme batch");
        };
        assert_eq!(themes.len(), 1);
        assert_eq!(themes[0].id, "eu_members");
        assert_eq!(themes[0].answers, vec!["フランス", "ドイツ"]);
    }

    #[test]
    fn fixture_source_fails_on_missing_file() {
        let mut source = FixtureThemes::new("/nonexistent/themes.yaml".into());
        let error = source.collect().expect_err("must fail");
        assert!(error.to_string().contains("failed to read"));
    }

    #[test]
    fn prefecture_source_orders_answers_by_code() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("ja_prefectures.json");
        fs::write(
            &path,
            r#"{"13":"東京都","01":"北海道","47":"沖縄県"}"#,
        )
        .expect("write table");

        let mut source = PrefectureThemes::new(path);
        let batch = source.collect().expect("collect");
        let SourceBatch::Themes(themes) = batch else {
            panic!("expected a theme batch");
        };
        assert_eq!(themes[0].id, PREFECTURE_THEME_ID);
        assert_eq!(themes[0].answers, vec!["北海道", "東京都", "沖縄県"]);
    }

    #[test]
    fn directory_entry_maps_typed_fields_only() {
        let entry = json!({
            "cca2": "JP",
            "name": { "common": "Japan" },
            "translations": { "jpn": { "common": "日本" } },
            "region": "Asia",
            "subregion": "Eastern Asia",
            "landlocked": false,
            "unMember": true,
            "capital": ["Tokyo"]
        });
        let candidate = candidate_from_entry(&entry);
        assert_eq!(candidate.code, "JP");
        assert_eq!(candidate.name_en.as_deref(), Some("Japan"));
        assert_eq!(candidate.name_ja.as_deref(), Some("日本"));
        assert_eq!(candidate.landlocked, Some(false));
        assert_eq!(candidate.un_member, Some(true));
        assert_eq!(candidate.capital.as_deref(), Some("Tokyo"));
    }

    #[test]
    fn mistyped_fields_become_the_absent_marker() {
        let entry = json!({
            "cca2": "XX",
            "name": { "common": "Nowhere" },
            "landlocked": "yes",
            "unMember": 1,
            "capital": "not-an-array",
            "subregion": null
        });
        let candidate = candidate_from_entry(&entry);
        assert_eq!(candidate.landlocked, None);
        assert_eq!(candidate.un_member, None);
        assert_eq!(candidate.capital, None);
        assert_eq!(candidate.subregion, None);
        assert_eq!(candidate.name_ja, None);
    }
}
