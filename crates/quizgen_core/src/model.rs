use serde::{Deserialize, Serialize};

pub const DATASET_ID: &str = "countries";
pub const DATASET_SCHEMA: &str = "countries_v1";

/// Themes with fewer answers than this are suppressed as too small to quiz on.
pub const MIN_ANSWERS: usize = 10;

/// One canonical dictionary row. Optional fields stay `None` when the
/// upstream did not supply a value of the expected type; they are never
/// coerced to `false` or an empty string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entity {
    pub code: String,
    pub name_en: String,
    pub name_ja: Option<String>,
    pub region: Option<String>,
    pub subregion: Option<String>,
    pub landlocked: Option<bool>,
    pub un_member: Option<bool>,
    pub capital: Option<String>,
}

impl Entity {
    /// Display name used for quiz answers: the localized name when the
    /// entity has one, otherwise the required fallback name.
    pub fn display_name(&self) -> &str {
        self.name_ja.as_deref().unwrap_or(&self.name_en)
    }
}

/// The merged, validated canonical dictionary, sorted by entity code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dictionary {
    pub id: String,
    pub schema: String,
    pub entities: Vec<Entity>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Theme {
    pub id: String,
    pub title: String,
    pub category_id: String,
    pub category_title: String,
    pub answers: Vec<String>,
}

/// Raw entity row as produced by a source adapter, before ingestion
/// normalizes and validates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityCandidate {
    pub code: String,
    pub name_en: Option<String>,
    pub name_ja: Option<String>,
    pub region: Option<String>,
    pub subregion: Option<String>,
    pub landlocked: Option<bool>,
    pub un_member: Option<bool>,
    pub capital: Option<String>,
}
