use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{DATASET_ID, DATASET_SCHEMA, Dictionary, Entity, EntityCandidate};
use crate::validate::{ValidationRegistry, is_valid_code};

/// Operator-facing ingestion counts. Skipped records are informational;
/// they do not fail the run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestSummary {
    pub total: usize,
    pub with_localized_name: usize,
    pub skipped: Vec<String>,
}

/// Merge all canonical-candidate batches into one dictionary keyed by
/// entity code. A repeated code is fatal; a record without a fallback
/// display name is skipped. Optional attributes pass through verbatim —
/// an absent value stays absent rather than becoming a default.
pub fn build_dictionary(
    batches: &[Vec<EntityCandidate>],
    registry: &mut ValidationRegistry,
) -> (Dictionary, IngestSummary) {
    let mut merged: BTreeMap<String, Entity> = BTreeMap::new();
    let mut summary = IngestSummary::default();

    for batch in batches {
        for candidate in batch {
            let code = candidate.code.trim().to_ascii_uppercase();
            let subject = format!("entity {code}");
            if !is_valid_code(&code) {
                registry.record(
                    &subject,
                    "invalid_code",
                    format!("entity code {:?} is not two uppercase letters", candidate.code),
                );
                continue;
            }
            if merged.contains_key(&code) {
                registry.record(
                    &subject,
                    "duplicate_code",
                    format!("entity code {code:?} appears in more than one candidate record"),
                );
                continue;
            }

            let name_en = candidate
                .name_en
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty());
            let Some(name_en) = name_en else {
                summary
                    .skipped
                    .push(format!("{code}: missing fallback display name"));
                continue;
            };

            let name_ja = candidate
                .name_ja
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string);
            if name_ja.is_some() {
                summary.with_localized_name += 1;
            }

            merged.insert(
                code.clone(),
                Entity {
                    code,
                    name_en: name_en.to_string(),
                    name_ja,
                    region: candidate.region.clone(),
                    subregion: candidate.subregion.clone(),
                    landlocked: candidate.landlocked,
                    un_member: candidate.un_member,
                    capital: candidate.capital.clone(),
                },
            );
        }
    }

    summary.total = merged.len();
    let dictionary = Dictionary {
        id: DATASET_ID.to_string(),
        schema: DATASET_SCHEMA.to_string(),
        entities: merged.into_values().collect(),
    };
    (dictionary, summary)
}
