use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Dictionary, Entity, MIN_ANSWERS, Theme};
use crate::text::{initial_char, initial_slug, kana_row, slug};

pub const DERIVED_CATEGORY_ID: &str = "geography";
pub const DERIVED_CATEGORY_TITLE: &str = "世界地理";

/// Localized labels for the region and sub-region values the upstream
/// directory is known to use. Anything absent from the table keeps its
/// original label; labels are never guessed.
const REGION_LABELS: &[(&str, &str)] = &[
    ("Africa", "アフリカ"),
    ("Americas", "アメリカ"),
    ("Antarctic", "南極"),
    ("Asia", "アジア"),
    ("Europe", "ヨーロッパ"),
    ("Oceania", "オセアニア"),
    ("Australia and New Zealand", "オーストラリア・ニュージーランド"),
    ("Caribbean", "カリブ海地域"),
    ("Central America", "中央アメリカ"),
    ("Central Asia", "中央アジア"),
    ("Eastern Africa", "東アフリカ"),
    ("Eastern Asia", "東アジア"),
    ("Eastern Europe", "東ヨーロッパ"),
    ("Melanesia", "メラネシア"),
    ("Micronesia", "ミクロネシア"),
    ("Middle Africa", "中部アフリカ"),
    ("North America", "北アメリカ"),
    ("Northern Africa", "北アフリカ"),
    ("Northern Europe", "北ヨーロッパ"),
    ("Polynesia", "ポリネシア"),
    ("South America", "南アメリカ"),
    ("South-Eastern Asia", "東南アジア"),
    ("Southern Africa", "南部アフリカ"),
    ("Southern Asia", "南アジア"),
    ("Southern Europe", "南ヨーロッパ"),
    ("Western Africa", "西アフリカ"),
    ("Western Asia", "西アジア"),
    ("Western Europe", "西ヨーロッパ"),
];

/// Derivation output: quiz-ready themes plus the groups suppressed for
/// falling below the answer threshold.
#[derive(Debug, Clone, Default)]
pub struct DerivedThemes {
    pub themes: Vec<Theme>,
    pub suppressed: Vec<String>,
}

/// Synthesize themes from the canonical dictionary along the four grouping
/// axes: region, sub-region, landlocked flag, and initial letter (exact
/// character and kana row). Only entities with verified membership
/// participate; an absent flag excludes the entity, it is never treated as
/// `false`.
pub fn derive_themes(dictionary: &Dictionary) -> DerivedThemes {
    let members: Vec<&Entity> = dictionary
        .entities
        .iter()
        .filter(|entity| entity.un_member == Some(true))
        .collect();

    let mut groups: BTreeMap<String, (String, BTreeSet<String>)> = BTreeMap::new();

    for entity in &members {
        let name = entity.display_name();

        if let Some(region) = entity.region.as_deref() {
            collect(
                &mut groups,
                format!("region_{}", slug(region)),
                format!("{}の国", localized_label(region)),
                name,
            );
        }
        if let Some(subregion) = entity.subregion.as_deref() {
            collect(
                &mut groups,
                format!("subregion_{}", slug(subregion)),
                format!("{}の国", localized_label(subregion)),
                name,
            );
        }
        match entity.landlocked {
            Some(true) => collect(
                &mut groups,
                "landlocked_yes".to_string(),
                "内陸国".to_string(),
                name,
            ),
            Some(false) => collect(
                &mut groups,
                "landlocked_no".to_string(),
                "海に面した国".to_string(),
                name,
            ),
            None => {}
        }
        if let Some(initial) = initial_char(name) {
            collect(
                &mut groups,
                format!("initial_{}", initial_slug(initial)),
                format!("「{initial}」で始まる国"),
                name,
            );
            if let Some(row) = kana_row(initial) {
                collect(
                    &mut groups,
                    format!("kana_row_{}", row.slug()),
                    format!("「{}」行で始まる国", row.kana()),
                    name,
                );
            }
        }
    }

    let mut derived = DerivedThemes::default();
    for (id, (title, answers)) in groups {
        if answers.len() < MIN_ANSWERS {
            derived
                .suppressed
                .push(format!("{id}: {} answers", answers.len()));
            continue;
        }
        derived.themes.push(Theme {
            id,
            title,
            category_id: DERIVED_CATEGORY_ID.to_string(),
            category_title: DERIVED_CATEGORY_TITLE.to_string(),
            answers: answers.into_iter().collect(),
        });
    }
    derived
}

fn collect(
    groups: &mut BTreeMap<String, (String, BTreeSet<String>)>,
    id: String,
    title: String,
    answer: &str,
) {
    groups
        .entry(id)
        .or_insert_with(|| (title, BTreeSet::new()))
        .1
        .insert(answer.to_string());
}

fn localized_label(name: &str) -> &str {
    REGION_LABELS
        .iter()
        .find(|(english, _)| *english == name)
        .map_or(name, |&(_, localized)| localized)
}

#[cfg(test)]
mod tests {
    use super::{DERIVED_CATEGORY_ID, derive_themes, localized_label};
    use crate::model::{DATASET_ID, DATASET_SCHEMA, Dictionary, Entity};

    fn entity(code: &str, name_ja: &str, region: &str) -> Entity {
        Entity {
            code: code.to_string(),
            name_en: code.to_string(),
            name_ja: Some(name_ja.to_string()),
            region: Some(region.to_string()),
            subregion: None,
            landlocked: None,
            un_member: Some(true),
            capital: None,
        }
    }

    fn dictionary(entities: Vec<Entity>) -> Dictionary {
        Dictionary {
            id: DATASET_ID.to_string(),
            schema: DATASET_SCHEMA.to_string(),
            entities,
        }
    }

    const ASIA_NAMES: [&str; 10] = [
        "日本",
        "中国",
        "韓国",
        "インド",
        "タイ",
        "ベトナム",
        "ネパール",
        "ブータン",
        "ラオス",
        "モンゴル",
    ];

    fn asia_entities(count: usize) -> Vec<Entity> {
        let codes = ["JP", "CN", "KR", "IN", "TH", "VN", "NP", "BT", "LA", "MN"];
        (0..count)
            .map(|i| entity(codes[i], ASIA_NAMES[i], "Asia"))
            .collect()
    }

    fn other_region_entities() -> Vec<Entity> {
        let rows = [
            ("FR", "フランス"),
            ("DE", "ドイツ"),
            ("IT", "イタリア"),
            ("ES", "スペイン"),
            ("PT", "ポルトガル"),
            ("NL", "オランダ"),
            ("BE", "ベルギー"),
            ("AT", "オーストリア"),
        ];
        rows.iter()
            .map(|(code, name)| entity(code, name, "Europe"))
            .collect()
    }

    #[test]
    fn region_group_below_threshold_is_suppressed() {
        let mut entities = asia_entities(9);
        entities.extend(other_region_entities());
        let derived = derive_themes(&dictionary(entities));
        assert!(!derived.themes.iter().any(|theme| theme.id == "region_asia"));
        assert!(
            derived
                .suppressed
                .iter()
                .any(|note| note.starts_with("region_asia:"))
        );
    }

    #[test]
    fn region_group_at_threshold_is_emitted_sorted() {
        let mut entities = asia_entities(10);
        entities.extend(other_region_entities());
        let derived = derive_themes(&dictionary(entities));
        let theme = derived
            .themes
            .iter()
            .find(|theme| theme.id == "region_asia")
            .expect("region_asia theme");
        assert_eq!(theme.title, "アジアの国");
        assert_eq!(theme.category_id, DERIVED_CATEGORY_ID);
        assert_eq!(theme.answers.len(), 10);
        let mut sorted = theme.answers.clone();
        sorted.sort();
        assert_eq!(theme.answers, sorted);
    }

    #[test]
    fn entities_without_membership_flag_are_excluded() {
        let mut entities = asia_entities(10);
        entities[0].un_member = None;
        entities[1].un_member = Some(false);
        let derived = derive_themes(&dictionary(entities));
        assert!(!derived.themes.iter().any(|theme| theme.id == "region_asia"));
        assert!(
            derived
                .suppressed
                .iter()
                .any(|note| note.starts_with("region_asia: 8"))
        );
    }

    #[test]
    fn absent_landlocked_flag_joins_neither_group() {
        let mut entities = asia_entities(10);
        for entity in entities.iter_mut().take(10) {
            entity.landlocked = Some(false);
        }
        entities[3].landlocked = None;
        let derived = derive_themes(&dictionary(entities));
        assert!(
            derived
                .suppressed
                .iter()
                .any(|note| note.starts_with("landlocked_no: 9"))
        );
        assert!(!derived.suppressed.iter().any(|note| note.starts_with("landlocked_yes")));
    }

    #[test]
    fn missing_localized_name_falls_back_to_the_required_name() {
        let mut entities = asia_entities(10);
        entities[0].name_ja = None;
        entities[0].name_en = "Japan".to_string();
        let derived = derive_themes(&dictionary(entities));
        let theme = derived
            .themes
            .iter()
            .find(|theme| theme.id == "region_asia")
            .expect("region_asia theme");
        assert!(theme.answers.contains(&"Japan".to_string()));
        assert!(!theme.answers.contains(&"日本".to_string()));
    }

    #[test]
    fn initial_letter_groups_use_hex_slugs_for_kana() {
        // ten katakana names sharing the same initial ア
        let names = [
            "アイスランド",
            "アイルランド",
            "アゼルバイジャン",
            "アフガニスタン",
            "アメリカ",
            "アラブ首長国連邦",
            "アルジェリア",
            "アルゼンチン",
            "アルバニア",
            "アルメニア",
        ];
        let codes = ["IS", "IE", "AZ", "AF", "US", "AE", "DZ", "AR", "AL", "AM"];
        let entities: Vec<Entity> = names
            .iter()
            .zip(codes.iter())
            .map(|(name, code)| entity(code, name, "Mixed"))
            .collect();
        let derived = derive_themes(&dictionary(entities));
        let exact = derived
            .themes
            .iter()
            .find(|theme| theme.id == "initial_30a2")
            .expect("exact-initial theme");
        assert_eq!(exact.title, "「ア」で始まる国");
        assert_eq!(exact.answers.len(), 10);
        let row = derived
            .themes
            .iter()
            .find(|theme| theme.id == "kana_row_a")
            .expect("kana-row theme");
        assert_eq!(row.title, "「あ」行で始まる国");
        assert_eq!(row.answers.len(), 10);
    }

    #[test]
    fn themes_are_ordered_by_identifier() {
        let mut entities = asia_entities(10);
        entities.extend(other_region_entities());
        let derived = derive_themes(&dictionary(entities));
        let ids: Vec<&str> = derived.themes.iter().map(|theme| theme.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn unknown_region_label_falls_back_to_input() {
        assert_eq!(localized_label("Asia"), "アジア");
        assert_eq!(localized_label("Atlantis"), "Atlantis");
    }
}
