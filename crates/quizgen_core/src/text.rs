use unicode_normalization::UnicodeNormalization;

/// Bracket pairs whose leading occurrence (including everything up to the
/// matching closer) is dropped before picking the initial character. Names
/// sometimes arrive with a parenthesized annotation prefix.
const BRACKET_PAIRS: &[(char, char)] = &[
    ('（', '）'),
    ('(', ')'),
    ('［', '］'),
    ('[', ']'),
    ('｛', '｝'),
    ('{', '}'),
    ('「', '」'),
    ('『', '』'),
    ('【', '】'),
    ('〈', '〉'),
    ('《', '》'),
    ('＜', '＞'),
    ('<', '>'),
];

/// Leading characters that never count as an initial: mid-dots, hyphen
/// variants, and period/comma variants in both scripts, plus stray quotes.
const SKIP_CHARS: &[char] = &[
    '・', '･', '–', '—', '―', '‐', '‑', '-', '－', '。', '、', '．', '，', '.', ',', '"', '“',
    '”', '\'', '‘', '’', '＂', '＇',
];

const COMBINING_VOICED_MARK: char = '\u{3099}';
const COMBINING_SEMI_VOICED_MARK: char = '\u{309A}';

/// Small/contracted kana folded to their full-size equivalent before row
/// classification.
const SMALL_KANA_FOLD: &[(char, char)] = &[
    ('ぁ', 'あ'),
    ('ぃ', 'い'),
    ('ぅ', 'う'),
    ('ぇ', 'え'),
    ('ぉ', 'お'),
    ('っ', 'つ'),
    ('ゃ', 'や'),
    ('ゅ', 'ゆ'),
    ('ょ', 'よ'),
    ('ゎ', 'わ'),
];

/// The ten gojūon rows used for coarse initial-letter grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KanaRow {
    A,
    Ka,
    Sa,
    Ta,
    Na,
    Ha,
    Ma,
    Ya,
    Ra,
    Wa,
}

impl KanaRow {
    pub fn slug(self) -> &'static str {
        match self {
            Self::A => "a",
            Self::Ka => "ka",
            Self::Sa => "sa",
            Self::Ta => "ta",
            Self::Na => "na",
            Self::Ha => "ha",
            Self::Ma => "ma",
            Self::Ya => "ya",
            Self::Ra => "ra",
            Self::Wa => "wa",
        }
    }

    /// Representative kana used in display titles.
    pub fn kana(self) -> char {
        match self {
            Self::A => 'あ',
            Self::Ka => 'か',
            Self::Sa => 'さ',
            Self::Ta => 'た',
            Self::Na => 'な',
            Self::Ha => 'は',
            Self::Ma => 'ま',
            Self::Ya => 'や',
            Self::Ra => 'ら',
            Self::Wa => 'わ',
        }
    }
}

/// Extract the first display-relevant character of a name: NFC-compose,
/// trim, drop a leading bracketed annotation whole, skip leading
/// punctuation. Advances by whole code points, so astral-plane characters
/// are handled like any other.
pub fn initial_char(name: &str) -> Option<char> {
    let composed: String = name.nfc().collect();
    let chars: Vec<char> = composed.trim().chars().collect();
    let mut index = 0;
    while index < chars.len() {
        let ch = chars[index];
        if let Some(close) = matching_close(ch) {
            match chars[index + 1..].iter().position(|&c| c == close) {
                Some(offset) => index += offset + 2,
                // unmatched opener: drop the opener alone
                None => index += 1,
            }
            continue;
        }
        if is_skippable(ch) {
            index += 1;
            continue;
        }
        return Some(ch);
    }
    None
}

/// Classify a character into its gojūon row. Katakana is folded onto
/// hiragana first, voicing marks are stripped, and small kana are widened;
/// anything outside the hiragana syllabary yields `None`.
pub fn kana_row(ch: char) -> Option<KanaRow> {
    let composed = std::iter::once(ch).nfc().next()?;
    let hiragana = katakana_to_hiragana(composed);
    let plain = strip_voicing_marks(hiragana);
    let full = fold_small_kana(plain);
    classify_row(full)
}

/// Deterministic identifier slug: ASCII letters lowercased, digits kept,
/// every other run of characters collapsed into a single underscore.
pub fn slug(text: &str) -> String {
    let mut out = String::new();
    let mut pending_separator = false;
    for ch in text.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    out
}

/// Identifier-safe token for an initial character: the lowercase ASCII
/// character itself, or the character's code point as lowercase hex padded
/// to four digits, which is collision-free for any script.
pub fn initial_slug(ch: char) -> String {
    if ch.is_ascii_alphanumeric() {
        ch.to_ascii_lowercase().to_string()
    } else {
        format!("{:04x}", ch as u32)
    }
}

fn matching_close(ch: char) -> Option<char> {
    BRACKET_PAIRS
        .iter()
        .find(|(open, _)| *open == ch)
        .map(|&(_, close)| close)
}

fn is_skippable(ch: char) -> bool {
    ch.is_whitespace() || SKIP_CHARS.contains(&ch)
}

fn katakana_to_hiragana(ch: char) -> char {
    let code = ch as u32;
    if (0x30A1..=0x30F6).contains(&code) {
        char::from_u32(code - 0x60).unwrap_or(ch)
    } else {
        ch
    }
}

fn strip_voicing_marks(ch: char) -> char {
    std::iter::once(ch)
        .nfd()
        .filter(|&part| part != COMBINING_VOICED_MARK && part != COMBINING_SEMI_VOICED_MARK)
        .nfc()
        .next()
        .unwrap_or(ch)
}

fn fold_small_kana(ch: char) -> char {
    SMALL_KANA_FOLD
        .iter()
        .find(|(small, _)| *small == ch)
        .map_or(ch, |&(_, full)| full)
}

fn classify_row(ch: char) -> Option<KanaRow> {
    match ch {
        'あ' | 'い' | 'う' | 'え' | 'お' => Some(KanaRow::A),
        'か' | 'き' | 'く' | 'け' | 'こ' => Some(KanaRow::Ka),
        'さ' | 'し' | 'す' | 'せ' | 'そ' => Some(KanaRow::Sa),
        'た' | 'ち' | 'つ' | 'て' | 'と' => Some(KanaRow::Ta),
        'な' | 'に' | 'ぬ' | 'ね' | 'の' => Some(KanaRow::Na),
        'は' | 'ひ' | 'ふ' | 'へ' | 'ほ' => Some(KanaRow::Ha),
        'ま' | 'み' | 'む' | 'め' | 'も' => Some(KanaRow::Ma),
        'や' | 'ゆ' | 'よ' => Some(KanaRow::Ya),
        'ら' | 'り' | 'る' | 'れ' | 'ろ' => Some(KanaRow::Ra),
        'わ' | 'ゐ' | 'ゑ' | 'を' | 'ん' => Some(KanaRow::Wa),
        _ => None,
    }
}
