//! Response similarity
//!
//! Two responses are compared in two steps: a locale-aware exact check
//! (case, diacritics, punctuation and whitespace ignored; symbols and emoji
//! still count) that scores 1.0,
//! then a pluggable [`SimilarityProvider`] for everything else.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use unicode_properties::{GeneralCategoryGroup, UnicodeGeneralCategory};

/// Chance above which a candidate is confirmed without asking the player
pub const AUTO_MATCH_THRESHOLD: f64 = 0.8;

/// Chance above which two responses count as the same response
pub const EXACT_MATCH_THRESHOLD: f64 = 0.9999;

/// Trait for scoring how alike two responses are
pub trait SimilarityProvider: Send + Sync {
    /// Symmetric score in `[0, 1]`; 1.0 is reserved for equal responses
    fn similarity(&self, a: &str, b: &str, locale: &str) -> f64;
}

/// Trim, NFC-normalize, trim again
pub fn normalize_response(text: &str) -> String {
    text.trim().nfc().collect::<String>().trim().to_string()
}

/// Fold a response into its comparison key for the given locale
pub fn fold(text: &str, locale: &str) -> String {
    // dotted/dotless i must be resolved before decomposition strips the dot
    let text: String = if is_turkic(locale) {
        text.chars()
            .map(|c| match c {
                'I' => 'ı',
                'İ' => 'i',
                other => other,
            })
            .collect()
    } else {
        text.to_string()
    };

    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| !is_ignorable(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whitespace and punctuation (Pc, Pd, Ps, Pe, Pi, Pf, Po) do not tell
/// responses apart
fn is_ignorable(c: char) -> bool {
    c.is_whitespace() || c.general_category_group() == GeneralCategoryGroup::Punctuation
}

fn is_turkic(locale: &str) -> bool {
    let lang = locale.split(['-', '_']).next().unwrap_or_default();
    lang.eq_ignore_ascii_case("tr") || lang.eq_ignore_ascii_case("az")
}

/// Score two responses, short-circuiting on folded equality
pub fn match_chance(provider: &dyn SimilarityProvider, a: &str, b: &str, locale: &str) -> f64 {
    let a = normalize_response(a);
    let b = normalize_response(b);
    if fold(&a, locale) == fold(&b, locale) {
        return 1.0;
    }
    provider.similarity(&a, &b, locale).clamp(0.0, 1.0)
}

pub fn exact_matches(provider: &dyn SimilarityProvider, a: &str, b: &str, locale: &str) -> bool {
    match_chance(provider, a, b, locale) > EXACT_MATCH_THRESHOLD
}

/// Normalized Levenshtein similarity over folded responses.
///
/// Catches common misspellings ("definately" vs "definitely") while keeping
/// unrelated words well below [`AUTO_MATCH_THRESHOLD`].
#[derive(Debug, Clone, Default)]
pub struct EditDistanceSimilarity;

impl SimilarityProvider for EditDistanceSimilarity {
    fn similarity(&self, a: &str, b: &str, locale: &str) -> f64 {
        let a: Vec<char> = fold(a, locale).chars().collect();
        let b: Vec<char> = fold(b, locale).chars().collect();
        let longest = a.len().max(b.len());
        if longest == 0 {
            return 1.0;
        }
        let distance = levenshtein(&a, &b);
        1.0 - distance as f64 / longest as f64
    }
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
