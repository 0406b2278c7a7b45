//! Clinical text helpers shared by the deterministic stages: sentence and
//! clause splitting, negation-aware keyword lookup, and significant-token
//! overlap.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?](?:\s+|$)|[;\n]+").expect("Invalid sentence boundary pattern"));

static CLAUSE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s+|\s+but\s+").expect("Invalid clause boundary pattern"));

/// Negation cue before a term: "no mass", "denies chest pain".
static NEGATION_BEFORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:no|not|denies|denied|without|negative\s+for|free\s+of|absence\s+of)\b")
        .expect("Invalid negation pattern")
});

/// Negation cue after a term: "referral not required", "malignancy ruled out".
static NEGATION_AFTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\W*(?:is\s+|was\s+|are\s+)?(?:not\s+(?:required|needed|indicated|necessary|warranted|seen|present)|ruled\s+out|excluded|unlikely)\b")
        .expect("Invalid negation pattern")
});

/// Compounds whose words must not count as findings on their own.
const NON_FINDING_COMPOUNDS: &[&str] = &[
    "body mass index", "body mass", "mass index", "muscle mass", "bone mass", "lean mass",
    "fat mass", "bone mineral density",
];

/// Words too generic to ground one clinical entity in another.
const STOPWORDS: &[&str] = &[
    "and", "the", "for", "with", "from", "per", "day", "daily", "once", "twice", "times",
    "tablet", "tablets", "tab", "cap", "capsule", "dose", "test", "tests", "level", "levels",
    "check", "repeat", "type", "your", "you", "this", "that", "before", "after", "meals",
    "mg", "mcg", "ml", "weeks", "week", "months", "month", "year", "years",
    "chronic", "acute", "disease", "disorder", "syndrome", "mild", "moderate", "severe",
    "stage", "right", "left", "upper", "lower", "history", "known", "new",
];

/// Split free text at sentence ends, semicolons and newlines. Decimal points
/// inside numbers do not split.
pub fn sentences(text: &str) -> Vec<&str> {
    SENTENCE_BOUNDARY
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Split a sentence into clauses at commas and "but"; negation scope.
pub fn clauses(sentence: &str) -> Vec<&str> {
    CLAUSE_BOUNDARY
        .split(sentence)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect()
}

/// Byte offset of `term_lower` in `haystack_lower` as a whole word.
fn find_term(haystack_lower: &str, term_lower: &str) -> Option<usize> {
    if term_lower.is_empty() {
        return None;
    }
    let mut from = 0;
    while let Some(pos) = haystack_lower[from..].find(term_lower) {
        let start = from + pos;
        let end = start + term_lower.len();
        let left_ok = haystack_lower[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let right_ok = haystack_lower[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if left_ok && right_ok {
            return Some(start);
        }
        from = end;
    }
    None
}

/// Whether `text` contains `term` as a whole word, ignoring negation.
pub fn contains_term(text: &str, term: &str) -> bool {
    find_term(&text.to_lowercase(), &term.to_lowercase()).is_some()
}

/// Blank out non-finding compounds, keeping byte offsets stable.
fn mask_compounds(mut lower: String) -> String {
    for compound in NON_FINDING_COMPOUNDS {
        while let Some(at) = find_term(&lower, compound) {
            lower.replace_range(at..at + compound.len(), &" ".repeat(compound.len()));
        }
    }
    lower
}

/// Whether `clause` affirmatively mentions `term`: the term is present and
/// no negation cue precedes or directly follows it.
pub fn affirms(clause: &str, term: &str) -> bool {
    let lower = mask_compounds(clause.to_lowercase());
    let term_lower = term.to_lowercase();
    match find_term(&lower, &term_lower) {
        Some(at) => {
            let before = &lower[..at];
            let after = &lower[at + term_lower.len()..];
            !NEGATION_BEFORE.is_match(before) && !NEGATION_AFTER.is_match(after)
        }
        None => false,
    }
}

fn sentence_affirms(sentence: &str, term: &str) -> bool {
    clauses(sentence).iter().any(|clause| affirms(clause, term))
}

/// Whether any clause of `text` affirmatively mentions `term`.
pub fn affirmed_in(text: &str, term: &str) -> bool {
    sentences(text).iter().any(|sentence| sentence_affirms(sentence, term))
}

/// First sentence in `text` that affirmatively mentions any of `terms`,
/// with the term that matched.
pub fn find_affirmed<'t>(text: &'t str, terms: &[&'static str]) -> Option<(&'static str, &'t str)> {
    sentences(text).into_iter().find_map(|sentence| {
        terms
            .iter()
            .find(|term| sentence_affirms(sentence, term))
            .map(|term| (*term, sentence))
    })
}

/// Lowercased alphanumeric tokens of length ≥ 3 that are not stopwords.
pub fn significant_tokens(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|t| t.chars().count() >= 3 && !t.chars().all(|c| c.is_ascii_digit()))
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Whether two texts name a common clinical entity.
pub fn shares_token(a: &str, b: &str) -> bool {
    let left = significant_tokens(a);
    if left.is_empty() {
        return false;
    }
    significant_tokens(b).iter().any(|t| left.contains(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_mass_index_is_not_a_mass() {
        assert!(!affirmed_in("Obesity, body mass index 32", "mass"));
        assert!(!affirmed_in("Reduced muscle mass. BMI rising", "mass"));
        assert!(affirmed_in("Palpable mass in the left breast", "mass"));
    }

    #[test]
    fn sentences_keep_decimals_intact() {
        let parts = sentences("Opacity measuring 2.5 cm. No effusion; HbA1c 7.4%, stable");
        assert_eq!(parts, vec!["Opacity measuring 2.5 cm", "No effusion", "HbA1c 7.4%, stable"]);
    }

    #[test]
    fn clauses_split_on_commas_and_but() {
        let parts = clauses("No fever, productive cough but no hemoptysis");
        assert_eq!(parts, vec!["No fever", "productive cough", "no hemoptysis"]);
    }

    #[test]
    fn term_requires_word_boundaries() {
        assert!(contains_term("Suspicious MASS in left lobe", "mass"));
        assert!(!contains_term("Advised massage therapy", "mass"));
    }

    #[test]
    fn negated_clause_is_not_affirmed() {
        assert!(!affirms("No suspicious lesion seen", "lesion"));
        assert!(!affirms("Patient denies chest pain", "chest pain"));
        assert!(!affirms("Referral not required at present", "referral"));
        assert!(!affirms("Malignancy ruled out on biopsy", "malignancy"));
        assert!(affirms("Chest pain radiating to the left arm", "chest pain"));
    }

    #[test]
    fn find_affirmed_returns_whole_sentence() {
        let text = "No mass palpable. Right upper lobe opacity, suspicious for malignancy.";
        let (term, sentence) = find_affirmed(text, &["mass", "suspicious"]).unwrap();
        assert_eq!(term, "suspicious");
        assert_eq!(sentence, "Right upper lobe opacity, suspicious for malignancy");
    }

    #[test]
    fn negation_is_scoped_to_its_clause() {
        let text = "No fever, suspicious nodule in left lung";
        assert!(find_affirmed(text, &["nodule"]).is_some());
        assert!(find_affirmed(text, &["fever"]).is_none());
    }

    #[test]
    fn shares_token_ignores_dosage_words() {
        assert!(shares_token("Metformin 500mg twice daily", "Metformin"));
        assert!(!shares_token("Vitamin D 1000 IU daily", "Metformin 500mg daily"));
    }

    #[test]
    fn significant_tokens_drop_numbers_and_stopwords() {
        let tokens = significant_tokens("Repeat HbA1c test in 3 months");
        assert_eq!(tokens.into_iter().collect::<Vec<_>>(), vec!["hba1c"]);
    }
}
