//! Local keyword relevance scoring for short tag labels.
//!
//! Remote zero-shot endpoints need an NLI model; when the configured model is
//! an embedding model the labels are scored here instead.

use crate::{top_labels, ClassificationResult, MAX_TAGS};

/// Minimum heuristic score a tag needs to be suggested.
pub const HEURISTIC_THRESHOLD: f32 = 0.2;

const SUBSTRING_WEIGHT: f32 = 0.8;
const FIRST_WORD_WEIGHT: f32 = 0.4;
const EXACT_TOKEN_WEIGHT: f32 = 0.6;
const PREFIX_TOKEN_WEIGHT: f32 = 0.3;
const CONTEXT_WEIGHT: f32 = 0.4;
const MIN_TOKEN_LEN: usize = 3;

/// Category name to trigger words. A category only applies to a tag whose
/// name equals the category exactly.
pub type ContextTable = [(&'static str, &'static [&'static str])];

pub const CONTEXT_KEYWORDS: &ContextTable = &[
    (
        "food",
        &["eat", "cook", "meal", "dinner", "lunch", "breakfast", "restaurant", "recipe", "snack", "pasta"],
    ),
    (
        "cooking",
        &["cook", "recipe", "bake", "pasta", "dinner", "meal", "oven", "kitchen", "ingredient", "making"],
    ),
    (
        "groceries",
        &["buy", "milk", "cheese", "tomato", "bread", "egg", "grocery", "store", "supermarket", "fruit", "vegetable"],
    ),
    (
        "shopping",
        &["buy", "order", "purchase", "store", "shop", "mall", "gift", "sale"],
    ),
    (
        "work",
        &["meeting", "report", "deadline", "project", "client", "office", "email", "boss", "presentation"],
    ),
    (
        "health",
        &["doctor", "dentist", "medicine", "appointment", "pharmacy", "checkup", "sick", "hospital"],
    ),
    (
        "fitness",
        &["gym", "run", "workout", "exercise", "yoga", "swim", "training", "walk"],
    ),
    (
        "travel",
        &["trip", "flight", "hotel", "vacation", "passport", "airport", "booking", "train", "luggage"],
    ),
    (
        "finance",
        &["pay", "bill", "bank", "budget", "tax", "invoice", "rent", "salary", "money"],
    ),
    (
        "family",
        &["mom", "dad", "kids", "sister", "brother", "birthday", "parents", "grandma", "family"],
    ),
    (
        "home",
        &["clean", "laundry", "repair", "garden", "furniture", "plumber", "house", "apartment"],
    ),
    (
        "learning",
        &["read", "book", "course", "study", "learn", "lecture", "tutorial", "practice"],
    ),
    (
        "ideas",
        &["idea", "maybe", "brainstorm", "concept", "plan", "someday"],
    ),
    (
        "urgent",
        &["asap", "urgent", "immediately", "today", "now", "deadline"],
    ),
];

fn tokens(s: &str) -> Vec<String> {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn prefix3(s: &str) -> Option<&str> {
    s.char_indices().nth(MIN_TOKEN_LEN).map(|(i, _)| &s[..i]).or_else(|| {
        (s.chars().count() == MIN_TOKEN_LEN).then_some(s)
    })
}

/// Relevance of `tag` to `text` in [0, 1].
pub fn score(text: &str, tag: &str, table: &ContextTable) -> f32 {
    let note = text.to_lowercase();
    let tag = tag.trim().to_lowercase();
    if tag.is_empty() {
        return 0.0;
    }
    let note_tokens = tokens(&note);
    let tag_tokens = tokens(&tag);
    let mut total = 0.0f32;

    if note.contains(&tag) {
        total += SUBSTRING_WEIGHT;
    }

    if let Some(first) = note_tokens.first() {
        if first.chars().count() >= MIN_TOKEN_LEN && (tag.contains(first.as_str()) || first.contains(&tag)) {
            total += FIRST_WORD_WEIGHT;
        }
    }

    for nt in note_tokens.iter().filter(|t| t.chars().count() >= MIN_TOKEN_LEN) {
        for tt in tag_tokens.iter().filter(|t| t.chars().count() >= MIN_TOKEN_LEN) {
            if nt == tt {
                total += EXACT_TOKEN_WEIGHT;
            } else if prefix3(nt).is_some() && prefix3(nt) == prefix3(tt) {
                total += PREFIX_TOKEN_WEIGHT;
            }
        }
    }

    if let Some((_, keywords)) = table.iter().find(|(category, _)| *category == tag) {
        for keyword in keywords.iter() {
            if note_tokens.iter().any(|t| t.starts_with(keyword)) {
                total += CONTEXT_WEIGHT;
            }
        }
    }

    total.min(1.0)
}

/// Vocabulary entries scoring above [`HEURISTIC_THRESHOLD`], best first.
pub fn rank(text: &str, vocabulary: &[String], table: &ContextTable) -> Vec<String> {
    let results = vocabulary
        .iter()
        .map(|tag| ClassificationResult {
            label: tag.clone(),
            score: score(text, tag, table),
        })
        .collect();
    // sort_by is stable, so equal scores keep vocabulary order
    top_labels(results, HEURISTIC_THRESHOLD)
}

/// Unscored substring/prefix matching, used when nothing clears the
/// heuristic threshold.
pub fn fallback_matches(text: &str, vocabulary: &[String]) -> Vec<String> {
    let note = text.to_lowercase();
    let note_tokens = tokens(&note);
    vocabulary
        .iter()
        .filter(|tag| {
            let tag = tag.trim().to_lowercase();
            if tag.is_empty() {
                return false;
            }
            note.contains(&tag)
                || note_tokens.iter().any(|t| {
                    t.chars().count() >= MIN_TOKEN_LEN && (t.starts_with(&tag) || tag.starts_with(t.as_str()))
                })
        })
        .take(MAX_TAGS)
        .cloned()
        .collect()
}

/// Heuristic suggestion: ranked scores first, raw matching as a last resort.
pub fn suggest(text: &str, vocabulary: &[String]) -> Vec<String> {
    let ranked = rank(text, vocabulary, CONTEXT_KEYWORDS);
    if !ranked.is_empty() {
        return ranked;
    }
    fallback_matches(text, vocabulary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    const PASTA: &str = "I need to buy tomatoes and cheese for making Italian pasta tonight";

    #[test]
    fn pasta_note_prefers_food_tags() {
        let v = vocab(&["groceries", "cooking", "italian", "travel"]);
        let tags = suggest(PASTA, &v);
        assert!(!tags.is_empty());
        assert!(tags.len() <= 3);
        assert!(!tags.contains(&"travel".to_string()));
        assert!(tags.contains(&"italian".to_string()));
        assert!(tags.contains(&"groceries".to_string()));
    }

    #[test]
    fn literal_substring_and_exact_token() {
        assert_eq!(score(PASTA, "italian", CONTEXT_KEYWORDS), 1.0);
        assert_eq!(score(PASTA, "travel", CONTEXT_KEYWORDS), 0.0);
    }

    #[test]
    fn context_bonus_requires_exact_category_name() {
        let table: &ContextTable = &[("food", &["pasta"])];
        assert!((score("pasta tonight", "food", table) - 0.4).abs() < 1e-6);
        assert_eq!(score("pasta tonight", "foods", table), 0.0);
    }

    #[test]
    fn prefix_match_counts_less_than_exact() {
        let table: &ContextTable = &[];
        let exact = score("weekly meeting notes", "meeting", table);
        let prefix = score("weekly meetup notes", "meeting", table);
        assert!(exact > prefix);
        assert!((prefix - 0.3).abs() < 1e-6);
    }

    #[test]
    fn first_word_overlap() {
        let table: &ContextTable = &[];
        // substring (0.8) + first word (0.4) capped
        assert_eq!(score("Gym session", "gym", table), 1.0);
        // "I" is too short to count as an overlap
        assert_eq!(score("I left", "italy", table), 0.0);
    }

    #[test]
    fn fallback_matches_substring_and_prefix() {
        let v = vocab(&["proj", "newyork", "zz"]);
        assert_eq!(
            fallback_matches("trip to new york for the project", &v),
            vec!["proj", "newyork"]
        );
    }

    #[test]
    fn empty_inputs_yield_nothing() {
        assert!(suggest("", &vocab(&["work"])).is_empty());
        assert!(suggest("some text", &[]).is_empty());
    }

    #[test]
    fn case_variants_in_vocabulary_keep_their_own_slot() {
        let v = vocab(&["Work", "work", "a", "food", "new-york"]);
        let tags = crate::restrict_to_vocabulary(suggest("I eat at work in New York", &v), &v);
        assert_eq!(tags, vec!["Work", "work", "new-york"]);
    }

    #[test]
    fn deterministic() {
        let v = vocab(&["groceries", "cooking", "italian", "travel"]);
        assert_eq!(suggest(PASTA, &v), suggest(PASTA, &v));
    }
}
