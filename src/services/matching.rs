//! Textual similarity primitives shared by the resolver and post-processor.

use crate::models::{CatalogEntry, Seed};
use std::collections::HashSet;

/// Punctuation stripped during title normalization. Covers both ASCII and
/// fullwidth forms so Japanese titles normalize the same way as English ones.
const STRIP_CHARS: &[char] = &[
    '【', '】', '［', '］', '[', ']', '(', ')', '（', '）', ',', ':', '：', ';', '・', '-', '–',
    '—', '\'', '’', '"', '“', '”', '!', '！', '?', '？',
];

/// Weight of title similarity in the resolution score
const TITLE_WEIGHT: f64 = 0.75;
/// Bonus when the seed's primary author appears within the entry's
const AUTHOR_BONUS: f64 = 0.2;
/// Bonus when the seed ISBN appears within the entry's ISBN-13
const ISBN_BONUS: f64 = 0.5;

/// Lowercase, strip punctuation, collapse internal whitespace
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped: String = lowered
        .chars()
        .map(|c| if STRIP_CHARS.contains(&c) { ' ' } else { c })
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Jaccard similarity over whitespace-split tokens of the normalized titles
pub fn token_set_similarity(a: &str, b: &str) -> f64 {
    let na = normalize_title(a);
    let nb = normalize_title(b);
    let set_a: HashSet<&str> = na.split_whitespace().collect();
    let set_b: HashSet<&str> = nb.split_whitespace().collect();

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count().max(1);
    intersection as f64 / union as f64
}

/// Score a catalog entry against a seed: title similarity plus author and
/// ISBN bonuses. The resolver picks the maximum-scoring entry, first wins
/// on ties.
pub fn score_against_seed(entry: &CatalogEntry, seed: &Seed) -> f64 {
    let mut score =
        token_set_similarity(seed.title.as_deref().unwrap_or(""), &entry.title) * TITLE_WEIGHT;

    if let (Some(seed_author), Some(entry_author)) = (seed.primary_author(), entry.primary_author())
    {
        if entry_author
            .to_lowercase()
            .contains(&seed_author.to_lowercase())
        {
            score += AUTHOR_BONUS;
        }
    }

    if let (Some(isbn), Some(isbn13)) = (seed.isbn.as_deref(), entry.isbn13.as_deref()) {
        if !isbn.is_empty() && isbn13.contains(isbn) {
            score += ISBN_BONUS;
        }
    }

    score
}
