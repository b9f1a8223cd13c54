//! Recommendation post-processing: reconcile raw LLM output against the
//! candidate pool, drop self-matches, score multi-seed relevance, and
//! re-rank under a per-seed diversity cap.
//!
//! Pure function of its inputs: running it twice on the same raw list and
//! pool yields the same ordered output.

use crate::{
    models::{CatalogEntry, RawRecommendation, Recommendation, ResolvedSeed, SourceRef},
    services::matching::normalize_title,
};
use std::collections::{HashMap, HashSet};

/// Confidence assumed when the model omits one
const DEFAULT_CONFIDENCE: f64 = 0.5;
/// Reward per seed the recommendation is related to
const RELATED_WEIGHT: f64 = 0.22;
/// Penalty for recommendations tied to exactly one seed, discouraging
/// over-fitting to a single input book
const SINGLE_SEED_PENALTY: f64 = 0.15;

struct ScoredRecommendation {
    recommendation: Recommendation,
    score: f64,
    /// Normalized relatedTo entries that name actual seeds, in order
    related: Vec<String>,
}

/// Enrich, filter, score and re-rank raw LLM recommendations.
///
/// `target_count` bounds the output; fewer are returned when not enough
/// recommendations survive filtering.
pub fn post_process(
    raw: Vec<RawRecommendation>,
    pool: &[CatalogEntry],
    resolved_seeds: &[ResolvedSeed],
    target_count: usize,
) -> Vec<Recommendation> {
    let seed_titles: HashSet<String> = resolved_seeds
        .iter()
        .filter_map(|seed| seed.title())
        .map(normalize_title)
        .filter(|t| !t.is_empty())
        .collect();
    // Only resolved seeds expose an ISBN; unresolved seeds are not
    // ISBN-compared, so a near-duplicate can pass when resolution failed
    let seed_isbns: HashSet<&str> = resolved_seeds.iter().filter_map(|s| s.isbn13()).collect();

    let mut scored: Vec<ScoredRecommendation> = raw
        .into_iter()
        .map(|rec| enrich(rec, pool))
        .filter(|(rec, _)| !is_self_match(rec, pool, &seed_titles, &seed_isbns))
        .map(|(rec, related_to)| score(rec, related_to, &seed_titles))
        .collect();

    // Stable: equal scores keep their original relative order
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    diversify(scored, target_count)
}

/// Attach authoritative metadata from the first pool entry whose normalized
/// title matches, or whose primary author equals the recommendation's
/// (case-insensitive). Candidate values take precedence; the
/// recommendation's own values remain as fallback.
fn enrich(raw: RawRecommendation, pool: &[CatalogEntry]) -> (Recommendation, Vec<String>) {
    let normalized = normalize_title(&raw.title);
    let raw_author = raw.authors.first().map(|a| a.to_lowercase());

    let hit = pool.iter().find(|candidate| {
        if normalize_title(&candidate.title) == normalized {
            return true;
        }
        match (&raw_author, candidate.primary_author()) {
            (Some(author), Some(candidate_author)) => {
                candidate_author.to_lowercase() == *author
            }
            _ => false,
        }
    });

    let mut rec = Recommendation {
        title: raw.title,
        authors: raw.authors,
        reason: raw.reason,
        confidence: raw.confidence,
        related_to: raw.related_to.clone(),
        isbn13: None,
        cover_url: None,
        description: None,
        language: None,
        published_year: None,
        source: None,
    };

    if let Some(candidate) = hit {
        rec.isbn13 = candidate.isbn13.clone();
        rec.cover_url = candidate.cover_url.clone();
        rec.description = candidate.description.clone();
        rec.language = candidate.language.clone();
        rec.published_year = candidate.published_year;
        rec.source = Some(SourceRef {
            api: candidate.source,
            id: candidate
                .source_id
                .clone()
                .or_else(|| candidate.isbn13.clone())
                .unwrap_or_default(),
            info_url: candidate.info_url(),
        });
    }

    (rec, raw.related_to)
}

/// A recommendation is a self-match when its normalized title names a seed,
/// or when the pool entry sharing its normalized title carries a resolved
/// seed's ISBN
fn is_self_match(
    rec: &Recommendation,
    pool: &[CatalogEntry],
    seed_titles: &HashSet<String>,
    seed_isbns: &HashSet<&str>,
) -> bool {
    let normalized = normalize_title(&rec.title);
    if seed_titles.contains(&normalized) {
        return true;
    }
    pool.iter()
        .find(|candidate| normalize_title(&candidate.title) == normalized)
        .and_then(|candidate| candidate.isbn13.as_deref())
        .is_some_and(|isbn| seed_isbns.contains(isbn))
}

fn score(
    recommendation: Recommendation,
    related_to: Vec<String>,
    seed_titles: &HashSet<String>,
) -> ScoredRecommendation {
    let related: Vec<String> = related_to
        .iter()
        .map(|title| normalize_title(title))
        .filter(|title| seed_titles.contains(title))
        .collect();
    let related_count = related.len();

    let base = recommendation.confidence.unwrap_or(DEFAULT_CONFIDENCE);
    let penalty = if related_count == 1 {
        SINGLE_SEED_PENALTY
    } else {
        0.0
    };
    let score = base + RELATED_WEIGHT * related_count as f64 - penalty;

    ScoredRecommendation {
        recommendation,
        score,
        related,
    }
}

/// Per-seed diversity cap: at most `ceil(target/2)` primary-fill slots per
/// main seed. Recommendations with no related seed are always deferred to
/// the overflow list, which fills any remaining slots in score order.
fn diversify(scored: Vec<ScoredRecommendation>, target_count: usize) -> Vec<Recommendation> {
    let cap = target_count.div_ceil(2);
    let mut per_seed: HashMap<&str, usize> = HashMap::new();
    let mut picked: Vec<&ScoredRecommendation> = Vec::new();
    let mut overflow: Vec<&ScoredRecommendation> = Vec::new();

    for rec in &scored {
        match rec.related.first() {
            Some(main_seed) => {
                let count = per_seed.entry(main_seed.as_str()).or_insert(0);
                if *count < cap {
                    *count += 1;
                    picked.push(rec);
                } else {
                    overflow.push(rec);
                }
            }
            None => overflow.push(rec),
        }
        if picked.len() >= target_count {
            break;
        }
    }

    for rec in overflow {
        if picked.len() >= target_count {
            break;
        }
        picked.push(rec);
    }

    picked
        .into_iter()
        .take(target_count)
        .map(|rec| rec.recommendation.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogSource, EntryMetadata, Seed};

    fn seed(title: &str, isbn13: Option<&str>) -> ResolvedSeed {
        let entry = isbn13.map(|isbn| CatalogEntry {
            title: title.to_string(),
            authors: vec![],
            isbn13: Some(isbn.to_string()),
            language: None,
            published_year: None,
            description: None,
            cover_url: None,
            source: CatalogSource::Google,
            source_id: None,
            metadata: EntryMetadata::default(),
        });
        ResolvedSeed {
            seed: Seed::from_title(title),
            entry,
        }
    }

    fn candidate(title: &str, author: Option<&str>, isbn13: Option<&str>) -> CatalogEntry {
        CatalogEntry {
            title: title.to_string(),
            authors: author.map(|a| vec![a.to_string()]).unwrap_or_default(),
            isbn13: isbn13.map(str::to_string),
            language: Some("en".to_string()),
            published_year: Some(2008),
            description: Some("desc".to_string()),
            cover_url: Some("http://covers/1.jpg".to_string()),
            source: CatalogSource::Google,
            source_id: Some("g1".to_string()),
            metadata: EntryMetadata::default(),
        }
    }

    fn raw(title: &str, confidence: Option<f64>, related_to: &[&str]) -> RawRecommendation {
        RawRecommendation {
            title: title.to_string(),
            authors: vec![],
            reason: "because".to_string(),
            confidence,
            related_to: related_to.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_enrich_attaches_candidate_metadata() {
        let pool = vec![candidate(
            "Refactoring",
            Some("Martin Fowler"),
            Some("9780134757599"),
        )];
        let out = post_process(vec![raw("Refactoring", None, &[])], &pool, &[], 5);

        assert_eq!(out.len(), 1);
        let rec = &out[0];
        assert_eq!(rec.isbn13, Some("9780134757599".to_string()));
        assert_eq!(rec.cover_url, Some("http://covers/1.jpg".to_string()));
        assert_eq!(rec.published_year, Some(2008));
        let source = rec.source.as_ref().unwrap();
        assert_eq!(source.api, CatalogSource::Google);
        assert_eq!(source.id, "g1");
    }

    #[test]
    fn test_enrich_matches_by_primary_author() {
        let pool = vec![candidate(
            "Refactoring: Improving the Design",
            Some("Martin Fowler"),
            Some("9780134757599"),
        )];
        let mut rec = raw("Some Other Rendering Of The Title", None, &[]);
        rec.authors = vec!["MARTIN FOWLER".to_string()];

        let out = post_process(vec![rec], &pool, &[], 5);
        assert_eq!(out[0].isbn13, Some("9780134757599".to_string()));
    }

    #[test]
    fn test_unmatched_recommendation_has_no_source() {
        let out = post_process(vec![raw("Unknown Book", None, &[])], &[], &[], 5);
        assert_eq!(out.len(), 1);
        assert!(out[0].source.is_none());
        assert!(out[0].isbn13.is_none());
    }

    #[test]
    fn test_self_match_by_title_excluded_regardless_of_punctuation() {
        // Scenario: "clean  code!" normalizes identically to seed "Clean Code"
        let seeds = vec![seed("Clean Code", None)];
        let out = post_process(vec![raw("clean  code!", None, &[])], &[], &seeds, 5);
        assert!(out.is_empty());
    }

    #[test]
    fn test_self_match_by_isbn_of_resolved_seed_excluded() {
        let seeds = vec![seed("Clean Code", Some("9780132350884"))];
        // Different title, but the title-matched pool entry carries the
        // seed's ISBN
        let pool = vec![candidate("Clean Code 2nd Edition", None, Some("9780132350884"))];
        let out = post_process(
            vec![raw("Clean Code 2nd Edition", None, &[])],
            &pool,
            &seeds,
            5,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_unresolved_seed_is_not_isbn_compared() {
        // Documented behavior: seeds that failed to resolve expose no ISBN,
        // so an ISBN-duplicate recommendation passes the filter
        let seeds = vec![seed("Clean Code", None)];
        let pool = vec![candidate("Clean Code 2nd Edition", None, Some("9780132350884"))];
        let out = post_process(
            vec![raw("Clean Code 2nd Edition", None, &[])],
            &pool,
            &seeds,
            5,
        );
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_scoring_multi_seed_and_tie_order() {
        // Scenario: two recommendations each related to 3 seeds at
        // confidence 0.5: score 0.5 + 0.22*3 = 1.16, tie broken by input
        // order. A third related to one seed is penalized below them.
        let seeds = vec![seed("A", None), seed("B", None), seed("C", None)];
        let recs = vec![
            raw("First", Some(0.5), &["A", "B", "C"]),
            raw("Second", Some(0.5), &["C", "B", "A"]),
            raw("Single", Some(0.9), &["A"]),
        ];
        let out = post_process(recs, &[], &seeds, 5);
        assert_eq!(out[0].title, "First");
        assert_eq!(out[1].title, "Second");
        // 0.9 + 0.22 - 0.15 = 0.97 < 1.16
        assert_eq!(out[2].title, "Single");
    }

    #[test]
    fn test_related_to_ignores_unknown_titles() {
        let seeds = vec![seed("A", None)];
        // relatedTo names a book that is not a seed; it contributes nothing
        let recs = vec![
            raw("X", Some(0.5), &["Nonexistent", "A"]),
            raw("Y", Some(0.5), &[]),
        ];
        let out = post_process(recs, &[], &seeds, 5);
        // X: 0.5 + 0.22 - 0.15 = 0.57 beats Y's flat 0.5
        assert_eq!(out[0].title, "X");
        assert_eq!(out[1].title, "Y");
    }

    #[test]
    fn test_diversity_cap_limits_dominant_seed() {
        // Scenario: n=5, cap=3; four picks relate primarily to seed A and
        // one to seed B. Primary fill admits 3 from A and 1 from B; the
        // deferred A pick fills the remaining slot from overflow.
        let seeds = vec![seed("A", None), seed("B", None)];
        let recs = vec![
            raw("A1", Some(0.9), &["A"]),
            raw("A2", Some(0.8), &["A"]),
            raw("A3", Some(0.7), &["A"]),
            raw("A4", Some(0.6), &["A"]),
            raw("B1", Some(0.5), &["B"]),
        ];
        let out = post_process(recs, &[], &seeds, 5);
        assert_eq!(out.len(), 5);
        let titles: Vec<&str> = out.iter().map(|r| r.title.as_str()).collect();
        // A4 is deferred past B1 despite its higher score
        assert_eq!(titles, vec!["A1", "A2", "A3", "B1", "A4"]);
    }

    #[test]
    fn test_unrelated_recommendations_fill_from_overflow() {
        let seeds = vec![seed("A", None)];
        let recs = vec![
            raw("Unrelated", Some(0.99), &[]),
            raw("Related", Some(0.5), &["A"]),
        ];
        let out = post_process(recs, &[], &seeds, 2);
        // The unrelated pick scores higher but is always deferred
        assert_eq!(out[0].title, "Related");
        assert_eq!(out[1].title, "Unrelated");
    }

    #[test]
    fn test_truncates_to_target_count() {
        let recs: Vec<RawRecommendation> = (0..10)
            .map(|i| raw(&format!("Book {}", i), Some(0.5), &[]))
            .collect();
        let out = post_process(recs, &[], &[], 3);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_idempotent_for_fixed_inputs() {
        let seeds = vec![seed("A", None), seed("B", None)];
        let pool = vec![candidate("Refactoring", Some("Martin Fowler"), None)];
        let recs = vec![
            raw("Refactoring", Some(0.6), &["A", "B"]),
            raw("Other", Some(0.6), &["B"]),
            raw("Third", None, &[]),
        ];
        let first = post_process(recs.clone(), &pool, &seeds, 2);
        let second = post_process(recs, &pool, &seeds, 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_inputs_yield_empty_output() {
        let out = post_process(vec![], &[], &[], 5);
        assert!(out.is_empty());
    }
}
