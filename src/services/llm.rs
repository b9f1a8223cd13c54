//! LLM recommendation collaborator.
//!
//! The model is an opaque function from seed text and candidate text to a
//! structured recommendation list. A structured-generation call with a JSON
//! schema is attempted first; on failure a free-text call with a JSON-only
//! instruction is parsed; on total failure the safe default is an empty
//! list. LLM faults are never fatal to a pipeline run.

use crate::{
    config::Config,
    error::AppResult,
    models::{CatalogEntry, LlmRecommendations, RawRecommendation, ResolvedSeed},
};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// Candidate descriptions are clipped before prompting
const DESCRIPTION_CLIP: usize = 180;

/// Input to one recommendation-generation call
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub seed_text: String,
    pub candidate_text: String,
    pub count: usize,
    pub language: String,
}

/// Opaque recommendation-generation collaborator
#[async_trait::async_trait]
pub trait RecommendationModel: Send + Sync {
    /// Propose recommendations for the given seeds over the candidate list.
    /// A total generation failure yields an empty list, not an error.
    async fn propose(&self, request: &LlmRequest) -> AppResult<Vec<RawRecommendation>>;
}

/// "- {title} / {authors} ({year})" per seed, in seed order
pub fn format_seed_list(seeds: &[ResolvedSeed]) -> String {
    seeds
        .iter()
        .filter_map(|seed| {
            let title = seed.title()?;
            let mut line = format!("- {}", title);
            if let Some(author) = seed.primary_author() {
                line.push_str(&format!(" / {}", author));
            }
            if let Some(year) = seed.entry.as_ref().and_then(|e| e.published_year) {
                line.push_str(&format!(" ({})", year));
            }
            Some(line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Numbered candidate listing with clipped descriptions
pub fn format_candidate_list(pool: &[CatalogEntry]) -> String {
    pool.iter()
        .enumerate()
        .map(|(i, entry)| {
            let mut line = format!("{}. {} / {}", i + 1, entry.title, entry.authors.join(", "));
            if let Some(year) = entry.published_year {
                line.push_str(&format!(" ({})", year));
            }
            if let Some(description) = entry.description.as_deref().filter(|d| !d.is_empty()) {
                let clipped: String = description.chars().take(DESCRIPTION_CLIP).collect();
                line.push_str(&format!("\n   {}…", clipped));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn non_empty(text: &str) -> &str {
    if text.is_empty() {
        "(empty)"
    } else {
        text
    }
}

fn instructions(count: usize, language: &str) -> String {
    format!(
        "Recommend {count} books from the candidate list, using the reference books \
         as taste signals. Preferred language: {language}. \
         Never recommend a book identical to a reference book (same title or ISBN). \
         Prefer candidates related to several reference books; rank candidates \
         strongly tied to only one reference book lower, to keep the list diverse. \
         Each reason should be 2-4 sentences. relatedTo must list the reference \
         book titles the recommendation relates to."
    )
}

/// Parse model output expected to be a JSON object with a
/// `recommendations` array. Markdown code fences are tolerated.
pub fn parse_recommendations(text: &str) -> Option<Vec<RawRecommendation>> {
    let trimmed = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    serde_json::from_str::<LlmRecommendations>(trimmed)
        .ok()
        .map(|parsed| parsed.recommendations)
}

// ============================================================================
// OpenAI chat-completions implementation
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Clone)]
pub struct OpenAiModel {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
    fallback_model: String,
}

impl OpenAiModel {
    pub fn new(api_key: String, api_url: String, model: String, fallback_model: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            model,
            fallback_model,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.openai_api_key.clone(),
            config.openai_api_url.clone(),
            config.openai_model.clone(),
            config.openai_fallback_model.clone(),
        )
    }

    fn recommendation_schema() -> Value {
        json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "recommendations": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "additionalProperties": false,
                        "properties": {
                            "title": { "type": "string" },
                            "authors": { "type": "array", "items": { "type": "string" } },
                            "reason": { "type": "string" },
                            "confidence": { "type": "number" },
                            "relatedTo": { "type": "array", "items": { "type": "string" } }
                        },
                        "required": ["title", "authors", "reason", "confidence", "relatedTo"]
                    }
                }
            },
            "required": ["recommendations"]
        })
    }

    async fn complete(&self, model: &str, body: Value) -> AppResult<String> {
        let url = format!("{}/chat/completions", self.api_url);
        let response = self
            .http_client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(crate::error::AppError::ExternalApi(format!(
                "{} returned status {}",
                model,
                response.status()
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }

    async fn run_structured(&self, request: &LlmRequest) -> AppResult<Vec<RawRecommendation>> {
        let prompt = format!(
            "{}\n\n[Reference books]\n{}\n\n[Candidates]\n{}",
            instructions(request.count, &request.language),
            non_empty(&request.seed_text),
            non_empty(&request.candidate_text),
        );
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "recommendations",
                    "schema": Self::recommendation_schema(),
                    "strict": true
                }
            }
        });

        let content = self.complete(&self.model, body).await?;
        parse_recommendations(&content).ok_or_else(|| {
            crate::error::AppError::ExternalApi(
                "Structured generation returned unparseable content".to_string(),
            )
        })
    }

    async fn run_fallback(&self, request: &LlmRequest) -> AppResult<Vec<RawRecommendation>> {
        let prompt = format!(
            "Respond with JSON only, no code fences: {{ \"recommendations\": \
             [{{ \"title\": string, \"authors\"?: string[], \"reason\": string, \
             \"confidence\"?: number, \"relatedTo\"?: string[] }}] }}. \
             {}\n\n[Reference books]\n{}\n\n[Candidates]\n{}",
            instructions(request.count, &request.language),
            non_empty(&request.seed_text),
            non_empty(&request.candidate_text),
        );
        let body = json!({
            "model": self.fallback_model,
            "messages": [{ "role": "user", "content": prompt }]
        });

        let content = self.complete(&self.fallback_model, body).await?;
        parse_recommendations(&content).ok_or_else(|| {
            crate::error::AppError::ExternalApi(
                "Fallback generation returned unparseable content".to_string(),
            )
        })
    }
}

#[async_trait::async_trait]
impl RecommendationModel for OpenAiModel {
    async fn propose(&self, request: &LlmRequest) -> AppResult<Vec<RawRecommendation>> {
        match self.run_structured(request).await {
            Ok(recommendations) => Ok(recommendations),
            Err(structured_error) => {
                tracing::warn!(
                    error = %structured_error,
                    "Structured generation failed, falling back to free text"
                );
                match self.run_fallback(request).await {
                    Ok(recommendations) => Ok(recommendations),
                    Err(fallback_error) => {
                        tracing::warn!(
                            error = %fallback_error,
                            "Fallback generation failed, returning no recommendations"
                        );
                        Ok(Vec::new())
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogSource, EntryMetadata, Seed};

    fn entry(title: &str, author: &str, year: Option<i32>, description: Option<&str>) -> CatalogEntry {
        CatalogEntry {
            title: title.to_string(),
            authors: vec![author.to_string()],
            isbn13: None,
            language: None,
            published_year: year,
            description: description.map(str::to_string),
            cover_url: None,
            source: CatalogSource::Google,
            source_id: None,
            metadata: EntryMetadata::default(),
        }
    }

    #[test]
    fn test_format_seed_list() {
        let seeds = vec![
            ResolvedSeed {
                seed: Seed::from_title("clean code"),
                entry: Some(entry("Clean Code", "Robert C. Martin", Some(2008), None)),
            },
            ResolvedSeed::unresolved(Seed::from_title("Some Unresolved Title")),
            ResolvedSeed::unresolved(Seed::default()),
        ];
        let text = format_seed_list(&seeds);
        assert_eq!(
            text,
            "- Clean Code / Robert C. Martin (2008)\n- Some Unresolved Title"
        );
    }

    #[test]
    fn test_format_candidate_list_numbers_and_clips() {
        let long_description = "x".repeat(400);
        let pool = vec![
            entry("Refactoring", "Martin Fowler", Some(2018), Some(&long_description)),
            entry("Dune", "Frank Herbert", None, None),
        ];
        let text = format_candidate_list(&pool);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "1. Refactoring / Martin Fowler (2018)");
        assert!(lines[1].starts_with("   "));
        assert_eq!(lines[1].chars().count(), 3 + DESCRIPTION_CLIP + 1);
        assert!(lines[1].ends_with('…'));
        assert_eq!(lines[2], "2. Dune / Frank Herbert");
    }

    #[test]
    fn test_parse_recommendations_plain_json() {
        let text = r#"{"recommendations": [{"title": "Dune", "reason": "r"}]}"#;
        let recs = parse_recommendations(text).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].title, "Dune");
    }

    #[test]
    fn test_parse_recommendations_tolerates_code_fences() {
        let text = "```json\n{\"recommendations\": []}\n```";
        assert_eq!(parse_recommendations(text).unwrap().len(), 0);
    }

    #[test]
    fn test_parse_recommendations_rejects_garbage() {
        assert!(parse_recommendations("not json at all").is_none());
        assert!(parse_recommendations("[1, 2, 3]").is_none());
    }
}
