use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// External bibliographic catalog a record was fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    Google,
    OpenLibrary,
}

impl Display for CatalogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogSource::Google => write!(f, "google"),
            CatalogSource::OpenLibrary => write!(f, "openlibrary"),
        }
    }
}

/// Provider-specific extras kept alongside a catalog entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info_link: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<String>,
}

/// A normalized bibliographic record returned by a catalog query
///
/// Created fresh per external query and never mutated; the pipeline treats
/// entries as request-local data (no caching layer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub isbn13: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub published_year: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    pub source: CatalogSource,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub metadata: EntryMetadata,
}

impl CatalogEntry {
    /// Uniqueness key within a result set: `(source, source_id or isbn13 or title)`
    pub fn dedup_key(&self) -> String {
        let id = self
            .source_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.isbn13.as_deref())
            .unwrap_or(&self.title);
        format!("{}:{}", self.source, id)
    }

    pub fn primary_author(&self) -> Option<&str> {
        self.authors.first().map(String::as_str)
    }

    /// Best available link to the provider's detail page
    pub fn info_url(&self) -> Option<String> {
        if let Some(link) = &self.metadata.info_link {
            return Some(link.clone());
        }
        match (self.source, self.source_id.as_deref()) {
            (CatalogSource::Google, Some(id)) if !id.is_empty() => {
                Some(format!("https://books.google.com/books?id={}", id))
            }
            _ => None,
        }
    }
}

/// A hint describing a book the user already owns or likes
///
/// Constructed from user input, OCR/vision extraction, or a prior resolution.
/// The producer-side `confidence` is carried but plays no part in resolution
/// scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Seed {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub isbn: Option<String>,
    pub confidence: Option<f64>,
}

impl Seed {
    pub fn from_title(title: impl Into<String>) -> Self {
        Seed {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn primary_author(&self) -> Option<&str> {
        self.authors
            .first()
            .map(String::as_str)
            .filter(|a| !a.is_empty())
    }

    /// Whether this seed carries any signal a resolver could act on
    pub fn is_resolvable(&self) -> bool {
        self.isbn.as_deref().is_some_and(|s| !s.trim().is_empty())
            || self.title.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

/// The outcome of resolving one seed: zero-or-one catalog entry
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSeed {
    pub seed: Seed,
    pub entry: Option<CatalogEntry>,
}

impl ResolvedSeed {
    pub fn unresolved(seed: Seed) -> Self {
        ResolvedSeed { seed, entry: None }
    }

    /// Authoritative title when resolved, the raw seed title otherwise
    pub fn title(&self) -> Option<&str> {
        self.entry
            .as_ref()
            .map(|e| e.title.as_str())
            .or(self.seed.title.as_deref())
    }

    pub fn primary_author(&self) -> Option<&str> {
        self.entry
            .as_ref()
            .and_then(CatalogEntry::primary_author)
            .or_else(|| self.seed.primary_author())
    }

    /// ISBN-13 of the resolved entry; unresolved seeds expose none
    pub fn isbn13(&self) -> Option<&str> {
        self.entry.as_ref().and_then(|e| e.isbn13.as_deref())
    }
}

/// Reference back to the catalog entry a recommendation was matched against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub api: CatalogSource,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info_url: Option<String>,
}

/// Raw LLM-proposed recommendation, before enrichment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecommendation {
    pub title: String,
    pub authors: Vec<String>,
    pub reason: String,
    pub confidence: Option<f64>,
    #[serde(rename = "relatedTo")]
    pub related_to: Vec<String>,
}

/// Wire shape of the LLM structured-generation response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LlmRecommendations {
    pub recommendations: Vec<RawRecommendation>,
}

/// A recommendation after post-processing, ready to return to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, rename = "relatedTo", skip_serializing_if = "Vec::is_empty")]
    pub related_to: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn13: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceRef>,
}

// ============================================================================
// Google Books API Types
// ============================================================================

/// Response from GET /volumes
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GoogleSearchResponse {
    pub items: Vec<GoogleVolume>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoogleVolume {
    pub id: Option<String>,
    pub volume_info: GoogleVolumeInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoogleVolumeInfo {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub published_date: Option<String>,
    pub image_links: Option<GoogleImageLinks>,
    pub industry_identifiers: Vec<GoogleIdentifier>,
    pub info_link: Option<String>,
    pub categories: Vec<String>,
    pub page_count: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoogleImageLinks {
    pub thumbnail: Option<String>,
    pub small_thumbnail: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GoogleIdentifier {
    #[serde(rename = "type")]
    pub id_type: Option<String>,
    pub identifier: Option<String>,
}

impl From<GoogleVolume> for CatalogEntry {
    fn from(volume: GoogleVolume) -> Self {
        let info = volume.volume_info;
        let isbn13 = info
            .industry_identifiers
            .iter()
            .find(|id| {
                id.id_type
                    .as_deref()
                    .is_some_and(|t| t.eq_ignore_ascii_case("ISBN_13"))
            })
            .and_then(|id| id.identifier.clone());
        let cover_url = info.image_links.as_ref().and_then(|links| {
            links
                .thumbnail
                .clone()
                .or_else(|| links.small_thumbnail.clone())
        });

        CatalogEntry {
            title: info.title.unwrap_or_default(),
            authors: info.authors,
            isbn13,
            language: info.language.filter(|l| !l.is_empty()),
            published_year: info.published_date.as_deref().and_then(parse_year),
            description: info.description.filter(|d| !d.is_empty()),
            cover_url,
            source: CatalogSource::Google,
            source_id: volume.id.filter(|id| !id.is_empty()),
            metadata: EntryMetadata {
                info_link: info.info_link,
                categories: info.categories,
                page_count: info.page_count,
                subjects: Vec::new(),
            },
        }
    }
}

// ============================================================================
// Open Library API Types
// ============================================================================

/// Response from GET /search.json
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OpenLibrarySearchResponse {
    pub docs: Vec<OpenLibraryDoc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OpenLibraryDoc {
    /// Work key, e.g. "/works/OL45883W"
    pub key: Option<String>,
    pub title: Option<String>,
    pub author_name: Vec<String>,
    pub language: Vec<String>,
    pub first_publish_year: Option<i32>,
    pub cover_i: Option<u64>,
    pub isbn: Vec<String>,
    pub subject: Vec<String>,
}

impl From<OpenLibraryDoc> for CatalogEntry {
    fn from(doc: OpenLibraryDoc) -> Self {
        let isbn13 = doc.isbn.iter().find(|s| s.len() == 13).cloned();
        let cover_url = doc
            .cover_i
            .map(|id| format!("https://covers.openlibrary.org/b/id/{}-M.jpg", id));
        let info_link = doc
            .key
            .as_deref()
            .map(|key| format!("https://openlibrary.org{}", key));

        CatalogEntry {
            title: doc.title.unwrap_or_default(),
            authors: doc.author_name,
            isbn13,
            language: doc.language.first().cloned(),
            published_year: doc.first_publish_year,
            description: None,
            cover_url,
            source: CatalogSource::OpenLibrary,
            source_id: doc.key,
            metadata: EntryMetadata {
                info_link,
                categories: Vec::new(),
                page_count: None,
                subjects: doc.subject,
            },
        }
    }
}

/// First run of four consecutive ASCII digits in a date string, e.g.
/// "2008-08-01" or "Aug 2008" both yield 2008
pub(crate) fn parse_year(date: &str) -> Option<i32> {
    let mut run = 0usize;
    let bytes = date.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() {
            run += 1;
            if run == 4 {
                let start = i + 1 - 4;
                return date[start..=i].parse().ok();
            }
        } else {
            run = 0;
        }
    }
    None
}
