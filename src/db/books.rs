//! Book persistence: upsert-by-unique-key over the `books` table plus the
//! `library_books` / `recommended_books` link tables.
//!
//! Uniqueness is `(source, source_id)`. Entries lacking a provider id are
//! stored under their ISBN-13 or title instead, mirroring the dedup-key
//! identity used in the pipeline.

use crate::{
    error::AppResult,
    models::{CatalogEntry, CatalogSource},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

/// A persisted bibliographic record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StoredBook {
    pub id: i64,
    pub title: String,
    pub authors: Vec<String>,
    pub isbn13: Option<String>,
    pub language: Option<String>,
    pub published_year: Option<i32>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub source: String,
    pub source_id: String,
}

/// A library membership row joined with its book
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LibraryBook {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub book: StoredBook,
    pub favorite: bool,
    pub added_at: DateTime<Utc>,
}

/// A recommended-list row joined with its book
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecommendedBook {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub book: StoredBook,
    pub reason: Option<String>,
    pub added_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct BookStore {
    pool: PgPool,
}

impl BookStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Storage identity for an entry: provider id when present, otherwise
    /// ISBN-13 or title
    fn storage_id(entry: &CatalogEntry) -> String {
        entry
            .source_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(entry.isbn13.as_deref())
            .unwrap_or(&entry.title)
            .to_string()
    }

    /// Upsert catalog entries by `(source, source_id)`, returning the
    /// stored rows in input order
    pub async fn upsert_entries(&self, entries: &[CatalogEntry]) -> AppResult<Vec<StoredBook>> {
        let mut stored = Vec::with_capacity(entries.len());
        for entry in entries {
            let row = sqlx::query_as::<_, StoredBook>(
                r#"
                INSERT INTO books
                    (title, authors, isbn13, language, published_year,
                     description, cover_url, source, source_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (source, source_id) DO UPDATE SET
                    title = EXCLUDED.title,
                    authors = EXCLUDED.authors,
                    isbn13 = COALESCE(EXCLUDED.isbn13, books.isbn13),
                    language = COALESCE(EXCLUDED.language, books.language),
                    published_year = COALESCE(EXCLUDED.published_year, books.published_year),
                    description = COALESCE(EXCLUDED.description, books.description),
                    cover_url = COALESCE(EXCLUDED.cover_url, books.cover_url)
                RETURNING id, title, authors, isbn13, language, published_year,
                          description, cover_url, source, source_id
                "#,
            )
            .bind(&entry.title)
            .bind(&entry.authors)
            .bind(&entry.isbn13)
            .bind(&entry.language)
            .bind(entry.published_year)
            .bind(&entry.description)
            .bind(&entry.cover_url)
            .bind(entry.source.to_string())
            .bind(Self::storage_id(entry))
            .fetch_one(&self.pool)
            .await?;
            stored.push(row);
        }
        Ok(stored)
    }

    /// Add books to the library, ignoring ones already present.
    /// Returns the number of newly added rows.
    pub async fn add_to_library(&self, book_ids: &[i64]) -> AppResult<u64> {
        let mut saved = 0;
        for book_id in book_ids {
            let result = sqlx::query(
                "INSERT INTO library_books (book_id) VALUES ($1) ON CONFLICT (book_id) DO NOTHING",
            )
            .bind(book_id)
            .execute(&self.pool)
            .await?;
            saved += result.rows_affected();
        }
        Ok(saved)
    }

    /// Toggle library membership; returns whether the book is now in the
    /// library
    pub async fn toggle_library(&self, book_id: i64) -> AppResult<bool> {
        let removed = sqlx::query("DELETE FROM library_books WHERE book_id = $1")
            .bind(book_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if removed > 0 {
            return Ok(false);
        }
        sqlx::query("INSERT INTO library_books (book_id) VALUES ($1) ON CONFLICT (book_id) DO NOTHING")
            .bind(book_id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }

    /// Mark or unmark a library book as favorite
    pub async fn set_favorite(&self, book_id: i64, favorite: bool) -> AppResult<bool> {
        let updated = sqlx::query("UPDATE library_books SET favorite = $2 WHERE book_id = $1")
            .bind(book_id)
            .bind(favorite)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(updated > 0)
    }

    /// Remove books from the library, ignoring ones not present.
    /// Returns the number of removed rows.
    pub async fn remove_from_library(&self, book_ids: &[i64]) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM library_books WHERE book_id = ANY($1)")
            .bind(book_ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn list_library(&self) -> AppResult<Vec<LibraryBook>> {
        let rows = sqlx::query_as::<_, LibraryBook>(
            r#"
            SELECT b.id, b.title, b.authors, b.isbn13, b.language,
                   b.published_year, b.description, b.cover_url,
                   b.source, b.source_id,
                   l.favorite, l.added_at
            FROM library_books l
            JOIN books b ON b.id = l.book_id
            ORDER BY l.added_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Toggle recommended-list membership; returns whether the book is now
    /// on the list
    pub async fn toggle_recommended(&self, book_id: i64, reason: Option<&str>) -> AppResult<bool> {
        let removed = sqlx::query("DELETE FROM recommended_books WHERE book_id = $1")
            .bind(book_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if removed > 0 {
            return Ok(false);
        }
        sqlx::query(
            "INSERT INTO recommended_books (book_id, reason) VALUES ($1, $2) \
             ON CONFLICT (book_id) DO UPDATE SET reason = EXCLUDED.reason",
        )
        .bind(book_id)
        .bind(reason)
        .execute(&self.pool)
        .await?;
        Ok(true)
    }

    /// Remove a book from the recommended list; returns whether a row was
    /// removed
    pub async fn remove_recommended(&self, book_id: i64) -> AppResult<bool> {
        let removed = sqlx::query("DELETE FROM recommended_books WHERE book_id = $1")
            .bind(book_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(removed > 0)
    }

    pub async fn list_recommended(&self) -> AppResult<Vec<RecommendedBook>> {
        let rows = sqlx::query_as::<_, RecommendedBook>(
            r#"
            SELECT b.id, b.title, b.authors, b.isbn13, b.language,
                   b.published_year, b.description, b.cover_url,
                   b.source, b.source_id,
                   r.reason, r.added_at
            FROM recommended_books r
            JOIN books b ON b.id = r.book_id
            ORDER BY r.added_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Whether a book row exists
    pub async fn book_exists(&self, book_id: i64) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 FROM books WHERE id = $1")
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}

impl std::fmt::Debug for BookStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookStore").finish_non_exhaustive()
    }
}
