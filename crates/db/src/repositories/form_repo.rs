//! Repository for the `forms` table.

use formflow_core::form::FormStatus;
use formflow_core::types::DbId;
use sqlx::PgPool;

use crate::models::form::{FormRow, SaveForm};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, title, internal_name, description, slug, status, sections, \
    theme, settings, published_at, created_at, updated_at";

/// Provides CRUD and publication for forms.
pub struct FormRepo;

impl FormRepo {
    /// Insert a new draft form, returning the created row.
    pub async fn create(pool: &PgPool, body: &SaveForm) -> Result<FormRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO forms (title, internal_name, description, sections, theme, settings) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FormRow>(&query)
            .bind(&body.title)
            .bind(&body.internal_name)
            .bind(&body.description)
            .bind(&body.sections)
            .bind(&body.theme)
            .bind(&body.settings)
            .fetch_one(pool)
            .await
    }

    /// Find a form by ID regardless of status.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<FormRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM forms WHERE id = $1");
        sqlx::query_as::<_, FormRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the published form serving a public slug.
    pub async fn find_published_by_slug(
        pool: &PgPool,
        slug: &str,
    ) -> Result<Option<FormRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM forms WHERE slug = $1 AND status = $2");
        sqlx::query_as::<_, FormRow>(&query)
            .bind(slug)
            .bind(FormStatus::Published.as_str())
            .fetch_optional(pool)
            .await
    }

    /// List forms, most recently updated first.
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<FormRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM forms ORDER BY updated_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, FormRow>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Replace a form's content. Returns `None` if the form does not exist.
    ///
    /// A published form moves to `slug` along with its settings, subject to
    /// `uq_forms_published_slug`; drafts keep no slug until published.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        body: &SaveForm,
        slug: &str,
    ) -> Result<Option<FormRow>, sqlx::Error> {
        let query = format!(
            "UPDATE forms SET title = $2, internal_name = $3, description = $4, \
                 sections = $5, theme = $6, settings = $7, \
                 slug = CASE WHEN status = $9 THEN $8 ELSE slug END, \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FormRow>(&query)
            .bind(id)
            .bind(&body.title)
            .bind(&body.internal_name)
            .bind(&body.description)
            .bind(&body.sections)
            .bind(&body.theme)
            .bind(&body.settings)
            .bind(slug)
            .bind(FormStatus::Published.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Mark a form published under `slug`.
    ///
    /// A slug already used by another published form violates
    /// `uq_forms_published_slug`.
    pub async fn publish(
        pool: &PgPool,
        id: DbId,
        slug: &str,
    ) -> Result<Option<FormRow>, sqlx::Error> {
        let query = format!(
            "UPDATE forms SET status = $2, slug = $3, \
                 published_at = COALESCE(published_at, now()), updated_at = now() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FormRow>(&query)
            .bind(id)
            .bind(FormStatus::Published.as_str())
            .bind(slug)
            .fetch_optional(pool)
            .await
    }
}
