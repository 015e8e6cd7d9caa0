use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};

use crate::model::{Draft, DraftFilter, DraftStatus, Id, User};
use crate::store::traits::{DraftStore, UserStore};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        token_hash TEXT NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS drafts (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        content TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'draft',
        external_tweet_id TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        posted_at TIMESTAMPTZ
    )
    "#,
    "CREATE INDEX IF NOT EXISTS drafts_user_created_idx ON drafts (user_id, created_at DESC)",
    // Recreated so older tables accept the `publishing` state
    "ALTER TABLE drafts DROP CONSTRAINT IF EXISTS drafts_status_check",
    "ALTER TABLE drafts ADD CONSTRAINT drafts_status_check CHECK (status IN ('draft', 'publishing', 'posted'))",
];

const SCHEMA_LOCK_KEY: i64 = 0x7477_6565_7470_7278;

const DRAFT_COLUMNS: &str =
    "id, user_id, content, status, external_tweet_id, created_at, updated_at, posted_at";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Create the tables if they do not exist yet.
    /// Concurrent callers are serialized on an advisory lock held for the transaction.
    pub async fn migrate(&self) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to start schema transaction")?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(SCHEMA_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .context("Failed to take schema lock")?;
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .context("Failed to apply schema")?;
        }
        tx.commit().await.context("Failed to commit schema")?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        created_at: row.get("created_at"),
    }
}

fn draft_from_row(row: &PgRow) -> Result<Draft> {
    let status: String = row.get("status");
    let status = DraftStatus::parse(&status)
        .with_context(|| format!("Unknown draft status '{}'", status))?;

    Ok(Draft {
        id: row.get("id"),
        user_id: row.get("user_id"),
        content: row.get("content"),
        status,
        external_tweet_id: row.get("external_tweet_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        posted_at: row.get("posted_at"),
    })
}

#[async_trait::async_trait]
impl UserStore for PostgresStore {
    async fn create_user(&self, user: User, token_hash: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (id, username, token_hash, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (username) DO NOTHING
            RETURNING id, username, created_at
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(token_hash)
        .bind(user.created_at)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to create user")?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_user_by_token_hash(&self, token_hash: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, created_at FROM users WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to look up token")?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, created_at FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user")?;

        Ok(row.as_ref().map(user_from_row))
    }
}

#[async_trait::async_trait]
impl DraftStore for PostgresStore {
    async fn create_draft(&self, draft: Draft) -> Result<Draft> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO drafts ({DRAFT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {DRAFT_COLUMNS}
            "#
        ))
        .bind(&draft.id)
        .bind(&draft.user_id)
        .bind(&draft.content)
        .bind(draft.status.as_str())
        .bind(&draft.external_tweet_id)
        .bind(draft.created_at)
        .bind(draft.updated_at)
        .bind(draft.posted_at)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create draft")?;

        draft_from_row(&row)
    }

    async fn get_draft(&self, user_id: &Id, id: &Id) -> Result<Option<Draft>> {
        let row = sqlx::query(&format!(
            "SELECT {DRAFT_COLUMNS} FROM drafts WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch draft")?;

        row.as_ref().map(draft_from_row).transpose()
    }

    async fn list_drafts(&self, user_id: &Id, filter: &DraftFilter) -> Result<Vec<Draft>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {DRAFT_COLUMNS} FROM drafts
            WHERE user_id = $1 AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list drafts")?;

        rows.iter().map(draft_from_row).collect()
    }

    async fn update_draft_content(&self, user_id: &Id, id: &Id, content: &str) -> Result<Option<Draft>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE drafts SET content = $3, updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND status = 'draft'
            RETURNING {DRAFT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update draft")?;

        row.as_ref().map(draft_from_row).transpose()
    }

    async fn claim_for_publish(&self, user_id: &Id, id: &Id) -> Result<Option<Draft>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE drafts SET status = 'publishing', updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND status = 'draft'
            RETURNING {DRAFT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to claim draft for publishing")?;

        row.as_ref().map(draft_from_row).transpose()
    }

    async fn release_publish(&self, user_id: &Id, id: &Id) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE drafts SET status = 'draft', updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND status = 'publishing'
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("Failed to release draft")?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_posted(
        &self,
        user_id: &Id,
        id: &Id,
        external_tweet_id: Option<String>,
    ) -> Result<Option<Draft>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE drafts
            SET status = 'posted', external_tweet_id = $3, posted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND status = 'publishing'
            RETURNING {DRAFT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(external_tweet_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to mark draft as posted")?;

        row.as_ref().map(draft_from_row).transpose()
    }

    async fn delete_draft(&self, user_id: &Id, id: &Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM drafts WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete draft")?;

        Ok(result.rows_affected() > 0)
    }
}
