use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// SiteStatus - outcome of the latest indexing attempt for a site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SiteStatus {
    pub url: String,
    /// Whether any policy text was indexed
    pub found_data: bool,
    /// Why nothing was indexed (bot wall, load failure, no documents, ...)
    pub issue: Option<String>,
    pub checked_at: DateTime<Utc>,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl SiteStatus {
    /// Latest status recorded for a url
    pub async fn find_latest(url: &str, pool: &PgPool) -> Result<Option<Self>> {
        let status = sqlx::query_as::<_, SiteStatus>(
            r#"
            SELECT url, found_data, issue, checked_at
            FROM sites
            WHERE url = $1
            ORDER BY checked_at DESC
            LIMIT 1
            "#,
        )
        .bind(url)
        .fetch_optional(pool)
        .await?;
        Ok(status)
    }

    /// Append a new status row
    pub async fn insert(
        url: &str,
        found_data: bool,
        issue: Option<&str>,
        pool: &PgPool,
    ) -> Result<Self> {
        let status = sqlx::query_as::<_, SiteStatus>(
            r#"
            INSERT INTO sites (url, found_data, issue)
            VALUES ($1, $2, $3)
            RETURNING url, found_data, issue, checked_at
            "#,
        )
        .bind(url)
        .bind(found_data)
        .bind(issue)
        .fetch_one(pool)
        .await?;
        Ok(status)
    }
}
