use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;

use crate::common::{HistoryEntryId, SegmentId, UserId};

/// Which way a membership changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipOperation {
    Add,
    Remove,
}

impl MembershipOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipOperation::Add => "add",
            MembershipOperation::Remove => "remove",
        }
    }
}

impl fmt::Display for MembershipOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MembershipOperation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add" => Ok(MembershipOperation::Add),
            "remove" => Ok(MembershipOperation::Remove),
            other => Err(anyhow!("unknown membership operation: {}", other)),
        }
    }
}

/// One audit record, as reported (segment resolved to its slug)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub user_id: UserId,
    pub segment_slug: String,
    pub operation: MembershipOperation,
    pub timestamp: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    user_id: UserId,
    slug: String,
    operation: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = anyhow::Error;

    fn try_from(row: HistoryRow) -> Result<Self> {
        Ok(HistoryEntry {
            user_id: row.user_id,
            segment_slug: row.slug,
            operation: row.operation.parse()?,
            timestamp: row.created_at,
        })
    }
}

/// Append-only audit log (`segment_history`)
pub struct SegmentHistory;

impl SegmentHistory {
    pub async fn append(
        user_id: UserId,
        segment_id: SegmentId,
        operation: MembershipOperation,
        timestamp: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO segment_history (id, user_id, segment_id, operation, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(HistoryEntryId::new())
        .bind(user_id)
        .bind(segment_id)
        .bind(operation.as_str())
        .bind(timestamp)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Entries whose timestamp falls in the given UTC calendar month
    ///
    /// Month extraction happens in the database. Entries for deleted segments
    /// are dropped by the join.
    pub async fn find_by_period(year: i32, month: u32, pool: &PgPool) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT h.user_id, s.slug, h.operation, h.created_at
            FROM segment_history h
            JOIN segments s ON s.id = h.segment_id
            WHERE EXTRACT(YEAR FROM h.created_at AT TIME ZONE 'UTC')::INT = $1
              AND EXTRACT(MONTH FROM h.created_at AT TIME ZONE 'UTC')::INT = $2
            ORDER BY h.created_at, h.id
            "#,
        )
        .bind(year)
        .bind(month as i32)
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(HistoryEntry::try_from).collect()
    }
}
