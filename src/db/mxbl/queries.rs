//! Database query methods for the MX blocklist.

use super::models::{MxblEntry, MxblRow};
use crate::db::DbError;
use sqlx::SqlitePool;

const SELECT_COLUMNS: &str =
    "SELECT id, pattern, reason, active, added, added_by, hits, last_hit FROM mxbl";

/// Translate an operator glob (`*`, `?`) into a LIKE pattern.
///
/// Literal `%`, `_` and `\` are escaped so they only ever match themselves;
/// the query must use `ESCAPE '\'`. An empty glob matches everything.
pub fn glob_to_like(glob: &str) -> String {
    if glob.is_empty() {
        return "%".to_string();
    }
    let mut out = String::with_capacity(glob.len());
    for c in glob.chars() {
        match c {
            '\\' | '%' | '_' => {
                out.push('\\');
                out.push(c);
            }
            '*' => out.push('%'),
            '?' => out.push('_'),
            _ => out.push(c),
        }
    }
    out
}

/// Repository for blocklist operations.
pub struct MxblRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MxblRepository<'a> {
    /// Create a new blocklist repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch an entry by id.
    pub async fn get(&self, id: i64) -> Result<Option<MxblEntry>, DbError> {
        let row = sqlx::query_as::<_, MxblRow>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(MxblEntry::from))
    }

    /// The active entry with the smallest id whose pattern equals `search`.
    pub async fn match_active(&self, search: &str) -> Result<Option<MxblEntry>, DbError> {
        let row = sqlx::query_as::<_, MxblRow>(&format!(
            "{SELECT_COLUMNS} WHERE pattern = ? COLLATE NOCASE AND active = 1 ORDER BY id LIMIT 1"
        ))
        .bind(search)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(MxblEntry::from))
    }

    /// Entries whose pattern matches `glob`, ascending by id.
    ///
    /// A `limit` of 0 means no limit.
    pub async fn list_all(&self, limit: u32, glob: &str) -> Result<Vec<MxblEntry>, DbError> {
        // SQLite treats a negative LIMIT as unbounded.
        let limit = if limit == 0 { -1 } else { i64::from(limit) };

        let rows = sqlx::query_as::<_, MxblRow>(&format!(
            r"{SELECT_COLUMNS} WHERE pattern LIKE ? ESCAPE '\' ORDER BY id LIMIT ?"
        ))
        .bind(glob_to_like(glob))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(MxblEntry::from).collect())
    }

    /// Insert a new entry and return its id.
    pub async fn add(
        &self,
        pattern: &str,
        reason: &str,
        active: bool,
        added_by: &str,
    ) -> Result<i64, DbError> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO mxbl (pattern, reason, active, added, added_by)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(pattern)
        .bind(reason)
        .bind(active)
        .bind(now)
        .bind(added_by)
        .execute(self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Delete an entry, returning its id if it existed.
    pub async fn delete(&self, id: i64) -> Result<Option<i64>, DbError> {
        let result = sqlx::query("DELETE FROM mxbl WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok((result.rows_affected() > 0).then_some(id))
    }

    /// Flip the active flag, returning the new state if the entry exists.
    pub async fn toggle(&self, id: i64) -> Result<Option<bool>, DbError> {
        let active: Option<i64> = sqlx::query_scalar(
            "UPDATE mxbl SET active = NOT active WHERE id = ? RETURNING active",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(active.map(|a| a != 0))
    }

    /// Record a match: bump the hit counter and stamp `last_hit`.
    ///
    /// Returns the new hit count if the entry exists. `last_hit` never moves
    /// backwards even if the wall clock does.
    pub async fn hit(&self, id: i64) -> Result<Option<i64>, DbError> {
        let now = chrono::Utc::now().timestamp();

        let hits: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE mxbl
            SET hits = hits + 1, last_hit = MAX(COALESCE(last_hit, 0), ?)
            WHERE id = ?
            RETURNING hits
            "#,
        )
        .bind(now)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(hits)
    }
}
