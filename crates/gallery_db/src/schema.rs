//! Database schema and migrations

use crate::{DbPool, Result, DbError};

pub const SCHEMA_VERSION: i32 = 1;

/// Run database migrations
pub fn migrate(pool: &DbPool) -> Result<()> {
    let conn = pool.get().map_err(|e| DbError::Pool(e.to_string()))?;

    let current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current_version > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current_version, SCHEMA_VERSION
        )));
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            "Migrating database from version {} to {}",
            current_version,
            SCHEMA_VERSION
        );

        if current_version < 1 {
            apply_v1(&conn)?;
        }

        conn.execute_batch(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))?;
    }

    Ok(())
}

fn apply_v1(conn: &rusqlite::Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Image records. Lookups by name are full scans.
        CREATE TABLE IF NOT EXISTS images (
            id INTEGER PRIMARY KEY AUTOINCREMENT,

            -- Original filename with extension
            name TEXT NOT NULL,

            -- NULL or '' means uncategorized
            category TEXT,

            -- JSON array of strings
            tags TEXT NOT NULL DEFAULT '[]',

            -- data:<mime>;base64,<payload>
            data TEXT NOT NULL,

            -- Display timestamp, never parsed
            date TEXT NOT NULL
        );

        -- Registered categories, enumerable even with no images
        CREATE TABLE IF NOT EXISTS categories (
            name TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );
        "#,
    )?;

    Ok(())
}
