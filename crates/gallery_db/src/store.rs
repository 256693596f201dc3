//! SQLite record store for images and registered categories

use crate::{pool, schema, DbError, DbPool, Result};
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row, Transaction};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Image record as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub data: String,
    pub date: String,
}

impl ImageRecord {
    /// Category if set and non-empty
    pub fn category_name(&self) -> Option<&str> {
        self.category.as_deref().filter(|c| !c.is_empty())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Image record before the store has assigned an id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub name: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub data: String,
    pub date: String,
}

const SELECT_IMAGES: &str = "SELECT id, name, category, tags, data, date FROM images";

fn read_record(row: &Row<'_>) -> rusqlite::Result<ImageRecord> {
    let tags_json: String = row.get(3)?;
    let tags = serde_json::from_str(&tags_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    Ok(ImageRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        tags,
        data: row.get(4)?,
        date: row.get(5)?,
    })
}

fn write_record(tx: &Transaction<'_>, record: &ImageRecord) -> Result<usize> {
    let tags = serde_json::to_string(&record.tags)?;
    let rows = tx.execute(
        "UPDATE images SET name = ?1, category = ?2, tags = ?3, data = ?4, date = ?5 WHERE id = ?6",
        params![record.name, record.category, tags, record.data, record.date, record.id],
    )?;
    Ok(rows)
}

/// Scan every image in key order and write back the ones the mutator changed
fn mutate_matching<P, M>(tx: &Transaction<'_>, mut predicate: P, mut mutator: M) -> Result<usize>
where
    P: FnMut(&ImageRecord) -> bool,
    M: FnMut(&mut ImageRecord),
{
    let records = {
        let mut stmt = tx.prepare(&format!("{} ORDER BY id", SELECT_IMAGES))?;
        let rows = stmt.query_map([], read_record)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };

    let mut changed = 0;
    for record in records.into_iter().filter(|r| predicate(r)) {
        let mut updated = record.clone();
        mutator(&mut updated);
        // Keys are immutable
        updated.id = record.id;
        if updated != record {
            write_record(tx, &updated)?;
            changed += 1;
        }
    }

    Ok(changed)
}

/// Record store over the gallery database
#[derive(Clone)]
pub struct ImageStore {
    pool: DbPool,
}

impl ImageStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `path` and bring the schema up to date
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let pool = pool::init_pool(path)?;
        schema::migrate(&pool)?;

        tracing::info!("Image store opened at {:?}", path);
        Ok(Self::new(pool))
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| DbError::Pool(e.to_string()))
    }

    // ===== Image Operations =====

    /// All image records in key order
    pub fn get_all(&self) -> Result<Vec<ImageRecord>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!("{} ORDER BY id", SELECT_IMAGES))?;
        let rows = stmt.query_map([], read_record)?;

        let mut images = Vec::new();
        for row in rows {
            images.push(row?);
        }

        Ok(images)
    }

    /// Get a single record by key
    pub fn get(&self, id: i64) -> Result<Option<ImageRecord>> {
        let conn = self.conn()?;

        let record = conn
            .query_row(&format!("{} WHERE id = ?1", SELECT_IMAGES), [id], read_record)
            .optional()?;

        Ok(record)
    }

    /// Insert a record, returning the assigned key
    pub fn add(&self, record: &NewRecord) -> Result<i64> {
        let conn = self.conn()?;
        let tags = serde_json::to_string(&record.tags)?;

        conn.execute(
            "INSERT INTO images (name, category, tags, data, date) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![record.name, record.category, tags, record.data, record.date],
        )?;

        let id = conn.last_insert_rowid();
        tracing::debug!(id, name = %record.name, "Image record added");
        Ok(id)
    }

    /// Overwrite a record by key
    pub fn put(&self, record: &ImageRecord) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        if write_record(&tx, record)? == 0 {
            return Err(DbError::NotFound(format!("image #{}", record.id)));
        }

        tx.commit()?;
        Ok(())
    }

    /// Apply `mutator` to every record matching `predicate`.
    ///
    /// The whole scan runs in one transaction: either every change commits
    /// or none does. Returns the number of rows that actually changed.
    pub fn iterate_and_mutate<P, M>(&self, predicate: P, mutator: M) -> Result<usize>
    where
        P: FnMut(&ImageRecord) -> bool,
        M: FnMut(&mut ImageRecord),
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let changed = mutate_matching(&tx, predicate, mutator)?;

        tx.commit()?;
        Ok(changed)
    }

    /// Delete a record by key
    pub fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;

        let rows = conn.execute("DELETE FROM images WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    // ===== Category Operations =====

    /// Registered category names, sorted
    pub fn list_categories(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare("SELECT name FROM categories ORDER BY name")?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut categories = Vec::new();
        for row in rows {
            categories.push(row?);
        }

        Ok(categories)
    }

    /// Register a category. Returns false if it was already registered.
    pub fn add_category(&self, name: &str) -> Result<bool> {
        let conn = self.conn()?;

        let rows = conn.execute("INSERT OR IGNORE INTO categories (name) VALUES (?1)", [name])?;
        Ok(rows > 0)
    }

    /// Rename a category on the registry and on every image carrying it.
    ///
    /// Returns the number of images rewritten.
    pub fn rename_category(&self, old: &str, new: &str) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let registered = tx.execute("DELETE FROM categories WHERE name = ?1", [old])?;
        if registered > 0 {
            tx.execute("INSERT OR IGNORE INTO categories (name) VALUES (?1)", [new])?;
        }

        let changed = mutate_matching(
            &tx,
            |r| r.category.as_deref() == Some(old),
            |r| r.category = Some(new.to_string()),
        )?;

        tx.commit()?;
        Ok(changed)
    }

    /// Unregister a category and clear it from every image carrying it.
    ///
    /// Images are kept. Returns the number of images rewritten.
    pub fn delete_category(&self, name: &str) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM categories WHERE name = ?1", [name])?;

        let changed = mutate_matching(
            &tx,
            |r| r.category.as_deref() == Some(name),
            |r| r.category = None,
        )?;

        tx.commit()?;
        Ok(changed)
    }
}
