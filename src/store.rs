use std::collections::HashSet;
use std::path::Path;
use std::process;
use std::rc::Rc;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::model::{ActivityEntry, Category, InventoryRecord, ItemPatch, NewItem};
use crate::util::now_utc_string;

pub const DB_SCHEMA_VERSION: &str = "0.1.0";

pub const DEFAULT_CATEGORY: &str = "General";

/// Conflicts the command layer must tell apart from plain I/O failures.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("an item named {0:?} already exists")]
    DuplicateName(String),

    #[error("a category named {0:?} already exists")]
    DuplicateCategory(String),

    #[error("category {name:?} is still used by {item_count} item(s)")]
    CategoryInUse { name: String, item_count: i64 },

    #[error("no item with id {0}")]
    UnknownItem(i64),

    #[error("no category named {0:?}")]
    UnknownCategory(String),

    #[error("unknown session token")]
    UnknownSession,
}

/// Explicit request context for every write; replaces any notion of a
/// process-wide current user. Tokens persist in the sessions table.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub actor: String,
}

#[derive(Debug, Clone)]
pub enum CatalogChange {
    ItemCreated { id: i64, name: String },
    ItemUpdated { id: i64, name: String },
    ItemDeleted { id: i64, name: String },
    ItemsImported { inserted: usize, duplicates: usize },
    ItemsCleared { count: usize },
    CategoryCreated { name: String },
    CategoryRenamed {
        old_name: String,
        new_name: String,
        items_updated: usize,
    },
    CategoryDeleted { name: String },
}

/// In-process stand-in for a storage push feed: observers get one event per
/// committed logical write. Core scoring/parsing code never sees this; it
/// always works on snapshots.
pub trait CatalogObserver {
    fn catalog_changed(&self, change: &CatalogChange);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverId(u64);

#[derive(Debug, Clone, Copy)]
pub struct ImportStats {
    pub inserted: usize,
    pub duplicates_skipped: usize,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct StoreCounts {
    pub items: i64,
    pub categories: i64,
    pub activity_entries: i64,
    pub out_of_stock: i64,
}

pub struct CatalogStore {
    connection: Connection,
    observers: Vec<(u64, Rc<dyn CatalogObserver>)>,
    next_observer_id: u64,
}

impl CatalogStore {
    pub fn open(path: &Path) -> Result<Self> {
        let connection = Connection::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Self::from_connection(connection)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> Result<Self> {
        let store = Self {
            connection,
            observers: Vec::new(),
            next_observer_id: 0,
        };
        store.configure_connection()?;
        store.ensure_schema()?;
        Ok(store)
    }

    fn configure_connection(&self) -> Result<()> {
        self.connection
            .pragma_update(None, "journal_mode", "WAL")
            .context("failed to set journal_mode=WAL")?;
        self.connection
            .pragma_update(None, "synchronous", "NORMAL")
            .context("failed to set synchronous=NORMAL")?;
        Ok(())
    }

    fn ensure_schema(&self) -> Result<()> {
        self.connection.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS items (
              item_id INTEGER PRIMARY KEY AUTOINCREMENT,
              name TEXT NOT NULL,
              price TEXT NOT NULL,
              stock INTEGER NOT NULL DEFAULT 0,
              category TEXT NOT NULL DEFAULT 'General',
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_items_name ON items(name);

            CREATE TABLE IF NOT EXISTS categories (
              name TEXT PRIMARY KEY,
              description TEXT,
              created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS activity_log (
              entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
              actor TEXT NOT NULL,
              action TEXT NOT NULL,
              detail TEXT NOT NULL,
              created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
              token TEXT PRIMARY KEY,
              actor TEXT NOT NULL,
              started_at TEXT NOT NULL,
              last_seen_at TEXT NOT NULL
            );
            ",
        )?;

        let now = now_utc_string();
        self.connection.execute(
            "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value",
            [DB_SCHEMA_VERSION],
        )?;
        self.connection.execute(
            "INSERT OR IGNORE INTO metadata(key, value) VALUES('revision', '0')",
            [],
        )?;
        self.connection.execute(
            "INSERT OR IGNORE INTO categories(name, description, created_at)
             VALUES(?1, ?2, ?3)",
            params![DEFAULT_CATEGORY, "Default category", now],
        )?;

        Ok(())
    }

    // --- observers ---

    pub fn subscribe(&mut self, observer: Rc<dyn CatalogObserver>) -> ObserverId {
        let id = self.next_observer_id;
        self.next_observer_id += 1;
        self.observers.push((id, observer));
        ObserverId(id)
    }

    pub fn unsubscribe(&mut self, id: ObserverId) {
        self.observers.retain(|(observer_id, _)| *observer_id != id.0);
    }

    fn notify(&self, change: &CatalogChange) {
        for (_, observer) in &self.observers {
            observer.catalog_changed(change);
        }
    }

    // --- sessions ---

    pub fn open_session(&self, actor: &str) -> Result<Session> {
        let actor = actor.trim();
        let actor = if actor.is_empty() { "anonymous" } else { actor };
        let now = now_utc_string();

        let mut hasher = Sha256::new();
        hasher.update(actor.as_bytes());
        hasher.update(now.as_bytes());
        hasher.update(process::id().to_le_bytes());
        hasher.update(self.revision()?.to_le_bytes());
        let token = format!("{:x}", hasher.finalize());

        self.connection
            .execute(
                "INSERT INTO sessions(token, actor, started_at, last_seen_at)
                 VALUES(?1, ?2, ?3, ?3)",
                params![token, actor, now],
            )
            .context("failed to persist session")?;

        Ok(Session {
            token,
            actor: actor.to_string(),
        })
    }

    pub fn resume_session(&self, token: &str) -> Result<Session> {
        let actor: Option<String> = self
            .connection
            .query_row(
                "SELECT actor FROM sessions WHERE token = ?1",
                [token],
                |row| row.get(0),
            )
            .optional()?;

        let Some(actor) = actor else {
            return Err(CatalogError::UnknownSession.into());
        };

        self.connection.execute(
            "UPDATE sessions SET last_seen_at = ?1 WHERE token = ?2",
            params![now_utc_string(), token],
        )?;

        Ok(Session {
            token: token.to_string(),
            actor,
        })
    }

    // --- reads ---

    pub fn list_items(&self) -> Result<Vec<InventoryRecord>> {
        let mut statement = self.connection.prepare(
            "SELECT item_id, name, price, stock, category FROM items ORDER BY item_id",
        )?;
        let items = statement
            .query_map([], row_to_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    pub fn get_item(&self, id: i64) -> Result<InventoryRecord> {
        let item = self
            .connection
            .query_row(
                "SELECT item_id, name, price, stock, category FROM items WHERE item_id = ?1",
                [id],
                row_to_item,
            )
            .optional()?;

        item.ok_or_else(|| CatalogError::UnknownItem(id).into())
    }

    pub fn item_name_exists(&self, name: &str) -> Result<bool> {
        let found: Option<i64> = self
            .connection
            .query_row(
                "SELECT item_id FROM items WHERE lower(name) = lower(?1) LIMIT 1",
                [name.trim()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let mut statement = self.connection.prepare(
            "SELECT name, description, created_at FROM categories ORDER BY name",
        )?;
        let categories = statement
            .query_map([], |row| {
                Ok(Category {
                    name: row.get(0)?,
                    description: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(categories)
    }

    /// Stored-case category name for `requested`, or the default category
    /// when the name is blank or not registered.
    pub fn resolve_category(&self, requested: &str) -> Result<String> {
        let requested = requested.trim();
        if requested.is_empty() {
            return Ok(DEFAULT_CATEGORY.to_string());
        }

        let stored: Option<String> = self
            .connection
            .query_row(
                "SELECT name FROM categories WHERE lower(name) = lower(?1)",
                [requested],
                |row| row.get(0),
            )
            .optional()?;

        Ok(stored.unwrap_or_else(|| DEFAULT_CATEGORY.to_string()))
    }

    pub fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>> {
        let mut statement = self.connection.prepare(
            "SELECT entry_id, actor, action, detail, created_at
             FROM activity_log ORDER BY entry_id DESC LIMIT ?1",
        )?;
        let entries = statement
            .query_map([limit as i64], |row| {
                Ok(ActivityEntry {
                    id: row.get(0)?,
                    actor: row.get(1)?,
                    action: row.get(2)?,
                    detail: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    pub fn schema_version(&self) -> Result<String> {
        let value = self.connection.query_row(
            "SELECT value FROM metadata WHERE key = 'db_schema_version'",
            [],
            |row| row.get(0),
        )?;
        Ok(value)
    }

    pub fn revision(&self) -> Result<i64> {
        let value: String = self.connection.query_row(
            "SELECT value FROM metadata WHERE key = 'revision'",
            [],
            |row| row.get(0),
        )?;
        value.parse().context("metadata revision is not a number")
    }

    pub fn counts(&self) -> Result<StoreCounts> {
        Ok(StoreCounts {
            items: self.count("SELECT COUNT(*) FROM items")?,
            categories: self.count("SELECT COUNT(*) FROM categories")?,
            activity_entries: self.count("SELECT COUNT(*) FROM activity_log")?,
            out_of_stock: self.count("SELECT COUNT(*) FROM items WHERE stock = 0")?,
        })
    }

    fn count(&self, sql: &str) -> Result<i64> {
        let count = self.connection.query_row(sql, [], |row| row.get(0))?;
        Ok(count)
    }

    // --- writes ---

    pub fn create_item(&mut self, session: &Session, item: &NewItem) -> Result<InventoryRecord> {
        if self.item_name_exists(&item.name)? {
            return Err(CatalogError::DuplicateName(item.name.clone()).into());
        }

        let now = now_utc_string();
        let tx = self.connection.transaction()?;
        tx.execute(
            "INSERT INTO items(name, price, stock, category, created_at, updated_at)
             VALUES(?1, ?2, ?3, ?4, ?5, ?5)",
            params![item.name.trim(), item.price, item.stock, item.category, now],
        )?;
        let id = tx.last_insert_rowid();
        record_activity(
            &tx,
            session,
            "item.create",
            &format!("{} (id {})", item.name.trim(), id),
        )?;
        bump_revision(&tx)?;
        tx.commit()?;

        let record = self.get_item(id)?;
        self.notify(&CatalogChange::ItemCreated {
            id,
            name: record.name.clone(),
        });
        Ok(record)
    }

    pub fn update_item(
        &mut self,
        session: &Session,
        id: i64,
        patch: &ItemPatch,
    ) -> Result<InventoryRecord> {
        let current = self.get_item(id)?;

        if let Some(new_name) = &patch.name {
            let renamed = !new_name.trim().eq_ignore_ascii_case(&current.name);
            if renamed && self.item_name_exists(new_name)? {
                return Err(CatalogError::DuplicateName(new_name.clone()).into());
            }
        }

        let name = patch
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or(&current.name)
            .to_string();
        let price = patch.price.clone().unwrap_or(current.price);
        let stock = patch.stock.unwrap_or(current.stock);
        let category = patch.category.clone().unwrap_or(current.category);

        let tx = self.connection.transaction()?;
        tx.execute(
            "UPDATE items SET name = ?1, price = ?2, stock = ?3, category = ?4, updated_at = ?5
             WHERE item_id = ?6",
            params![name, price, stock, category, now_utc_string(), id],
        )?;
        record_activity(
            &tx,
            session,
            "item.update",
            &format!("{} (id {})", name, id),
        )?;
        bump_revision(&tx)?;
        tx.commit()?;

        let record = self.get_item(id)?;
        self.notify(&CatalogChange::ItemUpdated {
            id,
            name: record.name.clone(),
        });
        Ok(record)
    }

    pub fn delete_item(&mut self, session: &Session, id: i64) -> Result<()> {
        let current = self.get_item(id)?;

        let tx = self.connection.transaction()?;
        tx.execute("DELETE FROM items WHERE item_id = ?1", [id])?;
        record_activity(
            &tx,
            session,
            "item.delete",
            &format!("{} (id {})", current.name, id),
        )?;
        bump_revision(&tx)?;
        tx.commit()?;

        self.notify(&CatalogChange::ItemDeleted {
            id,
            name: current.name,
        });
        Ok(())
    }

    pub fn clear_items(&mut self, session: &Session) -> Result<usize> {
        let tx = self.connection.transaction()?;
        let count = tx.execute("DELETE FROM items", [])?;
        record_activity(
            &tx,
            session,
            "items.clear",
            &format!("removed {count} item(s)"),
        )?;
        bump_revision(&tx)?;
        tx.commit()?;

        self.notify(&CatalogChange::ItemsCleared { count });
        Ok(count)
    }

    /// Sequential import loop: duplicate status is evaluated against a
    /// running set (existing catalog + rows already accepted from this batch)
    /// before each insert, so in-file duplicates are caught too. One activity
    /// entry summarizes the whole batch.
    pub fn import_batch(&mut self, session: &Session, records: &[NewItem]) -> Result<ImportStats> {
        let mut seen: HashSet<String> = self
            .list_items()?
            .iter()
            .map(|item| item.name.to_lowercase())
            .collect();

        let now = now_utc_string();
        let mut stats = ImportStats {
            inserted: 0,
            duplicates_skipped: 0,
        };

        let tx = self.connection.transaction()?;
        {
            let mut statement = tx.prepare(
                "INSERT INTO items(name, price, stock, category, created_at, updated_at)
                 VALUES(?1, ?2, ?3, ?4, ?5, ?5)",
            )?;

            for record in records {
                let key = record.name.trim().to_lowercase();
                if seen.contains(&key) {
                    stats.duplicates_skipped += 1;
                    debug!(item = %record.name, "skipping duplicate during import");
                    continue;
                }

                statement.execute(params![
                    record.name.trim(),
                    record.price,
                    record.stock,
                    record.category,
                    now
                ])?;
                seen.insert(key);
                stats.inserted += 1;
            }
        }

        record_activity(
            &tx,
            session,
            "items.import",
            &format!(
                "{} item(s) imported, {} duplicate(s) skipped",
                stats.inserted, stats.duplicates_skipped
            ),
        )?;
        bump_revision(&tx)?;
        tx.commit()?;

        self.notify(&CatalogChange::ItemsImported {
            inserted: stats.inserted,
            duplicates: stats.duplicates_skipped,
        });
        Ok(stats)
    }

    /// Create `name` if it is not registered yet. Returns whether a row was
    /// created.
    pub fn ensure_category(
        &mut self,
        session: &Session,
        name: &str,
        description: &str,
    ) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(false);
        }

        let existing: Option<String> = self
            .connection
            .query_row(
                "SELECT name FROM categories WHERE lower(name) = lower(?1)",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Ok(false);
        }

        let tx = self.connection.transaction()?;
        tx.execute(
            "INSERT INTO categories(name, description, created_at) VALUES(?1, ?2, ?3)",
            params![name, description, now_utc_string()],
        )?;
        record_activity(&tx, session, "category.create", name)?;
        bump_revision(&tx)?;
        tx.commit()?;

        self.notify(&CatalogChange::CategoryCreated {
            name: name.to_string(),
        });
        Ok(true)
    }

    /// Rename a category and rewrite every referencing item in the same
    /// transaction. The cascade is one logical operation: one activity entry,
    /// one observer event, regardless of how many items moved.
    pub fn rename_category(
        &mut self,
        session: &Session,
        old_name: &str,
        new_name: &str,
    ) -> Result<usize> {
        let old_name = old_name.trim();
        let new_name = new_name.trim();

        let stored: Option<String> = self
            .connection
            .query_row(
                "SELECT name FROM categories WHERE name = ?1",
                [old_name],
                |row| row.get(0),
            )
            .optional()?;
        if stored.is_none() {
            return Err(CatalogError::UnknownCategory(old_name.to_string()).into());
        }

        if !new_name.eq_ignore_ascii_case(old_name) {
            let collision: Option<String> = self
                .connection
                .query_row(
                    "SELECT name FROM categories WHERE lower(name) = lower(?1)",
                    [new_name],
                    |row| row.get(0),
                )
                .optional()?;
            if collision.is_some() {
                return Err(CatalogError::DuplicateCategory(new_name.to_string()).into());
            }
        }

        let tx = self.connection.transaction()?;
        let items_updated = tx.execute(
            "UPDATE items SET category = ?1, updated_at = ?2 WHERE category = ?3",
            params![new_name, now_utc_string(), old_name],
        )?;
        tx.execute(
            "UPDATE categories SET name = ?1 WHERE name = ?2",
            params![new_name, old_name],
        )?;
        record_activity(
            &tx,
            session,
            "category.rename",
            &format!("{old_name} -> {new_name} ({items_updated} item(s) updated)"),
        )?;
        bump_revision(&tx)?;
        tx.commit()?;

        self.notify(&CatalogChange::CategoryRenamed {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
            items_updated,
        });
        Ok(items_updated)
    }

    /// Deleting a category that items still reference is a conflict, never a
    /// silent orphaning.
    pub fn delete_category(&mut self, session: &Session, name: &str) -> Result<()> {
        let name = name.trim();

        let stored: Option<String> = self
            .connection
            .query_row(
                "SELECT name FROM categories WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        if stored.is_none() {
            return Err(CatalogError::UnknownCategory(name.to_string()).into());
        }

        let item_count: i64 = self.connection.query_row(
            "SELECT COUNT(*) FROM items WHERE category = ?1",
            [name],
            |row| row.get(0),
        )?;
        if item_count > 0 {
            return Err(CatalogError::CategoryInUse {
                name: name.to_string(),
                item_count,
            }
            .into());
        }

        let tx = self.connection.transaction()?;
        tx.execute("DELETE FROM categories WHERE name = ?1", [name])?;
        record_activity(&tx, session, "category.delete", name)?;
        bump_revision(&tx)?;
        tx.commit()?;

        self.notify(&CatalogChange::CategoryDeleted {
            name: name.to_string(),
        });
        Ok(())
    }
}

fn row_to_item(row: &Row) -> rusqlite::Result<InventoryRecord> {
    Ok(InventoryRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        price: row.get(2)?,
        stock: row.get(3)?,
        category: row.get(4)?,
    })
}

fn record_activity(
    tx: &rusqlite::Transaction<'_>,
    session: &Session,
    action: &str,
    detail: &str,
) -> Result<()> {
    tx.execute(
        "INSERT INTO activity_log(actor, action, detail, created_at) VALUES(?1, ?2, ?3, ?4)",
        params![session.actor, action, detail, now_utc_string()],
    )?;
    Ok(())
}

fn bump_revision(tx: &rusqlite::Transaction<'_>) -> Result<()> {
    tx.execute(
        "UPDATE metadata SET value = CAST(CAST(value AS INTEGER) + 1 AS TEXT)
         WHERE key = 'revision'",
        [],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    fn store() -> CatalogStore {
        CatalogStore::open_in_memory().expect("in-memory store should open")
    }

    fn session(store: &CatalogStore) -> Session {
        store.open_session("tester").expect("session should open")
    }

    fn new_item(name: &str, price: &str, stock: u32, category: &str) -> NewItem {
        NewItem {
            name: name.to_string(),
            price: price.to_string(),
            stock,
            category: category.to_string(),
        }
    }

    #[derive(Default)]
    struct Recorder {
        changes: RefCell<Vec<CatalogChange>>,
    }

    impl CatalogObserver for Recorder {
        fn catalog_changed(&self, change: &CatalogChange) {
            self.changes.borrow_mut().push(change.clone());
        }
    }

    #[test]
    fn create_assigns_ids_and_rejects_case_insensitive_duplicates() {
        let mut store = store();
        let session = session(&store);

        let record = store
            .create_item(&session, &new_item("Nova", "18.00", 100, "SNACKS"))
            .expect("create should succeed");
        assert!(record.id > 0);

        let err = store
            .create_item(&session, &new_item("NOVA", "20.00", 10, "SNACKS"))
            .expect_err("duplicate should be rejected");
        assert!(matches!(
            err.downcast_ref::<CatalogError>(),
            Some(CatalogError::DuplicateName(_))
        ));
    }

    #[test]
    fn update_applies_only_patched_fields() {
        let mut store = store();
        let session = session(&store);
        let record = store
            .create_item(&session, &new_item("Nova", "18.00", 100, "SNACKS"))
            .unwrap();

        let updated = store
            .update_item(
                &session,
                record.id,
                &ItemPatch {
                    stock: Some(42),
                    ..ItemPatch::default()
                },
            )
            .expect("update should succeed");

        assert_eq!(updated.name, "Nova");
        assert_eq!(updated.price, "18.00");
        assert_eq!(updated.stock, 42);
    }

    #[test]
    fn update_of_missing_item_is_a_typed_error() {
        let mut store = store();
        let session = session(&store);
        let err = store
            .update_item(&session, 999, &ItemPatch::default())
            .expect_err("missing item should fail");
        assert!(matches!(
            err.downcast_ref::<CatalogError>(),
            Some(CatalogError::UnknownItem(999))
        ));
    }

    #[test]
    fn import_batch_skips_duplicates_in_catalog_and_within_file() {
        let mut store = store();
        let session = session(&store);
        store
            .create_item(&session, &new_item("Nova", "18.00", 100, "SNACKS"))
            .unwrap();

        let stats = store
            .import_batch(
                &session,
                &[
                    new_item("nova", "18.00", 100, "SNACKS"),
                    new_item("Piattos", "22.50", 100, "SNACKS"),
                    new_item("PIATTOS", "22.50", 100, "SNACKS"),
                    new_item("Royal 8oz", "20.00", 100, "BEVERAGES"),
                ],
            )
            .expect("import should succeed");

        assert_eq!(stats.inserted, 2);
        assert_eq!(stats.duplicates_skipped, 2);
        assert_eq!(store.list_items().unwrap().len(), 3);

        // The whole batch is one activity entry.
        let imports: Vec<ActivityEntry> = store
            .recent_activity(50)
            .unwrap()
            .into_iter()
            .filter(|entry| entry.action == "items.import")
            .collect();
        assert_eq!(imports.len(), 1);
        assert!(imports[0].detail.contains("2 item(s) imported"));
        assert!(imports[0].detail.contains("2 duplicate(s) skipped"));
    }

    #[test]
    fn rename_category_cascades_in_one_logical_operation() {
        let mut store = store();
        let session = session(&store);
        store.ensure_category(&session, "Rice", "staples").unwrap();

        for i in 0..5 {
            store
                .create_item(
                    &session,
                    &new_item(&format!("Rice Pack {i}"), "55.00", 10, "Rice"),
                )
                .unwrap();
        }

        let recorder = Rc::new(Recorder::default());
        store.subscribe(recorder.clone());

        let moved = store
            .rename_category(&session, "Rice", "Grains")
            .expect("rename should succeed");
        assert_eq!(moved, 5);

        assert!(
            store
                .list_items()
                .unwrap()
                .iter()
                .all(|item| item.category == "Grains")
        );

        let renames: Vec<ActivityEntry> = store
            .recent_activity(50)
            .unwrap()
            .into_iter()
            .filter(|entry| entry.action == "category.rename")
            .collect();
        assert_eq!(renames.len(), 1);
        assert!(renames[0].detail.contains("5 item(s) updated"));

        let changes = recorder.changes.borrow();
        assert_eq!(changes.len(), 1);
        assert!(matches!(
            changes[0],
            CatalogChange::CategoryRenamed {
                items_updated: 5,
                ..
            }
        ));
    }

    #[test]
    fn delete_category_in_use_is_a_conflict() {
        let mut store = store();
        let session = session(&store);
        store.ensure_category(&session, "Rice", "staples").unwrap();
        store
            .create_item(&session, &new_item("Rice Pack", "55.00", 10, "Rice"))
            .unwrap();

        let err = store
            .delete_category(&session, "Rice")
            .expect_err("in-use category should not delete");
        assert!(matches!(
            err.downcast_ref::<CatalogError>(),
            Some(CatalogError::CategoryInUse { item_count: 1, .. })
        ));

        store.delete_item(&session, store.list_items().unwrap()[0].id).unwrap();
        store
            .delete_category(&session, "Rice")
            .expect("unused category should delete");
    }

    #[test]
    fn ensure_category_is_idempotent() {
        let mut store = store();
        let session = session(&store);

        assert!(store.ensure_category(&session, "Snacks", "x").unwrap());
        assert!(!store.ensure_category(&session, "snacks", "x").unwrap());
        assert!(!store.ensure_category(&session, "General", "x").unwrap());
    }

    #[test]
    fn resolve_category_defaults_unknown_names_to_general() {
        let mut store = store();
        let session = session(&store);
        store.ensure_category(&session, "Snacks", "x").unwrap();

        assert_eq!(store.resolve_category("SNACKS").unwrap(), "Snacks");
        assert_eq!(store.resolve_category("Nonexistent").unwrap(), "General");
        assert_eq!(store.resolve_category("  ").unwrap(), "General");
    }

    #[test]
    fn sessions_round_trip_and_unknown_tokens_fail() {
        let mut store = store();
        let session = store.open_session("aling nena").unwrap();

        let resumed = store.resume_session(&session.token).unwrap();
        assert_eq!(resumed.actor, "aling nena");

        let err = store
            .resume_session("not-a-token")
            .expect_err("unknown token should fail");
        assert!(matches!(
            err.downcast_ref::<CatalogError>(),
            Some(CatalogError::UnknownSession)
        ));

        // Sessions carry the actor into the activity log.
        store
            .create_item(&resumed, &new_item("Nova", "18.00", 1, "General"))
            .unwrap();
        let activity = store.recent_activity(1).unwrap();
        assert_eq!(activity[0].actor, "aling nena");
    }

    #[test]
    fn revision_increments_on_every_write() {
        let mut store = store();
        let session = session(&store);
        let start = store.revision().unwrap();

        store
            .create_item(&session, &new_item("Nova", "18.00", 1, "General"))
            .unwrap();
        store.clear_items(&session).unwrap();

        assert_eq!(store.revision().unwrap(), start + 2);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let mut store = store();
        let session = session(&store);
        let recorder = Rc::new(Recorder::default());
        let id = store.subscribe(recorder.clone());

        store
            .create_item(&session, &new_item("Nova", "18.00", 1, "General"))
            .unwrap();
        assert_eq!(recorder.changes.borrow().len(), 1);

        store.unsubscribe(id);
        store.clear_items(&session).unwrap();
        assert_eq!(recorder.changes.borrow().len(), 1);
    }
}
