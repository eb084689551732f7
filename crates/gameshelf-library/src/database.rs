//! Game catalog using SQLite

use crate::{AssetMirror, LibraryError};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A game in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Game {
    pub id: i64,
    pub title: String,
    /// Executable path or launcher URI
    pub launch_target: String,
    /// Base filename of the mirrored cover art
    pub cover_art_name: Option<String>,
    pub background_name: Option<String>,
    pub added_at: String,
}

impl Game {
    /// Background image for display, falling back to the cover art
    pub fn background(&self) -> Option<&str> {
        self.background_name
            .as_deref()
            .or(self.cover_art_name.as_deref())
    }

    pub fn summary(&self) -> GameSummary {
        GameSummary {
            id: self.id,
            title: self.title.clone(),
            cover_art_name: self.cover_art_name.clone(),
            background: self.background().map(str::to_string),
        }
    }
}

/// Record handed to the request layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSummary {
    pub id: i64,
    pub title: String,
    pub cover_art_name: Option<String>,
    pub background: Option<String>,
}

/// Partial update; absent or blank fields keep their current value
#[derive(Debug, Clone, Default)]
pub struct GameUpdate {
    pub title: Option<String>,
    pub launch_target: Option<String>,
    pub cover_art_source: Option<PathBuf>,
}

impl GameUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_launch_target(mut self, target: impl Into<String>) -> Self {
        self.launch_target = Some(target.into());
        self
    }

    pub fn with_cover_art(mut self, source: impl Into<PathBuf>) -> Self {
        self.cover_art_source = Some(source.into());
        self
    }

    /// True when applying this update changes nothing
    pub fn is_empty(&self) -> bool {
        non_blank(self.title.as_deref()).is_none()
            && non_blank(self.launch_target.as_deref()).is_none()
            && self
                .cover_art_source
                .as_ref()
                .is_none_or(|p| p.as_os_str().is_empty())
    }
}

/// How IDs behave when entries are deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdPolicy {
    /// Entries above a deleted ID shift down by one, keeping IDs dense
    #[default]
    Compact,
    /// IDs never change after insertion; freed IDs are reused by inserts
    Stable,
}

/// Persistent game catalog
///
/// Mutations take `&mut self`: ID allocation and compaction are
/// read-modify-write sequences and need a single writer. Share the store
/// behind a `Mutex` when more than one thread must write.
pub struct CatalogStore {
    conn: Connection,
    mirror: Option<AssetMirror>,
    policy: IdPolicy,
}

impl CatalogStore {
    /// Open or create a catalog database
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LibraryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Create an in-memory catalog (for testing)
    pub fn in_memory() -> Result<Self, LibraryError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, LibraryError> {
        let store = Self {
            conn,
            mirror: None,
            policy: IdPolicy::default(),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Attach the mirror used when cover art is supplied
    pub fn with_mirror(mut self, mirror: AssetMirror) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn with_id_policy(mut self, policy: IdPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn id_policy(&self) -> IdPolicy {
        self.policy
    }

    pub fn mirror(&self) -> Option<&AssetMirror> {
        self.mirror.as_ref()
    }

    fn init_schema(&self) -> Result<(), LibraryError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                launch_target TEXT NOT NULL,
                cover_art_name TEXT,
                background_name TEXT,
                added_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_games_title ON games(title);
        "#,
        )?;

        Ok(())
    }

    /// Add a game, returning its ID
    ///
    /// The ID is the smallest positive integer not currently in use. When
    /// `cover_art_source` is given the image is mirrored first and only its
    /// base filename is stored.
    pub fn add(
        &mut self,
        title: &str,
        launch_target: &str,
        cover_art_source: Option<&Path>,
    ) -> Result<i64, LibraryError> {
        let title = non_blank(Some(title))
            .ok_or_else(|| LibraryError::Validation("title is required".into()))?;
        let launch_target = non_blank(Some(launch_target))
            .ok_or_else(|| LibraryError::Validation("launch target is required".into()))?;

        let cover_art_name = match cover_art_source {
            Some(source) if !source.as_os_str().is_empty() => Some(self.mirror_asset(source)?),
            _ => None,
        };

        let id = self.lowest_free_id()?;
        self.conn.execute(
            "INSERT INTO games (id, title, launch_target, cover_art_name) VALUES (?1, ?2, ?3, ?4)",
            params![id, title, launch_target, cover_art_name],
        )?;

        info!("Game '{}' added with ID {}", title, id);
        Ok(id)
    }

    /// Apply a partial update to an existing game
    pub fn update(&mut self, id: i64, update: &GameUpdate) -> Result<(), LibraryError> {
        if self.get(id)?.is_none() {
            return Err(LibraryError::GameNotFound(id));
        }

        if update.is_empty() {
            debug!("Empty update for game {}", id);
            return Ok(());
        }

        let cover_art_name = match &update.cover_art_source {
            Some(source) if !source.as_os_str().is_empty() => Some(self.mirror_asset(source)?),
            _ => None,
        };

        let tx = self.conn.transaction()?;
        if let Some(title) = non_blank(update.title.as_deref()) {
            tx.execute(
                "UPDATE games SET title = ?1 WHERE id = ?2",
                params![title, id],
            )?;
        }
        if let Some(target) = non_blank(update.launch_target.as_deref()) {
            tx.execute(
                "UPDATE games SET launch_target = ?1 WHERE id = ?2",
                params![target, id],
            )?;
        }
        if let Some(name) = cover_art_name {
            tx.execute(
                "UPDATE games SET cover_art_name = ?1 WHERE id = ?2",
                params![name, id],
            )?;
        }
        tx.commit()?;

        info!("Game {} updated", id);
        Ok(())
    }

    /// Get a game by ID
    pub fn get(&self, id: i64) -> Result<Option<Game>, LibraryError> {
        let game = self
            .conn
            .query_row(
                "SELECT * FROM games WHERE id = ?1",
                params![id],
                Self::row_to_game,
            )
            .optional()?;

        Ok(game)
    }

    /// All games in ascending ID order
    pub fn list(&self) -> Result<Vec<Game>, LibraryError> {
        let mut stmt = self.conn.prepare("SELECT * FROM games ORDER BY id")?;

        let games = stmt
            .query_map([], Self::row_to_game)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(games)
    }

    /// Request-layer records in ascending ID order
    pub fn summaries(&self) -> Result<Vec<GameSummary>, LibraryError> {
        Ok(self.list()?.iter().map(Game::summary).collect())
    }

    /// Every title currently in the catalog
    pub fn titles(&self) -> Result<HashSet<String>, LibraryError> {
        let mut stmt = self.conn.prepare("SELECT title FROM games")?;

        let titles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<HashSet<String>, _>>()?;

        Ok(titles)
    }

    /// Get total game count
    pub fn count(&self) -> Result<i64, LibraryError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete a game
    ///
    /// Unknown IDs are a no-op and return `false`. Under
    /// [`IdPolicy::Compact`] every game above `id` moves down by one.
    pub fn delete(&mut self, id: i64) -> Result<bool, LibraryError> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute("DELETE FROM games WHERE id = ?1", params![id])?;
        if removed == 0 {
            debug!("Delete of unknown game {} ignored", id);
            return Ok(false);
        }

        if self.policy == IdPolicy::Compact {
            Self::shift_down_above(&tx, id)?;
        }
        tx.commit()?;

        info!("Game {} deleted", id);
        Ok(true)
    }

    /// Delete several games, returning how many were removed
    ///
    /// Each deletion commits on its own, so entries processed before a
    /// failure stay deleted. Compaction then shifts every remaining game
    /// above the smallest deleted ID down by exactly one, however many IDs
    /// above it were removed; non-contiguous batches leave gaps.
    pub fn bulk_delete(&mut self, ids: &[i64]) -> Result<usize, LibraryError> {
        let mut pivot: Option<i64> = None;
        let mut removed = 0;

        for &id in ids {
            let n = self
                .conn
                .execute("DELETE FROM games WHERE id = ?1", params![id])?;
            if n > 0 {
                removed += n;
                pivot = Some(pivot.map_or(id, |p| p.min(id)));
            } else {
                debug!("Bulk delete skipped unknown game {}", id);
            }
        }

        if let (Some(pivot), IdPolicy::Compact) = (pivot, self.policy) {
            let tx = self.conn.transaction()?;
            Self::shift_down_above(&tx, pivot)?;
            tx.commit()?;
        }

        info!("Bulk delete removed {} of {} games", removed, ids.len());
        Ok(removed)
    }

    /// Smallest positive ID not assigned to any game
    pub fn lowest_free_id(&self) -> Result<i64, LibraryError> {
        let mut stmt = self.conn.prepare("SELECT id FROM games ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut next = 1;
        for id in ids {
            if id > next {
                break;
            }
            if id == next {
                next += 1;
            }
        }

        Ok(next)
    }

    /// Decrement every ID above `pivot`
    ///
    /// Done in two passes through negative IDs so no intermediate row
    /// collides with the primary key of another.
    fn shift_down_above(conn: &Connection, pivot: i64) -> Result<(), LibraryError> {
        conn.execute("UPDATE games SET id = -id WHERE id > ?1", params![pivot])?;
        let shifted = conn.execute("UPDATE games SET id = -id - 1 WHERE id < 0", [])?;
        debug!("Compacted {} IDs above {}", shifted, pivot);
        Ok(())
    }

    fn mirror_asset(&self, source: &Path) -> Result<String, LibraryError> {
        let mirror = self
            .mirror
            .as_ref()
            .ok_or_else(|| LibraryError::Asset("no asset mirror configured".into()))?;
        mirror.mirror(source)
    }

    /// Convert a row to a Game
    fn row_to_game(row: &rusqlite::Row) -> rusqlite::Result<Game> {
        Ok(Game {
            id: row.get("id")?,
            title: row.get("title")?,
            launch_target: row.get("launch_target")?,
            cover_art_name: row.get("cover_art_name")?,
            background_name: row.get("background_name")?,
            added_at: row.get("added_at")?,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ids(store: &CatalogStore) -> Vec<i64> {
        store.list().unwrap().iter().map(|g| g.id).collect()
    }

    fn titles_in_order(store: &CatalogStore) -> Vec<String> {
        store.list().unwrap().into_iter().map(|g| g.title).collect()
    }

    fn seeded(n: usize) -> CatalogStore {
        let mut store = CatalogStore::in_memory().unwrap();
        for i in 1..=n {
            store
                .add(&format!("Game {}", i), &format!("/games/game{}.exe", i), None)
                .unwrap();
        }
        store
    }

    #[test]
    fn test_database_creation() {
        let db = CatalogStore::in_memory().unwrap();
        assert_eq!(db.count().unwrap(), 0);
        assert_eq!(db.lowest_free_id().unwrap(), 1);
    }

    #[test]
    fn test_add_and_get_game() {
        let mut db = CatalogStore::in_memory().unwrap();

        let id = db.add("Test Game", "/games/test.exe", None).unwrap();
        let game = db.get(id).unwrap().unwrap();

        assert_eq!(id, 1);
        assert_eq!(game.title, "Test Game");
        assert_eq!(game.launch_target, "/games/test.exe");
        assert_eq!(game.cover_art_name, None);
        assert!(!game.added_at.is_empty());
    }

    #[test]
    fn test_add_requires_title_and_target() {
        let mut db = CatalogStore::in_memory().unwrap();

        assert!(matches!(
            db.add("", "/games/a.exe", None),
            Err(LibraryError::Validation(_))
        ));
        assert!(matches!(
            db.add("   ", "/games/a.exe", None),
            Err(LibraryError::Validation(_))
        ));
        assert!(matches!(
            db.add("A", "", None),
            Err(LibraryError::Validation(_))
        ));
        assert_eq!(db.count().unwrap(), 0);
    }

    #[test]
    fn test_add_fills_lowest_gap() {
        let mut db = CatalogStore::in_memory().unwrap().with_id_policy(IdPolicy::Stable);
        for title in ["a", "b", "c", "d"] {
            db.add(title, "/x.exe", None).unwrap();
        }
        db.delete(2).unwrap();
        db.delete(4).unwrap();
        assert_eq!(ids(&db), vec![1, 3]);

        assert_eq!(db.add("e", "/x.exe", None).unwrap(), 2);
        assert_eq!(db.add("f", "/x.exe", None).unwrap(), 4);
        assert_eq!(db.add("g", "/x.exe", None).unwrap(), 5);
    }

    #[test]
    fn test_duplicate_titles_allowed() {
        let mut db = CatalogStore::in_memory().unwrap();
        db.add("Same", "/a.exe", None).unwrap();
        db.add("Same", "/b.exe", None).unwrap();
        assert_eq!(db.count().unwrap(), 2);
        assert_eq!(db.titles().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_compacts_ids() {
        let mut db = seeded(3);

        assert!(db.delete(2).unwrap());
        assert_eq!(ids(&db), vec![1, 2]);
        assert_eq!(titles_in_order(&db), vec!["Game 1", "Game 3"]);

        assert_eq!(db.add("Game 4", "/games/game4.exe", None).unwrap(), 3);
    }

    #[test]
    fn test_delete_unknown_is_noop() {
        let mut db = seeded(3);
        db.delete(1).unwrap();
        // IDs are {1, 2}; deleting 5 must not shift anything
        assert!(!db.delete(5).unwrap());
        assert_eq!(ids(&db), vec![1, 2]);
        assert_eq!(titles_in_order(&db), vec!["Game 2", "Game 3"]);
    }

    #[test]
    fn test_delete_stable_policy_keeps_ids() {
        let mut db = CatalogStore::in_memory().unwrap().with_id_policy(IdPolicy::Stable);
        for title in ["a", "b", "c"] {
            db.add(title, "/x.exe", None).unwrap();
        }
        db.delete(2).unwrap();
        assert_eq!(ids(&db), vec![1, 3]);
        assert_eq!(db.get(3).unwrap().unwrap().title, "c");
    }

    #[test]
    fn test_dense_ids_after_mixed_operations() {
        let mut db = seeded(6);
        for id in [6, 1, 3, 3] {
            db.delete(id).unwrap();
            let n = db.count().unwrap();
            assert_eq!(ids(&db), (1..=n).collect::<Vec<_>>());
        }
        db.add("late", "/late.exe", None).unwrap();
        assert_eq!(ids(&db), vec![1, 2, 3]);
    }

    #[test]
    fn test_bulk_delete_pivot_rule() {
        let mut db = seeded(4);

        assert_eq!(db.bulk_delete(&[1, 3]).unwrap(), 2);

        // Survivors 2 and 4 both drop by one: 2 -> 1, 4 -> 3
        assert_eq!(ids(&db), vec![1, 3]);
        assert_eq!(titles_in_order(&db), vec!["Game 2", "Game 4"]);
        assert_eq!(db.add("next", "/next.exe", None).unwrap(), 2);
    }

    #[test]
    fn test_bulk_delete_contiguous_stays_dense() {
        let mut db = seeded(5);
        db.bulk_delete(&[2]).unwrap();
        assert_eq!(ids(&db), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_bulk_delete_skips_unknown_ids() {
        let mut db = seeded(3);
        assert_eq!(db.bulk_delete(&[9, 2]).unwrap(), 1);
        assert_eq!(ids(&db), vec![1, 2]);
        assert_eq!(db.bulk_delete(&[]).unwrap(), 0);
        assert_eq!(db.bulk_delete(&[42]).unwrap(), 0);
        assert_eq!(ids(&db), vec![1, 2]);
    }

    #[test]
    fn test_update_partial_fields() {
        let mut db = seeded(1);

        db.update(1, &GameUpdate::new().with_title("Renamed").with_launch_target("  "))
            .unwrap();

        let game = db.get(1).unwrap().unwrap();
        assert_eq!(game.title, "Renamed");
        assert_eq!(game.launch_target, "/games/game1.exe");
    }

    #[test]
    fn test_update_empty_leaves_entry_unchanged() {
        let mut db = seeded(2);
        let before = db.get(2).unwrap().unwrap();

        db.update(2, &GameUpdate::new()).unwrap();
        db.update(2, &GameUpdate::new().with_title("")).unwrap();

        assert_eq!(db.get(2).unwrap().unwrap(), before);
    }

    #[test]
    fn test_update_unknown_game() {
        let mut db = seeded(1);
        let err = db.update(9, &GameUpdate::new().with_title("x")).unwrap_err();
        assert!(matches!(err, LibraryError::GameNotFound(9)));
    }

    #[test]
    fn test_cover_art_is_mirrored() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("halo.png");
        std::fs::write(&source, b"png-bytes").unwrap();
        let mirror = AssetMirror::new(dir.path().join("served"), dir.path().join("cache"));

        let mut db = CatalogStore::in_memory().unwrap().with_mirror(mirror.clone());
        let id = db.add("Halo", "/games/halo.exe", Some(&source)).unwrap();

        let game = db.get(id).unwrap().unwrap();
        assert_eq!(game.cover_art_name.as_deref(), Some("halo.png"));
        assert!(mirror.is_mirrored("halo.png"));
        assert_eq!(game.summary().background.as_deref(), Some("halo.png"));
    }

    #[test]
    fn test_update_cover_art_overwrites_name() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("old.png");
        let second = dir.path().join("new.jpg");
        std::fs::write(&first, b"old").unwrap();
        std::fs::write(&second, b"new").unwrap();
        let mirror = AssetMirror::new(dir.path().join("served"), dir.path().join("cache"));

        let mut db = CatalogStore::in_memory().unwrap().with_mirror(mirror.clone());
        let id = db.add("Game", "/g.exe", Some(&first)).unwrap();
        db.update(id, &GameUpdate::new().with_cover_art(&second))
            .unwrap();

        assert_eq!(
            db.get(id).unwrap().unwrap().cover_art_name.as_deref(),
            Some("new.jpg")
        );
        assert!(mirror.is_mirrored("new.jpg"));
    }

    #[test]
    fn test_cover_art_without_mirror_fails() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.png");
        std::fs::write(&source, b"a").unwrap();

        let mut db = CatalogStore::in_memory().unwrap();
        let err = db.add("A", "/a.exe", Some(&source)).unwrap_err();
        assert!(matches!(err, LibraryError::Asset(_)));
        assert_eq!(db.count().unwrap(), 0);
    }

    #[test]
    fn test_missing_cover_art_source_adds_nothing() {
        let dir = TempDir::new().unwrap();
        let mirror = AssetMirror::new(dir.path().join("served"), dir.path().join("cache"));
        let mut db = CatalogStore::in_memory().unwrap().with_mirror(mirror);

        let err = db
            .add("A", "/a.exe", Some(&dir.path().join("missing.png")))
            .unwrap_err();
        assert!(matches!(err, LibraryError::Asset(_)));
        assert_eq!(db.count().unwrap(), 0);
    }

    #[test]
    fn test_summary_serialization() {
        let mut db = seeded(1);
        db.add("Second", "steam://rungameid/10", None).unwrap();

        let json = serde_json::to_value(db.summaries().unwrap()).unwrap();
        assert_eq!(json[1]["id"], 2);
        assert_eq!(json[1]["title"], "Second");
        assert!(json[1]["background"].is_null());
    }

    #[test]
    fn test_reopen_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db").join("launcher.db");

        {
            let mut db = CatalogStore::open(&path).unwrap();
            db.add("Kept", "/kept.exe", None).unwrap();
        }

        let db = CatalogStore::open(&path).unwrap();
        assert_eq!(titles_in_order(&db), vec!["Kept"]);
    }
}
