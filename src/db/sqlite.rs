//! SQLite write side: schema setup, corpus import and session management.

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

use crate::corpus::Session;

use super::corpus::{read_session, SqliteCorpus, SESSION_COLUMNS};
use super::schema::{DATE_FORMAT, SCHEMA};
use super::{CorpusImport, ImportSummary};

pub struct Database {
    pub(crate) conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Read-only accessor over the same database file.
    pub fn corpus(&self) -> SqliteCorpus {
        SqliteCorpus::new(&self.path)
    }

    pub fn import_file(&mut self, path: &Path) -> Result<ImportSummary> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let data: CorpusImport = serde_json::from_str(&content)
            .with_context(|| format!("Invalid corpus file {}", path.display()))?;
        self.import(&data)
    }

    /// Insert every session and its photos in one transaction.
    ///
    /// Photos without a category or group inherit the session's. A session
    /// without an explicit photo count gets the number of photos it carries.
    /// Shutter speeds are stored trimmed, blank ones as NULL.
    pub fn import(&mut self, data: &CorpusImport) -> Result<ImportSummary> {
        for session in &data.sessions {
            if session.total_raw_photos.is_some_and(|raw| raw < 0) {
                bail!("Session '{}' has a negative RAW count", session.name);
            }
        }

        let tx = self.conn.transaction()?;
        let mut summary = ImportSummary::default();
        {
            let mut insert_session = tx.prepare(
                r#"
                INSERT INTO sessions (name, category, group_name, total_photos, total_raw_photos)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )?;
            let mut insert_photo = tx.prepare(
                r#"
                INSERT INTO photos (session_id, camera, lens, aperture, shutter_speed, iso,
                                    focal_length, date_taken, category, group_name)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )?;

            for session in &data.sessions {
                let total_photos = session
                    .total_photos
                    .unwrap_or(session.photos.len() as i64);
                insert_session.execute(params![
                    session.name,
                    session.category,
                    session.group,
                    total_photos,
                    session.total_raw_photos,
                ])?;
                let session_id = tx.last_insert_rowid();

                for photo in &session.photos {
                    let category = if photo.category.is_empty() { &session.category } else { &photo.category };
                    let group = if photo.group.is_empty() { &session.group } else { &photo.group };
                    insert_photo.execute(params![
                        session_id,
                        photo.camera,
                        photo.lens,
                        photo.aperture,
                        photo.shutter_speed.as_deref().map(str::trim).filter(|s| !s.is_empty()),
                        photo.iso,
                        photo.focal_length,
                        photo.date_taken.map(|dt| dt.format(DATE_FORMAT).to_string()),
                        category,
                        group,
                    ])?;
                    summary.photos += 1;
                }
                summary.sessions += 1;
            }
        }
        tx.commit()?;

        tracing::info!(
            sessions = summary.sessions,
            photos = summary.photos,
            "Imported corpus"
        );
        Ok(summary)
    }

    pub fn list_sessions(&self) -> Result<Vec<Session>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM sessions ORDER BY id", SESSION_COLUMNS))?;
        let sessions = stmt
            .query_map([], read_session)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }

    pub fn get_session(&self, session_id: i64) -> Result<Option<Session>> {
        let session = self
            .conn
            .query_row(
                &format!("SELECT {} FROM sessions WHERE id = ?", SESSION_COLUMNS),
                [session_id],
                read_session,
            )
            .optional()?;
        Ok(session)
    }

    /// Set or clear the RAW photo count. Returns false for an unknown session.
    pub fn set_raw_count(&self, session_id: i64, total_raw_photos: Option<i64>) -> Result<bool> {
        if total_raw_photos.is_some_and(|raw| raw < 0) {
            bail!("RAW count cannot be negative");
        }
        let updated = self.conn.execute(
            "UPDATE sessions SET total_raw_photos = ? WHERE id = ?",
            params![total_raw_photos, session_id],
        )?;
        Ok(updated > 0)
    }

    /// Delete a session and its photos. Returns the number of photos removed,
    /// or `None` for an unknown session.
    pub fn delete_session(&mut self, session_id: i64) -> Result<Option<usize>> {
        let tx = self.conn.transaction()?;
        let photos: i64 = tx.query_row(
            "SELECT COUNT(*) FROM photos WHERE session_id = ?",
            [session_id],
            |row| row.get(0),
        )?;
        let deleted = tx.execute("DELETE FROM sessions WHERE id = ?", [session_id])?;
        tx.commit()?;

        if deleted == 0 {
            return Ok(None);
        }
        tracing::info!(session_id, photos, "Deleted session");
        Ok(Some(photos as usize))
    }

    pub fn photo_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn dataset_version(&self) -> Result<u64> {
        let version: i64 = self.conn.query_row(
            "SELECT version FROM dataset_meta WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(version as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SessionImport;
    use crate::corpus::Photo;

    fn sample() -> CorpusImport {
        CorpusImport {
            sessions: vec![
                SessionImport {
                    name: "track day".into(),
                    category: "Sport".into(),
                    group: "Run".into(),
                    total_photos: None,
                    total_raw_photos: Some(12),
                    photos: vec![
                        Photo { camera: Some("A".into()), ..Default::default() },
                        Photo { camera: Some("B".into()), ..Default::default() },
                    ],
                },
                SessionImport {
                    name: "sunday".into(),
                    category: "Family".into(),
                    group: "Home".into(),
                    total_photos: Some(5),
                    total_raw_photos: None,
                    photos: vec![Photo { camera: Some("A".into()), ..Default::default() }],
                },
            ],
        }
    }

    fn open() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        db.initialize().unwrap();
        (dir, db)
    }

    #[test]
    fn test_import_and_list() {
        let (_dir, mut db) = open();
        let summary = db.import(&sample()).unwrap();
        assert_eq!(summary, ImportSummary { sessions: 2, photos: 3 });

        let sessions = db.list_sessions().unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].total_photos, 2);
        assert_eq!(sessions[0].total_raw_photos, Some(12));
        assert_eq!(sessions[0].group, "Run");
        assert_eq!(sessions[1].total_photos, 5);
        assert_eq!(sessions[1].total_raw_photos, None);
        assert_eq!(db.photo_count().unwrap(), 3);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (_dir, db) = open();
        let version = db.dataset_version().unwrap();
        db.initialize().unwrap();
        assert_eq!(db.dataset_version().unwrap(), version);
    }

    #[test]
    fn test_set_raw_count() {
        let (_dir, mut db) = open();
        db.import(&sample()).unwrap();
        let id = db.list_sessions().unwrap()[1].id;

        assert!(db.set_raw_count(id, Some(20)).unwrap());
        assert_eq!(db.get_session(id).unwrap().unwrap().total_raw_photos, Some(20));
        assert!(db.set_raw_count(id, None).unwrap());
        assert_eq!(db.get_session(id).unwrap().unwrap().total_raw_photos, None);

        assert!(!db.set_raw_count(9_999, Some(1)).unwrap());
        assert!(db.set_raw_count(id, Some(-1)).is_err());
    }

    #[test]
    fn test_delete_session_cascades() {
        let (_dir, mut db) = open();
        db.import(&sample()).unwrap();
        let id = db.list_sessions().unwrap()[0].id;
        let before = db.dataset_version().unwrap();

        assert_eq!(db.delete_session(id).unwrap(), Some(2));
        assert_eq!(db.photo_count().unwrap(), 1);
        assert!(db.dataset_version().unwrap() > before);
        assert_eq!(db.delete_session(id).unwrap(), None);
    }

    #[test]
    fn test_negative_raw_count_rejected() {
        let (_dir, mut db) = open();
        let mut data = sample();
        data.sessions[0].total_raw_photos = Some(-3);
        assert!(db.import(&data).is_err());
        assert!(db.list_sessions().unwrap().is_empty());
    }
}
