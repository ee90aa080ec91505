pub const SCHEMA: &str = r#"
-- Sessions: one shoot, i.e. the photos kept from one RAW folder
CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    category TEXT NOT NULL DEFAULT '',
    group_name TEXT NOT NULL DEFAULT '',
    total_photos INTEGER NOT NULL DEFAULT 0,
    total_raw_photos INTEGER,          -- NULL when no RAW folder was found
    imported_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_sessions_category ON sessions(category);
CREATE INDEX IF NOT EXISTS idx_sessions_group ON sessions(group_name);

-- Photos: EXIF attributes captured at extraction time
CREATE TABLE IF NOT EXISTS photos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id INTEGER NOT NULL,
    camera TEXT,
    lens TEXT,
    aperture REAL,
    shutter_speed TEXT,
    iso INTEGER,
    focal_length REAL,
    date_taken TEXT,                   -- 'YYYY-MM-DD HH:MM:SS'
    category TEXT NOT NULL DEFAULT '', -- denormalised from the session
    group_name TEXT NOT NULL DEFAULT '',
    FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
);

-- Indexes for every pushed-down dimension
CREATE INDEX IF NOT EXISTS idx_photos_session ON photos(session_id);
CREATE INDEX IF NOT EXISTS idx_photos_category ON photos(category);
CREATE INDEX IF NOT EXISTS idx_photos_group ON photos(group_name);
CREATE INDEX IF NOT EXISTS idx_photos_camera ON photos(camera);
CREATE INDEX IF NOT EXISTS idx_photos_lens ON photos(lens);
CREATE INDEX IF NOT EXISTS idx_photos_aperture ON photos(aperture);
CREATE INDEX IF NOT EXISTS idx_photos_shutter ON photos(shutter_speed);
CREATE INDEX IF NOT EXISTS idx_photos_iso ON photos(iso);
CREATE INDEX IF NOT EXISTS idx_photos_focal ON photos(focal_length);

-- Dataset version: bumped on every change to photos or sessions
CREATE TABLE IF NOT EXISTS dataset_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL
);

INSERT OR IGNORE INTO dataset_meta (id, version) VALUES (1, 1);

CREATE TRIGGER IF NOT EXISTS trg_sessions_insert AFTER INSERT ON sessions
BEGIN UPDATE dataset_meta SET version = version + 1 WHERE id = 1; END;
CREATE TRIGGER IF NOT EXISTS trg_sessions_update AFTER UPDATE ON sessions
BEGIN UPDATE dataset_meta SET version = version + 1 WHERE id = 1; END;
CREATE TRIGGER IF NOT EXISTS trg_sessions_delete AFTER DELETE ON sessions
BEGIN UPDATE dataset_meta SET version = version + 1 WHERE id = 1; END;

CREATE TRIGGER IF NOT EXISTS trg_photos_insert AFTER INSERT ON photos
BEGIN UPDATE dataset_meta SET version = version + 1 WHERE id = 1; END;
CREATE TRIGGER IF NOT EXISTS trg_photos_update AFTER UPDATE ON photos
BEGIN UPDATE dataset_meta SET version = version + 1 WHERE id = 1; END;
CREATE TRIGGER IF NOT EXISTS trg_photos_delete AFTER DELETE ON photos
BEGIN UPDATE dataset_meta SET version = version + 1 WHERE id = 1; END;
"#;

/// Stored format of `photos.date_taken`.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
