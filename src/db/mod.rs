mod schema;
pub mod corpus;
pub mod sqlite;

use serde::{Deserialize, Serialize};

use crate::corpus::Photo;

pub use corpus::SqliteCorpus;
pub use schema::SCHEMA;
pub use sqlite::Database;

/// Corpus file written by the external EXIF extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusImport {
    #[serde(default)]
    pub sessions: Vec<SessionImport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionImport {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub group: String,
    /// Defaults to the number of photos listed.
    #[serde(default)]
    pub total_photos: Option<i64>,
    #[serde(default)]
    pub total_raw_photos: Option<i64>,
    #[serde(default)]
    pub photos: Vec<Photo>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub sessions: usize,
    pub photos: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extractor_output() {
        let data: CorpusImport = serde_json::from_str(
            r#"{
                "sessions": [{
                    "name": "2025-03-15 Parkrun",
                    "category": "Sport",
                    "group": "Run",
                    "total_raw_photos": 240,
                    "photos": [
                        {"camera": "X-T5", "lens": "XF56mmF1.2 R", "aperture": 1.2,
                         "shutter_speed": "1/1000", "iso": 160, "focal_length": 56.0,
                         "date_taken": "2025-03-15T08:12:45"},
                        {"camera": "X-T5"}
                    ]
                }]
            }"#,
        )
        .unwrap();

        let session = &data.sessions[0];
        assert_eq!(session.total_raw_photos, Some(240));
        assert_eq!(session.total_photos, None);
        assert_eq!(session.photos.len(), 2);
        assert_eq!(session.photos[0].iso, Some(160));
        assert!(session.photos[0].date_taken.is_some());
        assert_eq!(session.photos[1].lens, None);
    }
}
