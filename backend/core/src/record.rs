use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A processed screenshot as persisted in history.
///
/// The id is assigned by the store at persistence time and never reused;
/// a record is immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenshotRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    /// On-disk image location; empty when the image was kept inline only.
    pub image_path: String,
    /// Inline data-URL thumbnail of the captured image.
    pub thumbnail: String,
    /// Recognized transcript. May be empty when no text was found.
    pub text: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A record as computed by a pipeline run, before the store assigns its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewScreenshot {
    pub timestamp: DateTime<Utc>,
    pub image_path: String,
    pub thumbnail: String,
    pub text: String,
    pub answer: String,
    pub title: Option<String>,
}

impl NewScreenshot {
    /// Promote to a full record once the store has assigned an id.
    pub fn into_record(self, id: i64) -> ScreenshotRecord {
        ScreenshotRecord {
            id,
            timestamp: self.timestamp,
            image_path: self.image_path,
            thumbnail: self.thumbnail,
            text: self.text,
            answer: self.answer,
            title: self.title,
        }
    }
}
