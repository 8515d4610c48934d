//! Voice diary entry and its emotion labels

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emotion extracted from a diary's audio during enrichment
///
/// Wire labels are the original Korean strings; `from_label` also accepts the
/// English names so the model survives a service-side localization change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Emotion {
    #[serde(rename = "화남")]
    Anger,
    #[serde(rename = "슬픔")]
    Sadness,
    #[serde(rename = "행복")]
    Happiness,
    #[serde(rename = "편안")]
    Neutral,
}

impl Emotion {
    /// Lenient parse of a wire label. Unknown or empty labels map to Neutral,
    /// which is also the provisional value before enrichment completes.
    pub fn from_label(label: &str) -> Self {
        match label {
            "화남" | "anger" => Emotion::Anger,
            "슬픔" | "sadness" => Emotion::Sadness,
            "행복" | "happiness" => Emotion::Happiness,
            _ => Emotion::Neutral,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Emotion::Anger => "화남",
            Emotion::Sadness => "슬픔",
            Emotion::Happiness => "행복",
            Emotion::Neutral => "편안",
        }
    }
}

impl Default for Emotion {
    fn default() -> Self {
        Emotion::Neutral
    }
}

/// A voice diary entry
///
/// Created locally in provisional form as soon as the upload returns a server
/// id; mutated in place when an enrichment poll comes back with a non-empty
/// keyword. Never deleted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiaryEntry {
    /// Server-assigned identifier
    pub id: i64,

    pub user_id: Uuid,

    pub created_at: DateTime<Utc>,

    /// Display date string as the server renders it (e.g. "2024-12-04")
    pub local_date: String,

    /// URL of the stored audio
    pub audio_link: String,

    /// Neutral until enrichment completes
    pub emotion: Emotion,

    /// Summary keyword; empty until enrichment completes
    pub keyword: String,

    /// Full transcription; empty until enrichment completes
    pub transcribed_text: String,

    pub is_private: bool,

    /// Furniture id redeemed against this diary, if any
    pub connected_furniture: Option<i64>,
}

impl DiaryEntry {
    /// Provisional entry for a freshly uploaded diary, before enrichment.
    pub fn provisional(id: i64, user_id: Uuid, is_private: bool) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            created_at: now,
            local_date: now.format("%Y-%m-%d").to_string(),
            audio_link: String::new(),
            emotion: Emotion::Neutral,
            keyword: String::new(),
            transcribed_text: String::new(),
            is_private,
            connected_furniture: None,
        }
    }

    /// A diary counts as enriched iff its keyword is non-empty. This is the
    /// sole signal the enrichment pipeline uses to stop polling.
    pub fn is_enriched(&self) -> bool {
        !self.keyword.is_empty()
    }

    /// Fold a freshly fetched server copy into this entry. Only enrichment
    /// fields move; local annotations (connected furniture) are preserved.
    pub fn apply_enrichment(&mut self, fetched: &DiaryEntry) {
        self.emotion = fetched.emotion;
        self.keyword = fetched.keyword.clone();
        self.transcribed_text = fetched.transcribed_text.clone();
        if !fetched.audio_link.is_empty() {
            self.audio_link = fetched.audio_link.clone();
        }
    }
}
