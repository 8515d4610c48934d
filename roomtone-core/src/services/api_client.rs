//! Remote service HTTP client
//!
//! Maps each core operation to exactly one HTTP request and decodes the typed
//! response. No retry lives here; the enrichment pipeline owns the only retry
//! policy. Two contract quirks are handled explicitly:
//!
//! - the upload response is a bare integer diary id, delivered either as
//!   plain text or as a JSON-decodable integer depending on server revision;
//! - placement writes acknowledge with the literal body `OK` (case-sensitive)
//!   rather than a JSON envelope.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use roomtone_common::models::{
    Coordinates, DiaryEntry, Emotion, Furniture, FurnitureCategory, PlacedFurniture,
};
use roomtone_common::time::wire_datetime;
use roomtone_common::{Error, Result};

use super::{AudioClip, RemoteService};

const USER_AGENT: &str = "roomtone/0.1.0";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the diary/deco/room service
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self { http, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue a GET and decode the JSON body, translating failures into the
    /// Transport/Decode taxonomy.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        debug!(path, "remote service GET");
        let response = self.http.get(self.url(path)).query(query).send().await?;
        let body = read_success_body(response).await?;
        serde_json::from_str(&body).map_err(|e| Error::Decode(format!("{path}: {e}")))
    }
}

/// Check HTTP status and return the raw body text
async fn read_success_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(Error::Transport(format!("HTTP {status}: {text}")));
    }
    Ok(response.text().await?)
}

/// Parse the upload response: a bare integer diary id as plain text, a JSON
/// integer, or a JSON string holding an integer (older server revision).
fn parse_diary_id(body: &str) -> Result<i64> {
    let trimmed = body.trim();
    if let Ok(id) = trimmed.parse::<i64>() {
        return Ok(id);
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(id) = value.as_i64() {
            return Ok(id);
        }
        if let Some(s) = value.as_str() {
            if let Ok(id) = s.trim().parse::<i64>() {
                return Ok(id);
            }
        }
    }
    Err(Error::ResponseFormat(format!(
        "expected integer diary id, got {body:?}"
    )))
}

/// Placement writes succeed iff the body is exactly "OK"
fn ensure_ok_sentinel(body: &str) -> Result<()> {
    if body == "OK" {
        Ok(())
    } else {
        Err(Error::ResponseFormat(format!(
            "expected \"OK\" sentinel, got {body:?}"
        )))
    }
}

// ========================================
// Wire shapes (snake_case per the service)
// ========================================

#[derive(Debug, Deserialize)]
struct DiaryWire {
    id: i64,
    #[serde(with = "wire_datetime")]
    created_at: DateTime<Utc>,
    local_date: String,
    user_id: Uuid,
    audio_link: Option<String>,
    summary: Option<String>,
    #[serde(default)]
    transcription: Option<String>,
    #[serde(default)]
    emotion: Option<String>,
    is_private: bool,
}

impl From<DiaryWire> for DiaryEntry {
    fn from(wire: DiaryWire) -> Self {
        DiaryEntry {
            id: wire.id,
            user_id: wire.user_id,
            created_at: wire.created_at,
            local_date: wire.local_date,
            audio_link: wire.audio_link.unwrap_or_default(),
            emotion: wire
                .emotion
                .as_deref()
                .map(Emotion::from_label)
                .unwrap_or_default(),
            keyword: wire.summary.unwrap_or_default(),
            transcribed_text: wire.transcription.unwrap_or_default(),
            is_private: wire.is_private,
            connected_furniture: None,
        }
    }
}

/// Calendar rows wrap the diary with its display date
#[derive(Debug, Deserialize)]
struct CalendarEntryWire {
    #[allow(dead_code)]
    created_at: String,
    diary: DiaryWire,
}

#[derive(Debug, Deserialize)]
struct FurnitureWire {
    id: i64,
    name: String,
    asset_link: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

impl From<FurnitureWire> for Furniture {
    fn from(wire: FurnitureWire) -> Self {
        let display_name = wire.display_name.unwrap_or_else(|| wire.name.clone());
        Furniture {
            id: wire.id,
            name: wire.name,
            display_name,
            // The catalog carries a single asset reference; previews reuse it
            image_ref: wire.asset_link.clone(),
            asset_ref: wire.asset_link,
            category: wire
                .category
                .as_deref()
                .map(FurnitureCategory::from_label)
                .unwrap_or(FurnitureCategory::GeneralFurniture),
            // Ownership counts are local ledger state, not catalog data
            quantity: 0,
        }
    }
}

#[async_trait]
impl RemoteService for RemoteClient {
    async fn fetch_diary(&self, user_id: Uuid, diary_id: i64) -> Result<DiaryEntry> {
        let wire: DiaryWire = self
            .get_json(
                "/diary",
                &[
                    ("user_id", user_id.to_string()),
                    ("diary_id", diary_id.to_string()),
                ],
            )
            .await?;
        Ok(wire.into())
    }

    async fn fetch_calendar(
        &self,
        user_id: Uuid,
        year: i32,
        month: u32,
    ) -> Result<Vec<DiaryEntry>> {
        let rows: Vec<CalendarEntryWire> = self
            .get_json(
                "/calendar",
                &[
                    ("user_id", user_id.to_string()),
                    ("year", year.to_string()),
                    ("month", month.to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(|row| row.diary.into()).collect())
    }

    async fn upload_diary(&self, user_id: Uuid, is_private: bool, clip: AudioClip) -> Result<i64> {
        debug!(bytes = clip.bytes.len(), "uploading diary audio");

        let part = multipart::Part::bytes(clip.bytes)
            .file_name("audio_file")
            .mime_str(&clip.mime)
            .map_err(|e| Error::Capture(format!("clip mime type: {e}")))?;
        let form = multipart::Form::new().part("audio_file", part);

        let response = self
            .http
            .post(self.url("/diary"))
            .query(&[
                ("user_id", user_id.to_string()),
                ("is_private", is_private.to_string()),
            ])
            .multipart(form)
            .send()
            .await?;

        let body = read_success_body(response).await?;
        parse_diary_id(&body)
    }

    async fn fetch_furniture(&self, deco_id: i64) -> Result<Furniture> {
        let wire: FurnitureWire = self
            .get_json("/deco", &[("deco_id", deco_id.to_string())])
            .await?;
        Ok(wire.into())
    }

    async fn fetch_available_furniture(&self) -> Result<Vec<Furniture>> {
        let wires: Vec<FurnitureWire> = self.get_json("/deco/available", &[]).await?;
        Ok(wires.into_iter().map(Into::into).collect())
    }

    async fn fetch_room(
        &self,
        user_id: Uuid,
        year: i32,
        month: u32,
    ) -> Result<Vec<PlacedFurniture>> {
        self.get_json(
            "/room",
            &[
                ("user_id", user_id.to_string()),
                ("year", year.to_string()),
                ("month", month.to_string()),
            ],
        )
        .await
    }

    async fn post_room_placement(&self, user_id: Uuid, diary_id: i64, deco_id: i64) -> Result<()> {
        let response = self
            .http
            .post(self.url("/room"))
            .query(&[
                ("user_id", user_id.to_string()),
                ("diary_id", diary_id.to_string()),
                ("deco_id", deco_id.to_string()),
            ])
            .send()
            .await?;

        let body = read_success_body(response).await?;
        ensure_ok_sentinel(&body)
    }

    async fn update_room_placement(
        &self,
        user_id: Uuid,
        diary_id: i64,
        deco_id: i64,
        coordinates: Option<Coordinates>,
    ) -> Result<()> {
        let mut request = self.http.put(self.url("/room")).query(&[
            ("user_id", user_id.to_string()),
            ("diary_id", diary_id.to_string()),
            ("deco_id", deco_id.to_string()),
        ]);
        if let Some(coordinates) = coordinates {
            request = request.json(&coordinates);
        }

        let body = read_success_body(request.send().await?).await?;
        ensure_ok_sentinel(&body)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_text_diary_id() {
        assert_eq!(parse_diary_id("42").unwrap(), 42);
        assert_eq!(parse_diary_id(" 42\n").unwrap(), 42);
    }

    #[test]
    fn parses_json_integer_diary_id() {
        // Older server revision wrapped the id as a JSON string
        assert_eq!(parse_diary_id("\"42\"").unwrap(), 42);
    }

    #[test]
    fn rejects_non_numeric_upload_body() {
        assert!(matches!(
            parse_diary_id("created"),
            Err(Error::ResponseFormat(_))
        ));
        assert!(matches!(parse_diary_id(""), Err(Error::ResponseFormat(_))));
        assert!(matches!(
            parse_diary_id("{\"id\": 42}"),
            Err(Error::ResponseFormat(_))
        ));
    }

    #[test]
    fn sentinel_is_exact_and_case_sensitive() {
        assert!(ensure_ok_sentinel("OK").is_ok());
        assert!(ensure_ok_sentinel("ok").is_err());
        assert!(ensure_ok_sentinel("").is_err());
        assert!(ensure_ok_sentinel(" OK").is_err());
        assert!(ensure_ok_sentinel("OK\n").is_err());
    }

    #[test]
    fn diary_wire_maps_summary_to_keyword() {
        let json = r#"{
            "id": 7,
            "created_at": "2024-12-04T09:30:00.123456Z",
            "local_date": "2024-12-04",
            "user_id": "8c7f3c44-5e4e-4f4a-9d2a-2a3f0a1b2c3d",
            "audio_link": "https://audio.example/7.m4a",
            "summary": "행복",
            "transcription": "오늘은 정말 즐거운 하루였다.",
            "emotion": "행복",
            "is_private": false
        }"#;

        let wire: DiaryWire = serde_json::from_str(json).unwrap();
        let diary: DiaryEntry = wire.into();
        assert_eq!(diary.id, 7);
        assert_eq!(diary.keyword, "행복");
        assert_eq!(diary.emotion, Emotion::Happiness);
        assert!(diary.is_enriched());
    }

    #[test]
    fn diary_wire_tolerates_missing_enrichment_fields() {
        let json = r#"{
            "id": 8,
            "created_at": "2024-12-04T09:30:00.123456Z",
            "local_date": "2024-12-04",
            "user_id": "8c7f3c44-5e4e-4f4a-9d2a-2a3f0a1b2c3d",
            "audio_link": null,
            "summary": null,
            "is_private": true
        }"#;

        let wire: DiaryWire = serde_json::from_str(json).unwrap();
        let diary: DiaryEntry = wire.into();
        assert!(!diary.is_enriched());
        assert_eq!(diary.emotion, Emotion::Neutral);
        assert!(diary.transcribed_text.is_empty());
    }

    #[test]
    fn furniture_wire_defaults_display_name() {
        let json = r#"{"id": 3, "name": "sofa_blue", "asset_link": "a.glb"}"#;
        let wire: FurnitureWire = serde_json::from_str(json).unwrap();
        let furniture: Furniture = wire.into();
        assert_eq!(furniture.display_name, "sofa_blue");
        assert_eq!(furniture.category, FurnitureCategory::GeneralFurniture);
        assert_eq!(furniture.quantity, 0);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = RemoteClient::new("http://localhost:10000/").unwrap();
        assert_eq!(client.url("/diary"), "http://localhost:10000/diary");
    }
}
