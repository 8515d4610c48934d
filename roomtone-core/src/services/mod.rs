//! Service boundaries: the remote HTTP API and the audio capture capability

pub mod api_client;
pub mod recorder;

pub use api_client::RemoteClient;
pub use recorder::{AudioClip, AudioRecorder};

use async_trait::async_trait;
use roomtone_common::models::{Coordinates, DiaryEntry, Furniture, PlacedFurniture};
use roomtone_common::Result;
use uuid::Uuid;

/// Typed boundary to the remote diary/deco/room service
///
/// One HTTP request per operation, no retry, no business rules. The trait is
/// the seam for the enrichment pipeline and placement coordinator; production
/// code uses [`RemoteClient`], tests substitute mocks.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// GET /diary — fetch one diary by id
    async fn fetch_diary(&self, user_id: Uuid, diary_id: i64) -> Result<DiaryEntry>;

    /// GET /calendar — all diaries of a month
    async fn fetch_calendar(&self, user_id: Uuid, year: i32, month: u32)
        -> Result<Vec<DiaryEntry>>;

    /// POST /diary — upload a captured clip; returns the new diary id
    async fn upload_diary(&self, user_id: Uuid, is_private: bool, clip: AudioClip) -> Result<i64>;

    /// GET /deco — fetch one catalog item
    async fn fetch_furniture(&self, deco_id: i64) -> Result<Furniture>;

    /// GET /deco/available — the full purchasable catalog
    async fn fetch_available_furniture(&self) -> Result<Vec<Furniture>>;

    /// GET /room — placed furniture of a month, for the rendering collaborator
    async fn fetch_room(&self, user_id: Uuid, year: i32, month: u32)
        -> Result<Vec<PlacedFurniture>>;

    /// POST /room — create a placement record; success is the "OK" sentinel
    async fn post_room_placement(&self, user_id: Uuid, diary_id: i64, deco_id: i64) -> Result<()>;

    /// PUT /room — update a placement; omitting coordinates clears position
    async fn update_room_placement(
        &self,
        user_id: Uuid,
        diary_id: i64,
        deco_id: i64,
        coordinates: Option<Coordinates>,
    ) -> Result<()>;
}
