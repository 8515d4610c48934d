//! Diary-to-furniture bindings and room placement records

use crate::error::{Error, Result};
use crate::time::wire_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Integer grid position plus orientation about the vertical axis
///
/// The rendering collaborator converts `orientation` (whole degrees) into a
/// rotation; this core only validates and persists the value. Wire field
/// names match the room-layout endpoint body: `{x, y, z, orientation}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: i64,
    pub y: i64,
    pub z: i64,
    /// Whole degrees, 0-359
    pub orientation: i32,
}

impl Coordinates {
    pub fn new(x: i64, y: i64, z: i64, orientation: i32) -> Result<Self> {
        if !(0..360).contains(&orientation) {
            return Err(Error::InvalidCoordinates(format!(
                "orientation {orientation} outside 0..=359"
            )));
        }
        Ok(Self { x, y, z, orientation })
    }
}

/// Binding of one redeemed furniture unit to the diary that earned it
///
/// Created exactly once per redemption. A stored link can move to the room
/// (`is_placed` flips true and it leaves the storage collection); placement
/// is one-way, there is no path back to storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiaryFurnitureLink {
    /// Local identity for storage bookkeeping
    pub id: Uuid,

    pub furniture_id: i64,
    pub diary_id: i64,

    pub created_at: DateTime<Utc>,

    /// true = rendered in the room, false = held in storage
    pub is_placed: bool,

    /// Server-side validity flag (cleared if the catalog item was retired)
    pub is_valid: bool,

    /// Present iff placed and the server has accepted a layout write
    pub coordinates: Option<Coordinates>,
}

impl DiaryFurnitureLink {
    pub fn new(diary_id: i64, furniture_id: i64, is_placed: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            furniture_id,
            diary_id,
            created_at: Utc::now(),
            is_placed,
            is_valid: true,
            coordinates: None,
        }
    }
}

/// Read-side room record from `GET /room`
///
/// The server joins diary, furniture, and link data into one flat snake_case
/// object per placed item. The core decodes these for the rendering
/// collaborator; it never writes them back in this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedFurniture {
    pub user_id: Uuid,
    pub deco_id: i64,
    pub name: String,
    pub asset_link: String,
    pub category: Option<String>,
    pub display_name: Option<String>,
    pub diary_id: i64,
    #[serde(with = "wire_datetime")]
    pub created_at: DateTime<Utc>,
    pub local_date: String,
    pub audio_link: Option<String>,
    pub summary: Option<String>,
    pub is_private: bool,
    pub is_placed: bool,
    pub coordinates: Option<Coordinates>,
}
