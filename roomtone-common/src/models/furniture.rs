//! Furniture catalog items

use serde::{Deserialize, Serialize};

/// Furniture category, controlling where an item may be placed in the room
///
/// Wire labels are the original Korean category strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FurnitureCategory {
    #[serde(rename = "벽")]
    Wall,
    #[serde(rename = "바닥")]
    Floor,
    #[serde(rename = "벽에 붙이는")]
    WallMounted,
    #[serde(rename = "바닥에 까는")]
    FloorRug,
    #[serde(rename = "일반 가구")]
    GeneralFurniture,
    /// Furniture that can carry small items on top of it
    #[serde(rename = "작은 물건 올릴 수 있는 가구")]
    SupportingFurniture,
    /// Small item that sits on supporting furniture
    #[serde(rename = "작은 물건")]
    SmallItem,
}

impl FurnitureCategory {
    /// Lenient parse of a wire label; unknown or absent categories fall back
    /// to GeneralFurniture so a catalog addition never breaks decoding.
    pub fn from_label(label: &str) -> Self {
        match label {
            "벽" | "wall" => FurnitureCategory::Wall,
            "바닥" | "floor" => FurnitureCategory::Floor,
            "벽에 붙이는" | "wall_mounted" => FurnitureCategory::WallMounted,
            "바닥에 까는" | "floor_rug" => FurnitureCategory::FloorRug,
            "일반 가구" | "general" => FurnitureCategory::GeneralFurniture,
            "작은 물건 올릴 수 있는 가구" | "supporting" => {
                FurnitureCategory::SupportingFurniture
            }
            "작은 물건" | "small_item" => FurnitureCategory::SmallItem,
            _ => FurnitureCategory::GeneralFurniture,
        }
    }
}

/// A furniture catalog item (wallpaper, rug, sofa, ...)
///
/// Catalog entries are fetched once from the remote service. `quantity` is
/// the locally owned count and is mutated only through the InventoryLedger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Furniture {
    pub id: i64,

    /// Internal asset name
    pub name: String,

    /// User-facing name shown in the library and carousel
    pub display_name: String,

    /// Preview image URL
    pub image_ref: String,

    /// 3D model reference consumed by the rendering collaborator
    pub asset_ref: String,

    pub category: FurnitureCategory,

    /// Owned count; always >= 0 by construction
    pub quantity: u32,
}

impl Furniture {
    pub fn is_owned(&self) -> bool {
        self.quantity > 0
    }
}
