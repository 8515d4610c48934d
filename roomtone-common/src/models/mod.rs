//! Domain models shared across the Roomtone core

pub mod diary;
pub mod furniture;
pub mod placement;

pub use diary::{DiaryEntry, Emotion};
pub use furniture::{Furniture, FurnitureCategory};
pub use placement::{Coordinates, DiaryFurnitureLink, PlacedFurniture};
