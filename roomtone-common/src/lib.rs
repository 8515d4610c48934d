//! # Roomtone Common Library
//!
//! Shared code for the Roomtone core crates including:
//! - Domain models (diaries, furniture, placements)
//! - Event types (RoomtoneEvent enum) and the EventBus
//! - Common error taxonomy
//! - Configuration loading
//! - Wire time format helpers

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod time;

pub use config::RoomtoneConfig;
pub use error::{Error, Result};
pub use events::{EventBus, RoomtoneEvent};
