//! Event types and the event distribution bus
//!
//! Roomtone uses hybrid communication:
//! - **EventBus** (tokio::broadcast): one-to-many event broadcasting; views
//!   derive their presentation from these events instead of polling
//! - **Shared state** (Arc + lock): read-heavy access to the ledger and the
//!   current diary

use crate::models::{Coordinates, DiaryEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Roomtone event types
///
/// Published by the enrichment pipeline and the placement coordinator.
/// Enrichment events for a single diary arrive in poll-completion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RoomtoneEvent {
    /// Audio capture began
    RecordingStarted {
        timestamp: DateTime<Utc>,
    },

    /// Upload succeeded; a provisional diary now exists under this id
    DiaryUploaded {
        diary_id: i64,
        timestamp: DateTime<Utc>,
    },

    /// An enrichment poll came back with a non-empty keyword
    DiaryEnriched {
        diary: DiaryEntry,
        /// 1-based poll attempt that returned the enrichment
        attempt: u32,
        timestamp: DateTime<Utc>,
    },

    /// All poll attempts exhausted; the diary keeps its provisional fields
    EnrichmentTimedOut {
        diary_id: i64,
        attempts: u32,
        timestamp: DateTime<Utc>,
    },

    /// User cancelled while polling was still pending
    EnrichmentCancelled {
        diary_id: i64,
        timestamp: DateTime<Utc>,
    },

    /// One inventory unit was consumed against a diary
    FurnitureRedeemed {
        diary_id: i64,
        furniture_id: i64,
        placed: bool,
        timestamp: DateTime<Utc>,
    },

    /// A stored link moved into the room
    MovedToRoom {
        diary_id: i64,
        furniture_id: i64,
        timestamp: DateTime<Utc>,
    },

    /// A stored link was deleted and its unit returned to the catalog pool
    StorageItemDeleted {
        diary_id: i64,
        furniture_id: i64,
        timestamp: DateTime<Utc>,
    },

    /// Best-effort placement write failed; local state was kept
    PlacementWriteFailed {
        diary_id: i64,
        furniture_id: i64,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Server acknowledged a coordinate update
    CoordinatesUpdated {
        diary_id: i64,
        furniture_id: i64,
        coordinates: Coordinates,
        timestamp: DateTime<Utc>,
    },

    /// Error surfaced to observers (capture or upload failures)
    Error {
        diary_id: Option<i64>,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

/// Central event distribution bus
///
/// Backed by tokio::broadcast: non-blocking publish, multiple concurrent
/// subscribers, automatic cleanup when subscribers drop.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RoomtoneEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events. Events emitted before subscription
    /// are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<RoomtoneEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring whether anyone is currently listening.
    /// Pipeline and coordinator events are all lossy in this sense: a view
    /// that is not mounted simply misses them.
    pub fn emit_lossy(&self, event: RoomtoneEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
