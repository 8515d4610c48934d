//! Redemption and room placement coordinator
//!
//! Owns the storage collection (links not yet placed) and mediates every
//! inventory-consuming operation. The ledger decides whether a redemption is
//! allowed; this coordinator sequences the side effects around that decision.
//!
//! Remote placement writes are best-effort: a failed POST keeps the local
//! link and publishes `PlacementWriteFailed`, and nothing ever reconciles the
//! drift afterwards. Coordinate updates are the one exception, where local
//! state only changes after the server acknowledges.

use roomtone_common::models::{Coordinates, DiaryEntry, DiaryFurnitureLink};
use roomtone_common::{Error, EventBus, Result, RoomtoneEvent};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

use crate::ledger::InventoryLedger;
use crate::services::RemoteService;

pub struct PlacementCoordinator {
    api: Arc<dyn RemoteService>,
    ledger: Arc<InventoryLedger>,
    event_bus: EventBus,
    user_id: Uuid,
    /// Links redeemed but not yet moved to the room
    storage: Mutex<Vec<DiaryFurnitureLink>>,
}

impl PlacementCoordinator {
    pub fn new(
        api: Arc<dyn RemoteService>,
        ledger: Arc<InventoryLedger>,
        event_bus: EventBus,
        user_id: Uuid,
    ) -> Self {
        Self {
            api,
            ledger,
            event_bus,
            user_id,
            storage: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the storage collection, oldest first
    pub fn storage_items(&self) -> Vec<DiaryFurnitureLink> {
        self.storage.lock().unwrap().clone()
    }

    /// Redeem one unit of `furniture_id` against `diary`.
    ///
    /// The ledger decrement is the gate: at zero quantity this fails with
    /// `InsufficientInventory` and has no side effects at all. On success a
    /// link is created exactly once and either placed in the room (with a
    /// best-effort remote write) or pushed into storage.
    pub async fn redeem(
        &self,
        diary: &mut DiaryEntry,
        furniture_id: i64,
        place_immediately: bool,
    ) -> Result<DiaryFurnitureLink> {
        if !self.ledger.decrement(furniture_id) {
            return Err(Error::InsufficientInventory { furniture_id });
        }

        diary.connected_furniture = Some(furniture_id);
        let link = DiaryFurnitureLink::new(diary.id, furniture_id, place_immediately);
        info!(
            diary_id = diary.id,
            furniture_id, placed = place_immediately, "furniture redeemed"
        );

        if place_immediately {
            self.write_placement(diary.id, furniture_id).await;
        } else {
            self.storage.lock().unwrap().push(link.clone());
        }

        self.event_bus.emit_lossy(RoomtoneEvent::FurnitureRedeemed {
            diary_id: diary.id,
            furniture_id,
            placed: place_immediately,
            timestamp: chrono::Utc::now(),
        });
        Ok(link)
    }

    /// Move a stored link into the room.
    ///
    /// The unit was already consumed at redemption, so the ledger is not
    /// touched. Returns the placed link, or None if the id is not in
    /// storage (already moved, or never stored).
    pub async fn move_to_room(&self, link_id: Uuid) -> Option<DiaryFurnitureLink> {
        let mut link = {
            let mut storage = self.storage.lock().unwrap();
            let index = storage.iter().position(|l| l.id == link_id)?;
            storage.remove(index)
        };
        link.is_placed = true;

        self.write_placement(link.diary_id, link.furniture_id).await;

        self.event_bus.emit_lossy(RoomtoneEvent::MovedToRoom {
            diary_id: link.diary_id,
            furniture_id: link.furniture_id,
            timestamp: chrono::Utc::now(),
        });
        Some(link)
    }

    /// Delete a stored link and refund its unit to the catalog pool.
    /// Returns false if the id is not in storage; the refund happens at most
    /// once because removal and refund are tied together.
    pub fn delete_from_storage(&self, link_id: Uuid) -> bool {
        let link = {
            let mut storage = self.storage.lock().unwrap();
            match storage.iter().position(|l| l.id == link_id) {
                Some(index) => storage.remove(index),
                None => return false,
            }
        };
        self.ledger.increment(link.furniture_id);

        self.event_bus.emit_lossy(RoomtoneEvent::StorageItemDeleted {
            diary_id: link.diary_id,
            furniture_id: link.furniture_id,
            timestamp: chrono::Utc::now(),
        });
        true
    }

    /// Persist new coordinates for a placed link.
    ///
    /// Server-first: the PUT must come back "OK" before the local link
    /// changes, so a rejected write leaves the previous position intact.
    pub async fn update_coordinates(
        &self,
        link: &mut DiaryFurnitureLink,
        coordinates: Coordinates,
    ) -> Result<()> {
        self.api
            .update_room_placement(
                self.user_id,
                link.diary_id,
                link.furniture_id,
                Some(coordinates),
            )
            .await?;

        link.coordinates = Some(coordinates);
        self.event_bus.emit_lossy(RoomtoneEvent::CoordinatesUpdated {
            diary_id: link.diary_id,
            furniture_id: link.furniture_id,
            coordinates,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Best-effort POST of a placement record. Failure keeps local state and
    /// is reported through the bus only.
    async fn write_placement(&self, diary_id: i64, furniture_id: i64) {
        if let Err(e) = self
            .api
            .post_room_placement(self.user_id, diary_id, furniture_id)
            .await
        {
            warn!(diary_id, furniture_id, error = %e, "placement write failed; keeping local state");
            self.event_bus
                .emit_lossy(RoomtoneEvent::PlacementWriteFailed {
                    diary_id,
                    furniture_id,
                    message: e.to_string(),
                    timestamp: chrono::Utc::now(),
                });
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
