//! Roomtone core: capture, enrich, redeem, place
//!
//! The domain core of the voice-diary companion. It owns the capture
//! pipeline, the inventory ledger, the placement coordinator, and the typed
//! client for the remote diary/deco/room service. Rendering, audio devices,
//! and account management live in collaborating layers that talk to this
//! crate through [`Roomtone`] and the event bus.

pub mod ledger;
pub mod pipeline;
pub mod placement;
pub mod services;

pub use ledger::{FilterMode, InventoryLedger};
pub use pipeline::{CaptureState, DiaryEnrichmentPipeline, PipelineConfig};
pub use placement::PlacementCoordinator;
pub use services::{AudioClip, AudioRecorder, RemoteClient, RemoteService};

use roomtone_common::models::{DiaryEntry, PlacedFurniture};
use roomtone_common::{Error, EventBus, Result, RoomtoneConfig, RoomtoneEvent};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

/// Event bus depth; enrichment and placement events are small and bursty
const EVENT_BUS_CAPACITY: usize = 64;

/// Composition root wiring the pipeline, ledger, and coordinator together
pub struct Roomtone {
    config: RoomtoneConfig,
    event_bus: EventBus,
    api: Arc<dyn RemoteService>,
    pub pipeline: DiaryEnrichmentPipeline,
    pub ledger: Arc<InventoryLedger>,
    pub coordinator: PlacementCoordinator,
}

impl Roomtone {
    /// Wire up against the real remote service named by `config`.
    pub fn new(config: RoomtoneConfig, recorder: Box<dyn AudioRecorder>) -> Result<Self> {
        let api: Arc<dyn RemoteService> = Arc::new(RemoteClient::new(&config.api_base_url)?);
        Ok(Self::with_service(config, api, recorder))
    }

    /// Wire up against an arbitrary service implementation (tests, previews)
    pub fn with_service(
        config: RoomtoneConfig,
        api: Arc<dyn RemoteService>,
        recorder: Box<dyn AudioRecorder>,
    ) -> Self {
        let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
        let ledger = Arc::new(InventoryLedger::new());

        let pipeline = DiaryEnrichmentPipeline::new(
            Arc::clone(&api),
            recorder,
            event_bus.clone(),
            config.user_id,
            PipelineConfig::from(&config),
        );
        let coordinator = PlacementCoordinator::new(
            Arc::clone(&api),
            Arc::clone(&ledger),
            event_bus.clone(),
            config.user_id,
        );

        info!(user_id = %config.user_id, api = %config.api_base_url, "roomtone core assembled");
        Self {
            config,
            event_bus,
            api,
            pipeline,
            ledger,
            coordinator,
        }
    }

    pub fn config(&self) -> &RoomtoneConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomtoneEvent> {
        self.event_bus.subscribe()
    }

    /// Fetch the purchasable catalog and seed the ledger. Quantities of
    /// already-known items survive a refresh.
    pub async fn refresh_catalog(&self) -> Result<()> {
        let items = self.api.fetch_available_furniture().await?;
        info!(count = items.len(), "catalog refreshed");
        self.ledger.load_catalog(items);
        Ok(())
    }

    /// Redeem furniture against the diary of the current capture cycle.
    ///
    /// Fails with `NoActiveDiary` when no cycle has produced a diary yet.
    /// On success the pipeline's diary snapshot is annotated with the
    /// redeemed furniture so later enrichment keeps the binding.
    pub async fn redeem_current(
        &self,
        furniture_id: i64,
        place_immediately: bool,
    ) -> Result<()> {
        let mut diary = self.pipeline.current_diary().ok_or(Error::NoActiveDiary)?;
        self.coordinator
            .redeem(&mut diary, furniture_id, place_immediately)
            .await?;
        self.pipeline
            .annotate_connected_furniture(diary.id, furniture_id);
        Ok(())
    }

    /// Month view of the room, for the rendering collaborator
    pub async fn room(&self, year: i32, month: u32) -> Result<Vec<PlacedFurniture>> {
        self.api.fetch_room(self.config.user_id, year, month).await
    }

    /// Month view of the calendar: every diary of the user for that month
    pub async fn calendar(&self, year: i32, month: u32) -> Result<Vec<DiaryEntry>> {
        self.api
            .fetch_calendar(self.config.user_id, year, month)
            .await
    }

    /// Re-fetch one diary by id, outside the enrichment poll loop
    pub async fn diary(&self, diary_id: i64) -> Result<DiaryEntry> {
        self.api.fetch_diary(self.config.user_id, diary_id).await
    }

    pub fn user_id(&self) -> Uuid {
        self.config.user_id
    }
}
