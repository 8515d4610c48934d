//! Capture-to-reward pipeline
//!
//! Drives the record → upload → poll-for-enrichment flow as an explicit
//! state machine. The enrichment poll runs as a detached background task
//! that may outlive the interaction that started it: the caller keeps using
//! the provisional diary while polling continues, and observers learn about
//! the outcome through the event bus.
//!
//! Retry policy lives here and only here: the upload itself is never
//! retried; the poll budget is a fixed number of attempts with a fixed wait
//! before each attempt (including the first).

use roomtone_common::models::DiaryEntry;
use roomtone_common::{Error, EventBus, Result, RoomtoneConfig, RoomtoneEvent};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::services::{AudioRecorder, RemoteService};

/// Pipeline state for the current capture cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureState {
    /// No capture in progress
    Idle,
    /// Audio device is capturing
    Recording,
    /// Clip handed to the remote service, waiting for the diary id
    Uploading,
    /// Diary exists provisionally; background polling for enrichment
    PendingEnrichment,
    /// A poll returned a non-empty keyword; diary fully populated
    Enriched,
    /// Terminal: upload failed, poll budget exhausted, or user cancelled
    /// before upload
    Abandoned,
}

/// Enrichment poll policy
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Poll attempts per uploaded diary
    pub poll_attempts: u32,
    /// Wait before each poll attempt, including the first
    pub poll_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_attempts: 3,
            poll_interval: Duration::from_secs(7),
        }
    }
}

impl From<&RoomtoneConfig> for PipelineConfig {
    fn from(config: &RoomtoneConfig) -> Self {
        Self {
            poll_attempts: config.poll_attempts,
            poll_interval: config.poll_interval,
        }
    }
}

/// Diary enrichment pipeline
///
/// One logical capture session at a time; a new cycle started while an older
/// diary is still polling leaves the older poll task running with its own
/// state, so concurrent diaries never share poll bookkeeping.
pub struct DiaryEnrichmentPipeline {
    api: Arc<dyn RemoteService>,
    recorder: AsyncMutex<Box<dyn AudioRecorder>>,
    event_bus: EventBus,
    config: PipelineConfig,
    user_id: Uuid,
    state: Arc<RwLock<CaptureState>>,
    current_diary: Arc<RwLock<Option<DiaryEntry>>>,
    /// Cancellation handle for the current diary's poll task
    poll_cancel: Mutex<Option<CancellationToken>>,
}

impl DiaryEnrichmentPipeline {
    pub fn new(
        api: Arc<dyn RemoteService>,
        recorder: Box<dyn AudioRecorder>,
        event_bus: EventBus,
        user_id: Uuid,
        config: PipelineConfig,
    ) -> Self {
        Self {
            api,
            recorder: AsyncMutex::new(recorder),
            event_bus,
            config,
            user_id,
            state: Arc::new(RwLock::new(CaptureState::Idle)),
            current_diary: Arc::new(RwLock::new(None)),
            poll_cancel: Mutex::new(None),
        }
    }

    pub fn state(&self) -> CaptureState {
        *self.state.read().unwrap()
    }

    /// Snapshot of the diary for the current cycle, if one exists
    pub fn current_diary(&self) -> Option<DiaryEntry> {
        self.current_diary.read().unwrap().clone()
    }

    fn set_state(&self, new_state: CaptureState) {
        let mut state = self.state.write().unwrap();
        debug!(old = ?*state, new = ?new_state, "capture state transition");
        *state = new_state;
    }

    /// Begin capturing audio. Starting while already recording is a no-op.
    /// A device failure surfaces `Error::Capture` and leaves the state Idle.
    pub async fn start_recording(&self) -> Result<()> {
        if self.state() == CaptureState::Recording {
            debug!("start_recording while already recording; ignoring");
            return Ok(());
        }

        let mut recorder = self.recorder.lock().await;
        match recorder.start().await {
            Ok(()) => {
                self.set_state(CaptureState::Recording);
                self.event_bus.emit_lossy(RoomtoneEvent::RecordingStarted {
                    timestamp: chrono::Utc::now(),
                });
                Ok(())
            }
            Err(e) => {
                self.set_state(CaptureState::Idle);
                Err(e)
            }
        }
    }

    /// Stop capturing and upload the clip.
    ///
    /// On success the provisional diary is published, background polling
    /// starts, and the new diary id is returned without waiting for
    /// enrichment. Upload failure is terminal for this cycle (`Abandoned`)
    /// and is never retried.
    pub async fn stop_and_upload(&self, is_private: bool) -> Result<i64> {
        if self.state() != CaptureState::Recording {
            return Err(Error::Capture("stop requested with no active recording".into()));
        }

        self.set_state(CaptureState::Uploading);
        // Clear the previous cycle's diary so stale data is never shown
        // while the new one uploads.
        *self.current_diary.write().unwrap() = None;

        let clip = {
            let mut recorder = self.recorder.lock().await;
            match recorder.stop().await {
                Ok(clip) => clip,
                Err(e) => {
                    self.set_state(CaptureState::Idle);
                    return Err(e);
                }
            }
        };

        match self.api.upload_diary(self.user_id, is_private, clip).await {
            Ok(diary_id) => {
                info!(diary_id, "diary uploaded; starting enrichment poll");
                let diary = DiaryEntry::provisional(diary_id, self.user_id, is_private);
                *self.current_diary.write().unwrap() = Some(diary);
                self.set_state(CaptureState::PendingEnrichment);
                self.event_bus.emit_lossy(RoomtoneEvent::DiaryUploaded {
                    diary_id,
                    timestamp: chrono::Utc::now(),
                });
                self.spawn_poll(diary_id);
                Ok(diary_id)
            }
            Err(e) => {
                warn!(error = %e, "diary upload failed; abandoning cycle");
                self.set_state(CaptureState::Abandoned);
                self.event_bus.emit_lossy(RoomtoneEvent::Error {
                    diary_id: None,
                    message: e.to_string(),
                    timestamp: chrono::Utc::now(),
                });
                Err(e)
            }
        }
    }

    /// Cancel the current cycle and reset to Idle.
    ///
    /// Stops future poll attempts (never an in-flight request) and does not
    /// roll back an already-submitted upload. A cancel is published as
    /// `EnrichmentCancelled`, distinguishable from a timeout, so the caller
    /// can decide whether to keep the provisional diary.
    pub async fn cancel(&self) {
        if self.state() == CaptureState::Recording {
            let mut recorder = self.recorder.lock().await;
            if let Err(e) = recorder.stop().await {
                debug!(error = %e, "recorder stop on cancel failed");
            }
        }
        if let Some(token) = self.poll_cancel.lock().unwrap().take() {
            token.cancel();
        }
        self.set_state(CaptureState::Idle);
    }

    /// Record the furniture redeemed against the current diary
    pub fn annotate_connected_furniture(&self, diary_id: i64, furniture_id: i64) {
        let mut guard = self.current_diary.write().unwrap();
        if let Some(diary) = guard.as_mut() {
            if diary.id == diary_id {
                diary.connected_furniture = Some(furniture_id);
            }
        }
    }

    /// Detach the enrichment poll loop for `diary_id`.
    ///
    /// The task owns every piece of state it needs, so a newer capture cycle
    /// can start without disturbing it; only the stored token (and therefore
    /// `cancel`) is replaced.
    fn spawn_poll(&self, diary_id: i64) {
        let token = CancellationToken::new();
        *self.poll_cancel.lock().unwrap() = Some(token.clone());

        let api = Arc::clone(&self.api);
        let event_bus = self.event_bus.clone();
        let state = Arc::clone(&self.state);
        let current_diary = Arc::clone(&self.current_diary);
        let user_id = self.user_id;
        let attempts = self.config.poll_attempts;
        let interval = self.config.poll_interval;

        tokio::spawn(async move {
            poll_for_enrichment(
                api,
                event_bus,
                state,
                current_diary,
                user_id,
                diary_id,
                attempts,
                interval,
                token,
            )
            .await;
        });
    }
}

/// Sequential poll loop for one diary. Polls are never concurrent, so
/// enrichment updates publish in completion order.
#[allow(clippy::too_many_arguments)]
async fn poll_for_enrichment(
    api: Arc<dyn RemoteService>,
    event_bus: EventBus,
    state: Arc<RwLock<CaptureState>>,
    current_diary: Arc<RwLock<Option<DiaryEntry>>>,
    user_id: Uuid,
    diary_id: i64,
    attempts: u32,
    interval: Duration,
    token: CancellationToken,
) {
    for attempt in 1..=attempts {
        // Mandatory wait before every attempt, including the first
        tokio::select! {
            _ = token.cancelled() => {
                info!(diary_id, "enrichment poll cancelled");
                event_bus.emit_lossy(RoomtoneEvent::EnrichmentCancelled {
                    diary_id,
                    timestamp: chrono::Utc::now(),
                });
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        match api.fetch_diary(user_id, diary_id).await {
            Ok(fetched) if fetched.is_enriched() => {
                let published = {
                    let mut guard = current_diary.write().unwrap();
                    match guard.as_mut() {
                        Some(diary) if diary.id == diary_id => {
                            diary.apply_enrichment(&fetched);
                            let snapshot = diary.clone();
                            // Still the active cycle; advance the machine
                            *state.write().unwrap() = CaptureState::Enriched;
                            snapshot
                        }
                        // A newer cycle replaced us; publish the result
                        // without touching the pipeline state.
                        _ => fetched,
                    }
                };
                info!(diary_id, attempt, "diary enriched");
                event_bus.emit_lossy(RoomtoneEvent::DiaryEnriched {
                    diary: published,
                    attempt,
                    timestamp: chrono::Utc::now(),
                });
                return;
            }
            Ok(_) => {
                debug!(diary_id, attempt, "diary not yet enriched");
            }
            Err(e) => {
                // A failed poll consumes its attempt; the budget is fixed
                warn!(diary_id, attempt, error = %e, "enrichment poll failed");
            }
        }
    }

    info!(diary_id, attempts, "enrichment poll budget exhausted");
    {
        let guard = current_diary.read().unwrap();
        if matches!(guard.as_ref(), Some(diary) if diary.id == diary_id) {
            *state.write().unwrap() = CaptureState::Abandoned;
        }
    }
    event_bus.emit_lossy(RoomtoneEvent::EnrichmentTimedOut {
        diary_id,
        attempts,
        timestamp: chrono::Utc::now(),
    });
}
