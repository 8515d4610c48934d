//! End-to-end pipeline tests against a programmable remote service
//!
//! The remote mock serves a queue of programmed fetch_diary outcomes, one per
//! poll attempt, so each test controls exactly which attempt (if any) returns
//! enrichment. Poll intervals are a few milliseconds to keep the suite fast.

use async_trait::async_trait;
use roomtone_common::models::{
    Coordinates, DiaryEntry, Emotion, Furniture, PlacedFurniture,
};
use roomtone_common::{Error, EventBus, Result, RoomtoneEvent};
use roomtone_core::pipeline::{CaptureState, DiaryEnrichmentPipeline, PipelineConfig};
use roomtone_core::services::{AudioClip, AudioRecorder, RemoteService};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

/// One programmed outcome for a fetch_diary call
enum PollOutcome {
    NotYet,
    Enriched,
    TransportError,
}

#[derive(Default)]
struct MockRemote {
    /// Consumed front-to-back, one per fetch_diary call
    poll_script: Mutex<VecDeque<PollOutcome>>,
    fetch_count: AtomicU32,
    fail_upload: bool,
}

impl MockRemote {
    fn scripted(outcomes: Vec<PollOutcome>) -> Self {
        Self {
            poll_script: Mutex::new(outcomes.into()),
            ..Default::default()
        }
    }

    fn failing_upload() -> Self {
        Self {
            fail_upload: true,
            ..Default::default()
        }
    }

    fn fetches(&self) -> u32 {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

fn enriched_diary(diary_id: i64, user_id: Uuid) -> DiaryEntry {
    let mut diary = DiaryEntry::provisional(diary_id, user_id, false);
    diary.keyword = "행복".to_string();
    diary.transcribed_text = "맑은 날 산책을 했다.".to_string();
    diary.emotion = Emotion::Happiness;
    diary.audio_link = "https://audio.example/42.m4a".to_string();
    diary
}

#[async_trait]
impl RemoteService for MockRemote {
    async fn fetch_diary(&self, user_id: Uuid, diary_id: i64) -> Result<DiaryEntry> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .poll_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(PollOutcome::NotYet);
        match outcome {
            PollOutcome::NotYet => Ok(DiaryEntry::provisional(diary_id, user_id, false)),
            PollOutcome::Enriched => Ok(enriched_diary(diary_id, user_id)),
            PollOutcome::TransportError => Err(Error::Transport("connection reset".into())),
        }
    }

    async fn fetch_calendar(
        &self,
        _user_id: Uuid,
        _year: i32,
        _month: u32,
    ) -> Result<Vec<DiaryEntry>> {
        Ok(Vec::new())
    }

    async fn upload_diary(
        &self,
        _user_id: Uuid,
        _is_private: bool,
        _clip: AudioClip,
    ) -> Result<i64> {
        if self.fail_upload {
            Err(Error::Transport("upload refused".into()))
        } else {
            Ok(42)
        }
    }

    async fn fetch_furniture(&self, _deco_id: i64) -> Result<Furniture> {
        unimplemented!("not used by pipeline tests")
    }

    async fn fetch_available_furniture(&self) -> Result<Vec<Furniture>> {
        Ok(Vec::new())
    }

    async fn fetch_room(
        &self,
        _user_id: Uuid,
        _year: i32,
        _month: u32,
    ) -> Result<Vec<PlacedFurniture>> {
        Ok(Vec::new())
    }

    async fn post_room_placement(&self, _user_id: Uuid, _diary_id: i64, _deco_id: i64) -> Result<()> {
        Ok(())
    }

    async fn update_room_placement(
        &self,
        _user_id: Uuid,
        _diary_id: i64,
        _deco_id: i64,
        _coordinates: Option<Coordinates>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Recorder fake that always yields a tiny clip; `fail_start` simulates a
/// device permission failure.
struct MockRecorder {
    fail_start: bool,
}

impl MockRecorder {
    fn ok() -> Box<dyn AudioRecorder> {
        Box::new(Self { fail_start: false })
    }

    fn broken() -> Box<dyn AudioRecorder> {
        Box::new(Self { fail_start: true })
    }
}

#[async_trait]
impl AudioRecorder for MockRecorder {
    async fn start(&mut self) -> Result<()> {
        if self.fail_start {
            Err(Error::Capture("microphone unavailable".into()))
        } else {
            Ok(())
        }
    }

    async fn stop(&mut self) -> Result<AudioClip> {
        Ok(AudioClip::new(vec![0u8; 16]))
    }
}

fn fast_config(attempts: u32) -> PipelineConfig {
    PipelineConfig {
        poll_attempts: attempts,
        poll_interval: Duration::from_millis(5),
    }
}

fn pipeline_with(
    remote: Arc<MockRemote>,
    recorder: Box<dyn AudioRecorder>,
    attempts: u32,
) -> (DiaryEnrichmentPipeline, broadcast::Receiver<RoomtoneEvent>) {
    let bus = EventBus::new(64);
    let rx = bus.subscribe();
    let pipeline = DiaryEnrichmentPipeline::new(
        remote,
        recorder,
        bus,
        Uuid::new_v4(),
        fast_config(attempts),
    );
    (pipeline, rx)
}

/// Drain events until one matches, with a hard timeout so a broken pipeline
/// fails the test instead of hanging it.
async fn wait_for<F>(rx: &mut broadcast::Receiver<RoomtoneEvent>, mut pred: F) -> RoomtoneEvent
where
    F: FnMut(&RoomtoneEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let event = rx.recv().await.expect("event bus closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("expected event did not arrive")
}

#[tokio::test]
async fn enrichment_on_second_attempt_stops_polling() {
    let remote = Arc::new(MockRemote::scripted(vec![
        PollOutcome::NotYet,
        PollOutcome::Enriched,
        PollOutcome::NotYet,
    ]));
    let (pipeline, mut rx) = pipeline_with(remote.clone(), MockRecorder::ok(), 3);

    pipeline.start_recording().await.unwrap();
    let diary_id = pipeline.stop_and_upload(false).await.unwrap();
    assert_eq!(diary_id, 42);
    assert_eq!(pipeline.state(), CaptureState::PendingEnrichment);

    let event = wait_for(&mut rx, |e| matches!(e, RoomtoneEvent::DiaryEnriched { .. })).await;
    match event {
        RoomtoneEvent::DiaryEnriched { diary, attempt, .. } => {
            assert_eq!(attempt, 2);
            assert_eq!(diary.keyword, "행복");
            assert_eq!(diary.emotion, Emotion::Happiness);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    assert_eq!(pipeline.state(), CaptureState::Enriched);
    let diary = pipeline.current_diary().unwrap();
    assert!(diary.is_enriched());
    // Success on attempt 2 means attempt 3 never ran
    assert_eq!(remote.fetches(), 2);
}

#[tokio::test]
async fn poll_budget_exhaustion_keeps_provisional_diary() {
    let remote = Arc::new(MockRemote::scripted(vec![
        PollOutcome::NotYet,
        PollOutcome::NotYet,
        PollOutcome::NotYet,
    ]));
    let (pipeline, mut rx) = pipeline_with(remote.clone(), MockRecorder::ok(), 3);

    pipeline.start_recording().await.unwrap();
    pipeline.stop_and_upload(false).await.unwrap();

    let event = wait_for(&mut rx, |e| {
        matches!(e, RoomtoneEvent::EnrichmentTimedOut { .. })
    })
    .await;
    match event {
        RoomtoneEvent::EnrichmentTimedOut { diary_id, attempts, .. } => {
            assert_eq!(diary_id, 42);
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    assert_eq!(pipeline.state(), CaptureState::Abandoned);
    assert_eq!(remote.fetches(), 3);
    // The diary survives with its provisional fields
    let diary = pipeline.current_diary().unwrap();
    assert!(!diary.is_enriched());
    assert_eq!(diary.id, 42);
}

#[tokio::test]
async fn transport_errors_consume_attempts() {
    let remote = Arc::new(MockRemote::scripted(vec![
        PollOutcome::TransportError,
        PollOutcome::TransportError,
        PollOutcome::Enriched,
    ]));
    let (pipeline, mut rx) = pipeline_with(remote.clone(), MockRecorder::ok(), 3);

    pipeline.start_recording().await.unwrap();
    pipeline.stop_and_upload(false).await.unwrap();

    let event = wait_for(&mut rx, |e| matches!(e, RoomtoneEvent::DiaryEnriched { .. })).await;
    match event {
        RoomtoneEvent::DiaryEnriched { attempt, .. } => assert_eq!(attempt, 3),
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(remote.fetches(), 3);
}

#[tokio::test]
async fn upload_failure_abandons_without_polling() {
    let remote = Arc::new(MockRemote::failing_upload());
    let (pipeline, mut rx) = pipeline_with(remote.clone(), MockRecorder::ok(), 3);

    pipeline.start_recording().await.unwrap();
    let err = pipeline.stop_and_upload(false).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(pipeline.state(), CaptureState::Abandoned);
    assert!(pipeline.current_diary().is_none());

    wait_for(&mut rx, |e| matches!(e, RoomtoneEvent::Error { .. })).await;

    // Give any (incorrect) poll task a chance to run
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(remote.fetches(), 0);
}

#[tokio::test]
async fn cancel_during_polling_stops_attempts() {
    // Interval long enough that cancel lands inside the first wait
    let remote = Arc::new(MockRemote::scripted(vec![PollOutcome::Enriched]));
    let bus = EventBus::new(64);
    let mut rx = bus.subscribe();
    let pipeline = DiaryEnrichmentPipeline::new(
        remote.clone(),
        MockRecorder::ok(),
        bus,
        Uuid::new_v4(),
        PipelineConfig {
            poll_attempts: 3,
            poll_interval: Duration::from_secs(30),
        },
    );

    pipeline.start_recording().await.unwrap();
    pipeline.stop_and_upload(false).await.unwrap();
    pipeline.cancel().await;

    let event = wait_for(&mut rx, |e| {
        matches!(e, RoomtoneEvent::EnrichmentCancelled { .. })
    })
    .await;
    match event {
        RoomtoneEvent::EnrichmentCancelled { diary_id, .. } => assert_eq!(diary_id, 42),
        other => panic!("unexpected event: {other:?}"),
    }

    assert_eq!(pipeline.state(), CaptureState::Idle);
    assert_eq!(remote.fetches(), 0);
}

#[tokio::test]
async fn capture_start_failure_stays_idle() {
    let remote = Arc::new(MockRemote::default());
    let (pipeline, _rx) = pipeline_with(remote, MockRecorder::broken(), 3);

    let err = pipeline.start_recording().await.unwrap_err();
    assert!(matches!(err, Error::Capture(_)));
    assert_eq!(pipeline.state(), CaptureState::Idle);

    // No recording means stop is also an error
    let err = pipeline.stop_and_upload(false).await.unwrap_err();
    assert!(matches!(err, Error::Capture(_)));
}

#[tokio::test]
async fn start_while_recording_is_a_no_op() {
    let remote = Arc::new(MockRemote::default());
    let (pipeline, mut rx) = pipeline_with(remote, MockRecorder::ok(), 3);

    pipeline.start_recording().await.unwrap();
    assert_eq!(pipeline.state(), CaptureState::Recording);
    pipeline.start_recording().await.unwrap();
    assert_eq!(pipeline.state(), CaptureState::Recording);

    // Exactly one RecordingStarted was published
    wait_for(&mut rx, |e| matches!(e, RoomtoneEvent::RecordingStarted { .. })).await;
    assert!(matches!(
        rx.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn annotation_survives_enrichment() {
    let remote = Arc::new(MockRemote::scripted(vec![PollOutcome::Enriched]));
    let (pipeline, mut rx) = pipeline_with(remote, MockRecorder::ok(), 3);

    pipeline.start_recording().await.unwrap();
    let diary_id = pipeline.stop_and_upload(false).await.unwrap();
    pipeline.annotate_connected_furniture(diary_id, 3);

    wait_for(&mut rx, |e| matches!(e, RoomtoneEvent::DiaryEnriched { .. })).await;

    let diary = pipeline.current_diary().unwrap();
    assert!(diary.is_enriched());
    assert_eq!(diary.connected_furniture, Some(3));
}
