//! Shared fakes for the engine integration tests.
//!
//! Every external collaborator gets a scriptable in-memory stand-in:
//! a render device recording its signal graph, a media element firing
//! native events on demand, an adaptive engine with a canned manifest,
//! a stream decoder yielding scripted chunks and an HTTP client serving
//! fixed bytes with an optional delay.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::audio::PcmBuffer;
use bridge_traits::decode::{DecodeSession, DecodedStreamInfo, PcmChunk, StreamDecoder};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::media::{
    ElementEvent, MediaBridge, MediaElement, MediaErrorKind, MediaReadyState,
};
use bridge_traits::render::{
    FilterParams, RenderDevice, SourceId, SourceStartOptions, StageId,
};
use bridge_traits::stream::{AdaptiveEngine, AdaptiveEvent, StreamVariant};
use bytes::Bytes;
use core_playback::events::PlayerEvent;
use core_playback::player::Player;
use core_runtime::logging::{LogLevel, LogSink};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

// ============================================================================
// Render device
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum StageKind {
    Gain,
    Filter,
    MediaSource,
}

#[derive(Debug, Clone)]
pub struct StageRecord {
    pub kind: StageKind,
    pub gain: f32,
    pub filter: Option<FilterParams>,
    pub released: bool,
}

#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub frames: usize,
    pub started: Option<SourceStartOptions>,
    pub stopped: bool,
    pub released: bool,
    pub connected_to: Option<StageId>,
}

#[derive(Debug, Default)]
pub struct GraphState {
    pub next_id: u64,
    pub stages: HashMap<u64, StageRecord>,
    pub connections: Vec<(u64, u64)>,
    pub output_links: Vec<u64>,
    pub sources: HashMap<u64, SourceRecord>,
}

pub struct FakeRenderDevice {
    pub graph: Mutex<GraphState>,
    clock: Mutex<f64>,
    sample_rate: u32,
    /// Seconds of silence produced by `decode`.
    pub decode_seconds: Mutex<f64>,
    pub decode_delay: Mutex<Duration>,
    pub decode_error: Mutex<Option<String>>,
    pub refuse_start: AtomicBool,
}

impl FakeRenderDevice {
    pub fn new(sample_rate: u32) -> Arc<Self> {
        Arc::new(Self {
            graph: Mutex::new(GraphState::default()),
            clock: Mutex::new(0.0),
            sample_rate,
            decode_seconds: Mutex::new(1.0),
            decode_delay: Mutex::new(Duration::ZERO),
            decode_error: Mutex::new(None),
            refuse_start: AtomicBool::new(false),
        })
    }

    pub fn advance_clock(&self, seconds: f64) {
        *self.clock.lock() += seconds;
    }

    pub fn set_clock(&self, seconds: f64) {
        *self.clock.lock() = seconds;
    }

    fn alloc(&self, graph: &mut GraphState) -> u64 {
        graph.next_id += 1;
        graph.next_id
    }

    /// Ordered stage path from `from`, following the recorded connections.
    pub fn path_from(&self, from: StageId) -> Vec<u64> {
        let graph = self.graph.lock();
        let mut path = vec![from.0];
        let mut current = from.0;
        loop {
            let next: Vec<u64> = graph
                .connections
                .iter()
                .filter(|(a, _)| *a == current)
                .map(|(_, b)| *b)
                .collect();
            match next.as_slice() {
                [single] => {
                    path.push(*single);
                    current = *single;
                }
                [] => break,
                _ => panic!("stage {current} has multiple outgoing connections"),
            }
        }
        path
    }
}

#[async_trait]
impl RenderDevice for FakeRenderDevice {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn clock_seconds(&self) -> f64 {
        *self.clock.lock()
    }

    fn create_gain_stage(&self) -> BridgeResult<StageId> {
        let mut graph = self.graph.lock();
        let id = self.alloc(&mut graph);
        graph.stages.insert(
            id,
            StageRecord {
                kind: StageKind::Gain,
                gain: 1.0,
                filter: None,
                released: false,
            },
        );
        Ok(StageId(id))
    }

    fn create_filter_stage(&self, params: FilterParams) -> BridgeResult<StageId> {
        let mut graph = self.graph.lock();
        let id = self.alloc(&mut graph);
        graph.stages.insert(
            id,
            StageRecord {
                kind: StageKind::Filter,
                gain: 1.0,
                filter: Some(params),
                released: false,
            },
        );
        Ok(StageId(id))
    }

    fn set_stage_gain(&self, stage: StageId, gain: f32) -> BridgeResult<()> {
        let mut graph = self.graph.lock();
        let record = graph
            .stages
            .get_mut(&stage.0)
            .ok_or(BridgeError::UnknownHandle(stage.0))?;
        record.gain = gain;
        Ok(())
    }

    fn update_filter_stage(&self, stage: StageId, params: FilterParams) -> BridgeResult<()> {
        let mut graph = self.graph.lock();
        let record = graph
            .stages
            .get_mut(&stage.0)
            .ok_or(BridgeError::UnknownHandle(stage.0))?;
        record.filter = Some(params);
        Ok(())
    }

    fn connect(&self, from: StageId, to: StageId) -> BridgeResult<()> {
        self.graph.lock().connections.push((from.0, to.0));
        Ok(())
    }

    fn connect_to_output(&self, stage: StageId) -> BridgeResult<()> {
        self.graph.lock().output_links.push(stage.0);
        Ok(())
    }

    fn disconnect(&self, stage: StageId) -> BridgeResult<()> {
        let mut graph = self.graph.lock();
        graph.connections.retain(|(from, _)| *from != stage.0);
        graph.output_links.retain(|from| *from != stage.0);
        Ok(())
    }

    fn release_stage(&self, stage: StageId) -> BridgeResult<()> {
        if let Some(record) = self.graph.lock().stages.get_mut(&stage.0) {
            record.released = true;
        }
        Ok(())
    }

    async fn decode(&self, _data: Bytes, _format_hint: Option<&str>) -> BridgeResult<PcmBuffer> {
        let delay = *self.decode_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self.decode_error.lock().clone() {
            return Err(BridgeError::Decode(message));
        }
        let seconds = *self.decode_seconds.lock();
        let frames = (seconds * self.sample_rate as f64) as usize;
        Ok(PcmBuffer::new(vec![0.0; frames * 2], 2, self.sample_rate))
    }

    fn create_source(&self, buffer: &PcmBuffer) -> BridgeResult<SourceId> {
        let mut graph = self.graph.lock();
        let id = self.alloc(&mut graph);
        graph.sources.insert(
            id,
            SourceRecord {
                frames: buffer.frames(),
                started: None,
                stopped: false,
                released: false,
                connected_to: None,
            },
        );
        Ok(SourceId(id))
    }

    fn start_source(&self, source: SourceId, options: SourceStartOptions) -> BridgeResult<()> {
        if self.refuse_start.load(Ordering::SeqCst) {
            return Err(BridgeError::NotAllowed("no user gesture yet".to_string()));
        }
        let mut graph = self.graph.lock();
        let record = graph
            .sources
            .get_mut(&source.0)
            .ok_or(BridgeError::UnknownHandle(source.0))?;
        record.started = Some(options);
        Ok(())
    }

    fn stop_source(&self, source: SourceId) -> BridgeResult<()> {
        if let Some(record) = self.graph.lock().sources.get_mut(&source.0) {
            record.stopped = true;
        }
        Ok(())
    }

    fn set_source_rate(&self, _source: SourceId, _rate: f32) -> BridgeResult<()> {
        Ok(())
    }

    fn set_source_looping(&self, _source: SourceId, _looping: bool) -> BridgeResult<()> {
        Ok(())
    }

    fn connect_source(&self, source: SourceId, to: StageId) -> BridgeResult<()> {
        let mut graph = self.graph.lock();
        let record = graph
            .sources
            .get_mut(&source.0)
            .ok_or(BridgeError::UnknownHandle(source.0))?;
        record.connected_to = Some(to);
        Ok(())
    }

    fn create_media_source(&self, _element_id: u64) -> BridgeResult<StageId> {
        let mut graph = self.graph.lock();
        let id = self.alloc(&mut graph);
        graph.stages.insert(
            id,
            StageRecord {
                kind: StageKind::MediaSource,
                gain: 1.0,
                filter: None,
                released: false,
            },
        );
        Ok(StageId(id))
    }

    fn release_source(&self, source: SourceId) -> BridgeResult<()> {
        if let Some(record) = self.graph.lock().sources.get_mut(&source.0) {
            record.released = true;
        }
        Ok(())
    }
}

// ============================================================================
// Media element & bridge
// ============================================================================

#[derive(Debug)]
struct ElementState {
    source: Option<String>,
    ready: MediaReadyState,
    position: f64,
    duration: Option<f64>,
    volume: f32,
    muted: bool,
    rate: f32,
    looping: bool,
    released: bool,
    last_error: Option<MediaErrorKind>,
    play_calls: usize,
    pause_calls: usize,
}

pub struct FakeMediaElement {
    id: u64,
    tx: broadcast::Sender<ElementEvent>,
    state: Mutex<ElementState>,
    /// Readiness reached once `begin_load` runs.
    pub ready_on_load: MediaReadyState,
    pub fail_load_with: Mutex<Option<MediaErrorKind>>,
    pub reject_play: AtomicBool,
}

impl FakeMediaElement {
    pub fn new(id: u64, initial_ready: MediaReadyState) -> Arc<Self> {
        let (tx, _) = broadcast::channel(64);
        Arc::new(Self {
            id,
            tx,
            state: Mutex::new(ElementState {
                source: None,
                ready: initial_ready,
                position: 0.0,
                duration: None,
                volume: 1.0,
                muted: false,
                rate: 1.0,
                looping: false,
                released: false,
                last_error: None,
                play_calls: 0,
                pause_calls: 0,
            }),
            ready_on_load: MediaReadyState::HaveEnoughData,
            fail_load_with: Mutex::new(None),
            reject_play: AtomicBool::new(false),
        })
    }

    /// Fire a native event at subscribers.
    pub fn fire(&self, event: ElementEvent) {
        let _ = self.tx.send(event);
    }

    pub fn set_duration(&self, duration: f64) {
        self.state.lock().duration = Some(duration);
    }

    pub fn set_element_position(&self, position: f64) {
        self.state.lock().position = position;
    }

    pub fn play_calls(&self) -> usize {
        self.state.lock().play_calls
    }

    pub fn pause_calls(&self) -> usize {
        self.state.lock().pause_calls
    }

    pub fn released(&self) -> bool {
        self.state.lock().released
    }

    pub fn assigned_source(&self) -> Option<String> {
        self.state.lock().source.clone()
    }
}

#[async_trait]
impl MediaElement for FakeMediaElement {
    fn id(&self) -> u64 {
        self.id
    }

    fn set_source(&self, url: &str) -> BridgeResult<()> {
        self.state.lock().source = Some(url.to_string());
        Ok(())
    }

    fn current_source(&self) -> Option<String> {
        self.state.lock().source.clone()
    }

    fn begin_load(&self) -> BridgeResult<()> {
        if let Some(kind) = *self.fail_load_with.lock() {
            self.state.lock().last_error = Some(kind);
            self.fire(ElementEvent::Error(kind));
            return Ok(());
        }
        {
            let mut state = self.state.lock();
            state.ready = self.ready_on_load;
            state.duration.get_or_insert(30.0);
        }
        self.fire(ElementEvent::LoadedMetadata);
        self.fire(ElementEvent::DurationChange);
        self.fire(ElementEvent::CanPlay);
        Ok(())
    }

    fn ready_state(&self) -> MediaReadyState {
        self.state.lock().ready
    }

    async fn play(&self) -> BridgeResult<()> {
        if self.reject_play.load(Ordering::SeqCst) {
            return Err(BridgeError::NotAllowed("autoplay blocked".to_string()));
        }
        self.state.lock().play_calls += 1;
        self.fire(ElementEvent::Play);
        self.fire(ElementEvent::Playing);
        Ok(())
    }

    fn pause(&self) -> BridgeResult<()> {
        self.state.lock().pause_calls += 1;
        self.fire(ElementEvent::Pause);
        Ok(())
    }

    fn position(&self) -> f64 {
        self.state.lock().position
    }

    fn set_position(&self, seconds: f64) -> BridgeResult<()> {
        self.state.lock().position = seconds;
        Ok(())
    }

    fn duration(&self) -> Option<f64> {
        self.state.lock().duration
    }

    fn set_volume(&self, volume: f32) {
        self.state.lock().volume = volume;
    }

    fn set_muted(&self, muted: bool) {
        self.state.lock().muted = muted;
    }

    fn set_rate(&self, rate: f32) {
        self.state.lock().rate = rate;
    }

    fn set_looping(&self, looping: bool) {
        self.state.lock().looping = looping;
    }

    fn last_error(&self) -> Option<MediaErrorKind> {
        self.state.lock().last_error
    }

    fn subscribe(&self) -> broadcast::Receiver<ElementEvent> {
        self.tx.subscribe()
    }

    fn release(&self) {
        self.state.lock().released = true;
    }
}

pub struct FakeMediaBridge {
    pub elements: Mutex<Vec<Arc<FakeMediaElement>>>,
    pub blob_urls: Mutex<Vec<String>>,
    pub revoked: Mutex<Vec<String>>,
    next_id: AtomicU64,
    pub initial_ready: Mutex<MediaReadyState>,
    pub reject_play: AtomicBool,
    pub fail_load_with: Mutex<Option<MediaErrorKind>>,
}

impl FakeMediaBridge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            elements: Mutex::new(Vec::new()),
            blob_urls: Mutex::new(Vec::new()),
            revoked: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            initial_ready: Mutex::new(MediaReadyState::HaveNothing),
            reject_play: AtomicBool::new(false),
            fail_load_with: Mutex::new(None),
        })
    }

    pub fn last_element(&self) -> Arc<FakeMediaElement> {
        self.elements
            .lock()
            .last()
            .expect("no element created yet")
            .clone()
    }
}

impl MediaBridge for FakeMediaBridge {
    fn create_element(&self) -> BridgeResult<Arc<dyn MediaElement>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let element = FakeMediaElement::new(id, *self.initial_ready.lock());
        element
            .reject_play
            .store(self.reject_play.load(Ordering::SeqCst), Ordering::SeqCst);
        *element.fail_load_with.lock() = *self.fail_load_with.lock();
        self.elements.lock().push(element.clone());
        Ok(element)
    }

    fn create_blob_url(&self, _data: Bytes, _content_type: Option<&str>) -> BridgeResult<String> {
        let url = format!("blob:fake/{}", self.blob_urls.lock().len());
        self.blob_urls.lock().push(url.clone());
        Ok(url)
    }

    fn revoke_blob_url(&self, url: &str) -> BridgeResult<()> {
        self.revoked.lock().push(url.to_string());
        Ok(())
    }
}

// ============================================================================
// Adaptive engine
// ============================================================================

pub struct FakeAdaptiveEngine {
    tx: broadcast::Sender<AdaptiveEvent>,
    pub variants: Mutex<Vec<StreamVariant>>,
    pub manifest_duration: Mutex<Option<f64>>,
    current: Mutex<Option<usize>>,
    pub attached: Mutex<Option<Arc<dyn MediaElement>>>,
    pub loaded_urls: Mutex<Vec<String>>,
    pub detach_count: AtomicUsize,
    /// Fire manifest-parsed + media-attached as soon as `load` is called.
    pub auto_ready: AtomicBool,
}

impl FakeAdaptiveEngine {
    pub fn new(variants: Vec<StreamVariant>) -> Arc<Self> {
        let (tx, _) = broadcast::channel(64);
        Arc::new(Self {
            tx,
            variants: Mutex::new(variants),
            manifest_duration: Mutex::new(Some(120.0)),
            current: Mutex::new(None),
            attached: Mutex::new(None),
            loaded_urls: Mutex::new(Vec::new()),
            detach_count: AtomicUsize::new(0),
            auto_ready: AtomicBool::new(true),
        })
    }

    pub fn fire(&self, event: AdaptiveEvent) {
        let _ = self.tx.send(event);
    }
}

impl AdaptiveEngine for FakeAdaptiveEngine {
    fn attach(&self, element: Arc<dyn MediaElement>) -> BridgeResult<()> {
        *self.attached.lock() = Some(element);
        Ok(())
    }

    fn load(&self, url: &str) -> BridgeResult<()> {
        self.loaded_urls.lock().push(url.to_string());
        if self.auto_ready.load(Ordering::SeqCst) {
            self.fire(AdaptiveEvent::ManifestParsed {
                variants: self.variants.lock().clone(),
                duration: *self.manifest_duration.lock(),
            });
            self.fire(AdaptiveEvent::MediaAttached);
        }
        Ok(())
    }

    fn detach(&self) -> BridgeResult<()> {
        self.detach_count.fetch_add(1, Ordering::SeqCst);
        *self.attached.lock() = None;
        Ok(())
    }

    fn variants(&self) -> Vec<StreamVariant> {
        self.variants.lock().clone()
    }

    fn set_variant(&self, index: Option<usize>) -> BridgeResult<()> {
        *self.current.lock() = index;
        if let Some(index) = index {
            self.fire(AdaptiveEvent::VariantSwitched { index });
        }
        Ok(())
    }

    fn current_variant(&self) -> Option<usize> {
        *self.current.lock()
    }

    fn subscribe(&self) -> broadcast::Receiver<AdaptiveEvent> {
        self.tx.subscribe()
    }
}

// ============================================================================
// Stream decoder
// ============================================================================

pub struct FakeStreamDecoder {
    pub sample_rate: u32,
    pub channels: u16,
    pub chunk_frames: usize,
    pub chunks: usize,
    /// Fail with a decode error after this many successful chunks.
    pub fail_after: Option<usize>,
}

impl FakeStreamDecoder {
    pub fn new(sample_rate: u32, chunks: usize) -> Arc<Self> {
        Arc::new(Self {
            sample_rate,
            channels: 2,
            chunk_frames: 1024,
            chunks,
            fail_after: None,
        })
    }

    pub fn failing_after(sample_rate: u32, chunks: usize, fail_after: usize) -> Arc<Self> {
        Arc::new(Self {
            sample_rate,
            channels: 2,
            chunk_frames: 1024,
            chunks,
            fail_after: Some(fail_after),
        })
    }
}

#[async_trait]
impl StreamDecoder for FakeStreamDecoder {
    async fn open(
        &self,
        _data: Bytes,
        _format_hint: Option<&str>,
    ) -> BridgeResult<Box<dyn DecodeSession>> {
        Ok(Box::new(FakeDecodeSession {
            sample_rate: self.sample_rate,
            channels: self.channels,
            chunk_frames: self.chunk_frames,
            remaining: self.chunks,
            fail_after: self.fail_after,
            produced: 0,
        }))
    }
}

struct FakeDecodeSession {
    sample_rate: u32,
    channels: u16,
    chunk_frames: usize,
    remaining: usize,
    fail_after: Option<usize>,
    produced: usize,
}

#[async_trait]
impl DecodeSession for FakeDecodeSession {
    fn info(&self) -> DecodedStreamInfo {
        DecodedStreamInfo {
            sample_rate: self.sample_rate,
            channels: self.channels,
            duration: None,
            codec: Some("fake".to_string()),
        }
    }

    async fn next_chunk(&mut self) -> BridgeResult<Option<PcmChunk>> {
        if let Some(fail_after) = self.fail_after {
            if self.produced >= fail_after {
                return Err(BridgeError::Decode("scripted mid-stream fault".to_string()));
            }
        }
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        self.produced += 1;
        Ok(Some(PcmChunk {
            samples: vec![0.25; self.chunk_frames * self.channels as usize],
            frames: self.chunk_frames,
            sample_rate: self.sample_rate,
            channels: self.channels,
        }))
    }
}

// ============================================================================
// HTTP
// ============================================================================

pub struct SlowHttpClient {
    pub body: Bytes,
    pub status: u16,
    pub delay: Duration,
    pub requests: Mutex<Vec<String>>,
}

impl SlowHttpClient {
    pub fn new(body: Bytes) -> Arc<Self> {
        Arc::new(Self {
            body,
            status: 200,
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn with_delay(body: Bytes, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            body,
            status: 200,
            delay,
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl HttpClient for SlowHttpClient {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.requests.lock().push(request.url.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(HttpResponse {
            status: self.status,
            headers: HashMap::new(),
            body: self.body.clone(),
        })
    }
}

// ============================================================================
// Observability & event capture
// ============================================================================

pub struct CapturingSink {
    pub entries: Mutex<Vec<(LogLevel, String, String)>>,
}

impl CapturingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(Vec::new()),
        })
    }

    pub fn warnings(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|(level, _, _)| *level == LogLevel::Warn)
            .map(|(_, _, message)| message.clone())
            .collect()
    }
}

impl LogSink for CapturingSink {
    fn log(&self, level: LogLevel, component: &str, message: &str) {
        self.entries
            .lock()
            .push((level, component.to_string(), message.to_string()));
    }
}

/// Record every player event for later assertions.
pub fn record_events(player: &Player) -> Arc<Mutex<Vec<PlayerEvent>>> {
    let events: Arc<Mutex<Vec<PlayerEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    player.on_any(move |event| sink.lock().push(event.clone()));
    events
}

/// Wait until the recorded events satisfy `predicate`, or panic after one
/// second.
pub async fn wait_for_event<F>(events: &Arc<Mutex<Vec<PlayerEvent>>>, predicate: F)
where
    F: Fn(&[PlayerEvent]) -> bool,
{
    for _ in 0..200 {
        if predicate(&events.lock()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("expected event did not arrive: {:?}", events.lock());
}
