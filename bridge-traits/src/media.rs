//! Media element abstraction.
//!
//! A media element is a host-provided playable object (the browser
//! `<audio>` element is the canonical example) that can fetch, buffer and
//! render a source URL on its own. The core drives it through a small
//! property/transport surface and consumes its native events re-emitted
//! verbatim through a broadcast channel.

use crate::error::Result;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Element readiness, ordered from "nothing loaded" to "enough data".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MediaReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

/// Native media error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaErrorKind {
    /// Fetch was aborted by the host.
    Aborted,
    /// A network fault interrupted fetching.
    Network,
    /// The data could not be decoded.
    Decode,
    /// The source is not supported by the element.
    SrcNotSupported,
}

/// Native events emitted by a media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementEvent {
    LoadedMetadata,
    CanPlay,
    Play,
    Playing,
    Pause,
    Ended,
    TimeUpdate,
    DurationChange,
    Waiting,
    Progress,
    Error(MediaErrorKind),
}

/// Host playable element.
///
/// Position, volume, rate and loop map directly onto element properties.
/// `play` is async because hosts may reject it (autoplay policies); all
/// other operations are immediate.
#[async_trait::async_trait]
pub trait MediaElement: Send + Sync {
    /// Stable identity of this element within its bridge, used to tap the
    /// element output into a render graph.
    fn id(&self) -> u64;

    /// Assign a new source URL. Does not start loading.
    fn set_source(&self, url: &str) -> Result<()>;

    /// URL currently assigned, if any.
    fn current_source(&self) -> Option<String>;

    /// Ask the element to (re)load its assigned source.
    fn begin_load(&self) -> Result<()>;

    /// Current readiness of the element.
    fn ready_state(&self) -> MediaReadyState;

    /// Start or resume playback. May be rejected by the host.
    async fn play(&self) -> Result<()>;

    /// Pause playback, keeping the position.
    fn pause(&self) -> Result<()>;

    /// Current playback position in seconds.
    fn position(&self) -> f64;

    /// Seek to an absolute position in seconds.
    fn set_position(&self, seconds: f64) -> Result<()>;

    /// Total duration in seconds, when known.
    fn duration(&self) -> Option<f64>;

    fn set_volume(&self, volume: f32);

    fn set_muted(&self, muted: bool);

    fn set_rate(&self, rate: f32);

    fn set_looping(&self, looping: bool);

    /// Most recent native error, if the element is in an error state.
    fn last_error(&self) -> Option<MediaErrorKind>;

    /// Subscribe to the element's native event stream.
    fn subscribe(&self) -> broadcast::Receiver<ElementEvent>;

    /// Detach the source and release host resources.
    fn release(&self);
}

/// Factory and resource registry for media elements.
pub trait MediaBridge: Send + Sync {
    /// Create a fresh, sourceless media element.
    fn create_element(&self) -> Result<Arc<dyn MediaElement>>;

    /// Mint a transient URL backed by in-memory bytes. The returned URL is
    /// playable by elements from this bridge until revoked.
    fn create_blob_url(&self, data: Bytes, content_type: Option<&str>) -> Result<String>;

    /// Revoke a previously minted blob URL.
    fn revoke_blob_url(&self, url: &str) -> Result<()>;
}
