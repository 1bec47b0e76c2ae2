//! Adaptive streaming engine abstraction.
//!
//! Boundary to the external adaptive-streaming protocol engine (manifest
//! parsing, segment fetching, ABR). The core only attaches the engine to a
//! media element, loads a manifest URL, surfaces the variant list and
//! forwards lifecycle events; it implements no ABR logic itself.

use crate::error::Result;
use crate::media::MediaElement;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// One selectable bitrate/variant track offered by an adaptive stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamVariant {
    /// 0-based index into the manifest's ordered variant list.
    pub index: usize,
    /// Average bitrate in bits per second.
    pub bitrate: u32,
    /// Human-readable label (e.g. "128k", "lossless").
    pub label: String,
}

/// Classification of engine error notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdaptiveErrorKind {
    /// Manifest or segment fetch failed.
    Network,
    /// Segment could not be demuxed/appended.
    Media,
    /// Anything else.
    Other,
}

/// Lifecycle events emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AdaptiveEvent {
    /// The manifest was fetched and parsed.
    ManifestParsed {
        variants: Vec<StreamVariant>,
        /// Presentation duration in seconds, when declared.
        duration: Option<f64>,
    },
    /// The engine finished attaching to its media element.
    MediaAttached,
    /// The active variant changed (manual selection or engine decision).
    VariantSwitched { index: usize },
    /// An error notification. Non-fatal errors are informational; fatal ones
    /// end the stream.
    Error {
        fatal: bool,
        kind: AdaptiveErrorKind,
        message: String,
    },
}

/// External adaptive-streaming protocol engine.
///
/// Engines are reusable across loads: `detach` tears down the current
/// element/manifest binding, after which `attach`/`load` may be called
/// again.
pub trait AdaptiveEngine: Send + Sync {
    /// Bind the engine output to a media element.
    fn attach(&self, element: Arc<dyn MediaElement>) -> Result<()>;

    /// Start loading a manifest URL. Progress is reported via events.
    fn load(&self, url: &str) -> Result<()>;

    /// Unbind from the current element and stop segment fetching.
    fn detach(&self) -> Result<()>;

    /// Ordered variant list from the parsed manifest (empty before parse).
    fn variants(&self) -> Vec<StreamVariant>;

    /// Select a variant by index, or `None` to return to automatic
    /// selection.
    fn set_variant(&self, index: Option<usize>) -> Result<()>;

    /// Currently active variant index, when one is locked in.
    fn current_variant(&self) -> Option<usize>;

    /// Subscribe to engine lifecycle events.
    fn subscribe(&self) -> broadcast::Receiver<AdaptiveEvent>;
}
