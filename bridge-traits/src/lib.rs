//! # Host Bridge Traits
//!
//! Abstraction traits for the external collaborators of the playback engine.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback core and everything
//! it deliberately does not implement itself: the host render device, the
//! host media element, the codec/demux library, the adaptive-streaming
//! protocol engine, and HTTP networking. Each trait represents a capability
//! the core drives through a fixed surface and nothing more.
//!
//! ## Traits
//!
//! ### Rendering
//! - [`RenderDevice`](render::RenderDevice) - Monotonic render clock, signal
//!   stage factories, stage wiring, byte decoding, single-use buffer sources
//! - [`MediaElement`](media::MediaElement) / [`MediaBridge`](media::MediaBridge) -
//!   Host playable element, native event stream, blob-URL registry
//!
//! ### Decoding & Streaming
//! - [`StreamDecoder`](decode::StreamDecoder) / [`DecodeSession`](decode::DecodeSession) -
//!   Byte container to PCM chunk sequence
//! - [`AdaptiveEngine`](stream::AdaptiveEngine) - Manifest loading, variant
//!   negotiation, engine lifecycle events
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async request execution
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Implementations should convert platform-specific errors to `BridgeError`
//! and classify network/decode/permission faults into the dedicated
//! variants so the core can map them onto its own taxonomy.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent
//! usage across async tasks.

pub mod audio;
pub mod decode;
pub mod error;
pub mod http;
pub mod media;
pub mod render;
pub mod stream;

pub use error::BridgeError;

// Re-export commonly used types
pub use audio::PcmBuffer;
pub use decode::{DecodeSession, DecodedStreamInfo, PcmChunk, StreamDecoder};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use media::{
    ElementEvent, MediaBridge, MediaElement, MediaErrorKind, MediaReadyState,
};
pub use render::{
    FilterParams, FilterShape, RenderDevice, SourceId, SourceStartOptions, StageId,
};
pub use stream::{AdaptiveEngine, AdaptiveErrorKind, AdaptiveEvent, StreamVariant};
