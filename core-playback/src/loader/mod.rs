//! Source loaders and the loader factory.
//!
//! Each loader turns a classified [`SourceDescriptor`] into a
//! [`LoadResult`]: either decoded PCM (`buffer`) or an opaque playable
//! reference (`handle`), never both. Loading is cancellable; every loader
//! re-checks its [`CancellationToken`] after each suspension point before
//! touching any state.
//!
//! The factory caches at most one instance of the streaming-capable loaders
//! (adaptive, stream-decode) across loads, since they wrap expensive engine
//! state, and always constructs fresh native/buffer loaders.

mod adaptive;
mod buffer;
mod native;
mod stream_decode;

pub use adaptive::AdaptiveLoader;
pub use buffer::BufferLoader;
pub use native::NativeLoader;
pub use stream_decode::StreamDecodeLoader;

use crate::cancel::CancellationToken;
use crate::error::{PlayerError, Result};
use crate::source::{classify, RawData, SourceDescriptor, SourceKind};
use crate::types::{BackendKind, QualityLevel};
use bridge_traits::audio::PcmBuffer;
use bridge_traits::http::{HttpClient, HttpRequest};
use bridge_traits::media::{MediaBridge, MediaElement};
use bridge_traits::render::RenderDevice;
use bridge_traits::stream::AdaptiveEngine;
use bridge_traits::StreamDecoder;
use bytes::Bytes;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

/// Opaque playable reference produced by a loader.
#[derive(Clone)]
pub enum PlayableHandle {
    /// A URL a media element can be pointed at.
    Url(String),
    /// An element a streaming loader already attached its output to.
    Attached(Arc<dyn MediaElement>),
}

impl std::fmt::Debug for PlayableHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayableHandle::Url(url) => f.debug_tuple("Url").field(url).finish(),
            PlayableHandle::Attached(element) => {
                f.debug_tuple("Attached").field(&element.id()).finish()
            }
        }
    }
}

/// A host resource produced during loading that the orchestrator must
/// release on cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceHandle {
    BlobUrl(String),
}

/// Outcome of a successful load.
///
/// Exactly one of `buffer`/`handle` is populated.
#[derive(Debug, Default, Clone)]
pub struct LoadResult {
    /// Decoded PCM, rendered by the direct-buffer backend.
    pub buffer: Option<Arc<PcmBuffer>>,
    /// Playable reference, rendered by the media-element backend.
    pub handle: Option<PlayableHandle>,
    /// Host resources to release on cleanup/dispose.
    pub resources: Vec<ResourceHandle>,
    /// Duration in seconds, when known at load time.
    pub duration: Option<f64>,
    /// Ordered quality levels (adaptive sources only).
    pub quality_levels: Vec<QualityLevel>,
}

/// External collaborators available to loaders.
#[derive(Clone, Default)]
pub struct LoaderBridges {
    pub http: Option<Arc<dyn HttpClient>>,
    pub media: Option<Arc<dyn MediaBridge>>,
    pub decoder: Option<Arc<dyn StreamDecoder>>,
    pub adaptive: Option<Arc<dyn AdaptiveEngine>>,
}

impl std::fmt::Debug for LoaderBridges {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderBridges")
            .field("http", &self.http.is_some())
            .field("media", &self.media.is_some())
            .field("decoder", &self.decoder.is_some())
            .field("adaptive", &self.adaptive.is_some())
            .finish()
    }
}

/// Closed set of loaders.
#[derive(Clone)]
pub enum Loader {
    Native(NativeLoader),
    Buffer(BufferLoader),
    StreamDecode(StreamDecodeLoader),
    Adaptive(AdaptiveLoader),
}

impl Loader {
    /// Source kind this loader serves.
    pub fn kind(&self) -> SourceKind {
        match self {
            Loader::Native(_) => SourceKind::Native,
            Loader::Buffer(_) => SourceKind::Buffer,
            Loader::StreamDecode(_) => SourceKind::DecodeNeeded,
            Loader::Adaptive(_) => SourceKind::AdaptiveStream,
        }
    }

    /// Whether this loader can serve the descriptor.
    pub fn can_handle(&self, descriptor: &SourceDescriptor) -> bool {
        match self {
            Loader::Native(loader) => loader.can_handle(descriptor),
            Loader::Buffer(loader) => loader.can_handle(descriptor),
            Loader::StreamDecode(loader) => loader.can_handle(descriptor),
            Loader::Adaptive(loader) => loader.can_handle(descriptor),
        }
    }

    /// Load the descriptor.
    ///
    /// `device` is the render device when (and only when) the orchestrator
    /// wants decoded output; loaders that can serve either path use its
    /// presence to decide between decoding and handle pass-through.
    pub async fn load(
        &self,
        descriptor: &SourceDescriptor,
        device: Option<&Arc<dyn RenderDevice>>,
        token: &CancellationToken,
    ) -> Result<LoadResult> {
        match self {
            Loader::Native(loader) => loader.load(descriptor, device, token).await,
            Loader::Buffer(loader) => loader.load(descriptor, device, token).await,
            Loader::StreamDecode(loader) => loader.load(descriptor, device, token).await,
            Loader::Adaptive(loader) => loader.load(descriptor, device, token).await,
        }
    }

    /// Release loader-held engine state.
    pub fn dispose(&self) {
        if let Loader::Adaptive(loader) = self {
            loader.detach();
        }
    }
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Loader").field(&self.kind()).finish()
    }
}

/// Builds and caches loaders per source kind.
#[derive(Debug)]
pub struct LoaderFactory {
    bridges: LoaderBridges,
    adaptive: Option<AdaptiveLoader>,
    stream_decode: Option<StreamDecodeLoader>,
}

impl LoaderFactory {
    pub fn new(bridges: LoaderBridges) -> Self {
        Self {
            bridges,
            adaptive: None,
            stream_decode: None,
        }
    }

    /// Derived kind of a descriptor.
    pub fn classify(&self, descriptor: &SourceDescriptor) -> SourceKind {
        classify(descriptor)
    }

    /// Loader instance for a source kind.
    ///
    /// Streaming-capable loaders are cached across loads; native/buffer
    /// loaders are constructed fresh per call.
    ///
    /// # Errors
    ///
    /// Fails with `Unsupported` for [`SourceKind::Unsupported`].
    pub fn loader_for(&mut self, kind: SourceKind) -> Result<Loader> {
        match kind {
            SourceKind::Native => Ok(Loader::Native(NativeLoader::new(
                self.bridges.http.clone(),
                self.bridges.media.clone(),
            ))),
            SourceKind::Buffer => Ok(Loader::Buffer(BufferLoader::new(
                self.bridges.media.clone(),
            ))),
            SourceKind::DecodeNeeded => {
                let loader = self
                    .stream_decode
                    .get_or_insert_with(|| {
                        StreamDecodeLoader::new(
                            self.bridges.decoder.clone(),
                            self.bridges.http.clone(),
                        )
                    })
                    .clone();
                Ok(Loader::StreamDecode(loader))
            }
            SourceKind::AdaptiveStream => {
                let loader = self
                    .adaptive
                    .get_or_insert_with(|| {
                        AdaptiveLoader::new(
                            self.bridges.adaptive.clone(),
                            self.bridges.media.clone(),
                        )
                    })
                    .clone();
                Ok(Loader::Adaptive(loader))
            }
            SourceKind::Unsupported => Err(PlayerError::Unsupported(
                "source kind has no available loader".to_string(),
            )),
        }
    }

    /// Preferred backend for a descriptor: media-element for adaptive and
    /// native-URL sources, direct-buffer otherwise.
    pub fn recommend_strategy(&self, descriptor: &SourceDescriptor) -> BackendKind {
        match classify(descriptor) {
            SourceKind::AdaptiveStream => BackendKind::MediaElement,
            SourceKind::Native if descriptor.url.is_some() => BackendKind::MediaElement,
            _ => BackendKind::DirectBuffer,
        }
    }

    /// Drop cached loaders, detaching their engine state.
    pub fn dispose(&mut self) {
        if let Some(loader) = self.adaptive.take() {
            loader.detach();
        }
        self.stream_decode = None;
    }
}

/// Fetch a URL into memory through the HTTP bridge, under cancellation.
pub(crate) async fn fetch_url(
    http: &Arc<dyn HttpClient>,
    descriptor: &SourceDescriptor,
    url: &str,
    token: &CancellationToken,
) -> Result<Bytes> {
    let request = HttpRequest::get(url).headers(&descriptor.headers);
    let http = Arc::clone(http);
    let response = token
        .wrap(async move {
            http.execute(request)
                .await
                .map_err(PlayerError::from_load_fault)
        })
        .await?;

    if !response.is_success() {
        return Err(PlayerError::Network(format!(
            "fetch of {url} failed with status {}",
            response.status
        )));
    }
    Ok(response.body)
}

/// Materialize raw data into bytes, draining byte streams once.
pub(crate) async fn raw_data_bytes(
    descriptor: &SourceDescriptor,
    token: &CancellationToken,
) -> Result<Bytes> {
    match descriptor.data.as_ref() {
        Some(RawData::Buffer(data)) => Ok(data.clone()),
        Some(RawData::Blob { data, .. }) => Ok(data.clone()),
        Some(RawData::Stream(stream)) => {
            let mut reader = stream.take().ok_or_else(|| {
                PlayerError::InvalidArgument("byte stream was already consumed".to_string())
            })?;
            let collected = token
                .wrap(async move {
                    let mut collected = Vec::new();
                    reader
                        .read_to_end(&mut collected)
                        .await
                        .map_err(|e| PlayerError::Network(e.to_string()))?;
                    Ok(collected)
                })
                .await?;
            Ok(Bytes::from(collected))
        }
        None => Err(PlayerError::InvalidArgument(
            "descriptor carries no raw data".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_caches_streaming_loaders_only() {
        let mut factory = LoaderFactory::new(LoaderBridges::default());

        let first = factory.loader_for(SourceKind::AdaptiveStream).unwrap();
        let second = factory.loader_for(SourceKind::AdaptiveStream).unwrap();
        match (first, second) {
            (Loader::Adaptive(a), Loader::Adaptive(b)) => assert!(a.shares_state_with(&b)),
            _ => panic!("expected adaptive loaders"),
        }

        assert!(matches!(
            factory.loader_for(SourceKind::Native).unwrap(),
            Loader::Native(_)
        ));
        assert!(matches!(
            factory.loader_for(SourceKind::Buffer).unwrap(),
            Loader::Buffer(_)
        ));
        assert!(factory.loader_for(SourceKind::Unsupported).is_err());
    }

    #[test]
    fn loaders_report_what_they_can_handle() {
        let mut factory = LoaderFactory::new(LoaderBridges::default());

        let manifest = SourceDescriptor::from_url("https://cdn.example.com/live.m3u8");
        let track = SourceDescriptor::from_url("https://cdn.example.com/track.mp3");
        let raw = SourceDescriptor::from_bytes(Bytes::from_static(b"pcm"));

        let adaptive = factory.loader_for(SourceKind::AdaptiveStream).unwrap();
        assert!(adaptive.can_handle(&manifest));
        assert!(!adaptive.can_handle(&track));

        let native = factory.loader_for(SourceKind::Native).unwrap();
        assert!(native.can_handle(&track));

        let buffer = factory.loader_for(SourceKind::Buffer).unwrap();
        assert!(buffer.can_handle(&raw));
        assert!(!buffer.can_handle(&track));
    }

    #[test]
    fn strategy_prefers_element_for_url_sources() {
        let factory = LoaderFactory::new(LoaderBridges::default());

        let adaptive = SourceDescriptor::from_url("https://cdn.example.com/live.m3u8");
        assert_eq!(
            factory.recommend_strategy(&adaptive),
            BackendKind::MediaElement
        );

        let native_url = SourceDescriptor::from_url("https://cdn.example.com/track.mp3");
        assert_eq!(
            factory.recommend_strategy(&native_url),
            BackendKind::MediaElement
        );

        let raw = SourceDescriptor::from_bytes(Bytes::from_static(b"pcm"));
        assert_eq!(factory.recommend_strategy(&raw), BackendKind::DirectBuffer);

        let decode_needed = SourceDescriptor::from_url("https://cdn.example.com/track.flac");
        assert_eq!(
            factory.recommend_strategy(&decode_needed),
            BackendKind::DirectBuffer
        );
    }
}
