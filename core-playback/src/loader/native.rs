//! Loader for host-native formats.
//!
//! Three paths:
//! - file-like raw data becomes a transient blob-URL handle (no decode);
//! - a URL with a render device supplied is fetched and device-decoded
//!   into PCM;
//! - a URL without a device is passed through as a playable handle for the
//!   media-element backend.

use crate::cancel::CancellationToken;
use crate::error::{PlayerError, Result};
use crate::loader::{fetch_url, LoadResult, PlayableHandle, ResourceHandle};
use crate::source::{RawData, SourceDescriptor, SourceKind};
use bridge_traits::http::HttpClient;
use bridge_traits::media::MediaBridge;
use bridge_traits::render::RenderDevice;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct NativeLoader {
    http: Option<Arc<dyn HttpClient>>,
    media: Option<Arc<dyn MediaBridge>>,
}

impl NativeLoader {
    pub fn new(http: Option<Arc<dyn HttpClient>>, media: Option<Arc<dyn MediaBridge>>) -> Self {
        Self { http, media }
    }

    pub fn can_handle(&self, descriptor: &SourceDescriptor) -> bool {
        descriptor.url.is_some()
            || matches!(descriptor.data, Some(RawData::Blob { .. }))
            || crate::source::classify(descriptor) == SourceKind::Native
    }

    pub async fn load(
        &self,
        descriptor: &SourceDescriptor,
        device: Option<&Arc<dyn RenderDevice>>,
        token: &CancellationToken,
    ) -> Result<LoadResult> {
        if let Some(RawData::Blob { data, content_type }) = descriptor.data.as_ref() {
            let media = self.media.as_ref().ok_or_else(|| {
                PlayerError::Unsupported(
                    "file-like sources require a media bridge".to_string(),
                )
            })?;
            let url = media
                .create_blob_url(data.clone(), content_type.as_deref())
                .map_err(PlayerError::from_load_fault)?;
            debug!("native loader minted blob url for in-memory file");
            return Ok(LoadResult {
                handle: Some(PlayableHandle::Url(url.clone())),
                resources: vec![ResourceHandle::BlobUrl(url)],
                ..Default::default()
            });
        }

        let url = descriptor.url.as_ref().ok_or_else(|| {
            PlayerError::InvalidArgument("native loader needs a URL or file data".to_string())
        })?;

        let Some(device) = device else {
            // Media-element path: the element fetches and decodes itself.
            return Ok(LoadResult {
                handle: Some(PlayableHandle::Url(url.clone())),
                ..Default::default()
            });
        };

        let http = self.http.as_ref().ok_or_else(|| {
            PlayerError::Unsupported("URL sources require an HTTP client".to_string())
        })?;

        let bytes = fetch_url(http, descriptor, url, token).await?;
        if token.is_cancelled() {
            return Err(PlayerError::Aborted);
        }

        let hint = descriptor.effective_hint();
        let device = Arc::clone(device);
        let buffer = token
            .wrap(async move {
                device
                    .decode(bytes, hint.as_deref())
                    .await
                    .map_err(PlayerError::from_load_fault)
            })
            .await?;

        let duration = buffer.duration_seconds();
        debug!(
            "native loader decoded {} frames ({duration:.2}s)",
            buffer.frames()
        );
        Ok(LoadResult {
            buffer: Some(Arc::new(buffer)),
            duration: Some(duration),
            ..Default::default()
        })
    }
}

impl std::fmt::Debug for NativeLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeLoader")
            .field("http", &self.http.is_some())
            .field("media", &self.media.is_some())
            .finish()
    }
}
