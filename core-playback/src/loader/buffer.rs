//! Loader for raw in-memory payloads and byte streams.
//!
//! Decodes through the render device when one is supplied; otherwise wraps
//! the bytes as a transient blob-URL handle for the media-element backend.

use crate::cancel::CancellationToken;
use crate::error::{PlayerError, Result};
use crate::loader::{raw_data_bytes, LoadResult, PlayableHandle, ResourceHandle};
use crate::source::{RawData, SourceDescriptor};
use bridge_traits::media::MediaBridge;
use bridge_traits::render::RenderDevice;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct BufferLoader {
    media: Option<Arc<dyn MediaBridge>>,
}

impl BufferLoader {
    pub fn new(media: Option<Arc<dyn MediaBridge>>) -> Self {
        Self { media }
    }

    pub fn can_handle(&self, descriptor: &SourceDescriptor) -> bool {
        matches!(
            descriptor.data,
            Some(RawData::Buffer(_)) | Some(RawData::Stream(_)) | Some(RawData::Blob { .. })
        )
    }

    pub async fn load(
        &self,
        descriptor: &SourceDescriptor,
        device: Option<&Arc<dyn RenderDevice>>,
        token: &CancellationToken,
    ) -> Result<LoadResult> {
        let bytes = raw_data_bytes(descriptor, token).await?;
        if token.is_cancelled() {
            return Err(PlayerError::Aborted);
        }

        if let Some(device) = device {
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
                "buffer loader decoded {} frames ({duration:.2}s)",
                buffer.frames()
            );
            return Ok(LoadResult {
                buffer: Some(Arc::new(buffer)),
                duration: Some(duration),
                ..Default::default()
            });
        }

        // No device: wrap the payload for element playback instead of
        // decoding.
        let media = self.media.as_ref().ok_or_else(|| {
            PlayerError::Unsupported(
                "buffer sources need a render device or a media bridge".to_string(),
            )
        })?;
        let content_type = descriptor.effective_hint();
        let url = media
            .create_blob_url(bytes, content_type.as_deref())
            .map_err(PlayerError::from_load_fault)?;
        Ok(LoadResult {
            handle: Some(PlayableHandle::Url(url.clone())),
            resources: vec![ResourceHandle::BlobUrl(url)],
            ..Default::default()
        })
    }
}

impl std::fmt::Debug for BufferLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferLoader")
            .field("media", &self.media.is_some())
            .finish()
    }
}
