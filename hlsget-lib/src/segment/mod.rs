//! Segment fetching: the init segment first, then every media segment,
//! delivered strictly in playlist order.

pub mod assemble;

use bytes::Bytes;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};
use url::Url;

use crate::error::{HlsGetError, Result};
use crate::fetch::Fetch;
use crate::playlist::resolve::resolve_url;
use crate::playlist::Manifest;

/// Segment fetches kept in flight at once. Results are still collected in
/// playlist order.
pub const PARALLEL_FETCHES: usize = 4;

/// Raw bytes of a downloaded rendition.
#[derive(Debug, Clone, Default)]
pub struct StreamDownload {
    pub init_segment: Option<Bytes>,
    pub segments: Vec<Bytes>,
}

/// Download the init segment (when declared) and every media segment of a
/// media playlist.
///
/// An empty playlist fails with [`HlsGetError::ManifestEmpty`] before any
/// network request. Any HTTP failure aborts the whole download.
pub async fn download_segments(
    fetch: &dyn Fetch,
    playlist_url: &Url,
    manifest: &Manifest,
) -> Result<StreamDownload> {
    if manifest.segments.is_empty() {
        return Err(HlsGetError::ManifestEmpty(
            "media playlist has no segments",
        ));
    }

    // Resolve every reference up front so a malformed one fails before
    // the first fetch.
    let segment_urls = manifest
        .segments
        .iter()
        .map(|s| resolve_url(playlist_url, &s.uri))
        .collect::<Result<Vec<_>>>()?;

    let init_segment = match &manifest.init_segment {
        Some(init) => {
            let url = resolve_url(playlist_url, &init.uri)?;
            debug!(url = %url, "downloading init segment");
            Some(fetch.fetch_bytes(&url).await?)
        }
        None => None,
    };

    info!(count = segment_urls.len(), "downloading media segments");
    let segments = stream::iter(
        segment_urls
            .into_iter()
            .map(|url| async move { fetch.fetch_bytes(&url).await }),
    )
    .buffered(PARALLEL_FETCHES)
    .try_collect::<Vec<_>>()
    .await?;

    Ok(StreamDownload {
        init_segment,
        segments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::parse_manifest;
    use crate::tests::fixtures::MockFetch;

    #[tokio::test]
    async fn empty_playlist_fails_before_any_fetch() {
        let fetch = MockFetch::new();
        let url = Url::parse("https://example.com/media.m3u8").unwrap();
        let manifest = parse_manifest("#EXT-X-VERSION:7\n");

        let err = download_segments(&fetch, &url, &manifest).await.unwrap_err();
        assert!(matches!(err, HlsGetError::ManifestEmpty(_)));
        assert_eq!(fetch.call_count(), 0);
    }

    #[tokio::test]
    async fn init_segment_first_then_playlist_order() {
        let fetch = MockFetch::new()
            .with("https://example.com/init.mp4", &b"INIT"[..])
            .with("https://example.com/seg0.m4s", &b"AAA"[..])
            .with("https://example.com/seg1.m4s", &b"BBB"[..])
            .with("https://example.com/seg2.m4s", &b"CCC"[..]);
        let url = Url::parse("https://example.com/media.m3u8").unwrap();
        let manifest = parse_manifest(
            "#EXT-X-MAP:URI=\"init.mp4\"\n#EXTINF:4,\nseg0.m4s\n#EXTINF:4,\nseg1.m4s\n#EXTINF:4,\nseg2.m4s\n",
        );

        let download = download_segments(&fetch, &url, &manifest).await.unwrap();
        assert_eq!(download.init_segment.as_deref(), Some(&b"INIT"[..]));
        let order: Vec<&[u8]> = download.segments.iter().map(|b| b.as_ref()).collect();
        assert_eq!(order, vec![&b"AAA"[..], &b"BBB"[..], &b"CCC"[..]]);
        assert_eq!(fetch.call_count(), 4);
        assert_eq!(fetch.first_call().as_deref(), Some("https://example.com/init.mp4"));
    }

    #[tokio::test]
    async fn missing_segment_is_fatal() {
        let fetch = MockFetch::new().with("https://example.com/seg0.ts", &b"X"[..]);
        let url = Url::parse("https://example.com/media.m3u8").unwrap();
        let manifest = parse_manifest("#EXTINF:2,\nseg0.ts\n#EXTINF:2,\nseg1.ts\n");

        let err = download_segments(&fetch, &url, &manifest).await.unwrap_err();
        assert!(matches!(err, HlsGetError::Http { status: 404, .. }));
    }
}
