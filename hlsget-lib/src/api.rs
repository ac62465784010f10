//! High-level download pipeline.

use tracing::info;
use url::Url;

use crate::error::Result;
use crate::fetch::Fetch;
use crate::playlist::parse_manifest;
use crate::playlist::resolve::{resolve_rendition, SelectionPolicy};
use crate::segment::assemble::{assemble, AssembledStream};
use crate::segment::download_segments;

/// Download an HLS stream to a single in-memory media file.
///
/// Fetches and parses the manifest, resolves a rendition when it is a
/// master playlist, downloads the init segment and every media segment in
/// order, and concatenates them. The content type is inferred from the
/// last segment's URI.
pub async fn download_stream(
    fetch: &dyn Fetch,
    manifest_url: &Url,
    policy: SelectionPolicy,
) -> Result<AssembledStream> {
    let text = fetch.fetch_text(manifest_url).await?;
    let manifest = parse_manifest(&text);

    let (playlist_url, playlist) =
        resolve_rendition(fetch, manifest_url, manifest, policy).await?;
    let download = download_segments(fetch, &playlist_url, &playlist).await?;

    // download_segments guarantees at least one segment.
    let last_uri = playlist
        .segments
        .last()
        .map(|s| s.uri.clone())
        .unwrap_or_default();

    let stream = assemble(download, &last_uri);
    info!(
        bytes = stream.data.len(),
        content_type = stream.content_type,
        "stream assembled"
    );
    Ok(stream)
}
