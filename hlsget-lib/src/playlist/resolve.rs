//! Rendition resolution: walk from a master playlist down to the media
//! playlist that actually lists segments, picking one variant per level.

use tracing::debug;
use url::Url;

use super::{parse_manifest, Manifest, Variant};
use crate::error::{HlsGetError, Result};
use crate::fetch::Fetch;

/// Maximum number of nested master playlists followed before giving up.
pub const MAX_PLAYLIST_DEPTH: usize = 10;

/// How to pick a variant stream from a master playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    LowestBandwidth,
    HighestBandwidth,
}

impl SelectionPolicy {
    /// Pick a variant by bandwidth. Ties go to the first listed variant
    /// for both policies; callers can rely on that.
    pub fn select<'a>(&self, variants: &'a [Variant]) -> Option<&'a Variant> {
        let mut best: Option<&Variant> = None;
        for variant in variants {
            let better = match (self, best) {
                (_, None) => true,
                (SelectionPolicy::LowestBandwidth, Some(b)) => variant.bandwidth < b.bandwidth,
                (SelectionPolicy::HighestBandwidth, Some(b)) => variant.bandwidth > b.bandwidth,
            };
            if better {
                best = Some(variant);
            }
        }
        best
    }
}

/// Resolve a possibly-relative playlist reference against its base URL.
/// If joining fails the reference is retried as an absolute URL.
pub(crate) fn resolve_url(base: &Url, reference: &str) -> Result<Url> {
    match base.join(reference) {
        Ok(url) => Ok(url),
        Err(_) => Ok(Url::parse(reference)?),
    }
}

/// Follow master playlists until a media playlist is reached.
///
/// Returns the media playlist together with its absolute URL, which is the
/// base for resolving segment references. A master without variants fails
/// with [`HlsGetError::ManifestEmpty`] before any further fetch; nesting
/// deeper than [`MAX_PLAYLIST_DEPTH`] fails with
/// [`HlsGetError::RecursionLimit`].
pub async fn resolve_rendition(
    fetch: &dyn Fetch,
    url: &Url,
    manifest: Manifest,
    policy: SelectionPolicy,
) -> Result<(Url, Manifest)> {
    let mut url = url.clone();
    let mut manifest = manifest;

    for _ in 0..MAX_PLAYLIST_DEPTH {
        if !manifest.is_master {
            return Ok((url, manifest));
        }
        let variant = policy
            .select(&manifest.variants)
            .ok_or(HlsGetError::ManifestEmpty(
                "master playlist has no variant streams",
            ))?;
        let next = resolve_url(&url, &variant.uri)?;
        debug!(bandwidth = variant.bandwidth, url = %next, "selected rendition");
        let text = fetch.fetch_text(&next).await?;
        manifest = parse_manifest(&text);
        url = next;
    }

    Err(HlsGetError::RecursionLimit(MAX_PLAYLIST_DEPTH))
}
