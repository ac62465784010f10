//! Container assembly: plain byte concatenation of the init segment and
//! media segments, plus content-type inference. No transcoding and no box
//! rewriting happen here.

use bytes::{Bytes, BytesMut};

use super::StreamDownload;

pub const MIME_MP4: &str = "video/mp4";
pub const MIME_MP2T: &str = "video/mp2t";

/// The assembled output plus its inferred content type.
#[derive(Debug, Clone)]
pub struct AssembledStream {
    pub data: Bytes,
    pub content_type: &'static str,
}

/// Infer the content type from a segment URI's extension. Query string and
/// fragment are ignored; unknown extensions default to fragmented MP4.
pub fn content_type_for(uri: &str) -> &'static str {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    match path.rsplit_once('.') {
        Some((_, ext)) => match ext.to_ascii_lowercase().as_str() {
            "ts" | "m2ts" => MIME_MP2T,
            "mp4" | "m4s" | "m4a" | "m4v" => MIME_MP4,
            _ => MIME_MP4,
        },
        None => MIME_MP4,
    }
}

/// Concatenate the init segment (when present) and every media segment, in
/// playlist order. The content type comes from the LAST segment's URI.
pub fn assemble(download: StreamDownload, last_segment_uri: &str) -> AssembledStream {
    let total = download.init_segment.as_ref().map_or(0, |b| b.len())
        + download.segments.iter().map(|s| s.len()).sum::<usize>();

    let mut data = BytesMut::with_capacity(total);
    if let Some(init) = &download.init_segment {
        data.extend_from_slice(init);
    }
    for segment in &download.segments {
        data.extend_from_slice(segment);
    }

    AssembledStream {
        data: data.freeze(),
        content_type: content_type_for(last_segment_uri),
    }
}
