pub(crate) mod api;
pub(crate) mod error;
pub(crate) mod fetch;
pub(crate) mod playlist;
pub(crate) mod remux;
pub(crate) mod segment;

#[cfg(test)]
pub(crate) mod tests;

pub use api::download_stream;
pub use error::{HlsGetError, Result};
pub use fetch::{Fetch, HttpFetcher};
pub use playlist::resolve::{resolve_rendition, SelectionPolicy, MAX_PLAYLIST_DEPTH};
pub use playlist::{parse_manifest, InitSegmentRef, Manifest, Segment, Variant};
pub use remux::codec::{
    CodecCapabilities, ContainerCodec, ContainerHeader, DemuxSession, MediaParams, MediaSample,
    MuxBuilder, SampleBatch, TrackDescriptor, TrackKind,
};
pub use remux::{demux_all, merge_audio_into_video, DemuxState, DemuxedMedia, Mp4Codec};
pub use segment::assemble::{assemble, content_type_for, AssembledStream, MIME_MP2T, MIME_MP4};
pub use segment::{download_segments, StreamDownload, PARALLEL_FETCHES};
