//! Container codec abstraction.
//!
//! The remultiplexer never talks to a container library directly; it is
//! handed a [`ContainerCodec`] whose capabilities are checked before any
//! work begins. Demuxing is a pull session delivering per-track sample
//! batches; muxing is a builder that takes tracks, then samples, then
//! yields the finished container. Nothing at this boundary mentions the
//! backing library's types.

use bytes::Bytes;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
    Subtitle,
}

/// Per-codec setup parameters carried from demux to mux.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaParams {
    Avc {
        width: u16,
        height: u16,
        seq_param_set: Vec<u8>,
        pic_param_set: Vec<u8>,
    },
    Hevc {
        width: u16,
        height: u16,
    },
    Vp9 {
        width: u16,
        height: u16,
    },
    Aac {
        bitrate: u32,
        profile: u8,
        freq_index: u8,
        channel_config: u8,
    },
    Ttxt,
}

/// Everything needed to recreate a track in another container.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackDescriptor {
    pub id: u32,
    pub kind: TrackKind,
    pub timescale: u32,
    pub language: String,
    /// Declared sample count; 0 when the container does not declare one.
    pub sample_count: u32,
    pub params: MediaParams,
}

/// One media sample. Size is `data.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSample {
    pub data: Bytes,
    /// Duration in track timescale ticks.
    pub duration: u32,
    /// Decode timestamp in track timescale ticks.
    pub decode_time: u64,
    /// Composition offset relative to the decode timestamp.
    pub rendering_offset: i32,
    pub is_sync: bool,
}

/// A run of samples for one track, in decode order.
#[derive(Debug, Clone)]
pub struct SampleBatch {
    pub track_id: u32,
    pub samples: Vec<MediaSample>,
}

/// The track table of an opened container, sorted by track id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerHeader {
    pub tracks: Vec<TrackDescriptor>,
}

#[derive(Debug, Clone, Copy)]
pub struct CodecCapabilities {
    pub demux: bool,
    pub mux: bool,
}

/// An injected container backend.
pub trait ContainerCodec: Send + Sync {
    fn capabilities(&self) -> CodecCapabilities;
    fn open_demux(&self, data: Bytes) -> Result<Box<dyn DemuxSession>>;
    fn open_mux(&self) -> Result<Box<dyn MuxBuilder>>;
}

/// A pull-based demux pass over one container.
pub trait DemuxSession: Send {
    fn header(&self) -> &ContainerHeader;
    /// Next batch of samples, per track in decode order. `Ok(None)` is the
    /// backend's own end-of-stream notification.
    fn next_batch(&mut self) -> Result<Option<SampleBatch>>;
}

/// A mux pass building one container: add every track, then write samples,
/// then finish.
pub trait MuxBuilder: Send {
    /// Register a track; returns the id to use with [`write_sample`].
    ///
    /// [`write_sample`]: MuxBuilder::write_sample
    fn add_track(&mut self, descriptor: &TrackDescriptor) -> Result<u32>;
    /// Write one sample. A sample with an empty payload fails with
    /// [`HlsGetError::SampleDataMissing`](crate::HlsGetError::SampleDataMissing).
    fn write_sample(&mut self, track_id: u32, sample: &MediaSample) -> Result<()>;
    fn finish(self: Box<Self>) -> Result<Bytes>;
}
