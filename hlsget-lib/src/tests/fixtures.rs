//! Test fixtures: an in-memory fetcher and small MP4 containers built
//! through the codec itself.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use crate::error::{HlsGetError, Result};
use crate::fetch::Fetch;
use crate::remux::codec::{ContainerCodec, MediaParams, MediaSample, TrackDescriptor, TrackKind};
use crate::remux::Mp4Codec;

/// In-memory fetcher keyed by absolute URL.
#[derive(Default)]
pub struct MockFetch {
    responses: HashMap<String, Bytes>,
    calls: AtomicUsize,
    call_log: Mutex<Vec<String>>,
}

impl MockFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: impl Into<Bytes>) -> Self {
        self.responses.insert(url.to_string(), body.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn first_call(&self) -> Option<String> {
        self.call_log.lock().unwrap().first().cloned()
    }

    fn lookup(&self, url: &Url) -> Result<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_log.lock().unwrap().push(url.to_string());
        self.responses
            .get(url.as_str())
            .cloned()
            .ok_or(HlsGetError::Http {
                status: 404,
                url: url.to_string(),
            })
    }
}

#[async_trait]
impl Fetch for MockFetch {
    async fn fetch_text(&self, url: &Url) -> Result<String> {
        let bytes = self.lookup(url)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn fetch_bytes(&self, url: &Url) -> Result<Bytes> {
        self.lookup(url)
    }
}

/// H.264 video track descriptor with placeholder parameter sets.
pub fn avc_track() -> TrackDescriptor {
    TrackDescriptor {
        id: 1,
        kind: TrackKind::Video,
        timescale: 90_000,
        language: "und".to_string(),
        sample_count: 0,
        params: MediaParams::Avc {
            width: 320,
            height: 240,
            seq_param_set: vec![0x67, 0x42, 0xc0, 0x1e, 0xd9],
            pic_param_set: vec![0x68, 0xce, 0x3c, 0x80],
        },
    }
}

/// AAC-LC stereo 48kHz audio track descriptor.
pub fn aac_track() -> TrackDescriptor {
    TrackDescriptor {
        id: 1,
        kind: TrackKind::Audio,
        timescale: 48_000,
        language: "und".to_string(),
        sample_count: 0,
        params: MediaParams::Aac {
            bitrate: 128_000,
            profile: 2,  // AAC LC
            freq_index: 3, // 48000 Hz
            channel_config: 2,
        },
    }
}

/// Consecutive sync samples with duration 1024 and cumulative decode times.
pub fn sample_run(payloads: &[&'static [u8]]) -> Vec<MediaSample> {
    payloads
        .iter()
        .enumerate()
        .map(|(i, p)| MediaSample {
            data: Bytes::from_static(p),
            duration: 1024,
            decode_time: i as u64 * 1024,
            rendering_offset: 0,
            is_sync: true,
        })
        .collect()
}

/// Build an MP4 container through the codec's own mux path.
pub fn build_container(tracks: &[(TrackDescriptor, Vec<MediaSample>)]) -> Bytes {
    let mut builder = Mp4Codec.open_mux().unwrap();
    let mut ids = Vec::new();
    for (descriptor, _) in tracks {
        ids.push(builder.add_track(descriptor).unwrap());
    }
    for ((_, samples), id) in tracks.iter().zip(ids) {
        for sample in samples {
            builder.write_sample(id, sample).unwrap();
        }
    }
    builder.finish().unwrap()
}

/// A container holding only an H.264 video track.
pub fn video_only_mp4() -> Bytes {
    build_container(&[(avc_track(), sample_run(&[b"vid0" as &[u8], b"vid1"]))])
}

/// A container holding only an AAC audio track.
pub fn audio_only_mp4() -> Bytes {
    build_container(&[(
        aac_track(),
        sample_run(&[b"aud0" as &[u8], b"aud1", b"aud2"]),
    )])
}
