//! Sample remultiplexing: demux two MP4 containers concurrently and merge
//! one video track and one audio track into a single container, preserving
//! sample timing and flags.

pub mod codec;
mod mp4box;
mod session;

pub use mp4box::Mp4Codec;
pub use session::{demux_all, DemuxState, DemuxedMedia, SampleCollector};

use std::sync::Arc;

use bytes::Bytes;
use tracing::info;

use crate::error::{HlsGetError, Result};
use self::codec::{ContainerCodec, MediaSample, TrackDescriptor, TrackKind};

fn find_track(media: &DemuxedMedia, kind: TrackKind) -> Option<&TrackDescriptor> {
    media.header.tracks.iter().find(|t| t.kind == kind)
}

fn mux_tracks(
    codec: &dyn ContainerCodec,
    tracks: &[(TrackDescriptor, Vec<MediaSample>)],
) -> Result<Bytes> {
    let mut builder = codec.open_mux()?;
    let mut ids = Vec::with_capacity(tracks.len());
    for (descriptor, _) in tracks {
        ids.push(builder.add_track(descriptor)?);
    }
    for ((_, samples), track_id) in tracks.iter().zip(ids) {
        for sample in samples {
            builder.write_sample(track_id, sample)?;
        }
    }
    builder.finish()
}

/// Merge the audio track of one container into the video track of another.
///
/// The codec's capabilities are checked before any work begins. The two
/// demux passes run concurrently on the blocking pool. The video-typed
/// track must come from the video container and the audio-typed track from
/// the audio container; a missing track fails with
/// [`HlsGetError::TrackMissing`].
pub async fn merge_audio_into_video(
    codec: Arc<dyn ContainerCodec>,
    video: Bytes,
    audio: Bytes,
) -> Result<Bytes> {
    let caps = codec.capabilities();
    if !caps.demux || !caps.mux {
        return Err(HlsGetError::CodecUnavailable(
            "container codec lacks demux or mux support",
        ));
    }

    let video_codec = Arc::clone(&codec);
    let audio_codec = Arc::clone(&codec);
    let video_task = tokio::task::spawn_blocking(move || demux_all(video_codec.as_ref(), video));
    let audio_task = tokio::task::spawn_blocking(move || demux_all(audio_codec.as_ref(), audio));
    let (video_media, audio_media) = tokio::try_join!(video_task, audio_task)
        .map_err(|e| HlsGetError::Join(e.to_string()))?;
    let (video_media, audio_media) = (video_media?, audio_media?);

    let video_track = find_track(&video_media, TrackKind::Video)
        .ok_or(HlsGetError::TrackMissing("no video track in video input"))?
        .clone();
    let audio_track = find_track(&audio_media, TrackKind::Audio)
        .ok_or(HlsGetError::TrackMissing("no audio track in audio input"))?
        .clone();

    let video_samples = video_media
        .samples
        .get(&video_track.id)
        .cloned()
        .unwrap_or_default();
    let audio_samples = audio_media
        .samples
        .get(&audio_track.id)
        .cloned()
        .unwrap_or_default();

    info!(
        video_samples = video_samples.len(),
        audio_samples = audio_samples.len(),
        "merging tracks"
    );

    let mux_codec = Arc::clone(&codec);
    tokio::task::spawn_blocking(move || {
        mux_tracks(
            mux_codec.as_ref(),
            &[(video_track, video_samples), (audio_track, audio_samples)],
        )
    })
    .await
    .map_err(|e| HlsGetError::Join(e.to_string()))?
}
