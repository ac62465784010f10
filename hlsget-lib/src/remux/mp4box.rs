//! MP4 backend for the container codec abstraction, built on the `mp4`
//! crate. Works entirely over in-memory buffers.

use std::io::Cursor;

use bytes::Bytes;
use mp4::{
    AacConfig, AvcConfig, HevcConfig, MediaConfig, MediaType, Mp4Config, Mp4Reader, Mp4Sample,
    Mp4Writer, TrackConfig, TrackType, TtxtConfig, Vp9Config,
};

use super::codec::{
    CodecCapabilities, ContainerCodec, ContainerHeader, DemuxSession, MediaParams, MediaSample,
    MuxBuilder, SampleBatch, TrackDescriptor, TrackKind,
};
use crate::error::{HlsGetError, Result};

/// Samples pulled from the reader per `next_batch` call.
const SAMPLE_BATCH: usize = 64;

/// Container codec backed by the `mp4` crate. Supports both demux and mux.
pub struct Mp4Codec;

impl ContainerCodec for Mp4Codec {
    fn capabilities(&self) -> CodecCapabilities {
        CodecCapabilities {
            demux: true,
            mux: true,
        }
    }

    fn open_demux(&self, data: Bytes) -> Result<Box<dyn DemuxSession>> {
        let size = data.len() as u64;
        let reader = Mp4Reader::read_header(Cursor::new(data), size)?;
        let header = describe_tracks(&reader)?;
        Ok(Box::new(Mp4Demux {
            reader,
            header,
            track_index: 0,
            next_sample: 1,
        }))
    }

    fn open_mux(&self) -> Result<Box<dyn MuxBuilder>> {
        let config = Mp4Config {
            major_brand: brand("isom")?,
            minor_version: 512,
            compatible_brands: vec![
                brand("isom")?,
                brand("iso2")?,
                brand("avc1")?,
                brand("mp41")?,
            ],
            timescale: 1000,
        };
        let writer = Mp4Writer::write_start(Cursor::new(Vec::new()), &config)?;
        Ok(Box::new(Mp4Mux {
            writer,
            next_track_id: 1,
            written: std::collections::BTreeMap::new(),
        }))
    }
}

fn brand(s: &str) -> Result<mp4::FourCC> {
    s.parse()
        .map_err(|_| HlsGetError::UnsupportedCodec(format!("invalid brand {s:?}")))
}

fn describe_tracks(reader: &Mp4Reader<Cursor<Bytes>>) -> Result<ContainerHeader> {
    // The reader's track table is a HashMap; sort ids so the header is
    // deterministic.
    let mut ids: Vec<u32> = reader.tracks().keys().copied().collect();
    ids.sort_unstable();

    let mut tracks = Vec::with_capacity(ids.len());
    for id in ids {
        let track = &reader.tracks()[&id];
        let kind = match track.track_type()? {
            TrackType::Video => TrackKind::Video,
            TrackType::Audio => TrackKind::Audio,
            TrackType::Subtitle => TrackKind::Subtitle,
        };
        let params = match track.media_type()? {
            MediaType::H264 => MediaParams::Avc {
                width: track.width(),
                height: track.height(),
                seq_param_set: track.sequence_parameter_set()?.to_vec(),
                pic_param_set: track.picture_parameter_set()?.to_vec(),
            },
            MediaType::H265 => MediaParams::Hevc {
                width: track.width(),
                height: track.height(),
            },
            MediaType::VP9 => MediaParams::Vp9 {
                width: track.width(),
                height: track.height(),
            },
            MediaType::AAC => MediaParams::Aac {
                bitrate: track.bitrate(),
                profile: track.audio_profile()? as u8,
                freq_index: track.sample_freq_index()? as u8,
                channel_config: track.channel_config()? as u8,
            },
            MediaType::TTXT => MediaParams::Ttxt,
            #[allow(unreachable_patterns)]
            other => return Err(HlsGetError::UnsupportedCodec(format!("{other:?}"))),
        };
        tracks.push(TrackDescriptor {
            id,
            kind,
            timescale: track.timescale(),
            language: track.language().to_string(),
            sample_count: track.sample_count(),
            params,
        });
    }
    Ok(ContainerHeader { tracks })
}

struct Mp4Demux {
    reader: Mp4Reader<Cursor<Bytes>>,
    header: ContainerHeader,
    track_index: usize,
    next_sample: u32,
}

impl DemuxSession for Mp4Demux {
    fn header(&self) -> &ContainerHeader {
        &self.header
    }

    fn next_batch(&mut self) -> Result<Option<SampleBatch>> {
        while self.track_index < self.header.tracks.len() {
            let track_id = self.header.tracks[self.track_index].id;
            let mut samples = Vec::new();
            while samples.len() < SAMPLE_BATCH {
                // Out-of-range sample ids read as None; that is the track's
                // end of stream.
                match self.reader.read_sample(track_id, self.next_sample)? {
                    Some(sample) => {
                        self.next_sample += 1;
                        samples.push(MediaSample {
                            duration: sample.duration,
                            decode_time: sample.start_time,
                            rendering_offset: sample.rendering_offset,
                            is_sync: sample.is_sync,
                            data: sample.bytes,
                        });
                    }
                    None => break,
                }
            }
            if samples.is_empty() {
                self.track_index += 1;
                self.next_sample = 1;
                continue;
            }
            return Ok(Some(SampleBatch { track_id, samples }));
        }
        Ok(None)
    }
}

struct Mp4Mux {
    writer: Mp4Writer<Cursor<Vec<u8>>>,
    next_track_id: u32,
    /// Samples written so far per track, for error reporting.
    written: std::collections::BTreeMap<u32, usize>,
}

impl MuxBuilder for Mp4Mux {
    fn add_track(&mut self, descriptor: &TrackDescriptor) -> Result<u32> {
        let media_conf = match &descriptor.params {
            MediaParams::Avc {
                width,
                height,
                seq_param_set,
                pic_param_set,
            } => MediaConfig::AvcConfig(AvcConfig {
                width: *width,
                height: *height,
                seq_param_set: seq_param_set.clone(),
                pic_param_set: pic_param_set.clone(),
            }),
            MediaParams::Hevc { width, height } => MediaConfig::HevcConfig(HevcConfig {
                width: *width,
                height: *height,
            }),
            MediaParams::Vp9 { width, height } => MediaConfig::Vp9Config(Vp9Config {
                width: *width,
                height: *height,
            }),
            MediaParams::Aac {
                bitrate,
                profile,
                freq_index,
                channel_config,
            } => MediaConfig::AacConfig(AacConfig {
                bitrate: *bitrate,
                profile: (*profile).try_into()?,
                freq_index: (*freq_index).try_into()?,
                chan_conf: (*channel_config).try_into()?,
            }),
            MediaParams::Ttxt => MediaConfig::TtxtConfig(TtxtConfig {}),
        };
        let track_conf = TrackConfig {
            track_type: match descriptor.kind {
                TrackKind::Video => TrackType::Video,
                TrackKind::Audio => TrackType::Audio,
                TrackKind::Subtitle => TrackType::Subtitle,
            },
            timescale: descriptor.timescale,
            language: descriptor.language.clone(),
            media_conf,
        };
        self.writer.add_track(&track_conf)?;

        // Writer track ids are sequential from 1 in add order.
        let id = self.next_track_id;
        self.next_track_id += 1;
        self.written.insert(id, 0);
        Ok(id)
    }

    fn write_sample(&mut self, track_id: u32, sample: &MediaSample) -> Result<()> {
        let ordinal = self.written.entry(track_id).or_insert(0);
        if sample.data.is_empty() {
            return Err(HlsGetError::SampleDataMissing {
                track_id,
                sample: *ordinal,
            });
        }
        self.writer.write_sample(
            track_id,
            &Mp4Sample {
                start_time: sample.decode_time,
                duration: sample.duration,
                rendering_offset: sample.rendering_offset,
                is_sync: sample.is_sync,
                bytes: sample.data.clone(),
            },
        )?;
        *ordinal += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Bytes> {
        let mut writer = self.writer;
        writer.write_end()?;
        Ok(Bytes::from(writer.into_writer().into_inner()))
    }
}
