//! Demux progress tracking.
//!
//! Progress through a demux pass is an explicit state machine with named
//! states and per-track counters. Completion is decided synchronously after
//! every event; the backend's end-of-stream notification is authoritative
//! for tracks that never declared a sample count.

use std::collections::BTreeMap;

use bytes::Bytes;
use tracing::{debug, warn};

use super::codec::{ContainerCodec, ContainerHeader, MediaSample, SampleBatch};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemuxState {
    AwaitingHeader,
    AccumulatingSamples,
    Complete,
    Failed,
}

#[derive(Debug)]
struct TrackProgress {
    /// Declared sample count; 0 when undeclared.
    expected: u32,
    received: u64,
    seen_batch: bool,
    drained: bool,
}

impl TrackProgress {
    fn update_drained(&mut self) {
        if self.drained {
            return;
        }
        // A track with a declared count drains when it has been met; an
        // undeclared count drains after the first batch.
        self.drained = if self.expected > 0 {
            self.received >= u64::from(self.expected)
        } else {
            self.seen_batch
        };
    }
}

/// Accumulates samples from one demux pass.
#[derive(Debug)]
pub struct SampleCollector {
    state: DemuxState,
    progress: BTreeMap<u32, TrackProgress>,
    samples: BTreeMap<u32, Vec<MediaSample>>,
}

impl SampleCollector {
    pub fn new() -> Self {
        Self {
            state: DemuxState::AwaitingHeader,
            progress: BTreeMap::new(),
            samples: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> DemuxState {
        self.state
    }

    /// The track table arrived; start counting.
    pub fn on_header(&mut self, header: &ContainerHeader) {
        if self.state != DemuxState::AwaitingHeader {
            return;
        }
        for track in &header.tracks {
            self.progress.insert(
                track.id,
                TrackProgress {
                    expected: track.sample_count,
                    received: 0,
                    seen_batch: false,
                    drained: false,
                },
            );
            self.samples.insert(track.id, Vec::new());
        }
        self.state = DemuxState::AccumulatingSamples;
        self.check_complete();
    }

    /// A batch of samples arrived. The completion check runs synchronously,
    /// right here.
    pub fn on_batch(&mut self, batch: SampleBatch) {
        if self.state != DemuxState::AccumulatingSamples {
            return;
        }
        match self.progress.get_mut(&batch.track_id) {
            Some(track) => {
                track.received += batch.samples.len() as u64;
                track.seen_batch = true;
                track.update_drained();
            }
            None => {
                warn!(track_id = batch.track_id, "samples for undeclared track ignored");
                return;
            }
        }
        self.samples
            .entry(batch.track_id)
            .or_default()
            .extend(batch.samples);
        self.check_complete();
    }

    /// The backend signalled end of stream. Any still-pending track is
    /// drained; this runs once, synchronously, after the feed loop.
    pub fn on_end_of_stream(&mut self) {
        if self.state != DemuxState::AccumulatingSamples {
            return;
        }
        for (id, track) in &mut self.progress {
            if !track.drained {
                if track.expected > 0 && track.received < u64::from(track.expected) {
                    warn!(
                        track_id = *id,
                        expected = track.expected,
                        received = track.received,
                        "track short of declared sample count at end of stream"
                    );
                }
                track.drained = true;
            }
        }
        self.check_complete();
    }

    pub fn fail(&mut self) {
        self.state = DemuxState::Failed;
    }

    fn check_complete(&mut self) {
        if self.state == DemuxState::AccumulatingSamples
            && self.progress.values().all(|t| t.drained)
        {
            debug!(tracks = self.progress.len(), "demux pass complete");
            self.state = DemuxState::Complete;
        }
    }

    /// Accumulated samples per track id. Only meaningful once complete;
    /// a failed pass never hands out partial results.
    pub fn into_samples(self) -> BTreeMap<u32, Vec<MediaSample>> {
        self.samples
    }
}

impl Default for SampleCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// The result of a full demux pass.
#[derive(Debug)]
pub struct DemuxedMedia {
    pub header: ContainerHeader,
    pub samples: BTreeMap<u32, Vec<MediaSample>>,
}

/// Drive one demux session to completion. Blocking; callers on the async
/// runtime should wrap this in `spawn_blocking`.
pub fn demux_all(codec: &dyn ContainerCodec, data: Bytes) -> Result<DemuxedMedia> {
    let mut session = codec.open_demux(data)?;
    let header = session.header().clone();

    let mut collector = SampleCollector::new();
    collector.on_header(&header);
    loop {
        match session.next_batch() {
            Ok(Some(batch)) => collector.on_batch(batch),
            Ok(None) => {
                collector.on_end_of_stream();
                break;
            }
            Err(err) => {
                collector.fail();
                return Err(err);
            }
        }
    }
    debug_assert_eq!(collector.state(), DemuxState::Complete);

    Ok(DemuxedMedia {
        header,
        samples: collector.into_samples(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remux::codec::{MediaParams, TrackDescriptor, TrackKind};

    fn descriptor(id: u32, sample_count: u32) -> TrackDescriptor {
        TrackDescriptor {
            id,
            kind: TrackKind::Video,
            timescale: 90_000,
            language: "und".to_string(),
            sample_count,
            params: MediaParams::Hevc {
                width: 16,
                height: 16,
            },
        }
    }

    fn batch(track_id: u32, count: usize) -> SampleBatch {
        let sample = MediaSample {
            data: Bytes::from_static(b"x"),
            duration: 1,
            decode_time: 0,
            rendering_offset: 0,
            is_sync: true,
        };
        SampleBatch {
            track_id,
            samples: vec![sample; count],
        }
    }

    #[test]
    fn completes_when_declared_counts_are_met() {
        let mut c = SampleCollector::new();
        assert_eq!(c.state(), DemuxState::AwaitingHeader);

        c.on_header(&ContainerHeader {
            tracks: vec![descriptor(1, 2), descriptor(2, 1)],
        });
        assert_eq!(c.state(), DemuxState::AccumulatingSamples);

        c.on_batch(batch(1, 2));
        assert_eq!(c.state(), DemuxState::AccumulatingSamples);

        c.on_batch(batch(2, 1));
        assert_eq!(c.state(), DemuxState::Complete);

        let samples = c.into_samples();
        assert_eq!(samples[&1].len(), 2);
        assert_eq!(samples[&2].len(), 1);
    }

    #[test]
    fn declared_count_met_across_multiple_batches() {
        let mut c = SampleCollector::new();
        c.on_header(&ContainerHeader {
            tracks: vec![descriptor(1, 3)],
        });
        c.on_batch(batch(1, 2));
        assert_eq!(c.state(), DemuxState::AccumulatingSamples);
        c.on_batch(batch(1, 1));
        assert_eq!(c.state(), DemuxState::Complete);
    }

    #[test]
    fn undeclared_count_drains_after_first_batch() {
        let mut c = SampleCollector::new();
        c.on_header(&ContainerHeader {
            tracks: vec![descriptor(1, 0)],
        });
        assert_eq!(c.state(), DemuxState::AccumulatingSamples);
        c.on_batch(batch(1, 5));
        assert_eq!(c.state(), DemuxState::Complete);
    }

    #[test]
    fn end_of_stream_drains_pending_tracks() {
        let mut c = SampleCollector::new();
        c.on_header(&ContainerHeader {
            tracks: vec![descriptor(1, 0), descriptor(2, 10)],
        });
        c.on_batch(batch(2, 4));
        assert_eq!(c.state(), DemuxState::AccumulatingSamples);
        c.on_end_of_stream();
        assert_eq!(c.state(), DemuxState::Complete);
        assert_eq!(c.into_samples()[&2].len(), 4);
    }

    #[test]
    fn zero_track_container_completes_on_header() {
        let mut c = SampleCollector::new();
        c.on_header(&ContainerHeader::default());
        assert_eq!(c.state(), DemuxState::Complete);
    }

    #[test]
    fn undeclared_track_samples_are_ignored() {
        let mut c = SampleCollector::new();
        c.on_header(&ContainerHeader {
            tracks: vec![descriptor(1, 1)],
        });
        c.on_batch(batch(7, 3));
        assert_eq!(c.state(), DemuxState::AccumulatingSamples);
        c.on_batch(batch(1, 1));
        assert_eq!(c.state(), DemuxState::Complete);
        assert!(!c.into_samples().contains_key(&7));
    }

    #[test]
    fn failed_state_is_terminal() {
        let mut c = SampleCollector::new();
        c.on_header(&ContainerHeader {
            tracks: vec![descriptor(1, 1)],
        });
        c.fail();
        c.on_batch(batch(1, 1));
        assert_eq!(c.state(), DemuxState::Failed);
    }
}
