use thiserror::Error;

/// Main error type for the downloader and remultiplexer.
///
/// Every variant is fatal: there is no retry logic anywhere in the
/// pipeline, and no operation produces partial output.
#[derive(Error, Debug)]
pub enum HlsGetError {
    /// A playlist had nothing usable: a master without variant streams,
    /// or a media playlist without segments
    #[error("Manifest is empty: {0}")]
    ManifestEmpty(&'static str),

    /// A merge input lacked the required video or audio track
    #[error("Track missing: {0}")]
    TrackMissing(&'static str),

    /// A sample with no payload reached the muxer
    #[error("Sample data missing: track={track_id}, sample={sample}")]
    SampleDataMissing { track_id: u32, sample: usize },

    /// A non-success HTTP status while fetching a playlist or segment
    #[error("HTTP error {status} for {url}")]
    Http { status: u16, url: String },

    /// The injected container codec lacks a required capability
    #[error("Codec unavailable: {0}")]
    CodecUnavailable(&'static str),

    /// Master playlists were nested deeper than the allowed limit
    #[error("Recursion limit exceeded: master playlists nested deeper than {0}")]
    RecursionLimit(usize),

    /// A track uses a media type the container backend has no mapping for
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// A standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A transport-level error from the HTTP client
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// An error from the MP4 container library
    #[error("MP4 error: {0}")]
    Mp4(#[from] mp4::Error),

    /// A URL could not be parsed or resolved
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A blocking demux/mux task failed to complete
    #[error("Task join error: {0}")]
    Join(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, HlsGetError>;
