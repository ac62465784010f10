//! HLS playlist (M3U8) parsing.
//!
//! Line-oriented and permissive: unknown directives are ignored, a bad
//! `#EXTINF` duration becomes "unknown" rather than an error, and parsing
//! never performs I/O. The same parser handles master and media playlists;
//! the presence of `#EXT-X-STREAM-INF` decides which one we got.

pub mod resolve;

use std::collections::BTreeMap;

const STREAM_INF: &str = "#EXT-X-STREAM-INF:";
const EXTINF: &str = "#EXTINF:";
const MAP: &str = "#EXT-X-MAP:";
const SESSION_DATA: &str = "#EXT-X-SESSION-DATA";

// helper.
macro_rules! regex {
    ($re:literal $(,)?) => {{
        static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| regex::Regex::new($re).unwrap())
    }};
}

/// A parsed playlist, master or media.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    /// True when at least one `#EXT-X-STREAM-INF` directive was seen.
    pub is_master: bool,
    /// Variant streams of a master playlist, in listed order.
    pub variants: Vec<Variant>,
    /// Media segments of a media playlist, in listed order.
    pub segments: Vec<Segment>,
    /// Initialization segment declared by `#EXT-X-MAP`, if any.
    pub init_segment: Option<InitSegmentRef>,
}

/// One variant stream of a master playlist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variant {
    /// URI of the variant playlist, as written (possibly relative).
    pub uri: String,
    /// `BANDWIDTH` attribute; 0 when missing or unparsable.
    pub bandwidth: u64,
    /// All attributes from the `#EXT-X-STREAM-INF` line, quotes stripped.
    pub attributes: BTreeMap<String, String>,
}

/// One media segment of a media playlist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segment {
    /// URI of the segment, as written (possibly relative).
    pub uri: String,
    /// `#EXTINF` duration in seconds; `None` when absent or unparsable.
    pub duration: Option<f64>,
}

/// The `#EXT-X-MAP` initialization segment reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitSegmentRef {
    pub uri: String,
    /// Carried opaquely; byte-range fetching is not performed.
    pub byterange: Option<String>,
}

/// Parse playlist text into a [`Manifest`]. Never fails.
pub fn parse_manifest(text: &str) -> Manifest {
    let mut manifest = Manifest::default();
    let mut pending_variant: Option<BTreeMap<String, String>> = None;
    let mut pending_duration: Option<f64> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(attrs) = line.strip_prefix(STREAM_INF) {
            manifest.is_master = true;
            pending_variant = Some(parse_attributes(attrs));
        } else if let Some(rest) = line.strip_prefix(EXTINF) {
            // Duration is the text before the first comma; tolerate junk.
            pending_duration = rest
                .split(',')
                .next()
                .and_then(|d| d.trim().parse::<f64>().ok());
        } else if let Some(attrs) = line.strip_prefix(MAP) {
            // First map wins; later ones are ignored.
            if manifest.init_segment.is_none() {
                let attrs = parse_attributes(attrs);
                if let Some(uri) = attrs.get("URI") {
                    manifest.init_segment = Some(InitSegmentRef {
                        uri: uri.clone(),
                        byterange: attrs.get("BYTERANGE").cloned(),
                    });
                }
            }
        } else if line.starts_with(SESSION_DATA) {
            // Dropped entirely.
        } else if line.starts_with('#') {
            // Unrelated directive. Never consumes the following line.
        } else if let Some(attributes) = pending_variant.take() {
            let bandwidth = attributes
                .get("BANDWIDTH")
                .and_then(|b| b.parse::<u64>().ok())
                .unwrap_or(0);
            manifest.variants.push(Variant {
                uri: line.to_string(),
                bandwidth,
                attributes,
            });
        } else if !manifest.is_master {
            manifest.segments.push(Segment {
                uri: line.to_string(),
                duration: pending_duration.take(),
            });
        }
        // A URI line in a master playlist without a preceding
        // #EXT-X-STREAM-INF is ignored.
    }

    manifest
}

/// Parse an M3U8 attribute list (`KEY=VALUE,KEY="quoted,value",...`).
/// Commas inside double-quoted values are not separators.
fn parse_attributes(input: &str) -> BTreeMap<String, String> {
    let re = regex!(r#"([A-Z0-9-]+)=("[^"]*"|[^,]*)"#);
    let mut attrs = BTreeMap::new();
    for cap in re.captures_iter(input) {
        let raw = &cap[2];
        let value = raw
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(raw);
        attrs.insert(cap[1].to_string(), value.to_string());
    }
    attrs
}
