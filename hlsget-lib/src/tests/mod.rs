//! Integration testing module
//!
//! End-to-end tests for the downloader and remultiplexer:
//! - Master playlist resolution down to assembled bytes
//! - Audio-into-video merging through the MP4 backend

pub mod fixtures;
