//! ┌──────────────────┐   MediaPlaylist   ┌──────────────────┐
//! │                  ├───────────────────►                  ├───┐
//! │ PlaylistResolver │                   │  SegmentFetcher  │   │ N workers claim
//! │                  │                   │     [cursor]     ◄───┘ indices in order
//! └────────▲─────────┘                   └────────┬─────────┘
//!          │ manifest URL                         │ init + segments, in playlist order
//! ┌────────┴─────────┐                   ┌────────▼─────────┐
//! │   DownloadJob    ◄───────────────────┤     assemble     │
//! │  [state machine] │    one buffer     │                  │
//! └────────┬─────────┘                   └──────────────────┘
//!          │ file name + bytes
//! ┌────────▼─────────┐
//! │    MediaSink     │
//! └──────────────────┘
pub mod download;
pub mod error;
pub mod fetch;
pub mod hls;
pub mod merge;
pub mod sink;
pub mod util;

pub use download::{Downloader, DownloadJob, JobEvent, JobOutcome, JobState, JobStatus};
pub use error::{ErrorKind, GrabError, GrabResult};
pub use util::HttpClient;
