use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GrabError {
    #[error("Failed to fetch playlist {url}: {reason}")]
    PlaylistFetchError { url: String, reason: String },

    #[error("Encrypted playlists are not supported")]
    EncryptedPlaylistError,

    #[error("Non-fragmented formats unsupported")]
    UnsupportedFormatError,

    #[error("Playlist contains no segments")]
    EmptyPlaylistError,

    #[error("Failed to fetch segment #{index}: {reason}")]
    SegmentFetchError { index: usize, reason: String },

    #[error("Failed to fetch init segment: {reason}")]
    InitSegmentFetchError { reason: String },

    #[error("Job has already been started")]
    JobAlreadyStarted,

    #[error("Segment #{0} was never written")]
    SegmentMissing(usize),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    #[error(transparent)]
    RequestError(#[from] reqwest::Error),

    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

/// Taxonomy of [GrabError] without payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PlaylistFetch,
    EncryptedPlaylist,
    UnsupportedFormat,
    EmptyPlaylist,
    SegmentFetch,
    InvalidUrl,
    Request,
    Io,
    Internal,
}

impl GrabError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GrabError::PlaylistFetchError { .. } => ErrorKind::PlaylistFetch,
            GrabError::EncryptedPlaylistError => ErrorKind::EncryptedPlaylist,
            GrabError::UnsupportedFormatError => ErrorKind::UnsupportedFormat,
            GrabError::EmptyPlaylistError => ErrorKind::EmptyPlaylist,
            GrabError::SegmentFetchError { .. } | GrabError::InitSegmentFetchError { .. } => {
                ErrorKind::SegmentFetch
            }
            GrabError::JobAlreadyStarted => ErrorKind::Internal,
            GrabError::SegmentMissing(_) => ErrorKind::Internal,
            GrabError::UrlParseError(_) => ErrorKind::InvalidUrl,
            GrabError::RequestError(_) => ErrorKind::Request,
            GrabError::IOError(_) => ErrorKind::Io,
        }
    }

    /// Index of the failing segment, if any.
    pub fn segment_index(&self) -> Option<usize> {
        match self {
            GrabError::SegmentFetchError { index, .. } | GrabError::SegmentMissing(index) => {
                Some(*index)
            }
            _ => None,
        }
    }
}

pub type GrabResult<T> = Result<T, GrabError>;
