use reqwest::Url;

use crate::{
    error::{GrabError, GrabResult},
    hls::playlist,
    util::HttpClient,
};

/// A resolved fragmented-MP4 media playlist with absolute URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPlaylist {
    /// URL the media playlist was loaded from. Relative URIs were joined against it.
    pub url: Url,
    pub init_segment: Url,
    /// Playback order. Never reordered.
    pub segments: Vec<Url>,
}

/// Loads a manifest, follows a master playlist to its best rendition and
/// validates that the result is a downloadable fMP4 playlist.
pub struct PlaylistResolver {
    client: HttpClient,
}

impl PlaylistResolver {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    pub async fn resolve(&self, manifest: &Url) -> GrabResult<MediaPlaylist> {
        tracing::info!("Start fetching M3U8 file.");
        let text = self.load(manifest).await?;

        let (url, text) = if playlist::is_master(&text) {
            tracing::info!("Master playlist input detected. Auto selecting best quality stream.");
            let variants = playlist::parse_variants(&text);
            let variant =
                playlist::select_variant(&variants).ok_or(GrabError::EmptyPlaylistError)?;
            let url = manifest.join(&variant.uri)?;
            tracing::info!(
                "Best stream: {url}; Bandwidth: {bandwidth}",
                bandwidth = variant.bandwidth
            );

            let text = self.load(&url).await?;
            (url, text)
        } else {
            (manifest.clone(), text)
        };
        tracing::info!("M3U8 file fetched.");

        let init_segment =
            playlist::init_segment_uri(&text).ok_or(GrabError::UnsupportedFormatError)?;
        let segments = playlist::segment_uris(&text);
        if segments.is_empty() {
            return Err(GrabError::EmptyPlaylistError);
        }

        let init_segment = url.join(&init_segment)?;
        let segments = segments
            .iter()
            .map(|uri| url.join(uri))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!("{} segments found in {url}", segments.len());

        Ok(MediaPlaylist {
            url,
            init_segment,
            segments,
        })
    }

    /// Fetches one manifest and rejects it if it declares encryption.
    async fn load(&self, url: &Url) -> GrabResult<String> {
        let bytes = self.client.get_bytes(url.clone()).await.map_err(|e| {
            GrabError::PlaylistFetchError {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;
        let text = String::from_utf8_lossy(&bytes).into_owned();

        if playlist::is_encrypted(&text) {
            tracing::error!("{url} declares an encryption key.");
            return Err(GrabError::EncryptedPlaylistError);
        }

        Ok(text)
    }
}
