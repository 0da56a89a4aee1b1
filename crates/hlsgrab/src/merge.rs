use bytes::{Bytes, BytesMut};
use reqwest::Url;

/// Used when the playlist URL does not end in a recognizable file name.
pub const DEFAULT_FILE_NAME: &str = "video.mp4";

const MANIFEST_EXTENSIONS: [&str; 2] = [".m3u8", ".m3u"];
const MEDIA_EXTENSION: &str = ".mp4";

/// Concatenates the initialization fragment and the media fragments in order.
///
/// The bytes are copied as they are: fragmented MP4 stays playable when its
/// fragments are simply appended after the init segment.
pub fn assemble(init: &[u8], segments: &[Bytes]) -> Bytes {
    let size = init.len() + segments.iter().map(Bytes::len).sum::<usize>();
    let mut output = BytesMut::with_capacity(size);
    output.extend_from_slice(init);
    for segment in segments {
        output.extend_from_slice(segment);
    }
    output.freeze()
}

/// Derives the output file name from a media playlist URL.
///
/// 1. take the last path segment, without the query string, percent-decoded
/// 2. replace a `.m3u8` or `.m3u` extension with `.mp4`
/// 3. otherwise fall back to [DEFAULT_FILE_NAME]
pub fn derive_file_name(playlist_url: &Url) -> String {
    let name = playlist_url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    file_name_from_path(name)
}

fn file_name_from_path(name: &str) -> String {
    // `Url::path_segments` never contains a query, but raw input might
    let name = name.split('?').next().unwrap_or_default();
    // an escaped separator must not turn into a directory component
    let name = match urlencoding::decode(name) {
        Ok(decoded) => decoded.replace(['/', '\\'], "_"),
        Err(_) => name.to_string(),
    };
    let name = name.as_str();

    MANIFEST_EXTENSIONS
        .iter()
        .find_map(|extension| {
            let split = name.len().checked_sub(extension.len())?;
            let (stem, suffix) = (name.get(..split)?, name.get(split..)?);
            suffix.eq_ignore_ascii_case(extension).then_some(stem)
        })
        .filter(|stem| !stem.is_empty())
        .map(|stem| format!("{stem}{MEDIA_EXTENSION}"))
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
}
