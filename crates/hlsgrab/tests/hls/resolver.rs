use hlsgrab::{hls::PlaylistResolver, ErrorKind, GrabError, HttpClient};
use wiremock::MockServer;

use crate::{media_playlist, AssertWrapper, HlsMock};

fn resolver() -> PlaylistResolver {
    PlaylistResolver::new(HttpClient::default())
}

#[tokio::test]
async fn master_playlist_selects_highest_bandwidth() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server
        .mock(
            "/master.m3u8",
            "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
low.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2000000,RESOLUTION=1280x720
high.m3u8
",
        )
        .await
        .mock("/low.m3u8", media_playlist("low-init.mp4", &["low0.mp4"]))
        .await
        .mock("/high.m3u8", media_playlist("high-init.mp4", &["high0.mp4"]))
        .await;

    let master = format!("{}/master.m3u8", server.uri()).parse()?;
    let playlist = resolver().resolve(&master).await.assert_success();

    assert_eq!(playlist.url, format!("{}/high.m3u8", server.uri()).parse()?);
    assert_eq!(
        playlist.init_segment,
        format!("{}/high-init.mp4", server.uri()).parse()?
    );
    assert_eq!(
        playlist.segments,
        vec![format!("{}/high0.mp4", server.uri()).parse()?]
    );

    Ok(())
}

#[tokio::test]
async fn master_playlist_tie_prefers_first_variant() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server
        .mock(
            "/master.m3u8",
            "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=100
small.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=500,CODECS=\"avc1.64001f,mp4a.40.2\"
first.m3u8
#EXT-X-STREAM-INF:AVERAGE-BANDWIDTH=900,BANDWIDTH=500
second.m3u8
",
        )
        .await
        .mock("/first.m3u8", media_playlist("init.mp4", &["a.mp4"]))
        .await
        .mock("/second.m3u8", media_playlist("init.mp4", &["b.mp4"]))
        .await;

    let master = format!("{}/master.m3u8", server.uri()).parse()?;
    let playlist = resolver().resolve(&master).await.assert_success();
    assert_eq!(playlist.url, format!("{}/first.m3u8", server.uri()).parse()?);

    Ok(())
}

#[tokio::test]
async fn media_uris_resolve_against_media_playlist() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server
        .mock(
            "/live/master.m3u8",
            "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\nvideo/720p/index.m3u8\n",
        )
        .await
        .mock(
            "/live/video/720p/index.m3u8",
            media_playlist("init.mp4", &["seg0.m4s", "../shared/seg1.m4s"]),
        )
        .await;

    let master = format!("{}/live/master.m3u8", server.uri()).parse()?;
    let playlist = resolver().resolve(&master).await.assert_success();

    assert_eq!(
        playlist.init_segment,
        format!("{}/live/video/720p/init.mp4", server.uri()).parse()?
    );
    assert_eq!(
        playlist.segments,
        vec![
            format!("{}/live/video/720p/seg0.m4s", server.uri()).parse()?,
            format!("{}/live/video/shared/seg1.m4s", server.uri()).parse()?,
        ]
    );

    Ok(())
}

#[tokio::test]
async fn media_playlist_keeps_order_and_absolute_uris() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let absolute = format!("{}/other/seg1.mp4", server.uri());
    server
        .mock(
            "/path/manifest.m3u8",
            media_playlist("init.mp4", &["seg0.mp4", absolute.as_str(), "seg2.mp4?token=1"]),
        )
        .await;

    let manifest = format!("{}/path/manifest.m3u8", server.uri()).parse()?;
    let playlist = resolver().resolve(&manifest).await.assert_success();

    assert_eq!(playlist.url, manifest);
    assert_eq!(
        playlist.init_segment,
        format!("{}/path/init.mp4", server.uri()).parse()?
    );
    assert_eq!(
        playlist.segments,
        vec![
            format!("{}/path/seg0.mp4", server.uri()).parse()?,
            absolute.parse()?,
            format!("{}/path/seg2.mp4?token=1", server.uri()).parse()?,
        ]
    );

    Ok(())
}

#[tokio::test]
async fn encrypted_master_playlist_is_rejected() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server
        .mock(
            "/master.m3u8",
            "#EXTM3U
#EXT-X-SESSION-KEY:METHOD=SAMPLE-AES,URI=\"skd://key\"
#EXT-X-STREAM-INF:BANDWIDTH=1
media.m3u8
",
        )
        .await
        .mock_expect("/media.m3u8", b"", 0)
        .await;

    let master = format!("{}/master.m3u8", server.uri()).parse()?;
    let error = resolver().resolve(&master).await.unwrap_err();
    assert!(matches!(error, GrabError::EncryptedPlaylistError));

    Ok(())
}

#[tokio::test]
async fn encrypted_media_playlist_is_rejected() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server
        .mock(
            "/master.m3u8",
            "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\nmedia.m3u8\n",
        )
        .await
        .mock(
            "/media.m3u8",
            "#EXTM3U
#EXT-X-MAP:URI=\"init.mp4\"
#EXT-X-KEY:METHOD=AES-128,URI=\"key.bin\"
#EXTINF:4,
seg0.mp4
",
        )
        .await
        .mock_expect("/key.bin", b"", 0)
        .await
        .mock_expect("/seg0.mp4", b"", 0)
        .await;

    let master = format!("{}/master.m3u8", server.uri()).parse()?;
    let error = resolver().resolve(&master).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::EncryptedPlaylist);

    Ok(())
}

#[tokio::test]
async fn media_playlist_without_map_is_unsupported() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server
        .mock(
            "/index.m3u8",
            "#EXTM3U
#EXT-X-TARGETDURATION:10
#EXTINF:9.009,
seg0.ts
#EXT-X-ENDLIST",
        )
        .await;

    let manifest = format!("{}/index.m3u8", server.uri()).parse()?;
    let error = resolver().resolve(&manifest).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UnsupportedFormat);
    assert_eq!(error.to_string(), "Non-fragmented formats unsupported");

    Ok(())
}

#[tokio::test]
async fn media_playlist_without_segments_is_empty() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server
        .mock("/index.m3u8", media_playlist("init.mp4", &[]))
        .await;

    let manifest = format!("{}/index.m3u8", server.uri()).parse()?;
    let error = resolver().resolve(&manifest).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::EmptyPlaylist);

    Ok(())
}

#[tokio::test]
async fn missing_manifest_fails_to_fetch() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server.mock_status("/index.m3u8", 404).await;

    let manifest = format!("{}/index.m3u8", server.uri()).parse()?;
    let error = resolver().resolve(&manifest).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::PlaylistFetch);

    let manifest = format!("{}/not-mounted.m3u8", server.uri()).parse()?;
    resolver().resolve(&manifest).await.assert_error();

    Ok(())
}
