use std::{num::NonZeroU32, sync::Mutex, time::Duration};

use hlsgrab::{fetch::SegmentFetcher, GrabError, HttpClient};
use reqwest::Url;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::{AssertWrapper, HlsMock};

fn fetcher(concurrency: u32) -> SegmentFetcher {
    SegmentFetcher::new(
        HttpClient::default(),
        NonZeroU32::new(concurrency).unwrap(),
    )
}

fn segment_urls(server: &MockServer, count: usize) -> Vec<Url> {
    (0..count)
        .map(|i| format!("{}/seg{i}.mp4", server.uri()).parse().unwrap())
        .collect()
}

#[tokio::test]
async fn output_order_ignores_completion_order() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let count = 8;
    for i in 0..count {
        // earlier segments answer later
        Mock::given(method("GET"))
            .and(path(format!("/seg{i}.mp4")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(format!("segment-{i};"))
                    .set_delay(Duration::from_millis(((count - i) * 20) as u64)),
            )
            .mount(&server)
            .await;
    }

    let progress = Mutex::new(Vec::new());
    let segments = fetcher(4)
        .fetch_all(&segment_urls(&server, count), |done, total| {
            progress.lock().unwrap().push((done, total));
        })
        .await
        .assert_success();

    assert_eq!(segments.len(), count);
    for (i, segment) in segments.iter().enumerate() {
        assert_eq!(&segment[..], format!("segment-{i};").as_bytes());
    }

    let progress = progress.into_inner().unwrap();
    assert_eq!(
        progress,
        (1..=count).map(|done| (done, count)).collect::<Vec<_>>()
    );

    Ok(())
}

#[tokio::test]
async fn every_segment_is_requested_once() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let count = 13;
    for i in 0..count {
        server
            .mock_expect(&format!("/seg{i}.mp4"), &[i as u8], 1)
            .await;
    }

    let segments = fetcher(5)
        .fetch_all(&segment_urls(&server, count), |_, _| {})
        .await
        .assert_success();
    let bytes: Vec<u8> = segments.iter().flat_map(|s| s.to_vec()).collect();
    assert_eq!(bytes, (0..count as u8).collect::<Vec<_>>());

    Ok(())
}

#[tokio::test]
async fn failed_segment_fails_everything() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server
        .mock_bytes("/seg0.mp4", b"0")
        .await
        .mock_bytes("/seg1.mp4", b"1")
        .await
        .mock_status("/seg2.mp4", 500)
        .await
        .mock_bytes("/seg3.mp4", b"3")
        .await;

    let error = fetcher(2)
        .fetch_all(&segment_urls(&server, 4), |_, _| {})
        .await
        .unwrap_err();
    assert!(matches!(error, GrabError::SegmentFetchError { index: 2, .. }));
    assert_eq!(error.segment_index(), Some(2));

    Ok(())
}

#[tokio::test]
async fn segment_retry_recovers() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/seg0.mp4"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    server.mock_bytes("/seg0.mp4", b"recovered").await;

    let urls = segment_urls(&server, 1);
    let segments = fetcher(1)
        .with_retries(1)
        .fetch_all(&urls, |_, _| {})
        .await
        .assert_success();
    assert_eq!(&segments[0][..], b"recovered");

    Ok(())
}

#[tokio::test]
async fn no_retry_by_default() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/seg0.mp4"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    server.mock_bytes("/seg0.mp4", b"too late").await;

    let urls = segment_urls(&server, 1);
    fetcher(1)
        .fetch_all(&urls, |_, _| {})
        .await
        .assert_error();

    Ok(())
}

#[tokio::test]
async fn empty_input_yields_nothing() {
    let segments = fetcher(4).fetch_all(&[], |_, _| {}).await.assert_success();
    assert!(segments.is_empty());
}
