use std::{
    num::NonZeroU32,
    sync::{
        atomic::{AtomicUsize, Ordering},
        OnceLock,
    },
};

use bytes::Bytes;
use reqwest::Url;

use crate::{
    error::{GrabError, GrabResult},
    util::{http::HttpFailure, HttpClient},
};

pub const DEFAULT_CONCURRENCY: NonZeroU32 = match NonZeroU32::new(4) {
    Some(concurrency) => concurrency,
    None => unreachable!(),
};

/// Downloads an ordered list of fragments with a fixed pool of workers.
///
/// Workers claim indices from a shared cursor and write each result into the
/// slot of that index, so the output order always equals the input order.
pub struct SegmentFetcher {
    client: HttpClient,
    concurrency: NonZeroU32,
    retries: u32,
}

/// State shared by the workers of one [SegmentFetcher::fetch_all] call.
struct FetchState<'a> {
    urls: &'a [Url],
    cursor: AtomicUsize,
    done: AtomicUsize,
    slots: Vec<OnceLock<Bytes>>,
}

impl SegmentFetcher {
    pub fn new(client: HttpClient, concurrency: NonZeroU32) -> Self {
        Self {
            client,
            concurrency,
            retries: 0,
        }
    }

    /// Extra attempts per segment after its first failure. Defaults to 0.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Fetches all `urls`, reporting `(done, total)` after every completed segment.
    ///
    /// The first segment that can not be fetched fails the whole call and the
    /// remaining workers are dropped.
    pub async fn fetch_all<F>(&self, urls: &[Url], on_progress: F) -> GrabResult<Vec<Bytes>>
    where
        F: Fn(usize, usize) + Sync,
    {
        let total = urls.len();
        let state = FetchState {
            urls,
            cursor: AtomicUsize::new(0),
            done: AtomicUsize::new(0),
            slots: (0..total).map(|_| OnceLock::new()).collect(),
        };

        let workers = (self.concurrency.get() as usize).min(total);
        tracing::info!("Start downloading {total} segments with {workers} worker(s).");

        futures::future::try_join_all(
            (0..workers).map(|_| self.run_worker(&state, &on_progress)),
        )
        .await?;

        state
            .slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.into_inner().ok_or(GrabError::SegmentMissing(index)))
            .collect()
    }

    async fn run_worker<F>(&self, state: &FetchState<'_>, on_progress: &F) -> GrabResult<()>
    where
        F: Fn(usize, usize) + Sync,
    {
        let total = state.urls.len();
        loop {
            let index = state.cursor.fetch_add(1, Ordering::Relaxed);
            if index >= total {
                return Ok(());
            }

            let bytes = self.fetch_segment(index, &state.urls[index]).await?;
            // the cursor hands out every index exactly once
            let written = state.slots[index].set(bytes).is_ok();
            debug_assert!(written, "segment #{index} written twice");

            let done = state.done.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::info!(
                "Processing segment #{index} finished. ({done} / {total} or {percentage:.2}%)",
                percentage = done as f32 / total as f32 * 100.
            );
            on_progress(done, total);
        }
    }

    /// Fetches the initialization fragment with the same retry policy as segments.
    pub async fn fetch_init(&self, url: &Url) -> GrabResult<Bytes> {
        self.fetch_with_retry("init segment", url)
            .await
            .map_err(|e| GrabError::InitSegmentFetchError {
                reason: e.to_string(),
            })
    }

    async fn fetch_segment(&self, index: usize, url: &Url) -> GrabResult<Bytes> {
        self.fetch_with_retry(&format!("segment #{index}"), url)
            .await
            .map_err(|e| GrabError::SegmentFetchError {
                index,
                reason: e.to_string(),
            })
    }

    async fn fetch_with_retry(&self, name: &str, url: &Url) -> Result<Bytes, HttpFailure> {
        let mut retries = self.retries;
        loop {
            match self.client.get_bytes(url.clone()).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if retries > 0 => {
                    retries -= 1;
                    tracing::warn!("Processing {name} failed, retry later. {e}");
                }
                Err(e) => {
                    tracing::error!("Processing {name} failed. {e}");
                    return Err(e);
                }
            }
        }
    }
}
