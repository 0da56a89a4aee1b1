use std::{
    num::NonZeroU32,
    sync::atomic::{AtomicUsize, Ordering},
};

use bytes::Bytes;
use reqwest::Url;
use serde::Serialize;

use crate::{
    error::{ErrorKind, GrabError, GrabResult},
    fetch::{SegmentFetcher, DEFAULT_CONCURRENCY},
    hls::{MediaPlaylist, PlaylistResolver},
    merge::{assemble, derive_file_name},
    sink::MediaSink,
    util::HttpClient,
};

/// Progress waypoints, in percent.
pub mod progress {
    pub const RESOLVE_START: u8 = 2;
    pub const FETCH_START: u8 = 5;
    pub const FETCH_END: u8 = 80;
    pub const ASSEMBLE_START: u8 = 90;
    pub const COMPLETE: u8 = 100;

    /// Maps `done / total` segments linearly onto `FETCH_START..=FETCH_END`.
    pub fn fetching(done: usize, total: usize) -> u8 {
        if total == 0 {
            return FETCH_END;
        }
        let span = (FETCH_END - FETCH_START) as usize;
        FETCH_START + (span * done.min(total) / total) as u8
    }
}

/// Why a job ended in [JobState::Failed].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&GrabError> for JobFailure {
    fn from(error: &GrabError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    ResolvingPlaylist,
    FetchingSegments,
    Assembling,
    Complete,
    Failed(JobFailure),
}

/// [JobState] without the failure payload. Ordered along the job lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    ResolvingPlaylist,
    FetchingSegments,
    Assembling,
    Complete,
    Failed,
}

impl JobState {
    pub fn status(&self) -> JobStatus {
        match self {
            JobState::Pending => JobStatus::Pending,
            JobState::ResolvingPlaylist => JobStatus::ResolvingPlaylist,
            JobState::FetchingSegments => JobStatus::FetchingSegments,
            JobState::Assembling => JobStatus::Assembling,
            JobState::Complete => JobStatus::Complete,
            JobState::Failed(_) => JobStatus::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Complete | JobState::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    State { status: JobStatus },
    Progress { percent: u8 },
    Failed(JobFailure),
}

/// What the sink received for a completed job.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub file_name: String,
    pub data: Bytes,
}

/// Shared configuration for the jobs it starts.
pub struct Downloader {
    client: HttpClient,
    concurrency: NonZeroU32,
    segment_retries: u32,
}

impl Downloader {
    pub fn new(client: HttpClient) -> Self {
        Self::builder().client(client).build()
    }

    pub fn builder() -> DownloaderBuilder {
        DownloaderBuilder::new()
    }

    /// Runs one job for `manifest` to completion.
    pub async fn download<S, F>(
        &self,
        manifest: &str,
        sink: &S,
        on_event: F,
    ) -> GrabResult<JobOutcome>
    where
        S: MediaSink,
        F: Fn(JobEvent) + Sync,
    {
        let mut job = DownloadJob::new(manifest.parse()?);
        job.run(self, sink, on_event).await
    }

    fn fetcher(&self) -> SegmentFetcher {
        SegmentFetcher::new(self.client.clone(), self.concurrency)
            .with_retries(self.segment_retries)
    }
}

pub struct DownloaderBuilder {
    client: Option<HttpClient>,
    concurrency: NonZeroU32,
    segment_retries: u32,
}

impl DownloaderBuilder {
    pub fn new() -> Self {
        Self {
            client: None,
            concurrency: DEFAULT_CONCURRENCY,
            segment_retries: 0,
        }
    }

    pub fn client(mut self, client: HttpClient) -> Self {
        self.client = Some(client);
        self
    }

    pub fn concurrency(mut self, concurrency: NonZeroU32) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn segment_retries(mut self, retries: u32) -> Self {
        self.segment_retries = retries;
        self
    }

    pub fn build(self) -> Downloader {
        Downloader {
            client: self.client.unwrap_or_default(),
            concurrency: self.concurrency,
            segment_retries: self.segment_retries,
        }
    }
}

impl Default for DownloaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One end-to-end download of a manifest.
///
/// ```text
/// Pending -> ResolvingPlaylist -> FetchingSegments -> Assembling -> Complete
///                   \                   \                  \
///                    +-------------------+------------------+--> Failed
/// ```
///
/// States only move forward. The sink is handed data only after assembly succeeded.
pub struct DownloadJob {
    manifest: Url,
    state: JobState,
    playlist: Option<MediaPlaylist>,
    segments: Vec<Bytes>,
    completed: AtomicUsize,
}

impl DownloadJob {
    pub fn new(manifest: Url) -> Self {
        Self {
            manifest,
            state: JobState::Pending,
            playlist: None,
            segments: Vec::new(),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn manifest(&self) -> &Url {
        &self.manifest
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn playlist(&self) -> Option<&MediaPlaylist> {
        self.playlist.as_ref()
    }

    /// Fragment data in playlist order.
    ///
    /// Empty until every segment has been fetched, then one entry per
    /// [MediaPlaylist::segments] URL. A failed fetch leaves it empty.
    pub fn segments(&self) -> &[Bytes] {
        &self.segments
    }

    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failure(&self) -> Option<&JobFailure> {
        match &self.state {
            JobState::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Drives the job through all of its states, reporting each transition and
    /// progress change to `on_event`.
    pub async fn run<S, F>(
        &mut self,
        downloader: &Downloader,
        sink: &S,
        on_event: F,
    ) -> GrabResult<JobOutcome>
    where
        S: MediaSink,
        F: Fn(JobEvent) + Sync,
    {
        if self.state != JobState::Pending {
            return Err(GrabError::JobAlreadyStarted);
        }

        match self.execute(downloader, sink, &on_event).await {
            Ok(outcome) => {
                advance(&mut self.state, JobState::Complete, &on_event);
                on_event(JobEvent::Progress {
                    percent: progress::COMPLETE,
                });
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!("Download of {} failed: {e}", self.manifest);
                let failure = JobFailure::from(&e);
                advance(&mut self.state, JobState::Failed(failure.clone()), &on_event);
                on_event(JobEvent::Failed(failure));
                Err(e)
            }
        }
    }

    async fn execute<S, F>(
        &mut self,
        downloader: &Downloader,
        sink: &S,
        on_event: &F,
    ) -> GrabResult<JobOutcome>
    where
        S: MediaSink,
        F: Fn(JobEvent) + Sync,
    {
        advance(&mut self.state, JobState::ResolvingPlaylist, on_event);
        on_event(JobEvent::Progress {
            percent: progress::RESOLVE_START,
        });
        let resolver = PlaylistResolver::new(downloader.client.clone());
        let resolved = resolver.resolve(&self.manifest).await?;
        let playlist = &*self.playlist.insert(resolved);

        advance(&mut self.state, JobState::FetchingSegments, on_event);
        on_event(JobEvent::Progress {
            percent: progress::FETCH_START,
        });
        let fetcher = downloader.fetcher();
        let init = fetcher.fetch_init(&playlist.init_segment).await?;
        let completed = &self.completed;
        self.segments = fetcher
            .fetch_all(&playlist.segments, |done, total| {
                completed.fetch_max(done, Ordering::Relaxed);
                on_event(JobEvent::Progress {
                    percent: progress::fetching(done, total),
                });
            })
            .await?;

        advance(&mut self.state, JobState::Assembling, on_event);
        on_event(JobEvent::Progress {
            percent: progress::ASSEMBLE_START,
        });
        let data = assemble(&init, &self.segments);
        let file_name = derive_file_name(&playlist.url);
        tracing::info!("Assembled {} bytes into {file_name}.", data.len());
        sink.write(&file_name, data.clone()).await?;

        Ok(JobOutcome { file_name, data })
    }
}

/// Moves `state` forward to `next` and announces it.
fn advance<F>(state: &mut JobState, next: JobState, on_event: &F)
where
    F: Fn(JobEvent),
{
    debug_assert!(
        !state.is_terminal() && next.status() > state.status(),
        "invalid transition {:?} -> {:?}",
        state.status(),
        next.status()
    );
    tracing::debug!("Job state: {:?} -> {:?}", state.status(), next.status());
    let status = next.status();
    *state = next;
    on_event(JobEvent::State { status });
}
