use std::{
    path::PathBuf,
    sync::atomic::{AtomicU8, Ordering},
};

use anyhow::bail;
use clap::Parser;
use futures::StreamExt;
use hlsgrab::{
    sink::FileSink,
    util::list::{dedup_urls, is_manifest_url, parse_url_list},
    Downloader, JobEvent,
};
use serde::Serialize;

mod options;

use options::{DownloadOptions, HttpOptions, OutputOptions};

#[derive(Parser, Clone, Debug)]
#[clap(name = "hlsgrab", version, about)]
struct HlsgrabArgs {
    #[clap(flatten)]
    http: HttpOptions,

    #[clap(flatten)]
    download: DownloadOptions,

    #[clap(flatten)]
    output: OutputOptions,

    /// Debug output
    #[clap(long, alias = "debug")]
    verbose: bool,

    /// Read manifest URLs from a file, one per line
    #[clap(short, long)]
    input: Option<PathBuf>,

    /// Manifest URLs to download
    urls: Vec<String>,
}

impl HlsgrabArgs {
    async fn urls(&self) -> anyhow::Result<Vec<String>> {
        let mut urls = self.urls.clone();
        if let Some(input) = &self.input {
            let text = tokio::fs::read_to_string(input).await?;
            urls.extend(parse_url_list(&text));
        }

        let urls = dedup_urls(urls)
            .into_iter()
            .filter(|url| {
                let is_manifest = is_manifest_url(url);
                if !is_manifest {
                    tracing::warn!("{url} is not an m3u8 playlist, skipping.");
                }
                is_manifest
            })
            .collect();
        Ok(urls)
    }
}

#[derive(Serialize)]
struct EventLine<'a> {
    url: &'a str,
    #[serde(flatten)]
    event: &'a JobEvent,
}

async fn download_one(
    downloader: &Downloader,
    sink: &FileSink,
    url: &str,
    json: bool,
) -> bool {
    let last_percent = AtomicU8::new(0);
    let on_event = |event: JobEvent| {
        if json {
            match serde_json::to_string(&EventLine { url, event: &event }) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!("Failed to serialize event: {e}"),
            }
            return;
        }

        if let JobEvent::Progress { percent } = event {
            if last_percent.fetch_max(percent, Ordering::Relaxed) < percent {
                tracing::info!("{url}: {percent}%");
            }
        }
    };

    downloader.download(url, sink, on_event).await.is_ok()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = HlsgrabArgs::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    let urls = args.urls().await?;
    if urls.is_empty() {
        bail!("No m3u8 playlist to download.");
    }

    let jobs = args.download.jobs.get() as usize;
    let json = args.output.json;
    let downloader = args.download.into_downloader(args.http.into_client()?);
    let sink = FileSink::new(args.output.output_dir);

    let total = urls.len();
    let downloads = futures::stream::iter(&urls)
        .map(|url| download_one(&downloader, &sink, url, json))
        .buffer_unordered(jobs)
        .collect::<Vec<_>>();

    let results = tokio::select! {
        results = downloads => results,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl-C received, stopping downloader.");
            std::process::exit(130);
        }
    };

    let failed = results.iter().filter(|ok| !**ok).count();
    if failed > 0 {
        bail!("{failed} of {total} downloads failed.");
    }
    tracing::info!("{total} download(s) finished.");

    Ok(())
}
