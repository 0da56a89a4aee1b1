use std::{num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use anyhow::Context;
use clap::Args;
use fake_user_agent::get_chrome_rua;
use hlsgrab::{Downloader, HttpClient};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client,
};

#[derive(Args, Clone, Debug)]
pub struct HttpOptions {
    /// Additional HTTP headers, eg. "Referer: https://example.com/"
    #[clap(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Cookies sent with every request
    #[clap(long)]
    pub cookies: Option<String>,

    /// HTTP timeout, in seconds
    #[clap(short, long, default_value = "10")]
    pub timeout: u64,
}

impl HttpOptions {
    pub fn into_client(self) -> anyhow::Result<HttpClient> {
        let mut headers = HeaderMap::new();
        if let Some(cookies) = &self.cookies {
            headers.insert(
                reqwest::header::COOKIE,
                HeaderValue::from_str(cookies).context("Invalid cookie")?,
            );
        }

        // headers override --cookies
        for header in &self.headers {
            let (key, value) = header
                .split_once(':')
                .with_context(|| format!("Invalid header: {header}"))?;
            headers.insert(
                HeaderName::from_str(key.trim()).context("Invalid header name")?,
                HeaderValue::from_str(value.trim()).context("Invalid header value")?,
            );
        }

        let builder = Client::builder()
            .default_headers(headers)
            .user_agent(get_chrome_rua())
            .timeout(Duration::from_secs(self.timeout));
        Ok(HttpClient::new(builder)?)
    }
}

#[derive(Args, Clone, Debug)]
pub struct DownloadOptions {
    /// Concurrent segment downloads per job
    #[clap(long, alias = "threads", default_value = "4")]
    pub concurrency: NonZeroU32,

    /// Segment retry limit. Failing segments abort the job by default
    #[clap(long, default_value = "0")]
    pub segment_retries: u32,

    /// Jobs to run at the same time
    #[clap(short, long, default_value = "1")]
    pub jobs: NonZeroU32,
}

impl DownloadOptions {
    pub fn into_downloader(self, client: HttpClient) -> Downloader {
        Downloader::builder()
            .client(client)
            .concurrency(self.concurrency)
            .segment_retries(self.segment_retries)
            .build()
    }
}

#[derive(Args, Clone, Debug)]
pub struct OutputOptions {
    /// Directory to write downloaded videos to
    #[clap(short, long, env = "HLSGRAB_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Print job events to stdout as JSON lines
    #[clap(long)]
    pub json: bool,
}
