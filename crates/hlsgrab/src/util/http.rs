use std::{ops::Deref, sync::Arc};

use bytes::Bytes;
use reqwest::{Client, ClientBuilder, StatusCode, Url};
use reqwest_cookie_store::{CookieStore, CookieStoreMutex};

use crate::error::GrabResult;

/// Cookies set by a playlist response are sent along with its segment requests.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(builder: ClientBuilder) -> GrabResult<Self> {
        let cookies_store = Arc::new(CookieStoreMutex::new(CookieStore::default()));
        let client = builder.cookie_provider(cookies_store).build()?;

        Ok(Self { client })
    }

    /// GET `url` and read the whole body, treating any non-2xx status as a failure.
    pub async fn get_bytes(&self, url: Url) -> Result<Bytes, HttpFailure> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            if let Ok(body) = response.text().await {
                tracing::debug!("Error body: {body}");
            }
            return Err(HttpFailure::Status(status));
        }

        Ok(response.bytes().await?)
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        let cookies_store = Arc::new(CookieStoreMutex::new(CookieStore::default()));
        let client = Client::builder()
            .cookie_provider(cookies_store)
            .build()
            .unwrap_or_default();

        Self { client }
    }
}

impl Deref for HttpClient {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

/// Why a single GET did not produce a body.
#[derive(Debug, thiserror::Error)]
pub enum HttpFailure {
    #[error("HTTP error: {0}")]
    Status(StatusCode),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}
