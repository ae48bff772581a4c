use anyhow::{Context, Result};
use reqwest::{Client, Response};
use tracing::debug;

use crate::error::FetchError;

const USER_AGENT: &str = concat!("einbuergerung_scraper/", env!("CARGO_PKG_VERSION"));

/// Where pages, sitemaps and spreadsheets come from.
pub trait Fetch {
    async fn text(&self, url: &str) -> Result<String, FetchError>;
    async fn bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Plain HTTP GET.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    /// Shared connection pool, reused by the enrichment services.
    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn get(&self, url: &str) -> Result<Response, FetchError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

impl Fetch for Fetcher {
    async fn text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.get(url).await?;
        response.text().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })
    }

    async fn bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.get(url).await?;
        let body = response.bytes().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::Fetch;
    use crate::error::FetchError;

    /// In-memory site: known URLs answer with their body, anything else 404s.
    #[derive(Default)]
    pub struct FakeSite {
        bodies: HashMap<String, Vec<u8>>,
        pub requests: RefCell<Vec<String>>,
    }

    impl FakeSite {
        pub fn with_page(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
            self.bodies.insert(url.to_string(), body.into());
            self
        }

        fn lookup(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.requests.borrow_mut().push(url.to_string());
            self.bodies.get(url).cloned().ok_or(FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    impl Fetch for FakeSite {
        async fn text(&self, url: &str) -> Result<String, FetchError> {
            Ok(String::from_utf8_lossy(&self.lookup(url)?).into_owned())
        }

        async fn bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.lookup(url)
        }
    }
}
