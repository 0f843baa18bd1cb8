//! Asset manifest: the URLs a version needs cached before it is installed.

use std::sync::Arc;

use reqwest::Url;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use wxcache_core::{Error, RequestKey, ResponseRecord};

use crate::fetch::{Fetcher, ProxyRequest, resolve};

/// Ordered, resolved manifest URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetManifest {
    urls: Vec<Url>,
}

impl AssetManifest {
    /// Resolve manifest entries against the app origin.
    pub fn resolve(origin: &Url, entries: &[String]) -> Result<Self, Error> {
        let urls = entries
            .iter()
            .map(|entry| resolve(origin, entry).map_err(|e| Error::InvalidUrl(format!("asset {entry}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { urls })
    }

    pub fn urls(&self) -> &[Url] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Fetch every asset, at most `concurrency` at a time.
    ///
    /// All-or-nothing: the first rejected fetch or non-2xx response aborts
    /// the remaining fetches and fails the whole call. On success the entries
    /// come back in manifest order.
    pub async fn fetch_all(
        &self, fetcher: Arc<dyn Fetcher>, concurrency: usize,
    ) -> Result<Vec<(RequestKey, ResponseRecord)>, Error> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut join_set = JoinSet::new();

        for (index, url) in self.urls.iter().cloned().enumerate() {
            let semaphore = semaphore.clone();
            let fetcher = fetcher.clone();

            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::InstallFailed { url: url.to_string(), reason: e.to_string() })?;

                let request = ProxyRequest::get(url.clone());
                let response = fetcher
                    .fetch(&request)
                    .await
                    .map_err(|e| Error::InstallFailed { url: url.to_string(), reason: e.to_string() })?;

                if !response.is_success() {
                    return Err(Error::InstallFailed {
                        url: url.to_string(),
                        reason: format!("status {}", response.status.as_u16()),
                    });
                }

                Ok::<_, Error>((index, request.key(), response.to_record()))
            });
        }

        let mut fetched: Vec<Option<(RequestKey, ResponseRecord)>> = vec![None; self.urls.len()];

        while let Some(joined) = join_set.join_next().await {
            let outcome = joined.map_err(|e| Error::InstallFailed { url: "<task>".into(), reason: e.to_string() })?;

            match outcome {
                Ok((index, key, record)) => fetched[index] = Some((key, record)),
                Err(e) => {
                    join_set.shutdown().await;
                    return Err(e);
                }
            }
        }

        Ok(fetched.into_iter().flatten().collect())
    }
}
