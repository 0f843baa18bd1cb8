//! The three fetch strategies.

use wxcache_core::Error;

use super::{Intercepted, Proxy, Strategy};
use crate::fetch::{ProxyRequest, ProxyResponse};

impl Proxy {
    /// Live fetch; on rejection fall back to the cache. Never writes.
    pub(crate) async fn api_network_first(&self, request: &ProxyRequest) -> Result<Intercepted, Error> {
        match self.fetcher.fetch(request).await {
            Ok(response) => Ok(Intercepted::network(response, Strategy::ApiNetworkFirst)),
            Err(err) => self.fall_back_to_cache(request, Strategy::ApiNetworkFirst, err).await,
        }
    }

    /// Live fetch with a background copy into the cache; on rejection fall back to the cache.
    ///
    /// Every response that arrives is copied, whatever its status.
    pub(crate) async fn navigation_network_first(&self, request: &ProxyRequest) -> Result<Intercepted, Error> {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.cache_in_background(request, &response);
                Ok(Intercepted::network(response, Strategy::NavigationNetworkFirst))
            }
            Err(err) => self.fall_back_to_cache(request, Strategy::NavigationNetworkFirst, err).await,
        }
    }

    /// Cached entry if present; otherwise a live fetch whose 2xx copy goes into the cache.
    pub(crate) async fn asset_cache_first(&self, request: &ProxyRequest) -> Result<Intercepted, Error> {
        match self.match_cached(request).await {
            Ok(Some(cached)) => return Ok(Intercepted::cache(cached, Strategy::AssetCacheFirst)),
            Ok(None) => {}
            Err(e) => tracing::warn!(url = %request.url, error = %e, "cache lookup failed, fetching"),
        }

        let response = self.fetcher.fetch(request).await?;
        if response.is_success() {
            self.cache_in_background(request, &response);
        } else {
            tracing::debug!(url = %request.url, status = response.status.as_u16(), "not caching error response");
        }
        Ok(Intercepted::network(response, Strategy::AssetCacheFirst))
    }

    async fn match_cached(&self, request: &ProxyRequest) -> Result<Option<ProxyResponse>, Error> {
        match self.current_store().match_request(&request.key()).await? {
            Some(record) => Ok(Some(ProxyResponse::from_record(record)?)),
            None => Ok(None),
        }
    }

    /// Serve the cached entry or re-raise the original failure.
    async fn fall_back_to_cache(
        &self, request: &ProxyRequest, strategy: Strategy, err: Error,
    ) -> Result<Intercepted, Error> {
        tracing::debug!(url = %request.url, error = %err, %strategy, "network failed, trying cache");

        match self.match_cached(request).await {
            Ok(Some(cached)) => Ok(Intercepted::cache(cached, strategy)),
            Ok(None) => Err(err),
            Err(lookup) => {
                tracing::warn!(url = %request.url, error = %lookup, "cache lookup failed");
                Err(err)
            }
        }
    }

    /// Write a copy of the response without making the caller wait for it.
    fn cache_in_background(&self, request: &ProxyRequest, response: &ProxyResponse) {
        let key = request.key();
        if !key.is_cacheable() {
            tracing::debug!(%key, "skipping cache write for non-GET request");
            return;
        }

        let record = response.to_record();
        let storage = self.storage.clone();
        let name = self.config.cache_name.clone();

        self.writes.spawn(async move {
            let written: Result<(), Error> = async { storage.open_store(&name).await?.put(&key, &record).await }.await;

            match written {
                Ok(()) => tracing::trace!(%key, store = %name, "cached response"),
                Err(e) => tracing::warn!(%key, store = %name, error = %e, "background cache write failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::{StatusCode, Url};
    use wxcache_core::{AppConfig, RequestKey};

    use crate::fetch::ProxyRequest;
    use crate::proxy::{Proxy, ResponseSource, Strategy};
    use crate::testing::{ORIGIN, StubFetcher, app_config, proxy_with};

    /// Active proxy over an empty manifest, so the store starts empty.
    async fn empty_proxy(fetcher: Arc<StubFetcher>) -> Proxy {
        let config = AppConfig { assets: Vec::new(), ..app_config("v2") };
        let proxy = proxy_with(fetcher, &config).await;
        proxy.register().await.unwrap();
        proxy
    }

    fn at(path: &str) -> Url {
        Url::parse(ORIGIN).unwrap().join(path).unwrap()
    }

    #[tokio::test]
    async fn test_asset_hit_makes_no_network_call() {
        let fetcher = Arc::new(StubFetcher::default());
        let proxy = empty_proxy(fetcher.clone()).await;
        fetcher.respond(at("app.js").as_str(), 200, "text/javascript", "init()");
        let request = ProxyRequest::get(at("app.js"));

        proxy.handle_fetch(&request).await.unwrap();
        proxy.flush().await;
        let first = fetcher.calls();

        let again = proxy.handle_fetch(&request).await.unwrap();
        let third = proxy.handle_fetch(&request).await.unwrap();

        assert_eq!(fetcher.calls(), first);
        assert_eq!(again.source, ResponseSource::Cache);
        assert_eq!(third.response.body.as_ref(), b"init()");
    }

    #[tokio::test]
    async fn test_asset_miss_offline_propagates_failure() {
        let fetcher = Arc::new(StubFetcher::default());
        let proxy = empty_proxy(fetcher.clone()).await;
        fetcher.set_offline(true);

        let result = proxy.handle_fetch(&ProxyRequest::get(at("icon-192.png"))).await;

        assert!(matches!(result, Err(wxcache_core::Error::Network(_))));
    }

    #[tokio::test]
    async fn test_navigation_writes_copy_and_serves_it_offline() {
        let fetcher = Arc::new(StubFetcher::default());
        let proxy = empty_proxy(fetcher.clone()).await;
        fetcher.respond(at("index.html").as_str(), 200, "text/html", "<h1>Weer</h1>");
        let request = ProxyRequest::get(at("index.html"));

        let live = proxy.handle_fetch(&request).await.unwrap();
        assert_eq!(live.strategy, Some(Strategy::NavigationNetworkFirst));
        assert_eq!(live.source, ResponseSource::Network);
        proxy.flush().await;

        let stored = proxy.current_store().match_request(&request.key()).await.unwrap().unwrap();
        assert_eq!(stored.status, 200);
        assert_eq!(stored.body, live.response.body);

        fetcher.set_offline(true);
        let offline = proxy.handle_fetch(&request).await.unwrap();
        assert_eq!(offline.source, ResponseSource::Cache);
        assert_eq!(offline.response.status, StatusCode::OK);
        assert_eq!(offline.response.body, live.response.body);
    }

    #[tokio::test]
    async fn test_navigation_prefers_network_over_cache() {
        let fetcher = Arc::new(StubFetcher::default());
        let proxy = empty_proxy(fetcher.clone()).await;
        let page = at("forecast.html");
        fetcher.respond(page.as_str(), 200, "text/html", "old");
        proxy.handle_fetch(&ProxyRequest::navigate(page.clone())).await.unwrap();
        proxy.flush().await;

        fetcher.respond(page.as_str(), 200, "text/html", "new");
        let result = proxy.handle_fetch(&ProxyRequest::navigate(page.clone())).await.unwrap();
        proxy.flush().await;

        assert_eq!(result.response.body.as_ref(), b"new");
        let stored = proxy.current_store().match_request(&RequestKey::get(page.as_str())).await.unwrap().unwrap();
        assert_eq!(stored.body.as_ref(), b"new");
    }

    #[tokio::test]
    async fn test_navigation_caches_error_status_too() {
        let fetcher = Arc::new(StubFetcher::default());
        let proxy = empty_proxy(fetcher.clone()).await;
        let page = at("gone.html");

        let result = proxy.handle_fetch(&ProxyRequest::navigate(page.clone())).await.unwrap();
        proxy.flush().await;

        assert_eq!(result.response.status, StatusCode::NOT_FOUND);
        let stored = proxy.current_store().match_request(&RequestKey::get(page.as_str())).await.unwrap();
        assert_eq!(stored.map(|r| r.status), Some(404));
    }

    #[tokio::test]
    async fn test_navigation_offline_without_entry_fails() {
        let fetcher = Arc::new(StubFetcher::default());
        let proxy = empty_proxy(fetcher.clone()).await;
        fetcher.set_offline(true);

        let result = proxy.handle_fetch(&ProxyRequest::navigate(at("about.html"))).await;

        assert!(matches!(result, Err(wxcache_core::Error::Network(_))));
    }

    #[tokio::test]
    async fn test_write_after_store_deleted_recreates_store() {
        let fetcher = Arc::new(StubFetcher::default());
        let proxy = empty_proxy(fetcher.clone()).await;
        proxy.storage().delete_store(proxy.cache_name()).await.unwrap();
        fetcher.respond(at("styles.css").as_str(), 200, "text/css", "a{}");

        proxy.handle_fetch(&ProxyRequest::get(at("styles.css"))).await.unwrap();
        proxy.flush().await;

        assert!(proxy.storage().has_store("weather-pwa-v2").await.unwrap());
        assert_eq!(proxy.current_store().keys().await.unwrap().len(), 1);
    }
}
