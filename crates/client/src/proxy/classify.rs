//! Request classification: which strategy handles a request.

use serde::Serialize;

use crate::fetch::ProxyRequest;

/// The fetch/cache procedure assigned to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Live fetch, cache only as a fallback; never written.
    ApiNetworkFirst,
    /// Live fetch, copy written to the cache; cache as a fallback.
    NavigationNetworkFirst,
    /// Cache first; live fetch on a miss, 2xx copies written.
    AssetCacheFirst,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Strategy::ApiNetworkFirst => "api_network_first",
            Strategy::NavigationNetworkFirst => "navigation_network_first",
            Strategy::AssetCacheFirst => "asset_cache_first",
        };
        f.write_str(name)
    }
}

/// True when `host` is one of `api_hosts` or a subdomain of one.
pub fn is_api_host(host: &str, api_hosts: &[String]) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    api_hosts.iter().any(|api| {
        let api = api.trim().trim_end_matches('.').to_ascii_lowercase();
        !api.is_empty() && (host == api || host.strip_suffix(&api).is_some_and(|sub| sub.ends_with('.')))
    })
}

/// Pick the strategy for a request. Rules apply in priority order:
///
/// 1. API host → [`Strategy::ApiNetworkFirst`]
/// 2. navigation, or a path ending in `.html` → [`Strategy::NavigationNetworkFirst`]
/// 3. anything else → [`Strategy::AssetCacheFirst`]
pub fn classify(request: &ProxyRequest, api_hosts: &[String]) -> Strategy {
    if request.url.host_str().is_some_and(|host| is_api_host(host, api_hosts)) {
        Strategy::ApiNetworkFirst
    } else if request.is_navigation() || request.url.path().ends_with(".html") {
        Strategy::NavigationNetworkFirst
    } else {
        Strategy::AssetCacheFirst
    }
}
