//! Client side of wxcache.
//!
//! This crate provides the network fetcher, the offline cache proxy that
//! intercepts every request, and the Open-Meteo helpers that issue their
//! requests through it.

pub mod fetch;
pub mod proxy;
pub mod weather;

#[cfg(test)]
pub(crate) mod testing;

pub use fetch::{FetchConfig, Fetcher, HttpFetcher, ProxyRequest, ProxyResponse, RequestMode};
pub use proxy::{Intercepted, LifecycleState, Proxy, ProxyConfig, ResponseSource, Strategy};
pub use weather::{CurrentWeather, Place, WeatherApi};

pub use reqwest::{Method, StatusCode, Url, header};
