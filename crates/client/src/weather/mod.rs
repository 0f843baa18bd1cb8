//! Open-Meteo requests issued through the proxy.
//!
//! Forecast payloads are passed through as JSON; nothing here models them.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wxcache_core::{AppConfig, Error};

use crate::fetch::{ProxyRequest, ProxyResponse};
use crate::proxy::{Proxy, ResponseSource};

/// Current-condition fields requested from the forecast API.
pub const CURRENT_FIELDS: &str = "temperature_2m,weather_code,wind_speed_10m,relative_humidity_2m,surface_pressure";

/// Amsterdam, shown when no location is given.
pub const DEFAULT_LOCATION: (f64, f64) = (52.3676, 4.9041);

/// First geocoding match for a place name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Option<Vec<Place>>,
}

/// Pass-through of the forecast's `current` block.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentWeather {
    pub latitude: f64,
    pub longitude: f64,
    pub current: Value,
    pub current_units: Value,
    pub source: ResponseSource,
}

pub struct WeatherApi {
    forecast_url: Url,
    geocoding_url: Url,
}

impl WeatherApi {
    pub fn new(forecast_url: &str, geocoding_url: &str) -> Result<Self, Error> {
        let parse = |s: &str| Url::parse(s).map_err(|e| Error::InvalidUrl(format!("{s}: {e}")));
        Ok(Self { forecast_url: parse(forecast_url)?, geocoding_url: parse(geocoding_url)? })
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        Self::new(&config.forecast_url, &config.geocoding_url)
    }

    pub fn forecast_request(&self, latitude: f64, longitude: f64) -> ProxyRequest {
        let mut url = self.forecast_url.clone();
        url.query_pairs_mut()
            .append_pair("latitude", &latitude.to_string())
            .append_pair("longitude", &longitude.to_string())
            .append_pair("current", CURRENT_FIELDS)
            .append_pair("timezone", "auto");
        ProxyRequest::get(url)
    }

    pub fn geocode_request(&self, name: &str) -> ProxyRequest {
        let mut url = self.geocoding_url.clone();
        url.query_pairs_mut().append_pair("name", name).append_pair("count", "1");
        ProxyRequest::get(url)
    }

    /// Look up a place name. `None` when the API knows no match.
    pub async fn geocode(&self, proxy: &Proxy, name: &str) -> Result<Option<Place>, Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("place name cannot be empty".into()));
        }

        let intercepted = proxy.handle_fetch(&self.geocode_request(name)).await?;
        let body: GeocodeResponse = decode_json(&intercepted.response)?;
        let place = body.results.and_then(|results| results.into_iter().next());

        tracing::debug!(query = name, found = place.is_some(), "geocoded place");
        Ok(place)
    }

    /// Fetch current conditions for a coordinate.
    pub async fn current(&self, proxy: &Proxy, latitude: f64, longitude: f64) -> Result<CurrentWeather, Error> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::InvalidInput(format!("coordinates out of range: {latitude}, {longitude}")));
        }

        let intercepted = proxy.handle_fetch(&self.forecast_request(latitude, longitude)).await?;
        let mut body: Value = decode_json(&intercepted.response)?;

        let current = body.get_mut("current").map(Value::take).unwrap_or(Value::Null);
        if current.is_null() {
            return Err(Error::Decode("forecast response has no current block".into()));
        }
        let current_units = body.get_mut("current_units").map(Value::take).unwrap_or(Value::Null);

        Ok(CurrentWeather { latitude, longitude, current, current_units, source: intercepted.source })
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(response: &ProxyResponse) -> Result<T, Error> {
    if !response.is_success() {
        return Err(Error::HttpError(format!("status {} from {}", response.status.as_u16(), response.url)));
    }
    serde_json::from_slice(&response.body).map_err(|e| Error::Decode(format!("{}: {e}", response.url)))
}
