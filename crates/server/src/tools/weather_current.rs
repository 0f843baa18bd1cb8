//! weather_current tool implementation.
//!
//! Resolves a location, then reads current conditions through the proxy so the
//! API requests follow the same network-first path the app uses.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use wxcache_client::weather::DEFAULT_LOCATION;
use wxcache_client::{CurrentWeather, Place, Proxy, WeatherApi};
use wxcache_core::Error;

use crate::tools::json_result;

/// Input parameters for weather_current tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WeatherCurrentParams {
    /// Place name to geocode. Takes precedence over coordinates.
    #[serde(default)]
    pub place: Option<String>,

    #[serde(default)]
    pub latitude: Option<f64>,

    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Output structure for weather_current tool.
#[derive(Debug, Clone, Serialize)]
pub struct WeatherCurrentOutput {
    /// Geocoding match, when a place name was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<Place>,
    pub weather: CurrentWeather,
}

/// Implementation of the weather_current tool.
pub async fn weather_impl(
    proxy: &Proxy, api: &WeatherApi, params: WeatherCurrentParams,
) -> Result<CallToolResult, McpError> {
    let (place, latitude, longitude) = match params.place.as_deref() {
        Some(name) => {
            let place = api
                .geocode(proxy, name)
                .await?
                .ok_or_else(|| Error::InvalidInput(format!("no location found for '{}'", name.trim())))?;
            let (lat, lon) = (place.latitude, place.longitude);
            (Some(place), lat, lon)
        }
        None => match (params.latitude, params.longitude) {
            (Some(lat), Some(lon)) => (None, lat, lon),
            (None, None) => (None, DEFAULT_LOCATION.0, DEFAULT_LOCATION.1),
            _ => return Err(Error::InvalidInput("latitude and longitude must be given together".into()).into()),
        },
    };

    let weather = api.current(proxy, latitude, longitude).await?;
    tracing::info!(latitude, longitude, source = %weather.source, "current weather");

    json_result(&WeatherCurrentOutput { place, weather })
}
