use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use reqwest::{Client, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Duration;

use crate::error::ApiError;
use crate::limiter::RateLimiter;
use crate::model::{
    Alert, AlertFilter, AlertReport, CurrentConditions, ForecastPeriod, ForecastReport,
    HourlyPeriod, RelativeLocation, Station,
};

const BASE_URL: &str = "https://api.weather.gov";
const USER_AGENT: &str = "(nws-mcp, nws-mcp@fastmail.com)";
const GEO_JSON: &str = "application/geo+json";

/// Minimum spacing between requests to `api.weather.gov`.
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(500);

/// Hourly output is capped at one day of periods.
const HOURLY_PERIOD_CAP: usize = 24;

/// Station output is capped at the first ten results.
const STATION_CAP: usize = 10;

const MPS_TO_MPH: f64 = 0.621371;

/// Client for the api.weather.gov REST API.
///
/// All endpoint lookups go through a shared [`RateLimiter`]; link-following
/// fetches of URLs returned inside point metadata bypass it and send only
/// the `User-Agent` header, matching the request pattern the API has been
/// served with so far.
#[derive(Debug)]
pub struct NwsClient {
    http: Client,
    limiter: RateLimiter,
}

impl Default for NwsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl NwsClient {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
            limiter: RateLimiter::new(MIN_REQUEST_INTERVAL),
        }
    }

    /// Rate-limited GET of an API endpoint path.
    async fn get_endpoint<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.limiter.acquire().await;
        tracing::debug!(%path, "GET weather.gov");

        let res = self
            .http
            .get(format!("{BASE_URL}{path}"))
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, GEO_JSON)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to send request to weather.gov: {path}"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read weather.gov response body: {path}"))?;

        if !status.is_success() {
            return Err(ApiError::Status { status, body: truncate_body(&body) }.into());
        }

        serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse weather.gov JSON: {path}"))
    }

    /// Unguarded GET of an absolute URL returned inside a prior response.
    async fn get_linked<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        tracing::debug!(%url, "GET linked resource");

        let res = self
            .http
            .get(url)
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .with_context(|| format!("Failed to fetch linked resource: {url}"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read linked resource body: {url}"))?;

        if !status.is_success() {
            return Err(ApiError::Status { status, body: truncate_body(&body) }.into());
        }

        serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse linked resource JSON: {url}"))
    }

    async fn point(&self, latitude: f64, longitude: f64) -> Result<PointProperties> {
        let point: Point = self
            .get_endpoint(&format!("/points/{latitude},{longitude}"), &[])
            .await?;

        Ok(point.properties.unwrap_or_default())
    }

    /// 7-day forecast for a coordinate, all periods.
    pub async fn forecast(&self, latitude: f64, longitude: f64) -> Result<ForecastReport> {
        let props = self.point(latitude, longitude).await?;
        let url = require_link(props.forecast, "No forecast available for this location")?;

        let forecast: ForecastResponse = self.get_linked(&url).await?;
        let periods = forecast
            .properties
            .and_then(|p| p.periods)
            .map(|periods| periods.into_iter().map(project_period).collect());

        Ok(ForecastReport {
            location: props.relative_location.and_then(|l| l.properties),
            periods,
        })
    }

    /// Hourly forecast for a coordinate, first 24 periods.
    pub async fn hourly_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<Vec<HourlyPeriod>>> {
        let props = self.point(latitude, longitude).await?;
        let url = require_link(props.forecast_hourly, "No hourly forecast")?;

        let forecast: ForecastResponse = self.get_linked(&url).await?;
        let periods = forecast
            .properties
            .and_then(|p| p.periods)
            .map(|periods| {
                periods
                    .into_iter()
                    .take(HOURLY_PERIOD_CAP)
                    .map(project_hourly_period)
                    .collect()
            });

        Ok(periods)
    }

    /// Active alerts matching the filter.
    pub async fn active_alerts(&self, filter: &AlertFilter) -> Result<AlertReport> {
        let collection: AlertCollection = self
            .get_endpoint("/alerts", &filter.query_params())
            .await?;

        let alerts: Option<Vec<Alert>> = collection
            .features
            .map(|features| features.into_iter().map(project_alert).collect());

        Ok(AlertReport {
            count: alerts.as_ref().map(Vec::len),
            alerts,
        })
    }

    /// Observation stations for a coordinate, first 10 in upstream order.
    pub async fn stations(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<Vec<Station>>> {
        let props = self.point(latitude, longitude).await?;
        let url = require_link(props.observation_stations, "No stations found")?;

        let collection: StationCollection = self.get_linked(&url).await?;
        let stations = collection.features.map(|features| {
            features
                .into_iter()
                .take(STATION_CAP)
                .map(project_station)
                .collect()
        });

        Ok(stations)
    }

    /// Latest observation for a station, with display conversions applied.
    pub async fn current_conditions(&self, station_id: &str) -> Result<CurrentConditions> {
        let observation: Observation = self
            .get_endpoint(&format!("/stations/{station_id}/observations/latest"), &[])
            .await?;

        let props = observation.properties.unwrap_or_default();

        Ok(CurrentConditions {
            station: station_id.to_string(),
            timestamp: props.timestamp,
            temperature: measured(props.temperature).map(format_temperature),
            humidity: measured(props.relative_humidity)
                .map(|pct| format!("{}%", pct.round() as i64)),
            wind_speed: measured(props.wind_speed)
                .map(|mps| format!("{} mph", (mps * MPS_TO_MPH).round() as i64)),
            wind_direction: measured(props.wind_direction),
            description: props.text_description,
            visibility: measured(props.visibility),
            barometric_pressure: measured(props.barometric_pressure),
        })
    }
}

// Upstream response shapes. Every field is optional: the API documents most
// of them as nullable and omits others entirely depending on the grid.

#[derive(Debug, Deserialize)]
struct Point {
    properties: Option<PointProperties>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PointProperties {
    forecast: Option<String>,
    forecast_hourly: Option<String>,
    observation_stations: Option<String>,
    relative_location: Option<RelativeLocationFeature>,
}

#[derive(Debug, Deserialize)]
struct RelativeLocationFeature {
    properties: Option<RelativeLocation>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    properties: Option<ForecastProperties>,
}

#[derive(Debug, Deserialize)]
struct ForecastProperties {
    periods: Option<Vec<RawPeriod>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPeriod {
    name: Option<String>,
    start_time: Option<DateTime<FixedOffset>>,
    temperature: Option<Value>,
    temperature_unit: Option<String>,
    wind_speed: Option<String>,
    wind_direction: Option<String>,
    short_forecast: Option<String>,
    detailed_forecast: Option<String>,
    probability_of_precipitation: Option<Measured<Value>>,
}

/// A `{ unitCode, value }` wrapper; only `value` is projected.
#[derive(Debug, Deserialize)]
struct Measured<T> {
    value: Option<T>,
}

#[derive(Debug, Deserialize)]
struct AlertCollection {
    features: Option<Vec<AlertFeature>>,
}

#[derive(Debug, Deserialize)]
struct AlertFeature {
    properties: Option<RawAlert>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAlert {
    headline: Option<String>,
    severity: Option<String>,
    event: Option<String>,
    description: Option<String>,
    onset: Option<DateTime<FixedOffset>>,
    expires: Option<DateTime<FixedOffset>>,
    area_desc: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StationCollection {
    features: Option<Vec<StationFeature>>,
}

#[derive(Debug, Deserialize)]
struct StationFeature {
    properties: Option<RawStation>,
    geometry: Option<Geometry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStation {
    station_identifier: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    properties: Option<ObservationProperties>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObservationProperties {
    timestamp: Option<DateTime<FixedOffset>>,
    text_description: Option<String>,
    temperature: Option<Measured<f64>>,
    relative_humidity: Option<Measured<f64>>,
    wind_speed: Option<Measured<f64>>,
    wind_direction: Option<Measured<f64>>,
    barometric_pressure: Option<Measured<f64>>,
    visibility: Option<Measured<f64>>,
}

fn require_link(link: Option<String>, missing: &'static str) -> Result<String, ApiError> {
    link.ok_or(ApiError::MissingLink(missing))
}

fn project_period(p: RawPeriod) -> ForecastPeriod {
    ForecastPeriod {
        name: p.name,
        temperature: p.temperature,
        temperature_unit: p.temperature_unit,
        wind_speed: p.wind_speed,
        wind_direction: p.wind_direction,
        short_forecast: p.short_forecast,
        detailed_forecast: p.detailed_forecast,
    }
}

fn project_hourly_period(p: RawPeriod) -> HourlyPeriod {
    HourlyPeriod {
        start_time: p.start_time,
        temperature: p.temperature,
        wind_speed: p.wind_speed,
        short_forecast: p.short_forecast,
        probability_of_precipitation: p.probability_of_precipitation.map(|m| match m.value {
            Some(value) => value,
            None => Value::Null,
        }),
    }
}

fn project_alert(feature: AlertFeature) -> Alert {
    let p = feature.properties.unwrap_or_default();

    Alert {
        headline: p.headline,
        severity: p.severity,
        event: p.event,
        description: p.description.map(|d| truncate_chars(&d, 500)),
        onset: p.onset,
        expires: p.expires,
        area_desc: p.area_desc,
    }
}

fn project_station(feature: StationFeature) -> Station {
    let p = feature.properties.unwrap_or_default();

    Station {
        id: p.station_identifier,
        name: p.name,
        coordinates: feature.geometry.and_then(|g| g.coordinates),
    }
}

fn measured<T>(m: Option<Measured<T>>) -> Option<T> {
    m.and_then(|m| m.value)
}

fn format_temperature(celsius: f64) -> String {
    let fahrenheit = (celsius * 9.0 / 5.0 + 32.0).round() as i64;
    format!("{}°F ({}°C)", fahrenheit, celsius.round() as i64)
}

/// Truncate to `max` characters of the decoded string, not bytes.
fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        format!("{}...", &body[..MAX])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_display_string() {
        assert_eq!(format_temperature(20.0), "68°F (20°C)");
        assert_eq!(format_temperature(0.0), "32°F (0°C)");
        assert_eq!(format_temperature(-5.3), "22°F (-5°C)");
    }

    #[test]
    fn wind_speed_rounds_to_whole_mph() {
        let display = format!("{} mph", (10.0 * MPS_TO_MPH).round() as i64);
        assert_eq!(display, "6 mph");
    }

    #[test]
    fn long_description_truncates_to_500_chars() {
        let long = "x".repeat(800);
        assert_eq!(truncate_chars(&long, 500).chars().count(), 500);

        let short = "all clear";
        assert_eq!(truncate_chars(short, 500), "all clear");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let long = "é".repeat(600);
        let truncated = truncate_chars(&long, 500);

        assert_eq!(truncated.chars().count(), 500);
        assert_eq!(truncated.len(), 1000);
    }

    #[test]
    fn missing_forecast_link_uses_fixed_message() {
        let err = require_link(None, "No forecast available for this location").unwrap_err();
        assert_eq!(err.to_string(), "No forecast available for this location");

        let ok = require_link(Some("https://x".to_string()), "No hourly forecast");
        assert_eq!(ok.unwrap(), "https://x");
    }

    #[test]
    fn point_metadata_tolerates_missing_links() {
        let point: Point = serde_json::from_str(
            r#"{ "properties": { "forecast": "https://api.weather.gov/gridpoints/BOX/71,90/forecast" } }"#,
        )
        .expect("point must parse");

        let props = point.properties.expect("properties present");
        assert!(props.forecast.is_some());
        assert!(props.forecast_hourly.is_none());
        assert!(props.observation_stations.is_none());
    }

    #[test]
    fn hourly_projection_caps_at_24_and_extracts_precipitation() {
        let periods_json: Vec<Value> = (0..30)
            .map(|i| {
                serde_json::json!({
                    "startTime": "2024-03-01T06:00:00-05:00",
                    "temperature": 40 + i,
                    "windSpeed": "5 mph",
                    "shortForecast": "Sunny",
                    "probabilityOfPrecipitation": { "unitCode": "wmoUnit:percent", "value": i }
                })
            })
            .collect();

        let forecast: ForecastResponse = serde_json::from_value(serde_json::json!({
            "properties": { "periods": periods_json }
        }))
        .expect("forecast must parse");

        let projected: Vec<HourlyPeriod> = forecast
            .properties
            .and_then(|p| p.periods)
            .expect("periods present")
            .into_iter()
            .take(HOURLY_PERIOD_CAP)
            .map(project_hourly_period)
            .collect();

        assert_eq!(projected.len(), 24);
        assert_eq!(
            projected[3].probability_of_precipitation,
            Some(Value::from(3))
        );
    }

    #[test]
    fn null_precipitation_value_is_preserved_as_null() {
        let raw: RawPeriod = serde_json::from_value(serde_json::json!({
            "probabilityOfPrecipitation": { "unitCode": "wmoUnit:percent", "value": null }
        }))
        .expect("period must parse");

        let projected = project_hourly_period(raw);
        assert_eq!(projected.probability_of_precipitation, Some(Value::Null));
    }

    #[test]
    fn forecast_period_projection_is_a_field_subset() {
        let raw: RawPeriod = serde_json::from_value(serde_json::json!({
            "number": 1,
            "name": "Tonight",
            "temperature": 43,
            "temperatureUnit": "F",
            "temperatureTrend": "falling",
            "windSpeed": "8 mph",
            "windDirection": "NW",
            "icon": "https://api.weather.gov/icons/land/night/few",
            "shortForecast": "Mostly Clear",
            "detailedForecast": "Mostly clear, with a low around 43."
        }))
        .expect("period must parse");

        let projected = project_period(raw);
        let json = serde_json::to_value(&projected).expect("projection must serialize");

        assert_eq!(json["name"], "Tonight");
        assert_eq!(json["temperature"], 43);
        assert_eq!(json["windSpeed"], "8 mph");
        assert!(json.get("icon").is_none());
        assert!(json.get("number").is_none());
    }

    #[test]
    fn alert_projection_truncates_description() {
        let feature: AlertFeature = serde_json::from_value(serde_json::json!({
            "properties": {
                "headline": "Flood Warning issued",
                "severity": "Severe",
                "event": "Flood Warning",
                "description": "rain ".repeat(200),
                "onset": "2024-03-01T06:00:00-05:00",
                "expires": "2024-03-02T06:00:00-05:00",
                "areaDesc": "Suffolk County"
            }
        }))
        .expect("alert must parse");

        let alert = project_alert(feature);
        assert_eq!(alert.description.as_ref().map(|d| d.chars().count()), Some(500));
        assert_eq!(alert.event.as_deref(), Some("Flood Warning"));
    }

    #[test]
    fn station_projection_keeps_raw_coordinates() {
        let feature: StationFeature = serde_json::from_value(serde_json::json!({
            "geometry": { "type": "Point", "coordinates": [-71.01056, 42.36056] },
            "properties": { "stationIdentifier": "KBOS", "name": "Boston, Logan International Airport" }
        }))
        .expect("station must parse");

        let station = project_station(feature);
        assert_eq!(station.id.as_deref(), Some("KBOS"));
        assert_eq!(station.coordinates, Some(vec![-71.01056, 42.36056]));
    }

    #[test]
    fn observation_conversions_skip_absent_values() {
        let observation: Observation = serde_json::from_value(serde_json::json!({
            "properties": {
                "timestamp": "2024-03-01T11:52:00+00:00",
                "textDescription": "Cloudy",
                "temperature": { "unitCode": "wmoUnit:degC", "value": null },
                "windSpeed": { "unitCode": "wmoUnit:km_h-1", "value": 10 }
            }
        }))
        .expect("observation must parse");

        let props = observation.properties.expect("properties present");
        assert_eq!(measured(props.temperature), None);
        assert_eq!(measured(props.wind_speed), Some(10.0));
        assert_eq!(measured(props.barometric_pressure), None);
    }

    #[test]
    fn zero_values_still_convert() {
        // 0 °C and 0 m/s are real readings, not absent ones.
        assert_eq!(format_temperature(0.0), "32°F (0°C)");
        assert_eq!(format!("{} mph", (0.0 * MPS_TO_MPH).round() as i64), "0 mph");
    }
}
