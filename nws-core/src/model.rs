use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Human-readable place a point resolved to, from the `relativeLocation`
/// resource of point metadata. Serialized verbatim into forecast output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelativeLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearing: Option<Value>,
}

/// One day/night period of the 7-day forecast.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPeriod {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Integer degrees in practice; kept as raw JSON so upstream values
    /// are reproduced untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_direction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_forecast: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_forecast: Option<String>,
}

/// `get_forecast` output: resolved location plus the full period list.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<RelativeLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub periods: Option<Vec<ForecastPeriod>>,
}

/// One hour of the hourly forecast.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyPeriod {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_forecast: Option<String>,
    /// The nested `value` of upstream `probabilityOfPrecipitation`; an
    /// explicit upstream `null` is preserved as `null`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability_of_precipitation: Option<Value>,
}

/// Projection of one active alert.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Truncated to 500 characters of the decoded string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onset: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_desc: Option<String>,
}

/// `get_alerts` output: alert count alongside the list.
#[derive(Debug, Clone, Serialize)]
pub struct AlertReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts: Option<Vec<Alert>>,
}

/// Filters for the active-alerts lookup. All optional and combinable.
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    /// 2-letter state code, e.g. "CA".
    pub state: Option<String>,
    /// NWS zone ID.
    pub zone: Option<String>,
    /// Area code. Writes the same query parameter as `state` and wins when
    /// both are supplied.
    pub area: Option<String>,
}

impl AlertFilter {
    /// Build the alerts query. Always constrained to active, actual alerts;
    /// `state` and `area` both set the `area` parameter, in that order.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("active", "true".to_string()),
            ("status", "actual".to_string()),
        ];

        if let Some(state) = &self.state {
            set_param(&mut params, "area", state.clone());
        }
        if let Some(zone) = &self.zone {
            set_param(&mut params, "zone", zone.clone());
        }
        if let Some(area) = &self.area {
            set_param(&mut params, "area", area.clone());
        }

        params
    }
}

/// Set-or-replace, so a key is never sent twice.
fn set_param(params: &mut Vec<(&'static str, String)>, key: &'static str, value: String) {
    match params.iter_mut().find(|(k, _)| *k == key) {
        Some(entry) => entry.1 = value,
        None => params.push((key, value)),
    }
}

/// Projection of one observation station.
#[derive(Debug, Clone, Serialize)]
pub struct Station {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Raw GeoJSON coordinate array, `[longitude, latitude]` as returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Vec<f64>>,
}

/// Latest observation for a station, with display-string conversions
/// applied. Absent source values stay `null`; conversions never run on a
/// missing value.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentConditions {
    pub station: String,
    pub timestamp: Option<DateTime<FixedOffset>>,
    /// Combined display string, e.g. `"68°F (20°C)"`.
    pub temperature: Option<String>,
    /// Rounded percentage, e.g. `"45%"`.
    pub humidity: Option<String>,
    /// Rounded miles per hour, e.g. `"6 mph"`.
    pub wind_speed: Option<String>,
    /// Degrees, unconverted.
    pub wind_direction: Option<f64>,
    pub description: Option<String>,
    pub visibility: Option<f64>,
    pub barometric_pressure: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_string(filter: &AlertFilter) -> String {
        filter
            .query_params()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    #[test]
    fn alert_query_is_always_active_and_actual() {
        let filter = AlertFilter::default();
        assert_eq!(query_string(&filter), "active=true&status=actual");
    }

    #[test]
    fn zone_only_sets_zone_and_no_area() {
        let filter = AlertFilter { zone: Some("CAZ043".to_string()), ..Default::default() };
        let query = query_string(&filter);

        assert!(query.contains("zone=CAZ043"));
        assert!(!query.contains("area="));
    }

    #[test]
    fn state_maps_to_area_parameter() {
        let filter = AlertFilter { state: Some("NY".to_string()), ..Default::default() };
        assert_eq!(query_string(&filter), "active=true&status=actual&area=NY");
    }

    #[test]
    fn area_overwrites_state() {
        let filter = AlertFilter {
            state: Some("NY".to_string()),
            area: Some("PZ".to_string()),
            ..Default::default()
        };
        let params = filter.query_params();

        let areas: Vec<_> = params.iter().filter(|(k, _)| *k == "area").collect();
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].1, "PZ");
    }

    #[test]
    fn absent_projection_fields_are_omitted() {
        let period = ForecastPeriod {
            name: Some("Tonight".to_string()),
            temperature: None,
            temperature_unit: None,
            wind_speed: None,
            wind_direction: None,
            short_forecast: None,
            detailed_forecast: None,
        };

        let json = serde_json::to_value(&period).expect("period must serialize");
        assert_eq!(json, serde_json::json!({ "name": "Tonight" }));
    }

    #[test]
    fn current_conditions_keep_explicit_nulls() {
        let conditions = CurrentConditions {
            station: "KLAX".to_string(),
            timestamp: None,
            temperature: None,
            humidity: None,
            wind_speed: None,
            wind_direction: None,
            description: None,
            visibility: None,
            barometric_pressure: None,
        };

        let json = serde_json::to_value(&conditions).expect("conditions must serialize");
        assert_eq!(json["temperature"], serde_json::Value::Null);
        assert_eq!(json["windSpeed"], serde_json::Value::Null);
    }
}
