use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    tool, tool_handler, tool_router,
};
use serde::Deserialize;

use nws_core::{AlertFilter, NwsClient};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PointArgs {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lon: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AlertArgs {
    /// 2-letter state code (e.g. CA, NY)
    pub state: Option<String>,
    /// NWS zone ID
    pub zone: Option<String>,
    /// Area code
    pub area: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct StationArgs {
    /// Station ID (e.g. 'KLAX', 'KJFK')
    #[serde(rename = "stationId")]
    pub station_id: String,
}

/// The five weather.gov lookup tools, sharing one rate-limited client.
#[derive(Clone)]
pub struct WeatherServer {
    client: Arc<NwsClient>,
    tool_router: ToolRouter<Self>,
}

impl Default for WeatherServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_router]
impl WeatherServer {
    pub fn new() -> Self {
        Self {
            client: Arc::new(NwsClient::new()),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Get 7-day forecast for a location (US only).")]
    async fn get_forecast(
        &self,
        Parameters(args): Parameters<PointArgs>,
    ) -> Result<CallToolResult, McpError> {
        let report = self
            .client
            .forecast(args.lat, args.lon)
            .await
            .map_err(tool_error)?;

        json_result(&report)
    }

    #[tool(description = "Get hourly forecast for a location.")]
    async fn get_hourly_forecast(
        &self,
        Parameters(args): Parameters<PointArgs>,
    ) -> Result<CallToolResult, McpError> {
        let periods = self
            .client
            .hourly_forecast(args.lat, args.lon)
            .await
            .map_err(tool_error)?;

        json_result(&periods)
    }

    #[tool(description = "Get active weather alerts for a state or area.")]
    async fn get_alerts(
        &self,
        Parameters(args): Parameters<AlertArgs>,
    ) -> Result<CallToolResult, McpError> {
        let filter = AlertFilter {
            state: args.state,
            zone: args.zone,
            area: args.area,
        };
        let report = self
            .client
            .active_alerts(&filter)
            .await
            .map_err(tool_error)?;

        json_result(&report)
    }

    #[tool(description = "Find weather observation stations near a point.")]
    async fn get_stations(
        &self,
        Parameters(args): Parameters<PointArgs>,
    ) -> Result<CallToolResult, McpError> {
        let stations = self
            .client
            .stations(args.lat, args.lon)
            .await
            .map_err(tool_error)?;

        json_result(&stations)
    }

    #[tool(description = "Get current weather observations from nearest station.")]
    async fn get_current_conditions(
        &self,
        Parameters(args): Parameters<StationArgs>,
    ) -> Result<CallToolResult, McpError> {
        let conditions = self
            .client
            .current_conditions(&args.station_id)
            .await
            .map_err(tool_error)?;

        json_result(&conditions)
    }
}

#[tool_handler]
impl ServerHandler for WeatherServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Weather lookups backed by the National Weather Service API (US only).".to_string(),
            ),
        }
    }
}

/// One pretty-printed JSON text block per tool call.
fn json_result<T: serde::Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| McpError::internal_error(format!("Failed to serialize result: {err}"), None))?;

    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn tool_error(err: anyhow::Error) -> McpError {
    McpError::internal_error(format!("{err:#}"), None)
}
