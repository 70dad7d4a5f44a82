//! Core library for the `nws-mcp` server.
//!
//! This crate defines:
//! - A rate-limited client for the api.weather.gov REST API
//! - Reduced projections of the upstream GeoJSON payloads
//! - The five lookup operations exposed by the server
//!
//! It is used by `nws-mcp`, but can also be reused by other binaries or services.

pub mod client;
pub mod error;
pub mod limiter;
pub mod model;

pub use client::{MIN_REQUEST_INTERVAL, NwsClient};
pub use error::ApiError;
pub use limiter::RateLimiter;
pub use model::{
    Alert, AlertFilter, AlertReport, CurrentConditions, ForecastPeriod, ForecastReport,
    HourlyPeriod, RelativeLocation, Station,
};
