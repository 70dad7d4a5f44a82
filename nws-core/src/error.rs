use reqwest::StatusCode;

/// Structured failures from the upstream API.
///
/// Transport and JSON-parse failures are carried as `anyhow` context chains
/// instead; these two variants are the ones callers can meaningfully match
/// on.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Upstream answered with a non-2xx status.
    #[error("weather.gov request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// Point metadata lacked an expected navigational link.
    #[error("{0}")]
    MissingLink(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_embeds_numeric_code() {
        let err = ApiError::Status {
            status: StatusCode::NOT_FOUND,
            body: "Not Found".to_string(),
        };

        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn missing_link_error_is_the_fixed_message() {
        let err = ApiError::MissingLink("No forecast available for this location");
        assert_eq!(err.to_string(), "No forecast available for this location");
    }
}
