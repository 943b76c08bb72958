// API Helper Functions
//
// Shared utilities used across API modules.

use axum::{http::StatusCode, Json};
use tracing::error;

use super::types::{ApiError, PageQuery};
use crate::error::QueryError;
use crate::types::Hash160;

/// Standard error result type for API handlers
pub type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

pub type ApiFailure = (StatusCode, Json<ApiError>);

/// Helper to create a 404 Not Found error response
pub fn not_found(message: impl Into<String>) -> ApiFailure {
    (StatusCode::NOT_FOUND, Json(ApiError::new(message)))
}

/// Helper to create a 500 Internal Server Error response
pub fn internal_error(message: impl Into<String>) -> ApiFailure {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiError::new(message)))
}

/// Helper to create a 400 Bad Request error response
pub fn bad_request(message: impl Into<String>) -> ApiFailure {
    (StatusCode::BAD_REQUEST, Json(ApiError::new(message)))
}

/// Maps a query failure onto a response. Store and decode failures are
/// logged here and reach the client only as a generic message.
pub fn query_error(err: QueryError) -> ApiFailure {
    match err {
        QueryError::InvalidArgument(message) => bad_request(message),
        QueryError::NotFound(message) => not_found(message),
        QueryError::StoreUnavailable(e) => {
            error!(error = %e, "store unavailable");
            internal_error("service temporarily unavailable")
        }
        QueryError::Decode(e) => {
            error!(error = %e, "decode failure");
            internal_error("internal error")
        }
    }
}

/// Page size from the query, falling back to `default`.
pub fn page_params(query: &PageQuery, default: u64) -> (i64, i64) {
    (query.cursor, query.size.unwrap_or(default as i64))
}

pub fn parse_hash(value: &str) -> Result<Hash160, ApiFailure> {
    Hash160::from_hex(value).map_err(query_error)
}

pub fn parse_address(value: &str) -> Result<Hash160, ApiFailure> {
    Hash160::from_address(value).map_err(query_error)
}

pub fn parse_token_index(value: &str) -> Result<u64, ApiFailure> {
    value
        .parse::<u64>()
        .map_err(|_| bad_request(format!("invalid token index: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn test_query_error_status_mapping() {
        assert_eq!(query_error(QueryError::invalid("x")).0, StatusCode::BAD_REQUEST);
        assert_eq!(query_error(QueryError::not_found("x")).0, StatusCode::NOT_FOUND);
        let (status, Json(body)) = query_error(QueryError::StoreUnavailable(StoreError::Timeout { op: "card" }));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.error.message.contains("card"));
    }

    #[test]
    fn test_page_params_default() {
        let query = PageQuery { cursor: 4, size: None };
        assert_eq!(page_params(&query, 16), (4, 16));
        let query = PageQuery { cursor: 0, size: Some(3) };
        assert_eq!(page_params(&query, 16), (0, 3));
    }

    #[test]
    fn test_parse_helpers() {
        assert!(parse_hash(&"ab".repeat(20)).is_ok());
        assert_eq!(parse_hash("zz").unwrap_err().0, StatusCode::BAD_REQUEST);
        assert_eq!(parse_token_index("12").unwrap(), 12);
        assert!(parse_token_index("-1").is_err());
        assert!(parse_address("1BoatSLRHtKNngkdXEeobR76b53LETtpyT").is_ok());
        assert!(parse_address("not-an-address").is_err());
    }
}
