//! HTTP error responses for the namescan server.
//!
//! Every failure is rendered as `{"error": "<message>", "code": "<KIND>"}`
//! with the status code carried by its [`ErrorKind`].

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use namescan_core::{Error, ErrorBody, ErrorKind};

/// Errors returned by route handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The query string could not be decoded.
    #[error("INVALID_INPUT: {0}")]
    BadQuery(String),

    /// Validation, configuration or aggregation failure.
    #[error(transparent)]
    Search(#[from] Error),
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadQuery(rejection.body_text())
    }
}

impl ApiError {
    fn body(&self) -> ErrorBody {
        match self {
            ApiError::BadQuery(msg) => ErrorBody { error: msg.clone(), code: Some(ErrorKind::InvalidInput) },
            ApiError::Search(err) => ErrorBody::from(err),
        }
    }

    fn status(&self) -> StatusCode {
        let code = match self {
            ApiError::BadQuery(_) => ErrorKind::InvalidInput.http_status(),
            ApiError::Search(err) => err.http_status(),
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "search request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "search request rejected");
        }

        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_body() {
        let err = ApiError::from(Error::NoSites("nothing allowed".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body(), ErrorBody { error: "nothing allowed".into(), code: Some(ErrorKind::NoSites) });

        let err = ApiError::from(Error::RateLimited("quota".into()));
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);

        let err = ApiError::from(Error::UpstreamAuth("rejected".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body().code, Some(ErrorKind::UpstreamAuth));
    }

    #[test]
    fn test_bad_query() {
        let err = ApiError::BadQuery("missing field".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body().code, Some(ErrorKind::InvalidInput));
    }
}
