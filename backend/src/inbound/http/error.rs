//! Rendering of domain errors as JSON responses.
//!
//! Every failure leaves the API as the same envelope (`code`, `message`,
//! optional `traceId` and `details`) with a status derived from the code.
//! Internal errors are logged in full and sent to the client redacted.
//! Error bodies are tenant data and are never cached.

use actix_web::http::header::{CacheControl, CacheDirective};
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use tracing::{debug, error};

use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER};

/// Result type returned by every storefront handler.
pub type ApiResult<T> = Result<T, Error>;

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self.code() {
            ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!(
                status = status.as_u16(),
                message = self.message(),
                details = ?self.details(),
                trace_id = self.trace_id(),
                "request failed"
            );
        } else {
            debug!(
                status = status.as_u16(),
                code = ?self.code(),
                trace_id = self.trace_id(),
                "request rejected"
            );
        }

        let mut response = HttpResponse::build(status);
        response.insert_header(CacheControl(vec![CacheDirective::NoStore]));
        if let Some(trace_id) = self.trace_id() {
            response.insert_header((TRACE_ID_HEADER, trace_id.to_owned()));
        }
        response.json(self.redacted())
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        error!(error = %err, "framework error surfaced in a handler");
        Error::internal("Internal server error")
    }
}
