//! Shared validation helpers for inbound HTTP adapters.

use std::str::FromStr;

use actix_web::web;
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::domain::Error;

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidUuid,
    InvalidTimestamp,
    InvalidBody,
    InvalidQuery,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingField => "missing_field",
            ErrorCode::InvalidUuid => "invalid_uuid",
            ErrorCode::InvalidTimestamp => "invalid_timestamp",
            ErrorCode::InvalidBody => "invalid_body",
            ErrorCode::InvalidQuery => "invalid_query",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(&self) -> &str {
        self.0
    }
}

/// Builder for validation errors with field context.
struct ValidationError {
    field: String,
    message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    fn with_code(self, code: ErrorCode) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "code": code.as_str(),
        }))
    }

    fn with_value(self, code: ErrorCode, value: impl Into<String>) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "value": value.into(),
            "code": code.as_str(),
        }))
    }
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let field = field.as_str();
    ValidationError::new(field, format!("missing required field: {field}"))
        .with_code(ErrorCode::MissingField)
}

pub(crate) fn invalid_uuid_error(field: FieldName, value: &str) -> Error {
    let field = field.as_str();
    ValidationError::new(field, format!("{field} must be a valid UUID"))
        .with_value(ErrorCode::InvalidUuid, value)
}

/// Parse a typed identifier, reporting the offending field on failure.
pub(crate) fn parse_id<T: FromStr>(value: &str, field: FieldName) -> Result<T, Error> {
    T::from_str(value).map_err(|_| invalid_uuid_error(field, value))
}

/// Parse a typed identifier from a body field that must be present.
pub(crate) fn parse_required_id<T: FromStr>(
    value: Option<String>,
    field: FieldName,
) -> Result<T, Error> {
    let raw = value.ok_or_else(|| missing_field_error(field))?;
    parse_id(&raw, field)
}

pub(crate) fn invalid_timestamp_error(field: FieldName, value: &str) -> Error {
    let field = field.as_str();
    ValidationError::new(field, format!("{field} must be an RFC 3339 timestamp"))
        .with_value(ErrorCode::InvalidTimestamp, value)
}

pub(crate) fn parse_rfc3339_timestamp(
    value: String,
    field: FieldName,
) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(&value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| invalid_timestamp_error(field, &value))
}

pub(crate) fn parse_optional_rfc3339_timestamp(
    value: Option<String>,
    field: FieldName,
) -> Result<Option<DateTime<Utc>>, Error> {
    value
        .map(|raw| parse_rfc3339_timestamp(raw, field))
        .transpose()
}

/// JSON extractor settings reporting malformed bodies as `invalid_request`.
pub(crate) fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        Error::invalid_request(format!("invalid request body: {err}"))
            .with_details(json!({ "code": ErrorCode::InvalidBody.as_str() }))
            .into()
    })
}

/// Query extractor settings reporting malformed query strings as
/// `invalid_request`.
pub(crate) fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        Error::invalid_request(format!("invalid query string: {err}"))
            .with_details(json!({ "code": ErrorCode::InvalidQuery.as_str() }))
            .into()
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::Value;

    use super::*;
    use crate::domain::{ErrorCode as DomainCode, ProductId};

    const PRODUCT: FieldName = FieldName::new("productId");

    #[rstest]
    fn parse_id_accepts_uuid() {
        let id: ProductId =
            parse_id("3fa85f64-5717-4562-b3fc-2c963f66afa6", PRODUCT).expect("valid id");
        assert_eq!(id.to_string(), "3fa85f64-5717-4562-b3fc-2c963f66afa6");
    }

    #[rstest]
    #[case("not-a-uuid")]
    #[case(" 3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    fn parse_id_reports_field_and_value(#[case] raw: &str) {
        let err = parse_id::<ProductId>(raw, PRODUCT).expect_err("invalid id");
        assert_eq!(err.code(), DomainCode::InvalidRequest);
        let details = err.details().expect("details");
        assert_eq!(details["field"], Value::from("productId"));
        assert_eq!(details["value"], Value::from(raw));
        assert_eq!(details["code"], Value::from("invalid_uuid"));
    }

    #[rstest]
    fn required_id_reports_missing_field() {
        let err = parse_required_id::<ProductId>(None, PRODUCT).expect_err("missing id");
        let details = err.details().expect("details");
        assert_eq!(details["field"], Value::from("productId"));
        assert_eq!(details["code"], Value::from("missing_field"));
    }

    #[rstest]
    fn optional_timestamp_passes_through_absent_value() {
        let parsed =
            parse_optional_rfc3339_timestamp(None, FieldName::new("expectedAt")).expect("none");
        assert!(parsed.is_none());
    }

    #[rstest]
    fn timestamp_rejects_garbage() {
        let err = parse_rfc3339_timestamp("tomorrow".to_owned(), FieldName::new("expectedAt"))
            .expect_err("invalid timestamp");
        let details = err.details().expect("details");
        assert_eq!(details["code"], Value::from("invalid_timestamp"));
    }
}
