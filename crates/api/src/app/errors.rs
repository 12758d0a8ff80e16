use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use storefront_core::DomainError;
use storefront_infra::StoreError;

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::InvalidReference(msg) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_reference", msg)
        }
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::Domain(e) => domain_error_to_response(e),
        StoreError::Backend(msg) => {
            tracing::error!(error = %msg, "catalog store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        // Raised only for corrupted stored association rows.
        DomainError::InvariantViolation(msg) => {
            tracing::error!(error = %msg, "catalog invariant violated");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "invariant_violation", msg)
        }
    }
}

/// Malformed or mistyped JSON bodies are a client error, reported in the same shape.
pub fn rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parse a `/:id` path segment into a typed id.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: core::str::FromStr<Err = DomainError>,
{
    raw.parse::<T>().map_err(domain_error_to_response)
}
