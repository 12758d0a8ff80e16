use axum::{
    Extension, Json, Router,
    extract::{Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use storefront_catalog::{NewTag, TagPatch};
use storefront_core::TagId;

use crate::app::services::SharedStore;
use crate::app::{dto, errors};

const NOT_FOUND: &str = "No tag found with this id!";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_tags).post(create_tag))
        .route("/:id", get(get_tag).put(update_tag).delete(delete_tag))
}

pub async fn list_tags(Extension(store): Extension<SharedStore>) -> axum::response::Response {
    match store.list_tags().await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_tag(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: TagId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match store.get_tag(id).await {
        Ok(Some(details)) => (StatusCode::OK, Json(details)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", NOT_FOUND),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_tag(
    Extension(store): Extension<SharedStore>,
    body: Result<Json<NewTag>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };

    match store.create_tag(body).await {
        Ok(tag) => (StatusCode::CREATED, Json(tag)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_tag(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
    body: Result<Json<TagPatch>, JsonRejection>,
) -> axum::response::Response {
    let id: TagId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };

    match store.update_tag(id, body).await {
        Ok(Some(tag)) => (StatusCode::OK, Json(tag)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", NOT_FOUND),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_tag(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: TagId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match store.delete_tag(id).await {
        Ok(true) => (
            StatusCode::OK,
            Json(dto::MessageResponse::new("Tag deleted successfully!")),
        )
            .into_response(),
        Ok(false) => errors::json_error(StatusCode::NOT_FOUND, "not_found", NOT_FOUND),
        Err(e) => errors::store_error_to_response(e),
    }
}
