use axum::{
    Extension, Json, Router,
    extract::{Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use storefront_catalog::{CategoryPatch, NewCategory};
use storefront_core::CategoryId;

use crate::app::services::SharedStore;
use crate::app::{dto, errors};

const NOT_FOUND: &str = "No category found with this id!";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/:id", get(get_category).put(update_category).delete(delete_category))
}

pub async fn list_categories(Extension(store): Extension<SharedStore>) -> axum::response::Response {
    match store.list_categories().await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_category(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CategoryId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match store.get_category(id).await {
        Ok(Some(details)) => (StatusCode::OK, Json(details)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", NOT_FOUND),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_category(
    Extension(store): Extension<SharedStore>,
    body: Result<Json<NewCategory>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };

    match store.create_category(body).await {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_category(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
    body: Result<Json<CategoryPatch>, JsonRejection>,
) -> axum::response::Response {
    let id: CategoryId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };

    match store.update_category(id, body).await {
        Ok(Some(category)) => (StatusCode::OK, Json(category)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", NOT_FOUND),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_category(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CategoryId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match store.delete_category(id).await {
        Ok(true) => (
            StatusCode::OK,
            Json(dto::MessageResponse::new("Category deleted successfully!")),
        )
            .into_response(),
        Ok(false) => errors::json_error(StatusCode::NOT_FOUND, "not_found", NOT_FOUND),
        Err(e) => errors::store_error_to_response(e),
    }
}
