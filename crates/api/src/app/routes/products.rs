use axum::{
    Extension, Json, Router,
    extract::{Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use storefront_catalog::TagSet;
use storefront_core::ProductId;

use crate::app::services::SharedStore;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

pub async fn list_products(Extension(store): Extension<SharedStore>) -> axum::response::Response {
    match store.list_products().await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match store.get_product(id).await {
        Ok(Some(details)) => (StatusCode::OK, Json(details)).into_response(),
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "No product found with this id!",
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(store): Extension<SharedStore>,
    body: Result<Json<dto::CreateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };

    let tags = match TagSet::try_from_ids(body.tag_ids) {
        Ok(t) => t,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match store.create_product(body.product, &tags).await {
        Ok(details) => {
            tracing::info!(product_id = %details.product.id, tag_count = tags.len(), "product created");
            (StatusCode::CREATED, Json(details)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let id: ProductId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };

    let tags = match body.tag_ids.map(TagSet::try_from_ids).transpose() {
        Ok(t) => t,
        Err(e) => return errors::domain_error_to_response(e),
    };

    // Associations are reconciled inside the store call, before we answer.
    match store.update_product(id, body.patch, tags.as_ref()).await {
        Ok(Some(details)) => (StatusCode::OK, Json(details)).into_response(),
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "No product found with this id!",
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match store.delete_product(id).await {
        Ok(true) => (
            StatusCode::OK,
            Json(dto::MessageResponse::new("Product deleted successfully!")),
        )
            .into_response(),
        Ok(false) => errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "No product found with this id!",
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}
