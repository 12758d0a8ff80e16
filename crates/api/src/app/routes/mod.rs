use axum::Router;

pub mod categories;
pub mod products;
pub mod system;
pub mod tags;

/// Router for the `/api` resources.
pub fn router() -> Router {
    Router::new()
        .nest("/categories", categories::router())
        .nest("/products", products::router())
        .nest("/tags", tags::router())
}
