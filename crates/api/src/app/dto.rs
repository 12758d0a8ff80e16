use serde::{Deserialize, Serialize};

use storefront_catalog::{NewProduct, ProductPatch};
use storefront_core::TagId;

// -------------------------
// Request DTOs
// -------------------------

/// `POST /api/products`
///
/// ```json
/// { "product_name": "Basketball", "price": 200.00, "stock": 3, "tagIds": [1, 2, 3, 4] }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    #[serde(flatten)]
    pub product: NewProduct,
    #[serde(default, rename = "tagIds", alias = "tag_ids")]
    pub tag_ids: Vec<TagId>,
}

/// `PUT /api/products/:id`
///
/// Absent `tagIds` leaves the associations alone; a present list (even empty)
/// replaces them.
#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    #[serde(flatten)]
    pub patch: ProductPatch,
    #[serde(default, rename = "tagIds", alias = "tag_ids")]
    pub tag_ids: Option<Vec<TagId>>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}
