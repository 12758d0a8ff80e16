//! Catalog domain module.
//!
//! Products, tags and categories plus the product/tag association reconciler,
//! implemented as deterministic domain logic (no IO, no HTTP, no storage).

pub mod association;
pub mod category;
pub mod price;
pub mod product;
pub mod tag;

pub use association::{NewProductTag, ProductTag, TagDelta, TagSet, reconcile};
pub use category::{Category, CategoryDetails, CategoryPatch, NewCategory};
pub use price::Price;
pub use product::{DEFAULT_STOCK, NewProduct, Product, ProductDetails, ProductPatch};
pub use tag::{NewTag, Tag, TagDetails, TagPatch};

use storefront_core::{DomainError, DomainResult};

/// Shared check for the `*_name` columns: required and not blank.
pub(crate) fn validate_name(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(())
}
