use thiserror::Error;

use storefront_catalog::{
    Category, CategoryDetails, CategoryPatch, NewCategory, NewProduct, NewTag, ProductDetails,
    ProductPatch, ProductTag, Tag, TagDetails, TagPatch, TagSet,
};
use storefront_core::{CategoryId, DomainError, ProductId, TagId};

/// Result type returned by every `CatalogStore` operation.
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A referenced category/tag/product does not exist.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// Input rejected by domain validation or by the association reconciler.
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Persistence boundary for the catalog.
///
/// Products, tags and categories are plain CRUD. Product/tag association rows
/// are only written by `create_product` and `update_product`: both compute a
/// delta with `storefront_catalog::reconcile` and apply its bulk delete and bulk
/// insert as one unit, so readers never observe a product with neither the
/// old nor the new tags.
///
/// `update_*` returns `Ok(None)` and `delete_*` returns `Ok(false)` when the row
/// does not exist. Errors are never retried here; they propagate to the caller.
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_categories(&self) -> StoreResult<Vec<CategoryDetails>>;
    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<CategoryDetails>>;
    async fn create_category(&self, new: NewCategory) -> StoreResult<Category>;
    async fn update_category(
        &self,
        id: CategoryId,
        patch: CategoryPatch,
    ) -> StoreResult<Option<Category>>;
    async fn delete_category(&self, id: CategoryId) -> StoreResult<bool>;

    async fn list_tags(&self) -> StoreResult<Vec<TagDetails>>;
    async fn get_tag(&self, id: TagId) -> StoreResult<Option<TagDetails>>;
    async fn create_tag(&self, new: NewTag) -> StoreResult<Tag>;
    async fn update_tag(&self, id: TagId, patch: TagPatch) -> StoreResult<Option<Tag>>;
    async fn delete_tag(&self, id: TagId) -> StoreResult<bool>;

    async fn list_products(&self) -> StoreResult<Vec<ProductDetails>>;
    async fn get_product(&self, id: ProductId) -> StoreResult<Option<ProductDetails>>;

    /// Insert the product and one association row per tag in `tags`.
    async fn create_product(&self, new: NewProduct, tags: &TagSet) -> StoreResult<ProductDetails>;

    /// Apply `patch`; when `tags` is `Some`, reconcile the associations to it.
    async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
        tags: Option<&TagSet>,
    ) -> StoreResult<Option<ProductDetails>>;

    async fn delete_product(&self, id: ProductId) -> StoreResult<bool>;

    /// Association rows currently stored for a product, ordered by row id.
    async fn find_product_tags(&self, product_id: ProductId) -> StoreResult<Vec<ProductTag>>;
}
