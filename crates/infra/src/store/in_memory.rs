use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use storefront_catalog::{
    Category, CategoryDetails, CategoryPatch, NewCategory, NewProduct, NewTag, Product,
    ProductDetails, ProductPatch, ProductTag, Tag, TagDelta, TagDetails, TagPatch, TagSet,
    reconcile,
};
use storefront_core::{CategoryId, Entity, ProductId, ProductTagId, TagId};

use super::r#trait::{CatalogStore, StoreError, StoreResult};

/// In-memory catalog for tests/dev.
///
/// All state lives behind one `RwLock`, so every write (including the
/// delete+insert of association rows) is atomic with respect to readers.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    inner: RwLock<State>,
}

#[derive(Debug, Default)]
struct State {
    sequences: Sequences,
    categories: BTreeMap<CategoryId, Category>,
    tags: BTreeMap<TagId, Tag>,
    products: BTreeMap<ProductId, Product>,
    product_tags: BTreeMap<ProductTagId, ProductTag>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("in-memory catalog lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("in-memory catalog lock poisoned".to_string()))
    }
}

/// One counter per table, like a `BIGSERIAL` column. Ids are never reused.
#[derive(Debug, Default)]
struct Sequences {
    category: i64,
    tag: i64,
    product: i64,
    product_tag: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

impl State {

    fn ensure_category(&self, id: Option<CategoryId>) -> StoreResult<()> {
        match id {
            Some(id) if !self.categories.contains_key(&id) => Err(StoreError::InvalidReference(
                format!("category {id} does not exist"),
            )),
            _ => Ok(()),
        }
    }

    fn ensure_tags(&self, tags: &TagSet) -> StoreResult<()> {
        match tags.iter().find(|id| !self.tags.contains_key(id)) {
            Some(id) => Err(StoreError::InvalidReference(format!(
                "tag {id} does not exist"
            ))),
            None => Ok(()),
        }
    }

    fn rows_for_product(&self, product_id: ProductId) -> Vec<ProductTag> {
        self.product_tags
            .values()
            .filter(|row| row.product_id == product_id)
            .copied()
            .collect()
    }

    /// Bulk delete then bulk insert, as computed by the reconciler.
    fn apply_delta(&mut self, delta: &TagDelta) {
        for id in &delta.to_delete {
            self.product_tags.remove(id);
        }
        for row in &delta.to_insert {
            let id = ProductTagId::new(next(&mut self.sequences.product_tag));
            self.product_tags.insert(
                id,
                ProductTag {
                    id,
                    product_id: row.product_id,
                    tag_id: row.tag_id,
                },
            );
        }
    }

    fn product_details(&self, product: &Product) -> ProductDetails {
        let mut tags: Vec<Tag> = self
            .rows_for_product(product.id)
            .iter()
            .filter_map(|row| self.tags.get(&row.tag_id).cloned())
            .collect();
        tags.sort_by_key(Tag::id);
        tags.dedup_by_key(|t| t.id());

        ProductDetails {
            product: product.clone(),
            category: product
                .category_id
                .and_then(|id| self.categories.get(&id).cloned()),
            tags,
        }
    }

    fn tag_details(&self, tag: &Tag) -> TagDetails {
        let mut products: Vec<Product> = self
            .product_tags
            .values()
            .filter(|row| row.tag_id == tag.id)
            .filter_map(|row| self.products.get(&row.product_id).cloned())
            .collect();
        products.sort_by_key(Product::id);
        products.dedup_by_key(|p| p.id());

        TagDetails {
            tag: tag.clone(),
            products,
        }
    }

    fn category_details(&self, category: &Category) -> CategoryDetails {
        CategoryDetails {
            category: category.clone(),
            products: self
                .products
                .values()
                .filter(|p| p.category_id == Some(category.id))
                .cloned()
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn list_categories(&self) -> StoreResult<Vec<CategoryDetails>> {
        let state = self.read()?;
        Ok(state
            .categories
            .values()
            .map(|c| state.category_details(c))
            .collect())
    }

    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<CategoryDetails>> {
        let state = self.read()?;
        Ok(state.categories.get(&id).map(|c| state.category_details(c)))
    }

    async fn create_category(&self, new: NewCategory) -> StoreResult<Category> {
        new.validate()?;
        let mut state = self.write()?;
        let category = Category {
            id: CategoryId::new(next(&mut state.sequences.category)),
            category_name: new.category_name,
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: CategoryId,
        patch: CategoryPatch,
    ) -> StoreResult<Option<Category>> {
        patch.validate()?;
        let mut state = self.write()?;
        Ok(state.categories.get_mut(&id).map(|category| {
            patch.apply_to(category);
            category.clone()
        }))
    }

    async fn delete_category(&self, id: CategoryId) -> StoreResult<bool> {
        let mut state = self.write()?;
        if state.categories.remove(&id).is_none() {
            return Ok(false);
        }
        for product in state.products.values_mut() {
            if product.category_id == Some(id) {
                product.category_id = None;
            }
        }
        Ok(true)
    }

    async fn list_tags(&self) -> StoreResult<Vec<TagDetails>> {
        let state = self.read()?;
        Ok(state.tags.values().map(|t| state.tag_details(t)).collect())
    }

    async fn get_tag(&self, id: TagId) -> StoreResult<Option<TagDetails>> {
        let state = self.read()?;
        Ok(state.tags.get(&id).map(|t| state.tag_details(t)))
    }

    async fn create_tag(&self, new: NewTag) -> StoreResult<Tag> {
        new.validate()?;
        let mut state = self.write()?;
        let tag = Tag {
            id: TagId::new(next(&mut state.sequences.tag)),
            tag_name: new.tag_name,
        };
        state.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn update_tag(&self, id: TagId, patch: TagPatch) -> StoreResult<Option<Tag>> {
        patch.validate()?;
        let mut state = self.write()?;
        Ok(state.tags.get_mut(&id).map(|tag| {
            patch.apply_to(tag);
            tag.clone()
        }))
    }

    async fn delete_tag(&self, id: TagId) -> StoreResult<bool> {
        let mut state = self.write()?;
        if state.tags.remove(&id).is_none() {
            return Ok(false);
        }
        state.product_tags.retain(|_, row| row.tag_id != id);
        Ok(true)
    }

    async fn list_products(&self) -> StoreResult<Vec<ProductDetails>> {
        let state = self.read()?;
        Ok(state
            .products
            .values()
            .map(|p| state.product_details(p))
            .collect())
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<ProductDetails>> {
        let state = self.read()?;
        Ok(state.products.get(&id).map(|p| state.product_details(p)))
    }

    async fn create_product(&self, new: NewProduct, tags: &TagSet) -> StoreResult<ProductDetails> {
        new.validate()?;
        let mut state = self.write()?;
        state.ensure_category(new.category_id)?;
        state.ensure_tags(tags)?;

        let product = new.into_product(ProductId::new(next(&mut state.sequences.product)));
        state.products.insert(product.id, product.clone());
        state.apply_delta(&TagDelta::for_new_product(product.id, tags));

        Ok(state.product_details(&product))
    }

    async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
        tags: Option<&TagSet>,
    ) -> StoreResult<Option<ProductDetails>> {
        patch.validate()?;
        let mut state = self.write()?;

        let Some(mut product) = state.products.get(&id).cloned() else {
            return Ok(None);
        };
        if let Some(category_id) = patch.category_id {
            state.ensure_category(category_id)?;
        }

        // Validate everything before the first mutation so a failure leaves no trace.
        let delta = match tags {
            Some(desired) => {
                state.ensure_tags(desired)?;
                Some(reconcile(id, &state.rows_for_product(id), desired)?)
            }
            None => None,
        };

        patch.apply_to(&mut product);
        state.products.insert(id, product.clone());
        if let Some(delta) = delta {
            state.apply_delta(&delta);
        }

        Ok(Some(state.product_details(&product)))
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
        let mut state = self.write()?;
        if state.products.remove(&id).is_none() {
            return Ok(false);
        }
        state.product_tags.retain(|_, row| row.product_id != id);
        Ok(true)
    }

    async fn find_product_tags(&self, product_id: ProductId) -> StoreResult<Vec<ProductTag>> {
        Ok(self.read()?.rows_for_product(product_id))
    }
}
