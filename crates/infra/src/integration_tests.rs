//! Integration tests for the catalog store.
//!
//! Every scenario runs against the in-memory store. When `TEST_DATABASE_URL`
//! points at a Postgres database, the same scenarios also run against
//! `PostgresCatalogStore` (tables are created on demand).
//!
//! Verifies:
//! - Product updates reconcile tag associations to the requested set
//! - Omitted tag lists leave associations untouched, empty lists clear them
//! - Reconciling twice with the same set is a no-op
//! - Category updates and listings, and detaching products on category delete

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use storefront_catalog::{
        CategoryPatch, NewCategory, NewProduct, NewTag, Price, ProductPatch, TagSet,
    };
    use storefront_core::{CategoryId, ProductId, TagId};

    use crate::store::{CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, StoreError};

    async fn postgres_store() -> Option<PostgresCatalogStore> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let store = PostgresCatalogStore::connect(&url, 2)
            .await
            .expect("failed to connect to TEST_DATABASE_URL");
        store.ensure_schema().await.expect("failed to create schema");
        Some(store)
    }

    async fn tags(store: &dyn CatalogStore, n: usize) -> Vec<TagId> {
        let mut ids = Vec::with_capacity(n);
        for i in 0..n {
            let tag = store
                .create_tag(NewTag {
                    tag_name: format!("tag-{i}"),
                })
                .await
                .unwrap();
            ids.push(tag.id);
        }
        ids
    }

    async fn product(store: &dyn CatalogStore, tags: &[TagId]) -> ProductId {
        store
            .create_product(
                NewProduct {
                    product_name: "Running Sneakers".to_string(),
                    price: Price::from_cents(9000).unwrap(),
                    stock: 25,
                    category_id: None,
                },
                &TagSet::try_from_ids(tags.iter().copied()).unwrap(),
            )
            .await
            .unwrap()
            .product
            .id
    }

    async fn stored_tags(store: &dyn CatalogStore, id: ProductId) -> BTreeSet<TagId> {
        store
            .find_product_tags(id)
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.tag_id)
            .collect()
    }

    fn set(ids: &[TagId]) -> TagSet {
        TagSet::try_from_ids(ids.iter().copied()).unwrap()
    }

    async fn update_reconciles_associations(store: &dyn CatalogStore) {
        let t = tags(store, 4).await;
        let id = product(store, &t[..3]).await;

        let details = store
            .update_product(id, ProductPatch::default(), Some(&set(&t[1..4])))
            .await
            .unwrap()
            .expect("product exists");

        let expected: BTreeSet<TagId> = t[1..4].iter().copied().collect();
        assert_eq!(stored_tags(store, id).await, expected);
        assert_eq!(
            details.tags.iter().map(|t| t.id).collect::<BTreeSet<_>>(),
            expected
        );

        // Same set again: nothing changes, row ids included.
        let before = store.find_product_tags(id).await.unwrap();
        store
            .update_product(id, ProductPatch::default(), Some(&set(&t[1..4])))
            .await
            .unwrap();
        assert_eq!(store.find_product_tags(id).await.unwrap(), before);
    }

    async fn omitted_tags_are_kept_and_empty_tags_clear(store: &dyn CatalogStore) {
        let t = tags(store, 2).await;
        let id = product(store, &t).await;

        let details = store
            .update_product(
                id,
                ProductPatch {
                    product_name: Some("Trail Sneakers".to_string()),
                    ..ProductPatch::default()
                },
                None,
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(details.product.product_name, "Trail Sneakers");
        assert_eq!(stored_tags(store, id).await.len(), 2);

        store
            .update_product(id, ProductPatch::default(), Some(&TagSet::empty()))
            .await
            .unwrap();
        assert!(stored_tags(store, id).await.is_empty());
    }

    async fn missing_product_and_bad_tag(store: &dyn CatalogStore) {
        let missing = store
            .update_product(ProductId::new(i64::MAX), ProductPatch::default(), None)
            .await
            .unwrap();
        assert!(missing.is_none());
        assert!(!store.delete_product(ProductId::new(i64::MAX)).await.unwrap());

        let t = tags(store, 1).await;
        let id = product(store, &t).await;
        let err = store
            .update_product(id, ProductPatch::default(), Some(&set(&[TagId::new(i64::MAX)])))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidReference(_)), "{err:?}");
        let unchanged: BTreeSet<TagId> = t.iter().copied().collect();
        assert_eq!(stored_tags(store, id).await, unchanged);
    }

    async fn deleting_product_drops_associations(store: &dyn CatalogStore) {
        let t = tags(store, 2).await;
        let id = product(store, &t).await;

        assert!(store.delete_product(id).await.unwrap());
        assert!(store.get_product(id).await.unwrap().is_none());
        assert!(store.find_product_tags(id).await.unwrap().is_empty());

        let tag = store.get_tag(t[0]).await.unwrap().unwrap();
        assert!(tag.products.iter().all(|p| p.id != id));
    }

    async fn category_update_list_and_delete(store: &dyn CatalogStore) {
        let category = store
            .create_category(NewCategory {
                category_name: "Shirts".to_string(),
            })
            .await
            .unwrap();
        let product_id = store
            .create_product(
                NewProduct {
                    product_name: "Plain T-Shirt".to_string(),
                    price: Price::from_cents(1499).unwrap(),
                    stock: 14,
                    category_id: Some(category.id),
                },
                &TagSet::empty(),
            )
            .await
            .unwrap()
            .product
            .id;

        let renamed = store
            .update_category(
                category.id,
                CategoryPatch {
                    category_name: Some("Tops".to_string()),
                },
            )
            .await
            .unwrap()
            .expect("category exists");
        assert_eq!(renamed.category_name, "Tops");

        let listed = store.list_categories().await.unwrap();
        let entry = listed
            .iter()
            .find(|c| c.category.id == category.id)
            .expect("category is listed");
        assert_eq!(entry.category.category_name, "Tops");
        assert_eq!(
            entry.products.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![product_id]
        );

        let missing = CategoryId::new(i64::MAX);
        assert!(store.get_category(missing).await.unwrap().is_none());
        assert!(
            store
                .update_category(missing, CategoryPatch::default())
                .await
                .unwrap()
                .is_none()
        );
        assert!(!store.delete_category(missing).await.unwrap());

        assert!(store.delete_category(category.id).await.unwrap());
        assert!(store.get_category(category.id).await.unwrap().is_none());
        let product = store.get_product(product_id).await.unwrap().unwrap();
        assert_eq!(product.product.category_id, None);
    }

    async fn run_all(store: &dyn CatalogStore) {
        update_reconciles_associations(store).await;
        omitted_tags_are_kept_and_empty_tags_clear(store).await;
        missing_product_and_bad_tag(store).await;
        deleting_product_drops_associations(store).await;
        category_update_list_and_delete(store).await;
    }

    #[tokio::test]
    async fn in_memory_store_scenarios() {
        let store = InMemoryCatalogStore::new();
        run_all(&store).await;
    }

    #[tokio::test]
    async fn postgres_store_scenarios() {
        let Some(store) = postgres_store().await else {
            eprintln!("TEST_DATABASE_URL not set; skipping postgres scenarios");
            return;
        };
        run_all(&store).await;
    }
}
