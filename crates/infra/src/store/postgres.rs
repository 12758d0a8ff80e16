//! Postgres-backed catalog store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (foreign key violation) | `23503` | `InvalidReference` | Unknown category/tag id |
//! | Database (unique violation) | `23505` | `Conflict` | Duplicate key |
//! | Database (check constraint violation) | `23514` | `Domain(Validation)` | Negative price/stock |
//! | Anything else | N/A | `Backend` | Pool closed, network errors, etc. |
//!
//! ## Associations
//!
//! `create_product` and `update_product` run in one transaction. On update the
//! product row is locked `FOR UPDATE` before the association rows are read, so
//! two concurrent updates of the same product reconcile one after the other
//! and cannot both insert the same (product, tag) pair.

use std::collections::BTreeMap;
use std::sync::Arc;

use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgConnection, PgPool, Row};
use tracing::{Span, instrument};

use storefront_catalog::{
    Category, CategoryDetails, CategoryPatch, NewCategory, NewProduct, NewProductTag, NewTag,
    Price, Product, ProductDetails, ProductPatch, ProductTag, Tag, TagDelta, TagDetails, TagPatch,
    TagSet, reconcile,
};
use storefront_core::{CategoryId, DomainError, ProductId, ProductTagId, TagId};

use super::r#trait::{CatalogStore, StoreError, StoreResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS category (
    id BIGSERIAL PRIMARY KEY,
    category_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tag (
    id BIGSERIAL PRIMARY KEY,
    tag_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS product (
    id BIGSERIAL PRIMARY KEY,
    product_name TEXT NOT NULL,
    price_cents BIGINT NOT NULL CHECK (price_cents >= 0),
    stock INTEGER NOT NULL DEFAULT 10 CHECK (stock >= 0),
    category_id BIGINT REFERENCES category (id) ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS product_tag (
    id BIGSERIAL PRIMARY KEY,
    product_id BIGINT NOT NULL REFERENCES product (id) ON DELETE CASCADE,
    tag_id BIGINT NOT NULL REFERENCES tag (id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS product_tag_product_id_idx ON product_tag (product_id);
CREATE INDEX IF NOT EXISTS product_tag_tag_id_idx ON product_tag (tag_id);
"#;

const PRODUCT_COLUMNS: &str = "p.id, p.product_name, p.price_cents, p.stock, p.category_id";

/// Postgres-backed `CatalogStore`.
///
/// Uses the SQLx connection pool, so it is `Send + Sync` and cheap to share.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the catalog tables if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    async fn conn(&self) -> StoreResult<sqlx::pool::PoolConnection<sqlx::Postgres>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))
    }
}

#[async_trait::async_trait]
impl CatalogStore for PostgresCatalogStore {
    #[instrument(skip(self), err)]
    async fn list_categories(&self) -> StoreResult<Vec<CategoryDetails>> {
        let mut conn = self.conn().await?;
        let categories = sqlx::query("SELECT id, category_name FROM category ORDER BY id")
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?
            .iter()
            .map(category_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("list_categories", e))?;

        let products = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product p WHERE p.category_id IS NOT NULL ORDER BY p.id"
        ))
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("list_categories", e))?;

        let mut by_category: BTreeMap<CategoryId, Vec<Product>> = BTreeMap::new();
        for row in &products {
            let product = product_from_row(row).map_err(|e| map_sqlx_error("list_categories", e))?;
            if let Some(category_id) = product.category_id {
                by_category.entry(category_id).or_default().push(product);
            }
        }

        Ok(categories
            .into_iter()
            .map(|category| CategoryDetails {
                products: by_category.remove(&category.id).unwrap_or_default(),
                category,
            })
            .collect())
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<CategoryDetails>> {
        let mut conn = self.conn().await?;
        let Some(row) = sqlx::query("SELECT id, category_name FROM category WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("get_category", e))?
        else {
            return Ok(None);
        };
        let category = category_from_row(&row).map_err(|e| map_sqlx_error("get_category", e))?;

        let products = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product p WHERE p.category_id = $1 ORDER BY p.id"
        ))
        .bind(id.get())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("get_category", e))?
        .iter()
        .map(product_from_row)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| map_sqlx_error("get_category", e))?;

        Ok(Some(CategoryDetails { category, products }))
    }

    #[instrument(skip(self, new), err)]
    async fn create_category(&self, new: NewCategory) -> StoreResult<Category> {
        new.validate()?;
        let row = sqlx::query(
            "INSERT INTO category (category_name) VALUES ($1) RETURNING id, category_name",
        )
        .bind(&new.category_name)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_category", e))?;

        category_from_row(&row).map_err(|e| map_sqlx_error("create_category", e))
    }

    #[instrument(skip(self, patch), fields(category_id = %id), err)]
    async fn update_category(
        &self,
        id: CategoryId,
        patch: CategoryPatch,
    ) -> StoreResult<Option<Category>> {
        patch.validate()?;
        let row = sqlx::query(
            r#"
            UPDATE category
            SET category_name = COALESCE($2, category_name)
            WHERE id = $1
            RETURNING id, category_name
            "#,
        )
        .bind(id.get())
        .bind(patch.category_name.as_deref())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_category", e))?;

        row.as_ref()
            .map(category_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("update_category", e))
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn delete_category(&self, id: CategoryId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM category WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn list_tags(&self) -> StoreResult<Vec<TagDetails>> {
        let mut conn = self.conn().await?;
        let tags = sqlx::query("SELECT id, tag_name FROM tag ORDER BY id")
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("list_tags", e))?
            .iter()
            .map(tag_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("list_tags", e))?;

        let ids: Vec<i64> = tags.iter().map(|t| t.id.get()).collect();
        let mut by_tag = load_tag_products(&mut conn, &ids).await?;

        Ok(tags
            .into_iter()
            .map(|tag| TagDetails {
                products: by_tag.remove(&tag.id).unwrap_or_default(),
                tag,
            })
            .collect())
    }

    #[instrument(skip(self), fields(tag_id = %id), err)]
    async fn get_tag(&self, id: TagId) -> StoreResult<Option<TagDetails>> {
        let mut conn = self.conn().await?;
        let Some(row) = sqlx::query("SELECT id, tag_name FROM tag WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("get_tag", e))?
        else {
            return Ok(None);
        };
        let tag = tag_from_row(&row).map_err(|e| map_sqlx_error("get_tag", e))?;

        let mut by_tag = load_tag_products(&mut conn, &[id.get()]).await?;
        Ok(Some(TagDetails {
            products: by_tag.remove(&tag.id).unwrap_or_default(),
            tag,
        }))
    }

    #[instrument(skip(self, new), err)]
    async fn create_tag(&self, new: NewTag) -> StoreResult<Tag> {
        new.validate()?;
        let row = sqlx::query("INSERT INTO tag (tag_name) VALUES ($1) RETURNING id, tag_name")
            .bind(&new.tag_name)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_tag", e))?;

        tag_from_row(&row).map_err(|e| map_sqlx_error("create_tag", e))
    }

    #[instrument(skip(self, patch), fields(tag_id = %id), err)]
    async fn update_tag(&self, id: TagId, patch: TagPatch) -> StoreResult<Option<Tag>> {
        patch.validate()?;
        let row = sqlx::query(
            r#"
            UPDATE tag
            SET tag_name = COALESCE($2, tag_name)
            WHERE id = $1
            RETURNING id, tag_name
            "#,
        )
        .bind(id.get())
        .bind(patch.tag_name.as_deref())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_tag", e))?;

        row.as_ref()
            .map(tag_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("update_tag", e))
    }

    #[instrument(skip(self), fields(tag_id = %id), err)]
    async fn delete_tag(&self, id: TagId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tag WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_tag", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn list_products(&self) -> StoreResult<Vec<ProductDetails>> {
        let mut conn = self.conn().await?;
        load_product_details(&mut conn, None).await
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product(&self, id: ProductId) -> StoreResult<Option<ProductDetails>> {
        let mut conn = self.conn().await?;
        Ok(load_product_details(&mut conn, Some(id)).await?.pop())
    }

    #[instrument(
        skip(self, new, tags),
        fields(tag_count = tags.len(), product_id = tracing::field::Empty),
        err
    )]
    async fn create_product(&self, new: NewProduct, tags: &TagSet) -> StoreResult<ProductDetails> {
        new.validate()?;
        let price_cents = price_to_db(new.price);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(
            r#"
            INSERT INTO product (product_name, price_cents, stock, category_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&new.product_name)
        .bind(price_cents)
        .bind(new.stock)
        .bind(new.category_id.map(CategoryId::get))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_product", e))?;

        let id: i64 = row
            .try_get("id")
            .map_err(|e| map_sqlx_error("create_product", e))?;
        let product_id = ProductId::new(id);
        Span::current().record("product_id", id);

        let delta = TagDelta::for_new_product(product_id, tags);
        insert_product_tags(&mut tx, &delta).await?;

        let details = load_product_details(&mut tx, Some(product_id))
            .await?
            .pop()
            .ok_or_else(|| StoreError::Backend(format!("product {product_id} vanished after insert")))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(details)
    }

    #[instrument(
        skip(self, patch, tags),
        fields(
            product_id = %id,
            tags_inserted = tracing::field::Empty,
            tags_deleted = tracing::field::Empty
        ),
        err
    )]
    async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
        tags: Option<&TagSet>,
    ) -> StoreResult<Option<ProductDetails>> {
        patch.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product p WHERE p.id = $1 FOR UPDATE"
        ))
        .bind(id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        let Some(row) = row else {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Ok(None);
        };

        let mut product = product_from_row(&row).map_err(|e| map_sqlx_error("update_product", e))?;
        if !patch.is_empty() {
            patch.apply_to(&mut product);
            sqlx::query(
                r#"
                UPDATE product
                SET product_name = $2, price_cents = $3, stock = $4, category_id = $5
                WHERE id = $1
                "#,
            )
            .bind(id.get())
            .bind(&product.product_name)
            .bind(price_to_db(product.price))
            .bind(product.stock)
            .bind(product.category_id.map(CategoryId::get))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;
        }

        if let Some(desired) = tags {
            let current = find_product_tags(&mut tx, id).await?;
            let delta = reconcile(id, &current, desired)?;
            Span::current().record("tags_inserted", delta.to_insert.len());
            Span::current().record("tags_deleted", delta.to_delete.len());

            delete_product_tags(&mut tx, &delta).await?;
            insert_product_tags(&mut tx, &delta).await?;
        }

        let details = load_product_details(&mut tx, Some(id)).await?.pop();

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(details)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM product WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn find_product_tags(&self, product_id: ProductId) -> StoreResult<Vec<ProductTag>> {
        let mut conn = self.conn().await?;
        find_product_tags(&mut conn, product_id).await
    }
}

async fn find_product_tags(
    conn: &mut PgConnection,
    product_id: ProductId,
) -> StoreResult<Vec<ProductTag>> {
    sqlx::query("SELECT id, product_id, tag_id FROM product_tag WHERE product_id = $1 ORDER BY id")
        .bind(product_id.get())
        .fetch_all(conn)
        .await
        .map_err(|e| map_sqlx_error("find_product_tags", e))?
        .iter()
        .map(|row| {
            Ok(ProductTag {
                id: ProductTagId::new(row.try_get("id")?),
                product_id: ProductId::new(row.try_get("product_id")?),
                tag_id: TagId::new(row.try_get("tag_id")?),
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()
        .map_err(|e| map_sqlx_error("find_product_tags", e))
}

/// Bulk insert of the delta's new association rows (single statement).
async fn insert_product_tags(conn: &mut PgConnection, delta: &TagDelta) -> StoreResult<()> {
    if delta.to_insert.is_empty() {
        return Ok(());
    }

    let (product_ids, tag_ids): (Vec<i64>, Vec<i64>) = delta
        .to_insert
        .iter()
        .map(|NewProductTag { product_id, tag_id }| (product_id.get(), tag_id.get()))
        .unzip();

    sqlx::query(
        r#"
        INSERT INTO product_tag (product_id, tag_id)
        SELECT * FROM UNNEST($1::bigint[], $2::bigint[])
        "#,
    )
    .bind(&product_ids)
    .bind(&tag_ids)
    .execute(conn)
    .await
    .map_err(|e| map_sqlx_error("insert_product_tags", e))?;

    Ok(())
}

/// Bulk delete of the delta's stale association rows (single statement).
async fn delete_product_tags(conn: &mut PgConnection, delta: &TagDelta) -> StoreResult<()> {
    if delta.to_delete.is_empty() {
        return Ok(());
    }

    let ids: Vec<i64> = delta.to_delete.iter().map(|id| id.get()).collect();
    sqlx::query("DELETE FROM product_tag WHERE product_id = $1 AND id = ANY($2)")
        .bind(delta.product_id.get())
        .bind(&ids)
        .execute(conn)
        .await
        .map_err(|e| map_sqlx_error("delete_product_tags", e))?;

    Ok(())
}

/// Load products (all, or one) with their category and tags resolved.
async fn load_product_details(
    conn: &mut PgConnection,
    only: Option<ProductId>,
) -> StoreResult<Vec<ProductDetails>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {PRODUCT_COLUMNS}, c.category_name
        FROM product p
        LEFT JOIN category c ON c.id = p.category_id
        WHERE ($1::bigint IS NULL OR p.id = $1)
        ORDER BY p.id
        "#
    ))
    .bind(only.map(ProductId::get))
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("load_products", e))?;

    let mut details = Vec::with_capacity(rows.len());
    for row in &rows {
        let product = product_from_row(row).map_err(|e| map_sqlx_error("load_products", e))?;
        let category_name: Option<String> = row
            .try_get("category_name")
            .map_err(|e| map_sqlx_error("load_products", e))?;
        let category = product
            .category_id
            .zip(category_name)
            .map(|(id, category_name)| Category { id, category_name });
        details.push(ProductDetails {
            product,
            category,
            tags: Vec::new(),
        });
    }

    let ids: Vec<i64> = details.iter().map(|d| d.product.id.get()).collect();
    let tag_rows = sqlx::query(
        r#"
        SELECT DISTINCT pt.product_id, t.id, t.tag_name
        FROM product_tag pt
        JOIN tag t ON t.id = pt.tag_id
        WHERE pt.product_id = ANY($1)
        ORDER BY pt.product_id, t.id
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("load_product_tags", e))?;

    let mut by_product: BTreeMap<ProductId, Vec<Tag>> = BTreeMap::new();
    for row in &tag_rows {
        let product_id: i64 = row
            .try_get("product_id")
            .map_err(|e| map_sqlx_error("load_product_tags", e))?;
        let tag = tag_from_row(row).map_err(|e| map_sqlx_error("load_product_tags", e))?;
        by_product.entry(ProductId::new(product_id)).or_default().push(tag);
    }

    for d in &mut details {
        d.tags = by_product.remove(&d.product.id).unwrap_or_default();
    }
    Ok(details)
}

/// Products carrying each of the given tags.
async fn load_tag_products(
    conn: &mut PgConnection,
    tag_ids: &[i64],
) -> StoreResult<BTreeMap<TagId, Vec<Product>>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT DISTINCT pt.tag_id, {PRODUCT_COLUMNS}
        FROM product_tag pt
        JOIN product p ON p.id = pt.product_id
        WHERE pt.tag_id = ANY($1)
        ORDER BY pt.tag_id, p.id
        "#
    ))
    .bind(tag_ids)
    .fetch_all(conn)
    .await
    .map_err(|e| map_sqlx_error("load_tag_products", e))?;

    let mut by_tag: BTreeMap<TagId, Vec<Product>> = BTreeMap::new();
    for row in &rows {
        let tag_id: i64 = row
            .try_get("tag_id")
            .map_err(|e| map_sqlx_error("load_tag_products", e))?;
        let product = product_from_row(row).map_err(|e| map_sqlx_error("load_tag_products", e))?;
        by_tag.entry(TagId::new(tag_id)).or_default().push(product);
    }
    Ok(by_tag)
}

// `Price` is capped at `Price::MAX_CENTS`, which is `i64::MAX`.
fn price_to_db(price: Price) -> i64 {
    price.cents() as i64
}

// SQLx row mapping

fn product_from_row(row: &PgRow) -> Result<Product, sqlx::Error> {
    let price_cents: i64 = row.try_get("price_cents")?;
    let price = u64::try_from(price_cents)
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
        .and_then(|cents| Price::from_cents(cents).map_err(|e| sqlx::Error::Decode(Box::new(e))))?;
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        product_name: row.try_get("product_name")?,
        price,
        stock: row.try_get("stock")?,
        category_id: row
            .try_get::<Option<i64>, _>("category_id")?
            .map(CategoryId::new),
    })
}

fn category_from_row(row: &PgRow) -> Result<Category, sqlx::Error> {
    Ok(Category {
        id: CategoryId::new(row.try_get("id")?),
        category_name: row.try_get("category_name")?,
    })
}

fn tag_from_row(row: &PgRow) -> Result<Tag, sqlx::Error> {
    Ok(Tag {
        id: TagId::new(row.try_get("id")?),
        tag_name: row.try_get("tag_name")?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23503") => StoreError::InvalidReference(msg),
                Some("23505") => StoreError::Conflict(msg),
                Some("23514") => StoreError::Domain(DomainError::validation(msg)),
                _ => StoreError::Backend(msg),
            }
        }
        other => StoreError::Backend(format!("{operation}: {other}")),
    }
}
