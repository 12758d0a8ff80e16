use serde::{Deserialize, Deserializer, Serialize};

use storefront_core::{CategoryId, DomainError, DomainResult, Entity, ProductId};

use crate::category::Category;
use crate::price::Price;
use crate::tag::Tag;
use crate::validate_name;

/// Stock assigned to a product created without an explicit count.
pub const DEFAULT_STOCK: i32 = 10;

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub product_name: String,
    pub price: Price,
    pub stock: i32,
    pub category_id: Option<CategoryId>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}

/// Input for creating a product (tags are passed separately as a `TagSet`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub product_name: String,
    pub price: Price,
    #[serde(default = "default_stock")]
    pub stock: i32,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

fn default_stock() -> i32 {
    DEFAULT_STOCK
}

impl NewProduct {
    pub fn validate(&self) -> DomainResult<()> {
        validate_name("product_name", &self.product_name)?;
        validate_stock(self.stock)
    }

    /// Materialize the row once the store has assigned an id.
    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            product_name: self.product_name,
            price: self.price,
            stock: self.stock,
            category_id: self.category_id,
        }
    }
}

/// Partial update of a product.
///
/// `category_id` distinguishes "absent" (`None`, keep) from an explicit `null`
/// (`Some(None)`, detach from the category).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i32>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub category_id: Option<Option<CategoryId>>,
}

impl ProductPatch {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(name) = &self.product_name {
            validate_name("product_name", name)?;
        }
        if let Some(stock) = self.stock {
            validate_stock(stock)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.product_name.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.category_id.is_none()
    }

    pub fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.product_name {
            product.product_name = name.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(category_id) = self.category_id {
            product.category_id = category_id;
        }
    }
}

fn validate_stock(stock: i32) -> DomainResult<()> {
    if stock < 0 {
        return Err(DomainError::validation("stock cannot be negative"));
    }
    Ok(())
}

fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A product with its category and tags resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDetails {
    #[serde(flatten)]
    pub product: Product,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
}
