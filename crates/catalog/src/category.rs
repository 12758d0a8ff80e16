use serde::{Deserialize, Serialize};

use storefront_core::{CategoryId, DomainResult, Entity};

use crate::product::Product;
use crate::validate_name;

/// A product category. One category has many products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub category_name: String,
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> CategoryId {
        self.id
    }
}

/// Input for creating a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub category_name: String,
}

impl NewCategory {
    pub fn validate(&self) -> DomainResult<()> {
        validate_name("category_name", &self.category_name)
    }
}

/// Partial update of a category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPatch {
    pub category_name: Option<String>,
}

impl CategoryPatch {
    pub fn validate(&self) -> DomainResult<()> {
        match &self.category_name {
            Some(name) => validate_name("category_name", name),
            None => Ok(()),
        }
    }

    pub fn apply_to(&self, category: &mut Category) {
        if let Some(name) = &self.category_name {
            category.category_name = name.clone();
        }
    }
}

/// A category together with the products filed under it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryDetails {
    #[serde(flatten)]
    pub category: Category,
    pub products: Vec<Product>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_are_rejected() {
        let new = NewCategory {
            category_name: "  ".to_string(),
        };
        assert!(new.validate().is_err());

        let patch = CategoryPatch {
            category_name: Some(String::new()),
        };
        assert!(patch.validate().is_err());
        assert!(CategoryPatch::default().validate().is_ok());
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut category = Category {
            id: CategoryId::new(1),
            category_name: "Shirts".to_string(),
        };
        CategoryPatch::default().apply_to(&mut category);
        assert_eq!(category.category_name, "Shirts");

        CategoryPatch {
            category_name: Some("Shorts".to_string()),
        }
        .apply_to(&mut category);
        assert_eq!(category.category_name, "Shorts");
    }
}
