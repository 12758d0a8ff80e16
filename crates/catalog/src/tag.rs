use serde::{Deserialize, Serialize};

use storefront_core::{DomainResult, Entity, TagId};

use crate::product::Product;
use crate::validate_name;

/// A label that can be attached to any number of products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub tag_name: String,
}

impl Entity for Tag {
    type Id = TagId;

    fn id(&self) -> TagId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTag {
    pub tag_name: String,
}

impl NewTag {
    pub fn validate(&self) -> DomainResult<()> {
        validate_name("tag_name", &self.tag_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPatch {
    pub tag_name: Option<String>,
}

impl TagPatch {
    pub fn validate(&self) -> DomainResult<()> {
        match &self.tag_name {
            Some(name) => validate_name("tag_name", name),
            None => Ok(()),
        }
    }

    pub fn apply_to(&self, tag: &mut Tag) {
        if let Some(name) = &self.tag_name {
            tag.tag_name = name.clone();
        }
    }
}

/// A tag together with the products carrying it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagDetails {
    #[serde(flatten)]
    pub tag: Tag,
    pub products: Vec<Product>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_flatten_the_tag_fields() {
        let details = TagDetails {
            tag: Tag {
                id: TagId::new(3),
                tag_name: "blue".to_string(),
            },
            products: vec![],
        };
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["tag_name"], "blue");
        assert!(json["products"].as_array().unwrap().is_empty());
    }

    #[test]
    fn new_tag_requires_a_name() {
        assert!(NewTag { tag_name: "pop music".into() }.validate().is_ok());
        assert!(NewTag { tag_name: "".into() }.validate().is_err());
    }
}
