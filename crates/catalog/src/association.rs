//! Product/tag associations and their reconciliation.
//!
//! Association rows are never addressed directly by clients: they are created
//! and destroyed as a side effect of creating or updating a product. The
//! [`reconcile`] function computes the minimal delta between the stored rows
//! and the requested tag set. It performs no IO; the store applies the delta.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, Entity, ProductId, ProductTagId, TagId};

/// A stored association row linking one product to one tag.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductTag {
    pub id: ProductTagId,
    pub product_id: ProductId,
    pub tag_id: TagId,
}

impl Entity for ProductTag {
    type Id = ProductTagId;

    fn id(&self) -> ProductTagId {
        self.id
    }
}

/// An association row to be inserted (id assigned by the store).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NewProductTag {
    pub product_id: ProductId,
    pub tag_id: TagId,
}

/// A duplicate-free set of tag ids requested for a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagSet(BTreeSet<TagId>);

impl TagSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a set from a client-supplied list.
    ///
    /// Duplicates are rejected rather than silently collapsed: the caller is
    /// expected to send each tag at most once.
    pub fn try_from_ids(ids: impl IntoIterator<Item = TagId>) -> DomainResult<Self> {
        let mut set = BTreeSet::new();
        for id in ids {
            if !set.insert(id) {
                return Err(DomainError::validation(format!(
                    "duplicate tag id {id} in tag list"
                )));
            }
        }
        Ok(Self(set))
    }

    pub fn contains(&self, id: TagId) -> bool {
        self.0.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = TagId> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Rows to delete and rows to insert so that a product's associations match
/// the requested tag set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagDelta {
    pub product_id: ProductId,
    pub to_insert: BTreeSet<NewProductTag>,
    pub to_delete: BTreeSet<ProductTagId>,
}

impl TagDelta {
    /// Delta for a product that has no associations yet.
    pub fn for_new_product(product_id: ProductId, desired: &TagSet) -> Self {
        Self {
            product_id,
            to_insert: desired
                .iter()
                .map(|tag_id| NewProductTag { product_id, tag_id })
                .collect(),
            to_delete: BTreeSet::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty() && self.to_delete.is_empty()
    }

    /// Tag ids the product ends up with once the delta is applied to `current`.
    pub fn apply_to(&self, current: &[ProductTag]) -> BTreeSet<TagId> {
        current
            .iter()
            .filter(|row| !self.to_delete.contains(&row.id))
            .map(|row| row.tag_id)
            .chain(self.to_insert.iter().map(|row| row.tag_id))
            .collect()
    }
}

/// Compute the association delta for `product_id`.
///
/// - `to_insert`: one row per tag in `desired` that no current row carries.
/// - `to_delete`: every current row whose tag is not in `desired`.
///
/// If `current` already holds several rows for the same tag, the one with the
/// lowest id is kept and the others are deleted, restoring the
/// one-row-per-pair invariant.
///
/// Fails when `current` contains rows of another product or repeats a row id.
pub fn reconcile(
    product_id: ProductId,
    current: &[ProductTag],
    desired: &TagSet,
) -> DomainResult<TagDelta> {
    let mut rows: Vec<&ProductTag> = current.iter().collect();
    rows.sort_by_key(|row| row.id);

    let mut kept: BTreeMap<TagId, ProductTagId> = BTreeMap::new();
    let mut to_delete = BTreeSet::new();
    let mut last_id = None;

    for row in rows {
        if row.product_id != product_id {
            return Err(DomainError::invariant(format!(
                "association {} belongs to product {}, not {}",
                row.id, row.product_id, product_id
            )));
        }
        if last_id == Some(row.id) {
            return Err(DomainError::validation(format!(
                "association {} listed more than once",
                row.id
            )));
        }
        last_id = Some(row.id);

        if !desired.contains(row.tag_id) || kept.contains_key(&row.tag_id) {
            to_delete.insert(row.id);
        } else {
            kept.insert(row.tag_id, row.id);
        }
    }

    let to_insert = desired
        .iter()
        .filter(|tag_id| !kept.contains_key(tag_id))
        .map(|tag_id| NewProductTag { product_id, tag_id })
        .collect();

    Ok(TagDelta {
        product_id,
        to_insert,
        to_delete,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT: ProductId = ProductId::new(7);

    /// Rows for `tags`, with association id = 100 + tag id.
    fn rows(tags: &[i64]) -> Vec<ProductTag> {
        tags.iter()
            .map(|&t| ProductTag {
                id: ProductTagId::new(100 + t),
                product_id: PRODUCT,
                tag_id: TagId::new(t),
            })
            .collect()
    }

    fn set(tags: &[i64]) -> TagSet {
        TagSet::try_from_ids(tags.iter().copied().map(TagId::new)).unwrap()
    }

    fn inserts(tags: &[i64]) -> BTreeSet<NewProductTag> {
        tags.iter()
            .map(|&t| NewProductTag {
                product_id: PRODUCT,
                tag_id: TagId::new(t),
            })
            .collect()
    }

    fn deletes(ids: &[i64]) -> BTreeSet<ProductTagId> {
        ids.iter().copied().map(ProductTagId::new).collect()
    }

    #[test]
    fn swaps_one_tag() {
        let delta = reconcile(PRODUCT, &rows(&[1, 2, 3]), &set(&[2, 3, 4])).unwrap();
        assert_eq!(delta.to_insert, inserts(&[4]));
        assert_eq!(delta.to_delete, deletes(&[101]));
    }

    #[test]
    fn creation_inserts_every_tag() {
        let delta = reconcile(PRODUCT, &[], &set(&[1, 2])).unwrap();
        assert_eq!(delta.to_insert, inserts(&[1, 2]));
        assert!(delta.to_delete.is_empty());
        assert_eq!(delta, TagDelta::for_new_product(PRODUCT, &set(&[1, 2])));
    }

    #[test]
    fn empty_desired_set_deletes_everything() {
        let delta = reconcile(PRODUCT, &rows(&[1, 2]), &TagSet::empty()).unwrap();
        assert!(delta.to_insert.is_empty());
        assert_eq!(delta.to_delete, deletes(&[101, 102]));
    }

    #[test]
    fn unchanged_set_is_a_no_op() {
        let delta = reconcile(PRODUCT, &rows(&[1, 2, 3]), &set(&[1, 2, 3])).unwrap();
        assert!(delta.is_empty());
    }

    #[test]
    fn duplicate_rows_for_one_tag_are_collapsed() {
        let mut current = rows(&[1, 2]);
        current.push(ProductTag {
            id: ProductTagId::new(250),
            product_id: PRODUCT,
            tag_id: TagId::new(2),
        });

        let delta = reconcile(PRODUCT, &current, &set(&[2])).unwrap();
        assert!(delta.to_insert.is_empty());
        assert_eq!(delta.to_delete, deletes(&[101, 250]));
        assert_eq!(delta.apply_to(&current), BTreeSet::from([TagId::new(2)]));
    }

    #[test]
    fn rejects_rows_of_another_product() {
        let mut current = rows(&[1]);
        current[0].product_id = ProductId::new(8);
        let err = reconcile(PRODUCT, &current, &set(&[1])).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn rejects_repeated_row_ids() {
        let mut current = rows(&[1]);
        current.push(current[0]);
        let err = reconcile(PRODUCT, &current, &set(&[1])).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn tag_set_rejects_duplicates() {
        let err = TagSet::try_from_ids([TagId::new(1), TagId::new(1)]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn tag_ids() -> impl Strategy<Value = BTreeSet<i64>> {
            prop::collection::btree_set(1i64..40, 0..16)
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: inserts are desired − current, deletes are rows of current − desired.
            #[test]
            fn delta_is_the_set_difference(current in tag_ids(), desired in tag_ids()) {
                let current_rows = rows(&current.iter().copied().collect::<Vec<_>>());
                let desired_set = set(&desired.iter().copied().collect::<Vec<_>>());

                let delta = reconcile(PRODUCT, &current_rows, &desired_set).unwrap();

                let expected_insert: Vec<i64> = desired.difference(&current).copied().collect();
                let expected_delete: Vec<i64> =
                    current.difference(&desired).map(|t| 100 + t).collect();
                prop_assert_eq!(delta.to_insert, inserts(&expected_insert));
                prop_assert_eq!(delta.to_delete, deletes(&expected_delete));
            }

            /// Property: after applying a delta, reconciling again is a no-op.
            #[test]
            fn reconcile_is_idempotent(current in tag_ids(), desired in tag_ids()) {
                let current_rows = rows(&current.iter().copied().collect::<Vec<_>>());
                let desired_set = set(&desired.iter().copied().collect::<Vec<_>>());

                let delta = reconcile(PRODUCT, &current_rows, &desired_set).unwrap();
                let after = delta.apply_to(&current_rows);
                let expected: BTreeSet<TagId> = desired.iter().copied().map(TagId::new).collect();
                prop_assert_eq!(&after, &expected);

                let after_rows = rows(&after.iter().map(|t| t.get()).collect::<Vec<_>>());
                let second = reconcile(PRODUCT, &after_rows, &desired_set).unwrap();
                prop_assert!(second.is_empty());
            }
        }
    }
}
