//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have **no identity**: two instances holding the same values
/// are interchangeable. They are immutable; "changing" one means building a
/// new one.
///
/// ```ignore
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// struct Price { cents: u64 }
///
/// impl ValueObject for Price {}
///
/// assert_eq!(Price { cents: 1999 }, Price { cents: 1999 });
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
