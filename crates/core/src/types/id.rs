//! Newtype IDs for type-safe item references.
//!
//! Item store ids are opaque strings. Use the `define_id!` macro to create
//! wrappers that prevent accidentally mixing ids of different record types.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use atelier_core::define_id;
/// define_id!(CourseId);
/// define_id!(LessonId);
///
/// let course = CourseId::new("pottery-101");
/// let lesson = LessonId::new("pottery-101");
///
/// // These are different types, so this won't compile:
/// // let _: CourseId = lesson;
/// assert_eq!(course.as_str(), lesson.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(ItemId);
define_id!(UserId);
define_id!(ProductId);
define_id!(OrderId);

impl ItemId {
    /// Generate a fresh random id for a new record.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Deterministic id of a user's cart line for one product.
    ///
    /// Cart lines are stored one item per product, so saving the same
    /// `(user, product)` pair twice overwrites the previous line.
    #[must_use]
    pub fn cart_line(user_id: &UserId, product_id: &ProductId) -> Self {
        Self(format!("cart-{user_id}-{product_id}"))
    }
}

impl From<ItemId> for ProductId {
    fn from(id: ItemId) -> Self {
        Self(id.0)
    }
}

impl From<ItemId> for UserId {
    fn from(id: ItemId) -> Self {
        Self(id.0)
    }
}

impl From<ItemId> for OrderId {
    fn from(id: ItemId) -> Self {
        Self(id.0)
    }
}

impl From<&OrderId> for ItemId {
    fn from(id: &OrderId) -> Self {
        Self(id.0.clone())
    }
}

impl From<&UserId> for ItemId {
    fn from(id: &UserId) -> Self {
        Self(id.0.clone())
    }
}

impl From<&ProductId> for ItemId {
    fn from(id: &ProductId) -> Self {
        Self(id.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_line_id_format() {
        let id = ItemId::cart_line(&UserId::new("u42"), &ProductId::new("glaze-kit"));
        assert_eq!(id.as_str(), "cart-u42-glaze-kit");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(ItemId::generate(), ItemId::generate());
        assert_eq!(ItemId::generate().as_str().len(), 32);
    }

    #[test]
    fn test_id_serializes_transparently() {
        let json = serde_json::to_string(&OrderId::new("ord_1")).unwrap_or_default();
        assert_eq!(json, "\"ord_1\"");
    }
}
