//! Opaque id newtypes.
//!
//! [`define_id!`](crate::define_id) declares a thin `u32` wrapper used as an
//! arena index. Generated ids are `Copy`, `Ord`, `Hash`, and
//! `Serialize`/`Deserialize`.

/// Declares an opaque, copyable `u32` id newtype with `from_raw`/`as_raw`,
/// `index` and `Display`.
#[macro_export]
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        pub struct $name(u32);

        impl $name {
            /// Creates an id from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }

            /// Returns the index as a `usize`, for direct vector indexing.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    crate::define_id!(
        /// Test id.
        TestId
    );

    #[test]
    fn id_roundtrip() {
        let id = TestId::from_raw(42);
        assert_eq!(id.as_raw(), 42);
        assert_eq!(id.index(), 42);
    }

    #[test]
    fn id_hash_in_set() {
        let mut set = HashSet::new();
        set.insert(TestId::from_raw(1));
        set.insert(TestId::from_raw(2));
        set.insert(TestId::from_raw(1));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn id_ordering_follows_raw() {
        assert!(TestId::from_raw(3) < TestId::from_raw(4));
    }

    #[test]
    fn id_display() {
        assert_eq!(format!("{}", TestId::from_raw(7)), "7");
    }

    #[test]
    fn id_serde_roundtrip() {
        let id = TestId::from_raw(55);
        let json = serde_json::to_string(&id).unwrap();
        let restored: TestId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, restored);
    }
}
