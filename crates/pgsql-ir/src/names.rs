//! Strongly-typed identifiers for schema entities and bond keys.
//!
//! Concept names are non-empty; bond keys may be any string, the empty one
//! included. They are kept distinct so a pass cannot accidentally look up a
//! bond with a relation alias or register a concept under a column name.

/// Define a non-empty string identifier.
///
/// Generates the struct plus `new()` (panics on empty), `try_new()`,
/// `as_str()`, `Display`, `AsRef<str>`, `Borrow<str>`, `TryFrom<&str>`,
/// `PartialEq<&str>` and a `Deserialize` impl that rejects empty strings.
macro_rules! define_name {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
        #[serde(transparent)]
        $vis struct $Name(String);

        impl $Name {
            /// Create a new identifier, panicking if it is empty.
            ///
            /// Prefer [`try_new`](Self::try_new) for names that come from
            /// user input.
            pub fn new(name: impl Into<String>) -> Self {
                let s = name.into();
                assert!(!s.is_empty(), concat!(stringify!($Name), " must not be empty"));
                Self(s)
            }

            /// Create a new identifier, returning `None` if it is empty.
            pub fn try_new(name: impl Into<String>) -> Option<Self> {
                let s = name.into();
                (!s.is_empty()).then_some(Self(s))
            }

            /// Return the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl<'de> serde::Deserialize<'de> for $Name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $Name::try_new(s).ok_or_else(|| {
                    serde::de::Error::custom(concat!(stringify!($Name), " must not be empty"))
                })
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $Name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $Name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<&str> for $Name {
            type Error = &'static str;
            fn try_from(s: &str) -> Result<Self, Self::Error> {
                $Name::try_new(s).ok_or(concat!(stringify!($Name), " must not be empty"))
            }
        }

        impl PartialEq<&str> for $Name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

define_name! {
    /// Identifier of a schema entity (object type, link, link property)
    /// that a relation materializes.
    pub struct ConceptName;
}

/// Logical join key under which bond expressions are registered.
///
/// Any string is a valid key.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct BondKey(String);

impl BondKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BondKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BondKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for BondKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BondKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for BondKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<&str> for BondKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
