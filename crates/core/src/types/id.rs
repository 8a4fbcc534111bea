//! Newtype IDs for backend entity references.
//!
//! The backend serves primary keys as JSON numbers, but form controls and
//! route parameters hand them around as strings. The `define_id!` macro
//! creates wrappers that accept both on input and always serialize as numbers.

/// Errors that can occur when parsing an id from text.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input string is empty.
    #[error("id cannot be empty")]
    Empty,
    /// The input is not a non-negative integer.
    #[error("id must be a non-negative integer, got {0:?}")]
    NotNumeric(String),
}

/// Parse a backend primary key from text, tolerating surrounding whitespace.
///
/// # Errors
///
/// Returns [`IdError`] if the text is empty or not a non-negative integer.
pub fn parse_id(s: &str) -> Result<i64, IdError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(IdError::Empty);
    }
    match trimmed.parse::<i64>() {
        Ok(id) if id >= 0 => Ok(id),
        _ => Err(IdError::NotNumeric(trimmed.to_owned())),
    }
}

/// Macro to define a backend ID wrapper.
///
/// Creates a newtype wrapper around `i64` with:
/// - `Serialize` as a bare number
/// - `Deserialize` from either a number or a numeric string
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Ord`
/// - `FromStr`, `Display`, and `From<i64>` conversions
///
/// # Example
///
/// ```rust
/// # use rafal_core::define_id;
/// define_id!(WidgetId);
///
/// let from_text: WidgetId = "42".parse().unwrap();
/// assert_eq!(from_text, WidgetId::new(42));
///
/// let from_json: WidgetId = serde_json::from_str("\"42\"").unwrap();
/// assert_eq!(from_json.as_i64(), 42);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ::serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from an i64 value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying i64 value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::types::id::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                $crate::types::id::parse_id(s).map(Self)
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                match ::serde_json::Value::deserialize(deserializer)? {
                    ::serde_json::Value::Number(n) => n
                        .as_i64()
                        .map(Self)
                        .ok_or_else(|| ::serde::de::Error::custom(format!("invalid id {n}"))),
                    ::serde_json::Value::String(s) => $crate::types::id::parse_id(&s)
                        .map(Self)
                        .map_err(::serde::de::Error::custom),
                    other => Err(::serde::de::Error::custom(format!(
                        "expected number or numeric string for id, got {other}"
                    ))),
                }
            }
        }
    };
}

define_id!(ProductId);
define_id!(OrderId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_from_text() {
        assert_eq!("17".parse::<ProductId>().unwrap(), ProductId::new(17));
        assert_eq!(" 17 ".parse::<ProductId>().unwrap(), ProductId::new(17));
        assert_eq!("".parse::<ProductId>(), Err(IdError::Empty));
        assert!(matches!(
            "abc".parse::<ProductId>(),
            Err(IdError::NotNumeric(_))
        ));
        assert!("-3".parse::<OrderId>().is_err());
    }

    #[test]
    fn test_deserialize_number_or_string() {
        let a: OrderId = serde_json::from_str("5").unwrap();
        let b: OrderId = serde_json::from_str("\"5\"").unwrap();
        assert_eq!(a, b);
        assert!(serde_json::from_str::<OrderId>("true").is_err());
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&ProductId::new(8)).unwrap();
        assert_eq!(json, "8");
    }
}
