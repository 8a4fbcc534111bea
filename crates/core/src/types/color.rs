//! Colour selector carried on order lines.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ColorHex`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorHexError {
    #[error("colour must start with '#'")]
    MissingHash,
    #[error("colour must have 3 or 6 hex digits, got {0:?}")]
    Malformed(String),
}

/// A `#rrggbb` colour as stored on product colour variants.
///
/// Short `#rgb` input is expanded; the value is kept lowercase. The default
/// is black, which is what the order endpoints assume for lines submitted
/// without a colour.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColorHex(String);

impl ColorHex {
    pub const BLACK: &'static str = "#000000";

    /// Parse a hex colour.
    ///
    /// # Errors
    ///
    /// Returns [`ColorHexError`] when the input lacks the leading `#` or does
    /// not contain exactly 3 or 6 hex digits.
    pub fn parse(s: &str) -> Result<Self, ColorHexError> {
        let digits = s.trim().strip_prefix('#').ok_or(ColorHexError::MissingHash)?;
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ColorHexError::Malformed(s.to_owned()));
        }
        let expanded = match digits.len() {
            6 => digits.to_ascii_lowercase(),
            3 => digits
                .chars()
                .flat_map(|c| [c, c])
                .collect::<String>()
                .to_ascii_lowercase(),
            _ => return Err(ColorHexError::Malformed(s.to_owned())),
        };
        Ok(Self(format!("#{expanded}")))
    }

    #[must_use]
    pub fn black() -> Self {
        Self(Self::BLACK.to_owned())
    }

    /// Use the given colour, or black when none (or a blank one) was chosen.
    ///
    /// # Errors
    ///
    /// Returns [`ColorHexError`] when a non-blank value fails to parse.
    pub fn or_black(value: Option<&str>) -> Result<Self, ColorHexError> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Self::parse(v),
            _ => Ok(Self::black()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ColorHex {
    fn default() -> Self {
        Self::black()
    }
}

impl fmt::Display for ColorHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ColorHex {
    type Error = ColorHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ColorHex> for String {
    fn from(value: ColorHex) -> Self {
        value.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(ColorHex::parse("#FFC0CB").unwrap().as_str(), "#ffc0cb");
        assert_eq!(ColorHex::parse("#0f0").unwrap().as_str(), "#00ff00");
        assert_eq!(ColorHex::parse("ff0000"), Err(ColorHexError::MissingHash));
        assert!(matches!(ColorHex::parse("#12345"), Err(ColorHexError::Malformed(_))));
        assert!(matches!(ColorHex::parse("#gggggg"), Err(ColorHexError::Malformed(_))));
    }

    #[test]
    fn test_defaults_to_black() {
        assert_eq!(ColorHex::default().as_str(), "#000000");
        assert_eq!(ColorHex::or_black(None).unwrap().as_str(), "#000000");
        assert_eq!(ColorHex::or_black(Some("  ")).unwrap().as_str(), "#000000");
        assert_eq!(ColorHex::or_black(Some("#c0c0c0")).unwrap().as_str(), "#c0c0c0");
    }

    #[test]
    fn test_serde_validates() {
        assert!(serde_json::from_str::<ColorHex>("\"#abc\"").is_ok());
        assert!(serde_json::from_str::<ColorHex>("\"red\"").is_err());
    }
}
