//! Buyer contact details: phone number and email address.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input is empty or only whitespace.
    #[error("Phone number is required")]
    Empty,
    /// The digits do not form a 10 or 11 digit local number.
    #[error("Please enter a valid phone number")]
    Invalid,
}

/// A buyer's mobile number in the form the order endpoints accept.
///
/// Input is validated as 10-11 ASCII digits once whitespace is removed, then
/// stored with leading zeros stripped (`"010 1234 5678"` becomes
/// `"1012345678"`).
///
/// ```
/// use rafal_core::PhoneNumber;
///
/// let phone = PhoneNumber::parse("010 1234 5678").unwrap();
/// assert_eq!(phone.as_str(), "1012345678");
/// assert!(PhoneNumber::parse("12345").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Egyptian country prefix stored on user profiles.
    pub const COUNTRY_PREFIX: &'static str = "+20";

    /// Validate and normalize a phone number.
    ///
    /// # Errors
    ///
    /// Returns [`PhoneError::Empty`] for blank input and
    /// [`PhoneError::Invalid`] when the whitespace-free input is not 10 or 11
    /// digits.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let compact = strip_whitespace(s);
        if compact.is_empty() {
            return Err(PhoneError::Empty);
        }
        if !(10..=11).contains(&compact.len()) || !compact.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PhoneError::Invalid);
        }
        Ok(Self(Self::normalize(&compact)))
    }

    /// Strip all whitespace and any leading zeros without validating.
    ///
    /// This is the transformation applied to every phone number before it
    /// leaves the client, validated or not.
    #[must_use]
    pub fn normalize(s: &str) -> String {
        strip_whitespace(s).trim_start_matches('0').to_owned()
    }

    /// Turn a stored profile number (`+201012345678`) into the local form the
    /// checkout form pre-fills.
    #[must_use]
    pub fn local_from_profile(s: &str) -> String {
        s.strip_prefix(Self::COUNTRY_PREFIX).unwrap_or(s).to_owned()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("Please enter a valid email address")]
    Malformed,
}

/// A buyer email address with a minimal structural check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse an email address.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, too long, or lacks a
    /// non-empty local part and domain around a single `@`.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        match s.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(Self(s.to_owned()))
            }
            _ => Err(EmailError::Malformed),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_phone_parse_valid() {
        assert_eq!(PhoneNumber::parse("01012345678").unwrap().as_str(), "1012345678");
        assert_eq!(PhoneNumber::parse("1012345678").unwrap().as_str(), "1012345678");
        assert_eq!(PhoneNumber::parse(" 0101 234 5678 ").unwrap().as_str(), "1012345678");
    }

    #[test]
    fn test_phone_parse_invalid() {
        assert_eq!(PhoneNumber::parse("   "), Err(PhoneError::Empty));
        assert_eq!(PhoneNumber::parse("123456789"), Err(PhoneError::Invalid));
        assert_eq!(PhoneNumber::parse("012345678901"), Err(PhoneError::Invalid));
        assert_eq!(PhoneNumber::parse("0101234567x"), Err(PhoneError::Invalid));
        assert_eq!(PhoneNumber::parse("+201012345678"), Err(PhoneError::Invalid));
    }

    #[test]
    fn test_local_from_profile() {
        assert_eq!(PhoneNumber::local_from_profile("+201012345678"), "1012345678");
        assert_eq!(PhoneNumber::local_from_profile("01012345678"), "01012345678");
    }

    #[test]
    fn test_email() {
        assert!(Email::parse("buyer@example.com").is_ok());
        assert_eq!(Email::parse(""), Err(EmailError::Empty));
        assert_eq!(Email::parse("nobody"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("@x.com"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("a@b@c"), Err(EmailError::Malformed));
    }

    fn with_spaces(digits: &str, gaps: &[usize]) -> String {
        let mut out = String::new();
        for (i, c) in digits.chars().enumerate() {
            if gaps.contains(&i) {
                out.push(' ');
            }
            out.push(c);
        }
        out
    }

    proptest! {
        #[test]
        fn prop_normalize_strips_spaces_and_leading_zeros(
            zeros in 0usize..3,
            body in "[1-9][0-9]{9,10}",
            gaps in proptest::collection::vec(0usize..14, 0..4),
        ) {
            let digits = format!("{}{}", "0".repeat(zeros), body);
            let input = with_spaces(&digits, &gaps);
            let normalized = PhoneNumber::normalize(&input);
            prop_assert_eq!(&normalized, &body);
            prop_assert!(!normalized.contains(' '));
            prop_assert!(!normalized.starts_with('0'));
        }

        #[test]
        fn prop_parse_accepts_ten_or_eleven_digits(
            body in "[0-9]{10,11}",
            gaps in proptest::collection::vec(0usize..12, 0..3),
        ) {
            let input = with_spaces(&body, &gaps);
            let phone = PhoneNumber::parse(&input).unwrap();
            prop_assert_eq!(phone.as_str(), body.trim_start_matches('0'));
        }
    }
}
