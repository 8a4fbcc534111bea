//! Buyer details form and its client-side validation.

use std::collections::BTreeMap;
use std::fmt;

use rafal_core::{Email, PaymentMethod, PhoneNumber};
use serde::{Deserialize, Serialize};

use crate::api::{BuyerInfo, PaymentOptions};

pub const DEFAULT_COUNTRY: &str = "EG";

/// A form input that can carry a validation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    FirstName,
    LastName,
    Email,
    Phone,
    Address,
    City,
    Region,
    PaymentMethod,
    Items,
}

impl Field {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::City => "city",
            Self::Region => "region",
            Self::PaymentMethod => "paymentMethod",
            Self::Items => "items",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-field validation messages, shown next to the offending input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<Field, String>);

impl FormErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message, replacing any earlier one for the same field.
    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    #[must_use]
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Clear the message for a field the buyer has just edited.
    pub fn clear(&mut self, field: Field) {
        self.0.remove(&field);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for FormErrors {}

/// What the buyer typed into the checkout form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuyerDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub country: String,
    pub city: String,
    pub region: String,
    pub address: String,
    pub apartment: String,
    pub payment_method: Option<PaymentMethod>,
    pub payment_options: PaymentOptions,
}

impl Default for BuyerDetails {
    fn default() -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            phone: String::new(),
            country: DEFAULT_COUNTRY.to_owned(),
            city: String::new(),
            region: String::new(),
            address: String::new(),
            apartment: String::new(),
            payment_method: Some(PaymentMethod::Cash),
            payment_options: PaymentOptions::default(),
        }
    }
}

impl BuyerDetails {
    /// Pre-fill identity fields from a logged-in profile.
    ///
    /// The full name is split on the first space; the stored `+20` prefix is
    /// dropped from the phone number.
    #[must_use]
    pub fn from_profile(full_name: &str, email: &str, phone: &str) -> Self {
        let mut parts = full_name.split_whitespace();
        let first_name = parts.next().unwrap_or_default().to_owned();
        let last_name = parts.collect::<Vec<_>>().join(" ");
        Self {
            first_name,
            last_name,
            email: email.to_owned(),
            phone: PhoneNumber::local_from_profile(phone),
            ..Self::default()
        }
    }

    /// Check every field and collect all problems at once.
    ///
    /// # Errors
    ///
    /// Returns [`FormErrors`] with one message per invalid field.
    pub fn validate(&self) -> Result<(BuyerInfo, PaymentMethod), FormErrors> {
        let mut errors = FormErrors::new();
        let required = [
            (Field::FirstName, &self.first_name, "First name is required"),
            (Field::LastName, &self.last_name, "Last name is required"),
            (Field::Address, &self.address, "Address is required"),
            (Field::City, &self.city, "City is required"),
            (Field::Region, &self.region, "Region is required"),
        ];
        for (field, value, message) in required {
            if value.trim().is_empty() {
                errors.insert(field, message);
            }
        }

        if let Err(e) = PhoneNumber::parse(&self.phone) {
            errors.insert(Field::Phone, e.to_string());
        }

        if !self.email.trim().is_empty()
            && let Err(e) = Email::parse(&self.email)
        {
            errors.insert(Field::Email, e.to_string());
        }

        let Some(payment_method) = self.payment_method else {
            errors.insert(Field::PaymentMethod, "Payment method is required");
            return Err(errors);
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        let apartment = self.apartment.trim();
        let buyer = BuyerInfo {
            first_name: self.first_name.trim().to_owned(),
            second_name: self.last_name.trim().to_owned(),
            email: self.email.trim().to_owned(),
            phone: self.phone.clone(),
            country: if self.country.trim().is_empty() {
                DEFAULT_COUNTRY.to_owned()
            } else {
                self.country.trim().to_owned()
            },
            city: self.city.trim().to_owned(),
            region: self.region.trim().to_owned(),
            address: self.address.trim().to_owned(),
            apartment: (!apartment.is_empty()).then(|| apartment.to_owned()),
        };
        Ok((buyer, payment_method))
    }
}
