//! Request field parsing and the field-message table
//!
//! Incoming bodies keep their numeric fields as raw JSON so that every bad field can be
//! reported at once instead of failing on the first one serde trips over.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

/// Message reported for a field, whatever rule it broke
const FIELD_MESSAGES: &[(&str, &str)] = &[
    ("name", "The name must be a non-empty string of at most 100 characters."),
    ("amount", "The updated amount is not within the allowed range."),
    ("max_loan_amount", "The max loan amount must be greater than or equal to 0."),
    ("min_loan_amount", "The min loan amount must be greater than or equal to 0."),
    ("interest_rate", "The interest rate must be greater than or equal to 0.01."),
    ("loan_duration", "The loan duration must be greater than or equal to 2."),
    ("customerName", "The customer name must be a non-empty string of at most 100 characters."),
    ("loan_fund_id", "The loan fund id must be a positive integer."),
    (
        "loan_amount",
        "The loan amount must be within the fund's minimum and maximum loan amounts.",
    ),
    ("status", "The status must be one of Requested, Approved or Rejected."),
    ("monthly_installment", "The monthly installment must be greater than or equal to 0."),
    (
        "non_field_errors",
        "The max loan amount must be greater than or equal to the min loan amount.",
    ),
];

/// Look up the message for a field
pub fn message_for(field: &str) -> Option<&'static str> {
    FIELD_MESSAGES
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, message)| *message)
}

/// Accumulated field -> message map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation using the table message for `field`
    pub fn reject(&mut self, field: &str) {
        let message = message_for(field).unwrap_or("This field is invalid.");
        self.reject_with(field, message);
    }

    /// Record a violation with an explicit message; the first message per field wins
    pub fn reject_with(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Fold `other` in, keeping messages already recorded
    pub fn absorb(&mut self, other: FieldErrors) {
        for (field, message) in other.0 {
            self.reject_with(&field, message);
        }
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut errors = FieldErrors::new();
        for (field, failures) in err.field_errors() {
            let message = failures
                .iter()
                .find_map(|failure| failure.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| format!("Invalid value for {field}."));
            errors.reject_with(field, message);
        }
        errors
    }
}

/// Shape of a numeric column: total digits and fractional digits
#[derive(Debug, Clone, Copy)]
pub struct DecimalColumn {
    pub max_digits: u32,
    pub decimal_places: u32,
}

/// NUMERIC(10, 2)
pub const MONEY: DecimalColumn = DecimalColumn {
    max_digits: 10,
    decimal_places: 2,
};

/// NUMERIC(5, 2)
pub const RATE: DecimalColumn = DecimalColumn {
    max_digits: 5,
    decimal_places: 2,
};

/// Whether the integer part of `value` fits in `column`
pub fn fits(value: Decimal, column: DecimalColumn) -> bool {
    let integer_digits = column.max_digits - column.decimal_places;
    value.abs() < Decimal::from_i128_with_scale(10i128.pow(integer_digits), 0)
}

/// Parse a JSON number or numeric string into a decimal that fits `column`.
///
/// The result is rescaled to `column.decimal_places` so it renders like the stored column.
pub fn parse_decimal(value: &Value, column: DecimalColumn) -> Option<Decimal> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };

    let mut parsed = Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()?;

    if parsed.normalize().scale() > column.decimal_places {
        return None;
    }

    if !fits(parsed, column) {
        return None;
    }

    parsed.rescale(column.decimal_places);
    Some(parsed)
}

/// Parse an integer given as a JSON number or numeric string
pub fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Trimmed non-empty string of at most `max_len` characters
pub fn parse_text(value: &Value, max_len: usize) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() && s.chars().count() <= max_len => {
            Some(s.clone())
        }
        _ => None,
    }
}

/// Render a decimal with exactly two fractional digits
pub fn money(mut value: Decimal) -> Decimal {
    value.rescale(2);
    value
}
