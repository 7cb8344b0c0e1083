use mongodb::bson::oid::ObjectId;
use thiserror::Error;

pub mod expense;
pub mod group;
pub mod user;

pub use expense::{Expense, ExpenseInput, ExpenseType, ExpenseUpdate};
pub use group::{Group, GroupInput, GroupUpdate};
pub use user::{Registration, RegisterInput, User};

pub type UserId = ObjectId;

/// A document failed one of its field-level rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("{field} must be {rule}")]
    Invalid {
        field: &'static str,
        rule: &'static str,
    },
}

/// Trims a required text field. Blank values count as missing.
pub(crate) fn required_text(
    field: &'static str,
    value: Option<String>,
) -> Result<String, ValidationError> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(ValidationError::Required(field)),
    }
}

pub(crate) fn optional_text(value: Option<String>) -> String {
    value.map(|text| text.trim().to_string()).unwrap_or_default()
}

pub(crate) fn non_negative_amount(amount: f64) -> Result<f64, ValidationError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(amount)
    } else {
        Err(ValidationError::Invalid {
            field: "amount",
            rule: "a non-negative number",
        })
    }
}

pub fn parse_object_id(field: &'static str, raw: &str) -> Result<ObjectId, ValidationError> {
    ObjectId::parse_str(raw.trim()).map_err(|_| ValidationError::Invalid {
        field,
        rule: "a valid id",
    })
}
