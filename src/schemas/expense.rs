use chrono::{NaiveDate, TimeZone, Utc};
use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{de, Deserialize, Deserializer, Serialize};

use super::{non_negative_amount, parse_object_id, required_text, UserId, ValidationError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseType {
    Wallet,
    Group,
}

impl ExpenseType {
    pub fn as_str(self) -> &'static str {
        match self {
            ExpenseType::Wallet => "wallet",
            ExpenseType::Group => "group",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw {
            "wallet" => Ok(ExpenseType::Wallet),
            "group" => Ok(ExpenseType::Group),
            _ => Err(ValidationError::Invalid {
                field: "type",
                rule: "one of wallet, group",
            }),
        }
    }
}

const DATE_FORMATS: &str = "an RFC 3339 timestamp, a YYYY-MM-DD date or epoch milliseconds";

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDate {
    Millis(i64),
    Text(String),
}

/// Reads an optional expense date. Plain dates are taken as midnight UTC.
fn flexible_date<'de, D>(deserializer: D) -> Result<Option<chrono::DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<RawDate>::deserialize(deserializer) {
        Ok(raw) => raw,
        Err(_) => return Err(de::Error::custom(format!("date must be {}", DATE_FORMATS))),
    };
    let parsed = match raw {
        None => return Ok(None),
        Some(RawDate::Millis(millis)) => Utc.timestamp_millis_opt(millis).single(),
        Some(RawDate::Text(text)) => chrono::DateTime::parse_from_rfc3339(&text)
            .map(|date| date.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                    .ok()
                    .and_then(|day| day.and_hms_opt(0, 0, 0))
                    .map(|midnight| Utc.from_utc_datetime(&midnight))
            }),
    };
    parsed
        .map(Some)
        .ok_or_else(|| de::Error::custom(format!("date must be {}", DATE_FORMATS)))
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub amount: f64,
    pub description: String,
    pub category: String,
    pub date: DateTime,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<ObjectId>,
    #[serde(rename = "type")]
    pub kind: ExpenseType,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Expense fields as submitted by a client. Everything is optional here so
/// that missing fields surface as validation errors instead of parse errors.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseInput {
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub date: Option<chrono::DateTime<Utc>>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub group_id: Option<String>,
}

impl ExpenseInput {
    pub fn into_expense(self, user_id: Option<UserId>) -> Result<Expense, ValidationError> {
        let amount = non_negative_amount(self.amount.ok_or(ValidationError::Required("amount"))?)?;
        let description = required_text("description", self.description)?;
        let category = required_text("category", self.category)?;
        let user_id = user_id.ok_or(ValidationError::Required("userId"))?;
        let kind = ExpenseType::parse(
            self.kind
                .as_deref()
                .ok_or(ValidationError::Required("type"))?,
        )?;
        let group_id = self
            .group_id
            .as_deref()
            .map(|raw| parse_object_id("groupId", raw))
            .transpose()?;

        match (kind, group_id) {
            (ExpenseType::Group, None) => return Err(ValidationError::Required("groupId")),
            (ExpenseType::Wallet, Some(_)) => {
                return Err(ValidationError::Invalid {
                    field: "groupId",
                    rule: "absent for wallet expenses",
                })
            }
            _ => {}
        }

        let now = DateTime::now();
        Ok(Expense {
            id: ObjectId::new(),
            amount,
            description,
            category,
            date: self.date.map(DateTime::from_chrono).unwrap_or(now),
            user_id,
            group_id,
            kind,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseUpdate {
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub date: Option<chrono::DateTime<Utc>>,
}

impl Expense {
    /// Applies a partial update. Nothing is modified unless every provided
    /// field passes validation.
    pub fn apply(&mut self, update: ExpenseUpdate) -> Result<(), ValidationError> {
        let amount = update.amount.map(non_negative_amount).transpose()?;
        let description = update
            .description
            .map(|text| required_text("description", Some(text)))
            .transpose()?;
        let category = update
            .category
            .map(|text| required_text("category", Some(text)))
            .transpose()?;

        if let Some(amount) = amount {
            self.amount = amount;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(category) = category {
            self.category = category;
        }
        if let Some(date) = update.date {
            self.date = DateTime::from_chrono(date);
        }
        self.updated_at = DateTime::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet_input() -> ExpenseInput {
        ExpenseInput {
            amount: Some(12.5),
            description: Some("  Lunch ".to_string()),
            category: Some(" Food".to_string()),
            date: None,
            kind: Some("wallet".to_string()),
            group_id: None,
        }
    }

    #[test]
    fn valid_wallet_expense_is_trimmed_and_dated() {
        let user = ObjectId::new();
        let before = DateTime::now();
        let expense = wallet_input().into_expense(Some(user)).unwrap();
        assert_eq!(expense.description, "Lunch");
        assert_eq!(expense.category, "Food");
        assert_eq!(expense.user_id, user);
        assert_eq!(expense.kind, ExpenseType::Wallet);
        assert!(expense.date >= before);
        assert_eq!(expense.created_at, expense.updated_at);
    }

    #[test]
    fn negative_amount_fails() {
        let input = ExpenseInput {
            amount: Some(-1.0),
            ..wallet_input()
        };
        assert_eq!(
            input.into_expense(Some(ObjectId::new())),
            Err(ValidationError::Invalid {
                field: "amount",
                rule: "a non-negative number"
            })
        );
    }

    #[test]
    fn missing_required_fields_fail() {
        let user = Some(ObjectId::new());
        let cases = [
            (
                ExpenseInput {
                    description: None,
                    ..wallet_input()
                },
                "description",
            ),
            (
                ExpenseInput {
                    category: Some("  ".to_string()),
                    ..wallet_input()
                },
                "category",
            ),
            (
                ExpenseInput {
                    kind: None,
                    ..wallet_input()
                },
                "type",
            ),
            (
                ExpenseInput {
                    amount: None,
                    ..wallet_input()
                },
                "amount",
            ),
        ];
        for (input, field) in cases {
            assert_eq!(
                input.into_expense(user),
                Err(ValidationError::Required(field))
            );
        }
        assert_eq!(
            wallet_input().into_expense(None),
            Err(ValidationError::Required("userId"))
        );
    }

    #[test]
    fn unknown_type_fails() {
        let input = ExpenseInput {
            kind: Some("savings".to_string()),
            ..wallet_input()
        };
        assert!(matches!(
            input.into_expense(Some(ObjectId::new())),
            Err(ValidationError::Invalid { field: "type", .. })
        ));
    }

    #[test]
    fn type_must_match_exactly() {
        assert_eq!(ExpenseType::parse("group"), Ok(ExpenseType::Group));
        for raw in [" wallet ", "Wallet", "wallet\n", ""] {
            assert!(ExpenseType::parse(raw).is_err(), "{:?}", raw);
        }
    }

    #[test]
    fn dates_accept_timestamps_plain_days_and_millis() {
        let day = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        for raw in [
            r#"{"date":"2024-01-15"}"#,
            r#"{"date":"2024-01-15T02:00:00+02:00"}"#,
            r#"{"date":1705276800000}"#,
        ] {
            let update: ExpenseUpdate = serde_json::from_str(raw).unwrap();
            assert_eq!(update.date, Some(day), "{}", raw);
        }

        let update: ExpenseUpdate = serde_json::from_str(r#"{"date":null}"#).unwrap();
        assert_eq!(update.date, None);
        let input: ExpenseInput = serde_json::from_str(r#"{"amount":1}"#).unwrap();
        assert_eq!(input.date, None);

        for raw in [r#"{"date":"15/01/2024"}"#, r#"{"date":"2024-02-30"}"#, r#"{"date":true}"#] {
            let err = serde_json::from_str::<ExpenseInput>(raw).unwrap_err();
            assert!(err.to_string().starts_with("date must be"), "{}", err);
        }
    }

    #[test]
    fn group_expense_requires_group_and_wallet_forbids_it() {
        let user = Some(ObjectId::new());
        let group = ExpenseInput {
            kind: Some("group".to_string()),
            ..wallet_input()
        };
        assert_eq!(
            group.clone().into_expense(user),
            Err(ValidationError::Required("groupId"))
        );

        let group_id = ObjectId::new();
        let expense = ExpenseInput {
            group_id: Some(group_id.to_hex()),
            ..group
        }
        .into_expense(user)
        .unwrap();
        assert_eq!(expense.group_id, Some(group_id));

        let wallet = ExpenseInput {
            group_id: Some(group_id.to_hex()),
            ..wallet_input()
        };
        assert!(wallet.into_expense(user).is_err());
    }

    #[test]
    fn rejected_update_leaves_expense_untouched() {
        let mut expense = wallet_input().into_expense(Some(ObjectId::new())).unwrap();
        let original = expense.clone();
        let result = expense.apply(ExpenseUpdate {
            amount: Some(3.0),
            description: Some(" ".to_string()),
            ..Default::default()
        });
        assert_eq!(result, Err(ValidationError::Required("description")));
        assert_eq!(expense, original);

        expense
            .apply(ExpenseUpdate {
                amount: Some(3.0),
                category: Some(" Travel ".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(expense.amount, 3.0);
        assert_eq!(expense.category, "Travel");
        assert_eq!(expense.description, "Lunch");
    }

    #[test]
    fn stored_document_uses_camel_case_fields() {
        let expense = wallet_input().into_expense(Some(ObjectId::new())).unwrap();
        let doc = mongodb::bson::to_document(&expense).unwrap();
        assert!(doc.contains_key("_id"));
        assert!(doc.contains_key("userId"));
        assert!(doc.contains_key("createdAt"));
        assert!(!doc.contains_key("groupId"));
        assert_eq!(doc.get_str("type").unwrap(), "wallet");
    }
}
