//! JSON shapes returned by the API. Stored documents use BSON ids and dates,
//! clients get hex strings and RFC 3339 timestamps.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::schemas::{Expense, ExpenseType, Group, User};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_hex(),
            name: user.name,
            email: user.email,
            created_at: user.created_at.to_chrono(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthView {
    pub token: String,
    pub user: UserView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseView {
    pub id: String,
    pub amount: f64,
    pub description: String,
    pub category: String,
    pub date: DateTime<Utc>,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: ExpenseType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Expense> for ExpenseView {
    fn from(expense: Expense) -> Self {
        Self {
            id: expense.id.to_hex(),
            amount: expense.amount,
            description: expense.description,
            category: expense.category,
            date: expense.date.to_chrono(),
            user_id: expense.user_id.to_hex(),
            group_id: expense.group_id.map(|id| id.to_hex()),
            kind: expense.kind,
            created_at: expense.created_at.to_chrono(),
            updated_at: expense.updated_at.to_chrono(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub members: Vec<String>,
    pub created_by: String,
    pub total_expense: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Group> for GroupView {
    fn from(group: Group) -> Self {
        Self {
            id: group.id.to_hex(),
            name: group.name,
            description: group.description,
            members: group.members.iter().map(|id| id.to_hex()).collect(),
            created_by: group.created_by.to_hex(),
            total_expense: group.total_expense,
            created_at: group.created_at.to_chrono(),
            updated_at: group.updated_at.to_chrono(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageView {
    pub message: &'static str,
}
