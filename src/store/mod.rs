//! Persistence for users, expenses and groups.
//!
//! Handlers only see the [`Store`] trait. [`MongoStore`] backs the running
//! service; tests run against an in-process `MemoryStore`.

use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId, Document};
use thiserror::Error;

use crate::schemas::{Expense, ExpenseType, Group, User, UserId};

#[cfg(test)]
mod memory;
mod mongo;

#[cfg(test)]
pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("{0} already exists")]
    Duplicate(&'static str),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Which expenses to return from [`Store::list_expenses`]. Unset fields
/// match everything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpenseFilter {
    pub user_id: Option<UserId>,
    pub group_id: Option<ObjectId>,
    pub kind: Option<ExpenseType>,
    pub category: Option<String>,
}

impl ExpenseFilter {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn for_group(group_id: ObjectId) -> Self {
        Self {
            group_id: Some(group_id),
            ..Default::default()
        }
    }

    pub(crate) fn to_document(&self) -> Document {
        let mut filter = doc! {};
        if let Some(user_id) = self.user_id {
            filter.insert("userId", user_id);
        }
        if let Some(group_id) = self.group_id {
            filter.insert("groupId", group_id);
        }
        if let Some(kind) = self.kind {
            filter.insert("type", kind.as_str());
        }
        if let Some(category) = &self.category {
            filter.insert("category", category.as_str());
        }
        filter
    }

    #[cfg(test)]
    pub(crate) fn matches(&self, expense: &Expense) -> bool {
        self.user_id.map_or(true, |id| expense.user_id == id)
            && self.group_id.map_or(true, |id| expense.group_id == Some(id))
            && self.kind.map_or(true, |kind| expense.kind == kind)
            && self
                .category
                .as_ref()
                .map_or(true, |category| &expense.category == category)
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the e-mail is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn find_user_by_id(&self, id: UserId) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn insert_expense(&self, expense: &Expense) -> StoreResult<()>;
    async fn find_expense(&self, id: ObjectId) -> StoreResult<Option<Expense>>;
    /// Newest `date` first.
    async fn list_expenses(&self, filter: &ExpenseFilter) -> StoreResult<Vec<Expense>>;
    async fn replace_expense(&self, expense: &Expense) -> StoreResult<bool>;
    async fn delete_expense(&self, id: ObjectId) -> StoreResult<bool>;
    async fn delete_group_expenses(&self, group_id: ObjectId) -> StoreResult<u64>;

    async fn insert_group(&self, group: &Group) -> StoreResult<()>;
    async fn find_group(&self, id: ObjectId) -> StoreResult<Option<Group>>;
    /// Newest group first.
    async fn list_groups_for_member(&self, user_id: UserId) -> StoreResult<Vec<Group>>;
    async fn update_group_details(
        &self,
        id: ObjectId,
        name: &str,
        description: &str,
    ) -> StoreResult<bool>;
    async fn add_group_member(&self, id: ObjectId, user_id: UserId) -> StoreResult<bool>;
    async fn remove_group_member(&self, id: ObjectId, user_id: UserId) -> StoreResult<bool>;
    async fn delete_group(&self, id: ObjectId) -> StoreResult<bool>;
    /// Atomically adds `delta` (possibly negative) to `totalExpense`.
    /// Returns `false` when the group no longer exists.
    async fn increment_group_total(&self, id: ObjectId, delta: f64) -> StoreResult<bool>;
}
