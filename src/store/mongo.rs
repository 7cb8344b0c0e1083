use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime},
    error::{ErrorKind, WriteFailure},
    options::{FindOptions, IndexOptions},
    Collection, Database, IndexModel,
};

use super::{ExpenseFilter, Store, StoreError, StoreResult};
use crate::schemas::{Expense, Group, User, UserId};

const DUPLICATE_KEY: i32 = 11000;

pub struct MongoStore {
    users: Collection<User>,
    expenses: Collection<Expense>,
    groups: Collection<Group>,
}

impl MongoStore {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection("users"),
            expenses: db.collection("expenses"),
            groups: db.collection("groups"),
        }
    }

    /// Creates the indexes the queries rely on. Safe to run on every start.
    pub async fn init(&self) -> StoreResult<()> {
        let unique_email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.users.create_index(unique_email, None).await?;

        let by_owner = IndexModel::builder()
            .keys(doc! { "userId": 1, "date": -1 })
            .build();
        let by_group = IndexModel::builder()
            .keys(doc! { "groupId": 1, "date": -1 })
            .build();
        self.expenses
            .create_indexes([by_owner, by_group], None)
            .await?;

        let by_member = IndexModel::builder().keys(doc! { "members": 1 }).build();
        self.groups.create_index(by_member, None).await?;
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref failure)) if failure.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl Store for MongoStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        match self.users.insert_one(user, None).await {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => Err(StoreError::Duplicate("email")),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_user_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.users.find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users.find_one(doc! { "email": email }, None).await?)
    }

    async fn insert_expense(&self, expense: &Expense) -> StoreResult<()> {
        self.expenses.insert_one(expense, None).await?;
        Ok(())
    }

    async fn find_expense(&self, id: ObjectId) -> StoreResult<Option<Expense>> {
        Ok(self.expenses.find_one(doc! { "_id": id }, None).await?)
    }

    async fn list_expenses(&self, filter: &ExpenseFilter) -> StoreResult<Vec<Expense>> {
        let options = FindOptions::builder()
            .sort(doc! { "date": -1, "_id": -1 })
            .build();
        let cursor = self.expenses.find(filter.to_document(), options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn replace_expense(&self, expense: &Expense) -> StoreResult<bool> {
        let result = self
            .expenses
            .replace_one(doc! { "_id": expense.id }, expense, None)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_expense(&self, id: ObjectId) -> StoreResult<bool> {
        let result = self.expenses.delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_group_expenses(&self, group_id: ObjectId) -> StoreResult<u64> {
        let result = self
            .expenses
            .delete_many(doc! { "groupId": group_id }, None)
            .await?;
        Ok(result.deleted_count)
    }

    async fn insert_group(&self, group: &Group) -> StoreResult<()> {
        self.groups.insert_one(group, None).await?;
        Ok(())
    }

    async fn find_group(&self, id: ObjectId) -> StoreResult<Option<Group>> {
        Ok(self.groups.find_one(doc! { "_id": id }, None).await?)
    }

    async fn list_groups_for_member(&self, user_id: UserId) -> StoreResult<Vec<Group>> {
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1, "_id": -1 })
            .build();
        let cursor = self
            .groups
            .find(doc! { "members": user_id }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_group_details(
        &self,
        id: ObjectId,
        name: &str,
        description: &str,
    ) -> StoreResult<bool> {
        let result = self
            .groups
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "name": name,
                    "description": description,
                    "updatedAt": DateTime::now(),
                }},
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn add_group_member(&self, id: ObjectId, user_id: UserId) -> StoreResult<bool> {
        let result = self
            .groups
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$addToSet": { "members": user_id },
                    "$set": { "updatedAt": DateTime::now() },
                },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn remove_group_member(&self, id: ObjectId, user_id: UserId) -> StoreResult<bool> {
        let result = self
            .groups
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$pull": { "members": user_id },
                    "$set": { "updatedAt": DateTime::now() },
                },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_group(&self, id: ObjectId) -> StoreResult<bool> {
        let result = self.groups.delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn increment_group_total(&self, id: ObjectId, delta: f64) -> StoreResult<bool> {
        let result = self
            .groups
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$inc": { "totalExpense": delta },
                    "$set": { "updatedAt": DateTime::now() },
                },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }
}
