use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime};
use tokio::sync::RwLock;

use super::{ExpenseFilter, Store, StoreError, StoreResult};
use crate::schemas::{Expense, Group, User, UserId};

/// In-process store with the same observable behaviour as [`super::MongoStore`].
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    expenses: RwLock<Vec<Expense>>,
    groups: RwLock<Vec<Group>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn modify_group(&self, id: ObjectId, change: impl FnOnce(&mut Group)) -> bool {
        let mut groups = self.groups.write().await;
        match groups.iter_mut().find(|group| group.id == id) {
            Some(group) => {
                change(group);
                group.updated_at = DateTime::now();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().await;
        if users.iter().any(|existing| existing.email == user.email) {
            return Err(StoreError::Duplicate("email"));
        }
        users.push(user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|user| user.email == email).cloned())
    }

    async fn insert_expense(&self, expense: &Expense) -> StoreResult<()> {
        self.expenses.write().await.push(expense.clone());
        Ok(())
    }

    async fn find_expense(&self, id: ObjectId) -> StoreResult<Option<Expense>> {
        let expenses = self.expenses.read().await;
        Ok(expenses.iter().find(|expense| expense.id == id).cloned())
    }

    async fn list_expenses(&self, filter: &ExpenseFilter) -> StoreResult<Vec<Expense>> {
        let expenses = self.expenses.read().await;
        let mut found: Vec<Expense> = expenses
            .iter()
            .filter(|expense| filter.matches(expense))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
        Ok(found)
    }

    async fn replace_expense(&self, expense: &Expense) -> StoreResult<bool> {
        let mut expenses = self.expenses.write().await;
        match expenses.iter_mut().find(|stored| stored.id == expense.id) {
            Some(stored) => {
                *stored = expense.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_expense(&self, id: ObjectId) -> StoreResult<bool> {
        let mut expenses = self.expenses.write().await;
        let before = expenses.len();
        expenses.retain(|expense| expense.id != id);
        Ok(expenses.len() < before)
    }

    async fn delete_group_expenses(&self, group_id: ObjectId) -> StoreResult<u64> {
        let mut expenses = self.expenses.write().await;
        let before = expenses.len();
        expenses.retain(|expense| expense.group_id != Some(group_id));
        Ok((before - expenses.len()) as u64)
    }

    async fn insert_group(&self, group: &Group) -> StoreResult<()> {
        self.groups.write().await.push(group.clone());
        Ok(())
    }

    async fn find_group(&self, id: ObjectId) -> StoreResult<Option<Group>> {
        let groups = self.groups.read().await;
        Ok(groups.iter().find(|group| group.id == id).cloned())
    }

    async fn list_groups_for_member(&self, user_id: UserId) -> StoreResult<Vec<Group>> {
        let groups = self.groups.read().await;
        let mut found: Vec<Group> = groups
            .iter()
            .filter(|group| group.is_member(user_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(found)
    }

    async fn update_group_details(
        &self,
        id: ObjectId,
        name: &str,
        description: &str,
    ) -> StoreResult<bool> {
        Ok(self
            .modify_group(id, |group| {
                group.name = name.to_string();
                group.description = description.to_string();
            })
            .await)
    }

    async fn add_group_member(&self, id: ObjectId, user_id: UserId) -> StoreResult<bool> {
        Ok(self
            .modify_group(id, |group| {
                if !group.is_member(user_id) {
                    group.members.push(user_id);
                }
            })
            .await)
    }

    async fn remove_group_member(&self, id: ObjectId, user_id: UserId) -> StoreResult<bool> {
        Ok(self
            .modify_group(id, |group| group.members.retain(|member| *member != user_id))
            .await)
    }

    async fn delete_group(&self, id: ObjectId) -> StoreResult<bool> {
        let mut groups = self.groups.write().await;
        let before = groups.len();
        groups.retain(|group| group.id != id);
        Ok(groups.len() < before)
    }

    async fn increment_group_total(&self, id: ObjectId, delta: f64) -> StoreResult<bool> {
        Ok(self
            .modify_group(id, |group| group.total_expense += delta)
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::{ExpenseInput, GroupInput, Registration};

    fn user(email: &str) -> User {
        let registration = Registration {
            name: "Test".to_string(),
            email: email.to_string(),
            password: "secret".to_string(),
        };
        User::new(&registration, "hash".to_string())
    }

    fn group_expense(user: UserId, group: ObjectId, amount: f64) -> Expense {
        ExpenseInput {
            amount: Some(amount),
            description: Some("groceries".to_string()),
            category: Some("Food".to_string()),
            kind: Some("group".to_string()),
            group_id: Some(group.to_hex()),
            ..Default::default()
        }
        .into_expense(Some(user))
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        store.insert_user(&user("a@b.c")).await.unwrap();
        let err = store.insert_user(&user("a@b.c")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("email")));
        assert!(store.find_user_by_email("a@b.c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn group_total_and_membership_updates() {
        let store = MemoryStore::new();
        let creator = ObjectId::new();
        let friend = ObjectId::new();
        let group = GroupInput {
            name: Some("Trip".to_string()),
            ..Default::default()
        }
        .into_group(Some(creator))
        .unwrap();
        store.insert_group(&group).await.unwrap();

        assert!(store.increment_group_total(group.id, 30.0).await.unwrap());
        assert!(store.increment_group_total(group.id, -10.0).await.unwrap());
        assert!(!store.increment_group_total(ObjectId::new(), 5.0).await.unwrap());
        assert!(store.add_group_member(group.id, friend).await.unwrap());
        assert!(store.add_group_member(group.id, friend).await.unwrap());

        let stored = store.find_group(group.id).await.unwrap().unwrap();
        assert_eq!(stored.total_expense, 20.0);
        assert_eq!(stored.members, vec![creator, friend]);
        assert_eq!(store.list_groups_for_member(friend).await.unwrap().len(), 1);

        assert!(store.remove_group_member(group.id, friend).await.unwrap());
        assert!(store.list_groups_for_member(friend).await.unwrap().is_empty());
        assert!(!store.add_group_member(ObjectId::new(), friend).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_group_expenses_keeps_others() {
        let store = MemoryStore::new();
        let owner = ObjectId::new();
        let group = ObjectId::new();
        let other = ObjectId::new();
        store
            .insert_expense(&group_expense(owner, group, 5.0))
            .await
            .unwrap();
        store
            .insert_expense(&group_expense(owner, group, 7.0))
            .await
            .unwrap();
        store
            .insert_expense(&group_expense(owner, other, 9.0))
            .await
            .unwrap();

        assert_eq!(store.delete_group_expenses(group).await.unwrap(), 2);
        let left = store
            .list_expenses(&ExpenseFilter::for_user(owner))
            .await
            .unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].group_id, Some(other));
    }
}
