use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::{optional_text, parse_object_id, required_text, UserId, ValidationError};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub members: Vec<UserId>,
    pub created_by: UserId,
    #[serde(default)]
    pub total_expense: f64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInput {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
}

impl GroupInput {
    /// Builds a new group. The creator is always the first member and
    /// repeated member ids are dropped.
    pub fn into_group(self, created_by: Option<UserId>) -> Result<Group, ValidationError> {
        let name = required_text("name", self.name)?;
        let created_by = created_by.ok_or(ValidationError::Required("createdBy"))?;

        let mut members = vec![created_by];
        for raw in &self.members {
            let member = parse_object_id("members", raw)?;
            if !members.contains(&member) {
                members.push(member);
            }
        }

        let now = DateTime::now();
        Ok(Group {
            id: ObjectId::new(),
            name,
            description: optional_text(self.description),
            members,
            created_by,
            total_expense: 0.0,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl GroupUpdate {
    /// Validated `(name, description)` pair for the group being updated.
    pub fn resolve(self, group: &Group) -> Result<(String, String), ValidationError> {
        let name = match self.name {
            Some(name) => required_text("name", Some(name))?,
            None => group.name.clone(),
        };
        let description = match self.description {
            Some(description) => optional_text(Some(description)),
            None => group.description.clone(),
        };
        Ok((name, description))
    }
}

impl Group {
    pub fn is_member(&self, user: UserId) -> bool {
        self.members.contains(&user)
    }

    pub fn is_creator(&self, user: UserId) -> bool {
        self.created_by == user
    }
}
