use actix_web::web;
use mongodb::bson::oid::ObjectId;

use crate::error::AppError;
use crate::schemas::{parse_object_id, Group, UserId};
use crate::store::Store;

pub mod auth;
pub mod expenses;
pub mod groups;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api/auth").configure(auth::configure))
        .service(web::scope("/api/expenses").configure(expenses::configure))
        .service(web::scope("/api/groups").configure(groups::configure));
}

fn path_id(raw: &str) -> Result<ObjectId, AppError> {
    Ok(parse_object_id("id", raw)?)
}

async fn load_group(store: &dyn Store, id: ObjectId) -> Result<Group, AppError> {
    store
        .find_group(id)
        .await?
        .ok_or(AppError::NotFound("Group not found"))
}

fn require_member(group: &Group, user: UserId) -> Result<(), AppError> {
    if group.is_member(user) {
        Ok(())
    } else {
        Err(AppError::Forbidden("You are not a member of this group"))
    }
}

fn require_creator(group: &Group, user: UserId) -> Result<(), AppError> {
    if group.is_creator(user) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only the group creator can do this"))
    }
}
