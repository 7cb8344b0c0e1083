use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;

use super::{load_group, path_id, require_creator, require_member};
use crate::app::AppState;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::schemas::{user::normalize_email, GroupInput, GroupUpdate};
use crate::store::ExpenseFilter;
use crate::summary::summarize_group;
use crate::views::{ExpenseView, GroupView, MessageView};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_group)
        .service(list_groups)
        .service(get_group)
        .service(update_group)
        .service(delete_group)
        .service(add_member)
        .service(remove_member)
        .service(group_expenses)
        .service(group_summary);
}

#[derive(Deserialize)]
struct AddMemberRequest {
    email: Option<String>,
}

#[post("")]
async fn create_group(
    state: web::Data<AppState>,
    auth: AuthUser,
    json: web::Json<GroupInput>,
) -> Result<HttpResponse, AppError> {
    let group = json.into_inner().into_group(Some(auth.0))?;
    for member in group.members.iter().filter(|member| **member != auth.0) {
        if state.store.find_user_by_id(*member).await?.is_none() {
            return Err(AppError::BadRequest(format!(
                "members contains unknown user {}",
                member
            )));
        }
    }

    state.store.insert_group(&group).await?;
    log::info!("user {} created group {}", auth.0, group.id);
    Ok(HttpResponse::Created().json(GroupView::from(group)))
}

#[get("")]
async fn list_groups(
    state: web::Data<AppState>,
    auth: AuthUser,
) -> Result<HttpResponse, AppError> {
    let groups = state.store.list_groups_for_member(auth.0).await?;
    Ok(HttpResponse::Ok().json(groups.into_iter().map(GroupView::from).collect::<Vec<_>>()))
}

#[get("/{id}")]
async fn get_group(
    state: web::Data<AppState>,
    auth: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let group = load_group(state.store.as_ref(), path_id(&id)?).await?;
    require_member(&group, auth.0)?;
    Ok(HttpResponse::Ok().json(GroupView::from(group)))
}

#[put("/{id}")]
async fn update_group(
    state: web::Data<AppState>,
    auth: AuthUser,
    id: web::Path<String>,
    json: web::Json<GroupUpdate>,
) -> Result<HttpResponse, AppError> {
    let store = state.store.as_ref();
    let group = load_group(store, path_id(&id)?).await?;
    require_creator(&group, auth.0)?;

    let (name, description) = json.into_inner().resolve(&group)?;
    if !store
        .update_group_details(group.id, &name, &description)
        .await?
    {
        return Err(AppError::NotFound("Group not found"));
    }
    let group = load_group(store, group.id).await?;
    Ok(HttpResponse::Ok().json(GroupView::from(group)))
}

#[delete("/{id}")]
async fn delete_group(
    state: web::Data<AppState>,
    auth: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let store = state.store.as_ref();
    let group = load_group(store, path_id(&id)?).await?;
    require_creator(&group, auth.0)?;

    let removed = store.delete_group_expenses(group.id).await?;
    store.delete_group(group.id).await?;
    log::info!(
        "user {} deleted group {} and {} of its expenses",
        auth.0,
        group.id,
        removed
    );
    Ok(HttpResponse::Ok().json(MessageView {
        message: "Group deleted",
    }))
}

#[post("/{id}/members")]
async fn add_member(
    state: web::Data<AppState>,
    auth: AuthUser,
    id: web::Path<String>,
    json: web::Json<AddMemberRequest>,
) -> Result<HttpResponse, AppError> {
    let store = state.store.as_ref();
    let group = load_group(store, path_id(&id)?).await?;
    require_creator(&group, auth.0)?;

    let email = normalize_email(json.into_inner().email)?;
    let user = store
        .find_user_by_email(&email)
        .await?
        .ok_or(AppError::NotFound("User not found"))?;
    if group.is_member(user.id) {
        return Err(AppError::Conflict("User is already a member"));
    }

    store.add_group_member(group.id, user.id).await?;
    let group = load_group(store, group.id).await?;
    Ok(HttpResponse::Ok().json(GroupView::from(group)))
}

#[delete("/{id}/members/{user_id}")]
async fn remove_member(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let store = state.store.as_ref();
    let (group_id, member) = path.into_inner();
    let group = load_group(store, path_id(&group_id)?).await?;
    let member = path_id(&member)?;

    if member != auth.0 {
        require_creator(&group, auth.0)?;
    }
    if group.is_creator(member) {
        return Err(AppError::BadRequest(
            "The group creator cannot be removed".to_string(),
        ));
    }
    if !group.is_member(member) {
        return Err(AppError::NotFound("User is not a member of this group"));
    }

    store.remove_group_member(group.id, member).await?;
    let group = load_group(store, group.id).await?;
    Ok(HttpResponse::Ok().json(GroupView::from(group)))
}

#[get("/{id}/expenses")]
async fn group_expenses(
    state: web::Data<AppState>,
    auth: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let store = state.store.as_ref();
    let group = load_group(store, path_id(&id)?).await?;
    require_member(&group, auth.0)?;

    let expenses = store
        .list_expenses(&ExpenseFilter::for_group(group.id))
        .await?;
    Ok(HttpResponse::Ok().json(
        expenses
            .into_iter()
            .map(ExpenseView::from)
            .collect::<Vec<_>>(),
    ))
}

#[get("/{id}/summary")]
async fn group_summary(
    state: web::Data<AppState>,
    auth: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let store = state.store.as_ref();
    let group = load_group(store, path_id(&id)?).await?;
    require_member(&group, auth.0)?;

    let expenses = store
        .list_expenses(&ExpenseFilter::for_group(group.id))
        .await?;
    Ok(HttpResponse::Ok().json(summarize_group(&group, &expenses)))
}
