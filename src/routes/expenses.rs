use actix_web::{delete, get, post, put, web, HttpResponse};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;

use super::{load_group, path_id, require_member};
use crate::app::AppState;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::schemas::{parse_object_id, Expense, ExpenseInput, ExpenseType, ExpenseUpdate, UserId};
use crate::store::{ExpenseFilter, Store};
use crate::summary::summarize_expenses;
use crate::views::{ExpenseView, MessageView};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_expense)
        .service(list_expenses)
        .service(expense_summary)
        .service(get_expense)
        .service(update_expense)
        .service(delete_expense);
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExpenseQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
    group_id: Option<String>,
    category: Option<String>,
}

impl ExpenseQuery {
    fn into_filter(self, user_id: UserId) -> Result<ExpenseFilter, AppError> {
        Ok(ExpenseFilter {
            kind: self.kind.as_deref().map(ExpenseType::parse).transpose()?,
            group_id: self
                .group_id
                .as_deref()
                .map(|raw| parse_object_id("groupId", raw))
                .transpose()?,
            category: self
                .category
                .map(|category| category.trim().to_string())
                .filter(|category| !category.is_empty()),
            ..ExpenseFilter::for_user(user_id)
        })
    }
}

async fn load_expense(store: &dyn Store, id: ObjectId) -> Result<Expense, AppError> {
    store
        .find_expense(id)
        .await?
        .ok_or(AppError::NotFound("Expense not found"))
}

async fn load_owned_expense(
    store: &dyn Store,
    id: ObjectId,
    user: UserId,
) -> Result<Expense, AppError> {
    let expense = load_expense(store, id).await?;
    if expense.user_id != user {
        return Err(AppError::Forbidden("You can only change your own expenses"));
    }
    Ok(expense)
}

/// Inserts the expense and adds it to its group's total. If the group was
/// deleted after the membership check, the expense is removed again.
async fn store_expense(store: &dyn Store, expense: &Expense) -> Result<(), AppError> {
    store.insert_expense(expense).await?;
    if let Some(group_id) = expense.group_id {
        if !store.increment_group_total(group_id, expense.amount).await? {
            store.delete_expense(expense.id).await?;
            return Err(AppError::NotFound("Group not found"));
        }
    }
    Ok(())
}

#[post("")]
async fn create_expense(
    state: web::Data<AppState>,
    auth: AuthUser,
    json: web::Json<ExpenseInput>,
) -> Result<HttpResponse, AppError> {
    let store = state.store.as_ref();
    let expense = json.into_inner().into_expense(Some(auth.0))?;
    if let Some(group_id) = expense.group_id {
        let group = load_group(store, group_id).await?;
        require_member(&group, auth.0)?;
    }

    store_expense(store, &expense).await?;
    log::debug!("user {} added {} expense {}", auth.0, expense.kind.as_str(), expense.id);
    Ok(HttpResponse::Created().json(ExpenseView::from(expense)))
}

#[get("")]
async fn list_expenses(
    state: web::Data<AppState>,
    auth: AuthUser,
    query: web::Query<ExpenseQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = query.into_inner().into_filter(auth.0)?;
    let expenses = state.store.list_expenses(&filter).await?;
    Ok(HttpResponse::Ok().json(
        expenses
            .into_iter()
            .map(ExpenseView::from)
            .collect::<Vec<_>>(),
    ))
}

#[get("/summary")]
async fn expense_summary(
    state: web::Data<AppState>,
    auth: AuthUser,
    query: web::Query<ExpenseQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = query.into_inner().into_filter(auth.0)?;
    let expenses = state.store.list_expenses(&filter).await?;
    Ok(HttpResponse::Ok().json(summarize_expenses(&expenses)))
}

#[get("/{id}")]
async fn get_expense(
    state: web::Data<AppState>,
    auth: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let store = state.store.as_ref();
    let expense = load_expense(store, path_id(&id)?).await?;
    if expense.user_id != auth.0 {
        let group_id = expense
            .group_id
            .ok_or(AppError::Forbidden("You cannot view this expense"))?;
        let group = load_group(store, group_id).await?;
        require_member(&group, auth.0)?;
    }
    Ok(HttpResponse::Ok().json(ExpenseView::from(expense)))
}

#[put("/{id}")]
async fn update_expense(
    state: web::Data<AppState>,
    auth: AuthUser,
    id: web::Path<String>,
    json: web::Json<ExpenseUpdate>,
) -> Result<HttpResponse, AppError> {
    let store = state.store.as_ref();
    let mut expense = load_owned_expense(store, path_id(&id)?, auth.0).await?;
    let previous_amount = expense.amount;
    expense.apply(json.into_inner())?;

    if !store.replace_expense(&expense).await? {
        return Err(AppError::NotFound("Expense not found"));
    }
    if let Some(group_id) = expense.group_id {
        let delta = expense.amount - previous_amount;
        if delta != 0.0 {
            store.increment_group_total(group_id, delta).await?;
        }
    }
    Ok(HttpResponse::Ok().json(ExpenseView::from(expense)))
}

#[delete("/{id}")]
async fn delete_expense(
    state: web::Data<AppState>,
    auth: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let store = state.store.as_ref();
    let expense = load_owned_expense(store, path_id(&id)?, auth.0).await?;

    if !store.delete_expense(expense.id).await? {
        return Err(AppError::NotFound("Expense not found"));
    }
    if let Some(group_id) = expense.group_id {
        store
            .increment_group_total(group_id, -expense.amount)
            .await?;
    }
    Ok(HttpResponse::Ok().json(MessageView {
        message: "Expense deleted",
    }))
}
