use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::{hash_password, verify_login, AuthError, AuthUser};
use crate::error::AppError;
use crate::schemas::{user::normalize_email, RegisterInput, User};
use crate::views::{AuthView, UserView};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(register).service(login).service(me);
}

#[derive(Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[post("/register")]
async fn register(
    state: web::Data<AppState>,
    json: web::Json<RegisterInput>,
) -> Result<HttpResponse, AppError> {
    let registration = json.into_inner().validate()?;
    if state
        .store
        .find_user_by_email(&registration.email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Email already registered"));
    }

    let password_hash = hash_password(&registration.password)?;
    let user = User::new(&registration, password_hash);
    state.store.insert_user(&user).await?;
    log::info!("registered user {}", user.id);

    let token = state.tokens.issue(user.id)?;
    Ok(HttpResponse::Created().json(AuthView {
        token,
        user: user.into(),
    }))
}

#[post("/login")]
async fn login(
    state: web::Data<AppState>,
    json: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let LoginRequest { email, password } = json.into_inner();
    let email = normalize_email(email).map_err(|_| AuthError::InvalidCredentials)?;
    let password = password.ok_or(AuthError::InvalidCredentials)?;

    let user = state.store.find_user_by_email(&email).await?;
    let verified = verify_login(
        user.as_ref().map(|user| user.password_hash.as_str()),
        &password,
    );
    let user = user
        .filter(|_| verified)
        .ok_or(AuthError::InvalidCredentials)?;

    let token = state.tokens.issue(user.id)?;
    Ok(HttpResponse::Ok().json(AuthView {
        token,
        user: user.into(),
    }))
}

#[get("/me")]
async fn me(state: web::Data<AppState>, auth: AuthUser) -> Result<HttpResponse, AppError> {
    let user = state
        .store
        .find_user_by_id(auth.0)
        .await?
        .ok_or(AuthError::InvalidToken)?;
    Ok(HttpResponse::Ok().json(UserView::from(user)))
}
