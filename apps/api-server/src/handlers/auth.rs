//! Authentication handlers.

use actix_web::{HttpResponse, web};
use std::sync::Arc;

use blogicum_core::DomainError;
use blogicum_core::domain::{NewUser, User};
use blogicum_core::ports::{AuthError, PasswordService, TokenService};
use blogicum_shared::dto::{AuthResponse, LoginRequest, RegisterUserRequest};

use crate::handlers::forms::validate_registration;
use crate::handlers::profile::{current_user, profile_view};
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn issue_token(
    state: &AppState,
    token_service: &Arc<dyn TokenService>,
    user: &User,
) -> AppResult<AuthResponse> {
    let token = token_service
        .generate_token(user.id, &user.username, state.roles_for(&user.username))
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(AuthResponse::bearer(
        token,
        token_service.expiration_seconds().max(0) as u64,
    ))
}

/// POST /auth/registration/
pub async fn register(
    state: web::Data<AppState>,
    token_service: web::Data<Arc<dyn TokenService>>,
    password_service: web::Data<Arc<dyn PasswordService>>,
    body: web::Json<RegisterUserRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    validate_registration(&req)?;

    if state.users.find_by_username(&req.username).await?.is_some() {
        return Err(DomainError::Duplicate("Username already registered".to_string()).into());
    }

    let password_hash = password_service.hash(&req.password)?;

    let user = state
        .users
        .create(NewUser {
            username: req.username,
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            password_hash,
        })
        .await?;

    tracing::info!(user = user.id, username = %user.username, "User registered");
    Ok(HttpResponse::Created().json(issue_token(&state, &token_service, &user)?))
}

/// POST /auth/login/
pub async fn login(
    state: web::Data<AppState>,
    token_service: web::Data<Arc<dyn TokenService>>,
    password_service: web::Data<Arc<dyn PasswordService>>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let user = state
        .users
        .find_by_username(&req.username)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !password_service.verify(&req.password, &user.password_hash)? {
        tracing::debug!(username = %req.username, "Login rejected");
        return Err(AuthError::InvalidCredentials.into());
    }

    Ok(HttpResponse::Ok().json(issue_token(&state, &token_service, &user)?))
}

/// GET /auth/me/
pub async fn me(identity: Identity, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let user = current_user(&state, &identity).await?;

    Ok(HttpResponse::Ok().json(profile_view(user, true)))
}
