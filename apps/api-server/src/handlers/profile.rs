//! Profile page and profile editing.

use actix_web::{HttpResponse, web};
use chrono::Utc;

use blogicum_core::domain::User;
use blogicum_core::{DomainError, PostQuery, visible_posts};
use blogicum_shared::dto::{ProfileForm, ProfilePageResponse, ProfileResponse};

use crate::handlers::forms::validate_profile;
use crate::handlers::posts::{PageQuery, paginate};
use crate::handlers::urls;
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// Public view of `user`; the email is included only for its owner.
pub(super) fn profile_view(user: User, is_owner: bool) -> ProfileResponse {
    ProfileResponse {
        id: user.id,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        email: is_owner.then_some(user.email),
        date_joined: user.date_joined,
    }
}

/// Record of the authenticated user. A token can outlive its user.
pub(super) async fn current_user(state: &AppState, identity: &Identity) -> AppResult<User> {
    state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or_else(|| DomainError::not_found("User", identity.user_id).into())
}

/// GET /profile/{username}/
///
/// Owners see all of their posts, including unpublished and scheduled ones.
pub async fn profile(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let username = path.into_inner();
    let user = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| DomainError::not_found("User", &username))?;

    let is_owner = viewer.user_id() == Some(user.id);
    let filter = if is_owner {
        PostQuery::unrestricted().by_author(user.id)
    } else {
        visible_posts(Utc::now()).by_author(user.id)
    };
    let page = paginate(&state, &filter, query.selector()?).await?;

    Ok(HttpResponse::Ok().json(ProfilePageResponse {
        profile: profile_view(user, is_owner),
        page,
    }))
}

/// GET /edit_profile/
pub async fn edit_profile_form(
    identity: Identity,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let user = current_user(&state, &identity).await?;

    Ok(HttpResponse::Ok().json(ProfileForm {
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        email: user.email,
    }))
}

/// POST /edit_profile/
pub async fn edit_profile(
    identity: Identity,
    state: web::Data<AppState>,
    body: web::Json<ProfileForm>,
) -> AppResult<HttpResponse> {
    let user = current_user(&state, &identity).await?;
    let changed = validate_profile(&state, &user, body.into_inner()).await?;
    let saved = state.users.update(changed).await?;

    if saved.username != user.username {
        tracing::info!(user = saved.id, from = %user.username, to = %saved.username, "Username changed");
    }
    Ok(urls::redirect(urls::profile(&saved.username)))
}
