//! Staff-only management of categories, locations and post publication.

use actix_web::{HttpResponse, web};

use blogicum_core::domain::{Category, Id, Location, NewCategory, NewLocation, Post};
use blogicum_core::DomainError;
use blogicum_shared::ApiResponse;
use blogicum_shared::dto::{
    CategoryForm, CategoryUpdate, LocationForm, LocationUpdate, PostModeration,
};

use crate::handlers::forms::{validate_category, validate_location};
use crate::middleware::auth::StaffIdentity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /moderation/categories/
pub async fn create_category(
    staff: StaffIdentity,
    state: web::Data<AppState>,
    body: web::Json<CategoryForm>,
) -> AppResult<HttpResponse> {
    let form = body.into_inner();
    validate_category(&form)?;

    let category = state
        .categories
        .create(NewCategory {
            title: form.title,
            description: form.description,
            slug: form.slug,
            is_published: form.is_published,
        })
        .await?;

    tracing::info!(staff = staff.0.user_id, category = category.id, "Category created");
    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(category, "Category created")))
}

/// POST /moderation/categories/{id}/
pub async fn update_category(
    staff: StaffIdentity,
    state: web::Data<AppState>,
    path: web::Path<Id>,
    body: web::Json<CategoryUpdate>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let current = state
        .categories
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Category", id))?;

    let patch = body.into_inner();
    let form = CategoryForm {
        title: patch.title.unwrap_or(current.title),
        description: patch.description.unwrap_or(current.description),
        slug: patch.slug.unwrap_or(current.slug),
        is_published: patch.is_published.unwrap_or(current.is_published),
    };
    validate_category(&form)?;

    let category = state
        .categories
        .update(Category {
            title: form.title,
            description: form.description,
            slug: form.slug,
            is_published: form.is_published,
            ..current
        })
        .await?;

    tracing::info!(staff = staff.0.user_id, category = id, "Category updated");
    Ok(HttpResponse::Ok().json(ApiResponse::ok(category)))
}

/// POST /moderation/locations/
pub async fn create_location(
    staff: StaffIdentity,
    state: web::Data<AppState>,
    body: web::Json<LocationForm>,
) -> AppResult<HttpResponse> {
    let form = body.into_inner();
    validate_location(&form)?;

    let location = state
        .locations
        .create(NewLocation {
            name: form.name,
            is_published: form.is_published,
        })
        .await?;

    tracing::info!(staff = staff.0.user_id, location = location.id, "Location created");
    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(location, "Location created")))
}

/// POST /moderation/locations/{id}/
pub async fn update_location(
    staff: StaffIdentity,
    state: web::Data<AppState>,
    path: web::Path<Id>,
    body: web::Json<LocationUpdate>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let current = state
        .locations
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Location", id))?;

    let patch = body.into_inner();
    let form = LocationForm {
        name: patch.name.unwrap_or(current.name),
        is_published: patch.is_published.unwrap_or(current.is_published),
    };
    validate_location(&form)?;

    let location = state
        .locations
        .update(Location {
            name: form.name,
            is_published: form.is_published,
            ..current
        })
        .await?;

    tracing::info!(staff = staff.0.user_id, location = id, "Location updated");
    Ok(HttpResponse::Ok().json(ApiResponse::ok(location)))
}

/// POST /moderation/posts/{id}/
///
/// Publishes, unpublishes or reschedules any post regardless of author.
pub async fn moderate_post(
    staff: StaffIdentity,
    state: web::Data<AppState>,
    path: web::Path<Id>,
    body: web::Json<PostModeration>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let current = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Post", id))?;

    let patch = body.into_inner();
    let post = state
        .posts
        .update(Post {
            is_published: patch.is_published.unwrap_or(current.is_published),
            pub_date: patch.pub_date.unwrap_or(current.pub_date),
            ..current
        })
        .await?;

    tracing::info!(
        staff = staff.0.user_id,
        post_id = id,
        is_published = post.is_published,
        "Post moderated"
    );
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post)))
}
