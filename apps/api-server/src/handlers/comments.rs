//! Comment mutations. Every outcome, allowed or not, lands on the post page.

use actix_web::{HttpResponse, web};

use blogicum_core::domain::{Comment, Id, NewComment};
use blogicum_core::{Access, DomainError, guard};
use blogicum_shared::dto::CommentForm;

use crate::handlers::forms::validate_comment;
use crate::handlers::posts::denied;
use crate::handlers::urls;
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// The comment, only if it belongs to `post_id`.
async fn load_comment(state: &AppState, post_id: Id, comment_id: Id) -> AppResult<Comment> {
    state
        .comments
        .find_by_id(comment_id)
        .await?
        .filter(|comment| comment.post_id == post_id)
        .ok_or_else(|| DomainError::not_found("Comment", comment_id).into())
}

/// POST /posts/{id}/comment/
pub async fn add_comment(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Id>,
    body: web::Json<CommentForm>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    if state.posts.find_by_id(post_id).await?.is_none() {
        return Err(DomainError::not_found("Post", post_id).into());
    }

    let text = validate_comment(body.into_inner())?;
    let comment = state
        .comments
        .create(NewComment {
            text,
            post_id,
            author_id: identity.user_id,
        })
        .await?;

    tracing::debug!(comment_id = comment.id, post_id, "Comment added");
    Ok(urls::redirect(urls::post_detail(post_id)))
}

/// GET /posts/{post_id}/edit_comment/{comment_id}/
pub async fn edit_comment_form(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<(Id, Id)>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let comment = load_comment(&state, post_id, comment_id).await?;
    if let Access::Denied(reason) = guard(identity.user_id, &comment) {
        return Ok(denied(reason, post_id));
    }

    Ok(HttpResponse::Ok().json(CommentForm { text: comment.text }))
}

/// POST /posts/{post_id}/edit_comment/{comment_id}/
pub async fn edit_comment(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<(Id, Id)>,
    body: web::Json<CommentForm>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let comment = load_comment(&state, post_id, comment_id).await?;
    if let Access::Denied(reason) = guard(identity.user_id, &comment) {
        return Ok(denied(reason, post_id));
    }

    let text = validate_comment(body.into_inner())?;
    state.comments.update(Comment { text, ..comment }).await?;

    Ok(urls::redirect(urls::post_detail(post_id)))
}

/// POST /posts/{post_id}/delete_comment/{comment_id}/
pub async fn delete_comment(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<(Id, Id)>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let comment = load_comment(&state, post_id, comment_id).await?;
    if let Access::Denied(reason) = guard(identity.user_id, &comment) {
        return Ok(denied(reason, post_id));
    }

    state.comments.delete(comment.id).await?;

    tracing::debug!(comment_id, post_id, "Comment deleted");
    Ok(urls::redirect(urls::post_detail(post_id)))
}
