//! Post listings, detail and post mutations.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;

use blogicum_core::domain::{Id, NewPost, Post, PostWithRelations};
use blogicum_core::{
    Access, DenialReason, DomainError, Page, PageSelector, PostQuery, guard, visible_posts,
};
use blogicum_shared::dto::{CategoryPageResponse, CategorySummary, CommentForm, PostDetailResponse, PostForm};

use crate::handlers::forms::validate_post;
use crate::handlers::urls;
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// `?page=N` or `?page=last`.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn selector(&self) -> Result<PageSelector, DomainError> {
        PageSelector::parse(self.page.as_deref())
    }
}

/// The selected page of `query`; a page past the last one is not found.
pub(super) async fn paginate(
    state: &AppState,
    query: &PostQuery,
    selector: PageSelector,
) -> AppResult<Page<PostWithRelations>> {
    state
        .posts
        .page_filtered(query, selector)
        .await?
        .ok_or_else(|| DomainError::not_found("Page", format!("{selector:?}")).into())
}

/// Redirect for a refused mutation; the resource is left untouched.
pub(super) fn denied(reason: DenialReason, post_id: Id) -> HttpResponse {
    let DenialReason::NotAuthor { requester, author } = reason;
    tracing::info!(requester, author, post_id, "Mutation refused: requester is not the author");
    urls::redirect(urls::post_detail(post_id))
}

async fn load_post(state: &AppState, id: Id) -> AppResult<Post> {
    state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Post", id).into())
}

/// GET /
pub async fn index(state: web::Data<AppState>, query: web::Query<PageQuery>) -> AppResult<HttpResponse> {
    let page = paginate(&state, &visible_posts(Utc::now()), query.selector()?).await?;

    Ok(HttpResponse::Ok().json(page))
}

/// GET /category/{slug}/
pub async fn category_posts(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let slug = path.into_inner();
    let category = state
        .categories
        .find_published_by_slug(&slug)
        .await?
        .ok_or_else(|| DomainError::not_found("Category", &slug))?;

    let filter = visible_posts(Utc::now()).in_category(category.id);
    let page = paginate(&state, &filter, query.selector()?).await?;

    Ok(HttpResponse::Ok().json(CategoryPageResponse {
        category: CategorySummary {
            id: category.id,
            title: category.title,
            description: category.description,
            slug: category.slug,
        },
        page,
    }))
}

/// GET /posts/{id}/
///
/// Any existing post is shown, published or not.
pub async fn post_detail(state: web::Data<AppState>, path: web::Path<Id>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let post = state
        .posts
        .find_with_relations(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Post", id))?;
    let comments = state.comments.list_for_post(id).await?;

    Ok(HttpResponse::Ok().json(PostDetailResponse {
        post,
        comments,
        comment_form: CommentForm::default(),
    }))
}

/// POST /posts/create/
pub async fn create_post(
    identity: Identity,
    state: web::Data<AppState>,
    body: web::Json<PostForm>,
) -> AppResult<HttpResponse> {
    let fields = validate_post(&state, body.into_inner()).await?;

    let post = state
        .posts
        .create(NewPost {
            title: fields.title,
            text: fields.text,
            pub_date: fields.pub_date,
            is_published: true,
            image: fields.image,
            author_id: identity.user_id,
            category_id: Some(fields.category_id),
            location_id: fields.location_id,
        })
        .await?;

    tracing::info!(post_id = post.id, author = identity.user_id, "Post created");
    Ok(urls::redirect(urls::post_detail(post.id)))
}

/// GET /posts/{id}/edit/
pub async fn edit_post_form(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Id>,
) -> AppResult<HttpResponse> {
    let post = load_post(&state, path.into_inner()).await?;
    if let Access::Denied(reason) = guard(identity.user_id, &post) {
        return Ok(denied(reason, post.id));
    }

    Ok(HttpResponse::Ok().json(PostForm {
        title: post.title,
        text: post.text,
        pub_date: Some(post.pub_date),
        category_id: post.category_id,
        location_id: post.location_id,
        image: post.image,
    }))
}

/// POST /posts/{id}/edit/
pub async fn edit_post(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Id>,
    body: web::Json<PostForm>,
) -> AppResult<HttpResponse> {
    let post = load_post(&state, path.into_inner()).await?;
    if let Access::Denied(reason) = guard(identity.user_id, &post) {
        return Ok(denied(reason, post.id));
    }

    let fields = validate_post(&state, body.into_inner()).await?;
    let post = state
        .posts
        .update(Post {
            title: fields.title,
            text: fields.text,
            pub_date: fields.pub_date,
            image: fields.image,
            category_id: Some(fields.category_id),
            location_id: fields.location_id,
            ..post
        })
        .await?;

    Ok(urls::redirect(urls::post_detail(post.id)))
}

/// POST /posts/{id}/delete/
pub async fn delete_post(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Id>,
) -> AppResult<HttpResponse> {
    let post = load_post(&state, path.into_inner()).await?;
    if let Access::Denied(reason) = guard(identity.user_id, &post) {
        return Ok(denied(reason, post.id));
    }

    state.posts.delete(post.id).await?;

    tracing::info!(post_id = post.id, author = identity.user_id, "Post deleted");
    Ok(urls::redirect(urls::INDEX))
}

