//! Form validation against the current store.
//!
//! Each validator either returns the cleaned values or every field error at
//! once; nothing is written until a form validates.

use chrono::{DateTime, Utc};

use blogicum_core::ValidationErrors;
use blogicum_core::domain::{Id, User};
use blogicum_core::validation::{MAX_TITLE_CHARS, MAX_USERNAME_CHARS, MIN_PASSWORD_CHARS};
use blogicum_shared::dto::{
    CategoryForm, CommentForm, LocationForm, PostForm, ProfileForm, RegisterUserRequest,
};

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";
const USERNAME_TAKEN: &str = "A user with that username already exists.";

/// Cleaned post form.
#[derive(Debug)]
pub struct PostFields {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub category_id: Id,
    pub location_id: Option<Id>,
    pub image: Option<String>,
}

pub async fn validate_post(state: &AppState, form: PostForm) -> AppResult<PostFields> {
    let mut errors = ValidationErrors::new();
    errors
        .require("title", &form.title)
        .max_chars("title", &form.title, MAX_TITLE_CHARS)
        .require("text", &form.text)
        .require_some("pub_date", &form.pub_date)
        .require_some("category_id", &form.category_id);

    if let Some(id) = form.category_id {
        if state.categories.find_by_id(id).await?.is_none() {
            errors.add("category_id", INVALID_CHOICE);
        }
    }
    if let Some(id) = form.location_id {
        if state.locations.find_by_id(id).await?.is_none() {
            errors.add("location_id", INVALID_CHOICE);
        }
    }
    errors.into_result()?;

    match (form.pub_date, form.category_id) {
        (Some(pub_date), Some(category_id)) => Ok(PostFields {
            title: form.title,
            text: form.text,
            pub_date,
            category_id,
            location_id: form.location_id,
            image: form.image.filter(|path| !path.trim().is_empty()),
        }),
        _ => Err(AppError::Internal(
            "post form passed validation without required fields".to_string(),
        )),
    }
}

pub fn validate_comment(form: CommentForm) -> AppResult<String> {
    let mut errors = ValidationErrors::new();
    errors.require("text", &form.text);
    errors.into_result()?;
    Ok(form.text)
}

/// `current` with the submitted profile fields applied.
pub async fn validate_profile(state: &AppState, current: &User, form: ProfileForm) -> AppResult<User> {
    let mut errors = ValidationErrors::new();
    errors
        .username("username", &form.username)
        .max_chars("first_name", &form.first_name, MAX_USERNAME_CHARS)
        .max_chars("last_name", &form.last_name, MAX_USERNAME_CHARS)
        .email("email", &form.email);

    if !errors.has("username") {
        if let Some(other) = state.users.find_by_username(&form.username).await? {
            if other.id != current.id {
                errors.add("username", USERNAME_TAKEN);
            }
        }
    }
    errors.into_result()?;

    Ok(User {
        username: form.username,
        first_name: form.first_name,
        last_name: form.last_name,
        email: form.email,
        ..current.clone()
    })
}

/// Field rules of registration. Username uniqueness is a conflict, checked by
/// the handler.
pub fn validate_registration(req: &RegisterUserRequest) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors
        .username("username", &req.username)
        .max_chars("first_name", &req.first_name, MAX_USERNAME_CHARS)
        .max_chars("last_name", &req.last_name, MAX_USERNAME_CHARS)
        .email("email", &req.email);

    if req.password.chars().count() < MIN_PASSWORD_CHARS {
        errors.add(
            "password",
            format!("This password is too short. It must contain at least {MIN_PASSWORD_CHARS} characters."),
        );
    }
    errors.into_result()
}

pub fn validate_category(form: &CategoryForm) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors
        .require("title", &form.title)
        .max_chars("title", &form.title, MAX_TITLE_CHARS)
        .slug("slug", &form.slug);
    errors.into_result()
}

pub fn validate_location(form: &LocationForm) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors
        .require("name", &form.name)
        .max_chars("name", &form.name, MAX_TITLE_CHARS);
    errors.into_result()
}
