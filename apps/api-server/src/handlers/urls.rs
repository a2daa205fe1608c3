//! Paths used as redirect targets.

use actix_web::{HttpResponse, http::header};

use blogicum_core::domain::Id;

pub const INDEX: &str = "/";

pub fn post_detail(post_id: Id) -> String {
    format!("/posts/{post_id}/")
}

pub fn profile(username: &str) -> String {
    format!("/profile/{username}/")
}

/// Login endpoint remembering the page to return to.
pub fn login(next: &str) -> String {
    format!("/auth/login/?next={}", urlencoding::encode(next))
}

/// `302 Found` to `location`.
pub fn redirect(location: impl Into<String>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.into()))
        .finish()
}
