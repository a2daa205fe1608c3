//! HTTP handlers and route configuration.

mod auth;
mod comments;
mod forms;
mod health;
mod moderation;
mod posts;
mod profile;
pub mod urls;

#[cfg(test)]
mod tests;

use actix_web::{HttpRequest, HttpResponse, web};

use blogicum_shared::ErrorResponse;

use crate::middleware::error::AppError;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::NotFound(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    // Listings and detail
    .route("/", web::get().to(posts::index))
    .route("/health", web::get().to(health::health_check))
    .route("/category/{slug}/", web::get().to(posts::category_posts))
    .route("/profile/{username}/", web::get().to(profile::profile))
    .route("/posts/{id:\\d+}/", web::get().to(posts::post_detail))
    // Post mutations
    .route("/posts/create/", web::post().to(posts::create_post))
    .service(
        web::resource("/posts/{id:\\d+}/edit/")
            .route(web::get().to(posts::edit_post_form))
            .route(web::post().to(posts::edit_post)),
    )
    .route("/posts/{id:\\d+}/delete/", web::post().to(posts::delete_post))
    // Comments
    .route("/posts/{id:\\d+}/comment/", web::post().to(comments::add_comment))
    .service(
        web::resource("/posts/{post_id:\\d+}/edit_comment/{comment_id:\\d+}/")
            .route(web::get().to(comments::edit_comment_form))
            .route(web::post().to(comments::edit_comment)),
    )
    .route(
        "/posts/{post_id:\\d+}/delete_comment/{comment_id:\\d+}/",
        web::post().to(comments::delete_comment),
    )
    // Profile
    .service(
        web::resource("/edit_profile/")
            .route(web::get().to(profile::edit_profile_form))
            .route(web::post().to(profile::edit_profile)),
    )
    // Auth routes
    .service(
        web::scope("/auth")
            .route("/registration/", web::post().to(auth::register))
            .route("/login/", web::post().to(auth::login))
            .route("/me/", web::get().to(auth::me)),
    )
    // Staff routes
    .service(
        web::scope("/moderation")
            .route("/categories/", web::post().to(moderation::create_category))
            .route("/categories/{id:\\d+}/", web::post().to(moderation::update_category))
            .route("/locations/", web::post().to(moderation::create_location))
            .route("/locations/{id:\\d+}/", web::post().to(moderation::update_location))
            .route("/posts/{id:\\d+}/", web::post().to(moderation::moderate_post)),
    )
    .default_service(web::to(not_found));
}

/// Problem body for paths no route matches.
async fn not_found(req: HttpRequest) -> HttpResponse {
    HttpResponse::NotFound()
        .json(ErrorResponse::not_found("No route matches this path").with_instance(req.path()))
}
