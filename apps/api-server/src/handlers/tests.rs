use std::sync::Arc;

use actix_web::dev::ServiceResponse;
use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use chrono::{TimeDelta, Utc};
use serde_json::{Value, json};

use blogicum_core::domain::{
    Category, Comment, Id, NewCategory, NewComment, NewLocation, NewPost, NewUser, Post, User,
};
use blogicum_core::ports::{PasswordService, TokenService};
use blogicum_core::{PageSelector, PostQuery};
use blogicum_infra::{Argon2PasswordService, JwtConfig, JwtTokenService};

use super::configure_routes;
use crate::state::AppState;

const STAFF: &str = "moderator";

/// In-memory state plus a token issuer, seeded directly through the ports.
struct TestEnv {
    state: AppState,
    tokens: Arc<dyn TokenService>,
}

impl TestEnv {
    fn new() -> Self {
        Self {
            state: AppState::in_memory(&[STAFF.to_string()]),
            tokens: Arc::new(JwtTokenService::new(JwtConfig {
                secret: "handler-test-secret".to_string(),
                expiration_hours: 1,
                issuer: "blogicum-test".to_string(),
            })),
        }
    }

    /// A user and a bearer token for it.
    async fn user(&self, username: &str) -> (User, String) {
        let user = self
            .state
            .users
            .create(NewUser {
                username: username.to_string(),
                first_name: String::new(),
                last_name: String::new(),
                email: format!("{username}@example.com"),
                password_hash: "not-a-real-hash".to_string(),
            })
            .await
            .unwrap();
        let token = self
            .tokens
            .generate_token(user.id, &user.username, self.state.roles_for(&user.username))
            .unwrap();
        (user, token)
    }

    async fn category(&self, slug: &str, is_published: bool) -> Category {
        self.state
            .categories
            .create(NewCategory {
                title: slug.to_uppercase(),
                description: format!("All about {slug}"),
                slug: slug.to_string(),
                is_published,
            })
            .await
            .unwrap()
    }

    /// Published, already due post; `tweak` adjusts it before storing.
    async fn post(
        &self,
        author: &User,
        category: Option<&Category>,
        tweak: impl FnOnce(&mut NewPost),
    ) -> Post {
        let mut new = NewPost {
            title: "A day out".to_string(),
            text: "Went to the lake.".to_string(),
            pub_date: Utc::now() - TimeDelta::hours(1),
            is_published: true,
            image: None,
            author_id: author.id,
            category_id: category.map(|c| c.id),
            location_id: None,
        };
        tweak(&mut new);
        self.state.posts.create(new).await.unwrap()
    }

    /// Every stored post, visible or not.
    async fn post_count(&self) -> u64 {
        self.state
            .posts
            .page_filtered(&PostQuery::unrestricted(), PageSelector::Number(1))
            .await
            .unwrap()
            .map_or(0, |page| page.total_items)
    }

    async fn comment(&self, author: &User, post: &Post, text: &str) -> Comment {
        self.state
            .comments
            .create(NewComment {
                text: text.to_string(),
                post_id: post.id,
                author_id: author.id,
            })
            .await
            .unwrap()
    }
}

macro_rules! init_app {
    ($env:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($env.state.clone()))
                .app_data(web::Data::new($env.tokens.clone()))
                .app_data(web::Data::new(
                    Arc::new(Argon2PasswordService::new()) as Arc<dyn PasswordService>
                ))
                .configure(configure_routes),
        )
        .await
    };
}

fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

fn location<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .expect("redirect without Location")
        .to_str()
        .unwrap()
        .to_string()
}

fn item_ids(page: &Value) -> Vec<Id> {
    page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect()
}

fn post_form(category_id: Id, title: &str) -> Value {
    json!({
        "title": title,
        "text": "Body text",
        "pub_date": (Utc::now() - TimeDelta::minutes(5)).to_rfc3339(),
        "category_id": category_id,
    })
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[actix_web::test]
async fn test_index_hides_posts_that_are_not_publicly_visible() {
    let env = TestEnv::new();
    let (anna, anna_token) = env.user("anna").await;
    let (_, boris_token) = env.user("boris").await;
    let travel = env.category("travel", true).await;
    let drafts = env.category("drafts", false).await;

    let visible = env.post(&anna, Some(&travel), |_| {}).await;
    env.post(&anna, Some(&travel), |p| p.is_published = false).await;
    env.post(&anna, Some(&travel), |p| p.pub_date = Utc::now() + TimeDelta::days(1))
        .await;
    env.post(&anna, Some(&drafts), |_| {}).await;
    env.post(&anna, None, |_| {}).await;

    let app = init_app!(env);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page: Value = test::read_body_json(resp).await;
    assert_eq!(item_ids(&page), vec![visible.id]);
    assert_eq!(page["total_items"], 1);

    // Another user sees the same public subset on the profile.
    let req = test::TestRequest::get()
        .uri("/profile/anna/")
        .insert_header(bearer(&boris_token))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(item_ids(&body["page"]), vec![visible.id]);
    assert!(body["profile"].get("email").is_none());

    // The owner sees every post, hidden ones included, and their email.
    let req = test::TestRequest::get()
        .uri("/profile/anna/")
        .insert_header(bearer(&anna_token))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["page"]["total_items"], 5);
    assert_eq!(body["profile"]["email"], "anna@example.com");
}

#[actix_web::test]
async fn test_category_listing() {
    let env = TestEnv::new();
    let (anna, _) = env.user("anna").await;
    let travel = env.category("travel", true).await;
    let food = env.category("food", true).await;
    let hidden = env.category("hidden", false).await;

    let trip = env.post(&anna, Some(&travel), |_| {}).await;
    env.post(&anna, Some(&food), |_| {}).await;
    env.post(&anna, Some(&hidden), |_| {}).await;

    let app = init_app!(env);

    let req = test::TestRequest::get().uri("/category/travel/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["category"]["slug"], "travel");
    assert_eq!(body["category"]["description"], "All about travel");
    assert_eq!(item_ids(&body["page"]), vec![trip.id]);
    assert_eq!(body["page"]["items"][0]["category"]["title"], "TRAVEL");
    assert_eq!(body["page"]["items"][0]["author"]["username"], "anna");

    // Unpublished category is not found even though it has posts.
    let req = test::TestRequest::get().uri("/category/hidden/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/category/nope/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_listing_pages_hold_ten_posts_newest_first() {
    let env = TestEnv::new();
    let (anna, _) = env.user("anna").await;
    let travel = env.category("travel", true).await;

    let mut created = Vec::new();
    for _ in 0..12 {
        created.push(env.post(&anna, Some(&travel), |_| {}).await.id);
    }
    let newest_first: Vec<Id> = created.iter().rev().copied().collect();

    let app = init_app!(env);

    let page1: Value = test::read_body_json(
        test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await,
    )
    .await;
    assert_eq!(item_ids(&page1), newest_first[..10].to_vec());
    assert_eq!(page1["num_pages"], 2);
    assert_eq!(page1["has_next"], true);
    assert_eq!(page1["has_previous"], false);

    let page2: Value = test::read_body_json(
        test::call_service(&app, test::TestRequest::get().uri("/?page=2").to_request()).await,
    )
    .await;
    assert_eq!(item_ids(&page2), newest_first[10..].to_vec());

    let last: Value = test::read_body_json(
        test::call_service(&app, test::TestRequest::get().uri("/?page=last").to_request()).await,
    )
    .await;
    assert_eq!(last["number"], 2);

    for uri in ["/?page=3", "/?page=0", "/?page=abc"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[actix_web::test]
async fn test_empty_listing_has_only_first_page() {
    let env = TestEnv::new();
    let app = init_app!(env);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page: Value = test::read_body_json(resp).await;
    assert!(item_ids(&page).is_empty());
    assert_eq!(page["num_pages"], 1);

    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/?page=2").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Detail and comments
// ---------------------------------------------------------------------------

#[actix_web::test]
async fn test_detail_lists_comments_and_tracks_count() {
    let env = TestEnv::new();
    let (anna, anna_token) = env.user("anna").await;
    let (_, boris_token) = env.user("boris").await;
    let travel = env.category("travel", true).await;
    let post = env.post(&anna, Some(&travel), |_| {}).await;

    let app = init_app!(env);
    let detail_uri = format!("/posts/{}/", post.id);

    for (token, text) in [(&anna_token, "first"), (&boris_token, "second")] {
        let req = test::TestRequest::post()
            .uri(&format!("/posts/{}/comment/", post.id))
            .insert_header(bearer(token))
            .set_json(json!({ "text": text }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), detail_uri);
    }

    let body: Value = test::read_body_json(
        test::call_service(&app, test::TestRequest::get().uri(&detail_uri).to_request()).await,
    )
    .await;
    assert_eq!(body["post"]["comment_count"], 2);
    assert_eq!(body["comments"][0]["text"], "second");
    assert_eq!(body["comments"][0]["author"]["username"], "boris");
    assert_eq!(body["comments"][1]["text"], "first");
    assert_eq!(body["comment_form"]["text"], "");

    let first_id = body["comments"][1]["id"].as_i64().unwrap();
    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/delete_comment/{}/", post.id, first_id))
        .insert_header(bearer(&anna_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), detail_uri);

    let body: Value = test::read_body_json(
        test::call_service(&app, test::TestRequest::get().uri(&detail_uri).to_request()).await,
    )
    .await;
    assert_eq!(body["post"]["comment_count"], 1);

    // The index annotation follows the same count.
    let page: Value = test::read_body_json(
        test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await,
    )
    .await;
    assert_eq!(page["items"][0]["comment_count"], 1);
}

#[actix_web::test]
async fn test_detail_of_missing_post_is_not_found() {
    let env = TestEnv::new();
    let (_, token) = env.user("anna").await;
    let app = init_app!(env);

    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/posts/404/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], 404);

    let req = test::TestRequest::post()
        .uri("/posts/404/comment/")
        .insert_header(bearer(&token))
        .set_json(json!({ "text": "hello?" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_comment_must_belong_to_post_in_path() {
    let env = TestEnv::new();
    let (anna, token) = env.user("anna").await;
    let first = env.post(&anna, None, |_| {}).await;
    let second = env.post(&anna, None, |_| {}).await;
    let comment = env.comment(&anna, &first, "on the first post").await;

    let app = init_app!(env);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit_comment/{}/", second.id, comment.id))
        .insert_header(bearer(&token))
        .set_json(json!({ "text": "moved" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let stored = env.state.comments.find_by_id(comment.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "on the first post");
}

// ---------------------------------------------------------------------------
// Authentication and ownership
// ---------------------------------------------------------------------------

/// Every mutating route with a body it would accept from the author.
fn mutations(category: &Category, post: &Post, comment: &Comment) -> Vec<(String, Value)> {
    let (id, cid) = (post.id, comment.id);
    vec![
        ("/posts/create/".to_string(), post_form(category.id, "Sneaky")),
        (format!("/posts/{id}/edit/"), post_form(category.id, "Rewritten")),
        (format!("/posts/{id}/delete/"), json!({})),
        (format!("/posts/{id}/comment/"), json!({ "text": "Drive-by" })),
        (format!("/posts/{id}/edit_comment/{cid}/"), json!({ "text": "Changed" })),
        (format!("/posts/{id}/delete_comment/{cid}/"), json!({})),
        ("/edit_profile/".to_string(), json!({ "username": "intruder" })),
    ]
}

#[actix_web::test]
async fn test_unauthenticated_mutations_redirect_to_login() {
    let env = TestEnv::new();
    let (anna, _) = env.user("anna").await;
    let travel = env.category("travel", true).await;
    let post = env.post(&anna, Some(&travel), |_| {}).await;
    let comment = env.comment(&anna, &post, "First!").await;

    let app = init_app!(env);

    for (uri, body) in mutations(&travel, &post, &comment) {
        let req = test::TestRequest::post().uri(&uri).set_json(&body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND, "{uri}");
        assert_eq!(
            location(&resp),
            format!("/auth/login/?next={}", urlencoding::encode(&uri)),
            "{uri}"
        );

        let req = test::TestRequest::post()
            .uri(&uri)
            .insert_header(bearer("garbage"))
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND, "{uri}");
        assert!(location(&resp).starts_with("/auth/login/?next="), "{uri}");
    }

    let req = test::TestRequest::get().uri("/edit_profile/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/auth/login/?next=%2Fedit_profile%2F");

    assert_eq!(env.state.posts.find_by_id(post.id).await.unwrap(), Some(post.clone()));
    assert_eq!(env.state.comments.find_by_id(comment.id).await.unwrap(), Some(comment));
    assert_eq!(env.post_count().await, 1);
    let detail = env.state.posts.find_with_relations(post.id).await.unwrap().unwrap();
    assert_eq!(detail.comment_count, 1);
    let stored = env.state.users.find_by_id(anna.id).await.unwrap().unwrap();
    assert_eq!(stored.username, "anna");
}

#[actix_web::test]
async fn test_token_of_deleted_user_redirects_to_login() {
    let env = TestEnv::new();
    let (anna, _) = env.user("anna").await;
    let (carl, carl_token) = env.user("carl").await;
    let travel = env.category("travel", true).await;
    let post = env.post(&anna, Some(&travel), |_| {}).await;
    let comment = env.comment(&anna, &post, "First!").await;

    env.state.users.delete(carl.id).await.unwrap();

    let app = init_app!(env);

    for (uri, body) in mutations(&travel, &post, &comment) {
        let req = test::TestRequest::post()
            .uri(&uri)
            .insert_header(bearer(&carl_token))
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND, "{uri}");
        assert!(location(&resp).starts_with("/auth/login/?next="), "{uri}");
    }

    let req = test::TestRequest::get()
        .uri("/edit_profile/")
        .insert_header(bearer(&carl_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/?next=%2Fedit_profile%2F");

    // Public pages treat the stale token as anonymous.
    let req = test::TestRequest::get()
        .uri("/profile/anna/")
        .insert_header(bearer(&carl_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    assert_eq!(env.state.posts.find_by_id(post.id).await.unwrap(), Some(post));
    assert_eq!(env.state.comments.find_by_id(comment.id).await.unwrap(), Some(comment));
    assert_eq!(env.post_count().await, 1);
}

#[actix_web::test]
async fn test_post_lifecycle_with_foreign_delete_attempt() {
    let env = TestEnv::new();
    let (_, author_token) = env.user("anna").await;
    let (_, other_token) = env.user("carl").await;
    let travel = env.category("travel", true).await;

    let app = init_app!(env);

    let req = test::TestRequest::post()
        .uri("/posts/create/")
        .insert_header(bearer(&author_token))
        .set_json(post_form(travel.id, "Lake trip"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let detail_uri = location(&resp);

    let page: Value = test::read_body_json(
        test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await,
    )
    .await;
    let post_id = item_ids(&page)[0];
    assert_eq!(detail_uri, format!("/posts/{post_id}/"));
    assert_eq!(page["items"][0]["title"], "Lake trip");

    let delete_uri = format!("/posts/{post_id}/delete/");

    let req = test::TestRequest::post()
        .uri(&delete_uri)
        .insert_header(bearer(&other_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), detail_uri);
    assert!(env.state.posts.find_by_id(post_id).await.unwrap().is_some());

    let req = test::TestRequest::post()
        .uri(&delete_uri)
        .insert_header(bearer(&author_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");

    let page: Value = test::read_body_json(
        test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await,
    )
    .await;
    assert!(item_ids(&page).is_empty());
}

#[actix_web::test]
async fn test_non_author_cannot_edit_post() {
    let env = TestEnv::new();
    let (anna, anna_token) = env.user("anna").await;
    let (_, boris_token) = env.user("boris").await;
    let travel = env.category("travel", true).await;
    let post = env.post(&anna, Some(&travel), |_| {}).await;

    let app = init_app!(env);
    let edit_uri = format!("/posts/{}/edit/", post.id);
    let detail_uri = format!("/posts/{}/", post.id);

    let req = test::TestRequest::get()
        .uri(&edit_uri)
        .insert_header(bearer(&boris_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), detail_uri);

    let req = test::TestRequest::post()
        .uri(&edit_uri)
        .insert_header(bearer(&boris_token))
        .set_json(post_form(travel.id, "Hijacked"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), detail_uri);

    let stored = env.state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored, post);

    // The author gets the current values, then saves a new title.
    let req = test::TestRequest::get()
        .uri(&edit_uri)
        .insert_header(bearer(&anna_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let form: Value = test::read_body_json(resp).await;
    assert_eq!(form["title"], "A day out");
    assert_eq!(form["category_id"], travel.id);

    let req = test::TestRequest::post()
        .uri(&edit_uri)
        .insert_header(bearer(&anna_token))
        .set_json(post_form(travel.id, "A day at the lake"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), detail_uri);

    let stored = env.state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "A day at the lake");
    assert_eq!(stored.created_at, post.created_at);
    assert_eq!(stored.author_id, anna.id);
}

#[actix_web::test]
async fn test_non_author_cannot_touch_comment() {
    let env = TestEnv::new();
    let (anna, anna_token) = env.user("anna").await;
    let (_, boris_token) = env.user("boris").await;
    let post = env.post(&anna, None, |_| {}).await;
    let comment = env.comment(&anna, &post, "Lovely view").await;

    let app = init_app!(env);
    let edit_uri = format!("/posts/{}/edit_comment/{}/", post.id, comment.id);
    let delete_uri = format!("/posts/{}/delete_comment/{}/", post.id, comment.id);
    let detail_uri = format!("/posts/{}/", post.id);

    let req = test::TestRequest::post()
        .uri(&edit_uri)
        .insert_header(bearer(&boris_token))
        .set_json(json!({ "text": "Defaced" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), detail_uri);

    let req = test::TestRequest::post()
        .uri(&delete_uri)
        .insert_header(bearer(&boris_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), detail_uri);

    let stored = env.state.comments.find_by_id(comment.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "Lovely view");

    let req = test::TestRequest::get()
        .uri(&edit_uri)
        .insert_header(bearer(&anna_token))
        .to_request();
    let form: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(form["text"], "Lovely view");

    let req = test::TestRequest::post()
        .uri(&edit_uri)
        .insert_header(bearer(&anna_token))
        .set_json(json!({ "text": "Lovely view, again" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), detail_uri);

    let stored = env.state.comments.find_by_id(comment.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "Lovely view, again");
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[actix_web::test]
async fn test_invalid_post_form_is_rejected_without_writing() {
    let env = TestEnv::new();
    let (_, token) = env.user("anna").await;
    let app = init_app!(env);

    let req = test::TestRequest::post()
        .uri("/posts/create/")
        .insert_header(bearer(&token))
        .set_json(json!({ "title": "   " }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    for field in ["title", "text", "pub_date", "category_id"] {
        assert!(body["errors"].get(field).is_some(), "missing error for {field}");
    }

    let mut form = post_form(999, "Fine title");
    form["location_id"] = json!(998);
    let req = test::TestRequest::post()
        .uri("/posts/create/")
        .insert_header(bearer(&token))
        .set_json(form)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["errors"].get("category_id").is_some());
    assert!(body["errors"].get("location_id").is_some());
    assert!(body["errors"].get("title").is_none());

    let req = test::TestRequest::post()
        .uri("/posts/create/")
        .insert_header(bearer(&token))
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert_eq!(env.post_count().await, 0);
}

#[actix_web::test]
async fn test_post_with_location_and_image() {
    let env = TestEnv::new();
    let (_, token) = env.user("anna").await;
    let travel = env.category("travel", true).await;
    let lake = env
        .state
        .locations
        .create(NewLocation {
            name: "Lake".to_string(),
            is_published: true,
        })
        .await
        .unwrap();

    let app = init_app!(env);

    let mut form = post_form(travel.id, "With a place");
    form["location_id"] = json!(lake.id);
    form["image"] = json!("posts_images/lake.jpg");
    let req = test::TestRequest::post()
        .uri("/posts/create/")
        .insert_header(bearer(&token))
        .set_json(form)
        .to_request();
    let resp = test::call_service(&app, req).await;
    let detail_uri = location(&resp);

    let body: Value = test::read_body_json(
        test::call_service(&app, test::TestRequest::get().uri(&detail_uri).to_request()).await,
    )
    .await;
    assert_eq!(body["post"]["location"]["name"], "Lake");
    assert_eq!(body["post"]["image"], "posts_images/lake.jpg");
    assert_eq!(body["post"]["is_published"], true);
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

#[actix_web::test]
async fn test_edit_profile() {
    let env = TestEnv::new();
    let (anna, token) = env.user("anna").await;
    env.user("boris").await;
    let app = init_app!(env);

    let req = test::TestRequest::get()
        .uri("/edit_profile/")
        .insert_header(bearer(&token))
        .to_request();
    let form: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(form["username"], "anna");

    let req = test::TestRequest::post()
        .uri("/edit_profile/")
        .insert_header(bearer(&token))
        .set_json(json!({ "username": "boris", "email": "not-an-email" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["errors"].get("username").is_some());
    assert!(body["errors"].get("email").is_some());

    let req = test::TestRequest::post()
        .uri("/edit_profile/")
        .insert_header(bearer(&token))
        .set_json(json!({
            "username": "anna.k",
            "first_name": "Anna",
            "last_name": "K",
            "email": "anna@lake.org",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/anna.k/");

    let stored = env.state.users.find_by_id(anna.id).await.unwrap().unwrap();
    assert_eq!(stored.username, "anna.k");
    assert_eq!(stored.first_name, "Anna");
    assert_eq!(stored.password_hash, anna.password_hash);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/profile/anna/").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Registration and login
// ---------------------------------------------------------------------------

#[actix_web::test]
async fn test_register_login_and_me() {
    let env = TestEnv::new();
    let app = init_app!(env);

    let req = test::TestRequest::post()
        .uri("/auth/registration/")
        .set_json(json!({
            "username": "dora",
            "email": "dora@example.com",
            "password": "long enough",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let auth: Value = test::read_body_json(resp).await;
    assert_eq!(auth["token_type"], "Bearer");
    let token = auth["access_token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/auth/me/")
        .insert_header(bearer(&token))
        .to_request();
    let me: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(me["username"], "dora");
    assert_eq!(me["email"], "dora@example.com");

    let req = test::TestRequest::post()
        .uri("/auth/registration/")
        .set_json(json!({ "username": "dora", "password": "another one" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/auth/registration/")
        .set_json(json!({ "username": "eve", "password": "short" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .set_json(json!({ "username": "dora", "password": "wrong password" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .set_json(json!({ "username": "nobody", "password": "whatever1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .set_json(json!({ "username": "dora", "password": "long enough" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let auth: Value = test::read_body_json(resp).await;
    assert!(auth["access_token"].as_str().is_some_and(|t| !t.is_empty()));
}

// ---------------------------------------------------------------------------
// Moderation
// ---------------------------------------------------------------------------

#[actix_web::test]
async fn test_moderation_requires_staff() {
    let env = TestEnv::new();
    let (_, user_token) = env.user("anna").await;
    let (_, staff_token) = env.user(STAFF).await;
    let app = init_app!(env);

    let category = json!({ "title": "Travel", "description": "Trips", "slug": "travel" });

    let req = test::TestRequest::post()
        .uri("/moderation/categories/")
        .set_json(category.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let req = test::TestRequest::post()
        .uri("/moderation/categories/")
        .insert_header(bearer(&user_token))
        .set_json(category.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/moderation/categories/")
        .insert_header(bearer(&staff_token))
        .set_json(category.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["slug"], "travel");
    assert_eq!(body["data"]["is_published"], true);
    let category_id = body["data"]["id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri("/moderation/categories/")
        .insert_header(bearer(&staff_token))
        .set_json(category)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri(&format!("/moderation/categories/{category_id}/"))
        .insert_header(bearer(&staff_token))
        .set_json(json!({ "is_published": false }))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["is_published"], false);
    assert_eq!(body["data"]["title"], "Travel");

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/category/travel/").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_staff_can_unpublish_and_reschedule_posts() {
    let env = TestEnv::new();
    let (anna, _) = env.user("anna").await;
    let (_, staff_token) = env.user(STAFF).await;
    let travel = env.category("travel", true).await;
    let post = env.post(&anna, Some(&travel), |_| {}).await;
    let app = init_app!(env);

    let req = test::TestRequest::post()
        .uri(&format!("/moderation/posts/{}/", post.id))
        .insert_header(bearer(&staff_token))
        .set_json(json!({ "is_published": false }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let page: Value = test::read_body_json(
        test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await,
    )
    .await;
    assert!(item_ids(&page).is_empty());

    let req = test::TestRequest::post()
        .uri(&format!("/moderation/posts/{}/", post.id))
        .insert_header(bearer(&staff_token))
        .set_json(json!({
            "is_published": true,
            "pub_date": (Utc::now() + TimeDelta::days(2)).to_rfc3339(),
        }))
        .to_request();
    test::call_service(&app, req).await;

    let page: Value = test::read_body_json(
        test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await,
    )
    .await;
    assert!(item_ids(&page).is_empty());

    let stored = env.state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert!(stored.is_published);
    assert!(stored.pub_date > Utc::now());

    let req = test::TestRequest::post()
        .uri("/moderation/locations/")
        .insert_header(bearer(&staff_token))
        .set_json(json!({ "name": "" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// ---------------------------------------------------------------------------
// Misc
// ---------------------------------------------------------------------------

#[actix_web::test]
async fn test_health_and_unknown_route() {
    let env = TestEnv::new();
    let app = init_app!(env);

    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");

    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/nowhere/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["instance"], "/nowhere/");
    assert!(body.get("request_id").is_none());

    // Handler errors share the fallback's body shape.
    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/posts/999/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], 404);
    assert!(body.get("request_id").is_none());
}
