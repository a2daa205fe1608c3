//! Authentication extractors.
//!
//! Gated handlers take an [`Identity`]; a request without a valid bearer
//! token, or whose token names an account that no longer exists, never
//! reaches them and is redirected to the login endpoint with the original
//! path in `next`.

use actix_web::{FromRequest, HttpRequest, HttpResponse, dev::Payload, http::StatusCode, http::header, web};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use blogicum_core::domain::Id;
use blogicum_core::ports::{AuthError, ROLE_STAFF, TokenClaims, TokenService};
use blogicum_shared::ErrorResponse;

use crate::handlers::urls;
use crate::middleware::error::AppError;
use crate::state::AppState;

/// Authenticated user identity extractor.
///
/// ```ignore
/// async fn protected_route(identity: Identity) -> impl Responder {
///     format!("Hello, user {}!", identity.user_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Id,
    pub roles: Vec<String>,
}

impl Identity {
    /// Check if the user has a specific role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            roles: claims.roles,
        }
    }
}

/// Authentication failure, remembering where the client was headed.
#[derive(Debug)]
pub struct AuthenticationError {
    pub reason: AuthError,
    pub next: String,
}

impl AuthenticationError {
    fn new(reason: AuthError, req: &HttpRequest) -> Self {
        let next = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.path().to_string());
        Self { reason, next }
    }
}

impl std::fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl actix_web::ResponseError for AuthenticationError {
    fn status_code(&self) -> StatusCode {
        match &self.reason {
            AuthError::MissingAuth | AuthError::TokenExpired | AuthError::InvalidToken(_) => {
                StatusCode::FOUND
            }
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match &self.reason {
            AuthError::MissingAuth | AuthError::TokenExpired | AuthError::InvalidToken(_) => {
                tracing::debug!(reason = %self.reason, next = %self.next, "Redirecting to login");
                urls::redirect(urls::login(&self.next))
            }
            AuthError::InsufficientPermissions => HttpResponse::Forbidden().json(
                ErrorResponse::forbidden().with_detail("Staff permissions are required."),
            ),
            _ => HttpResponse::InternalServerError().json(ErrorResponse::internal_error()),
        }
    }
}

/// Identity carried by the bearer token, without consulting the store.
fn authenticate(req: &HttpRequest) -> Result<Identity, AuthError> {
    let Some(token_service) = req.app_data::<web::Data<Arc<dyn TokenService>>>() else {
        tracing::error!("TokenService not found in app data");
        return Err(AuthError::InvalidToken("Server configuration error".to_string()));
    };

    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuth)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken("Invalid authorization header".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidToken("Expected Bearer token".to_string()))?;

    token_service.validate_token(token).map(Identity::from)
}

/// `Ok(None)` when the token's user has been deleted since it was issued.
async fn existing(req: &HttpRequest, identity: Identity) -> Result<Option<Identity>, AppError> {
    let Some(state) = req.app_data::<web::Data<AppState>>() else {
        return Err(AppError::Internal("AppState not found in app data".to_string()));
    };

    match state.users.find_by_id(identity.user_id).await? {
        Some(_) => Ok(Some(identity)),
        None => {
            tracing::debug!(user = identity.user_id, "Token names a deleted account");
            Ok(None)
        }
    }
}

/// Authenticated identity whose account still exists.
async fn resolve(req: &HttpRequest) -> Result<Identity, actix_web::Error> {
    let identity = authenticate(req).map_err(|reason| AuthenticationError::new(reason, req))?;

    existing(req, identity).await?.ok_or_else(|| {
        AuthenticationError::new(
            AuthError::InvalidToken("Account no longer exists".to_string()),
            req,
        )
        .into()
    })
}

type ExtractFuture<T> = Pin<Box<dyn Future<Output = Result<T, actix_web::Error>>>>;

impl FromRequest for Identity {
    type Error = actix_web::Error;
    type Future = ExtractFuture<Self>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move { resolve(&req).await })
    }
}

/// Optional identity extractor - anonymous when no valid token is sent or the
/// account behind it is gone.
pub struct OptionalIdentity(pub Option<Identity>);

impl OptionalIdentity {
    pub fn user_id(&self) -> Option<Id> {
        self.0.as_ref().map(|identity| identity.user_id)
    }
}

impl FromRequest for OptionalIdentity {
    type Error = actix_web::Error;
    type Future = ExtractFuture<Self>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let Ok(identity) = authenticate(&req) else {
                return Ok(OptionalIdentity(None));
            };
            Ok(OptionalIdentity(existing(&req, identity).await?))
        })
    }
}

/// Identity of a user holding the staff role.
pub struct StaffIdentity(pub Identity);

impl FromRequest for StaffIdentity {
    type Error = actix_web::Error;
    type Future = ExtractFuture<Self>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let identity = resolve(&req).await?;
            if !identity.has_role(ROLE_STAFF) {
                tracing::info!(user = identity.user_id, "Moderation refused for non-staff user");
                return Err(
                    AuthenticationError::new(AuthError::InsufficientPermissions, &req).into(),
                );
            }
            Ok(StaffIdentity(identity))
        })
    }
}
