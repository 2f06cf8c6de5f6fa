use actix_web::cookie::{time::Duration as CookieDuration, Cookie};
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{get, post, web, FromRequest, HttpRequest, HttpResponse};
use std::future::Future;
use std::pin::Pin;
use tracing::{info, warn};

use crate::core::db::RepoError;
use crate::core::errors::ApiError;
use crate::core::helpers::verify_password;
use crate::models::models::{Message, UserIn, UserRecord};
use crate::token::TokenError;
use crate::AppState;

/// A request carrying a valid token for an existing user.
pub struct AuthenticatedUser(pub UserRecord);

/// Like `AuthenticatedUser`, but a missing or unreadable token means an
/// anonymous visitor. Expired or forged tokens are still rejected.
pub struct MaybeUser(pub Option<UserRecord>);

fn app_state(req: &HttpRequest) -> Result<web::Data<AppState>, ApiError> {
    req.app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or_else(|| ApiError::InternalError("application state missing".to_string()))
}

/// Cookie first, then `Authorization: Bearer`.
pub fn token_from_request(req: &HttpRequest, cookie_name: &str) -> Option<String> {
    if let Some(cookie) = req.cookie(cookie_name) {
        return Some(cookie.value().to_string());
    }
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(|t| t.trim().to_string())
}

async fn load_user(state: &AppState, username: &str) -> Result<UserRecord, ApiError> {
    match state.repo.get_user(username).await {
        Ok(user) => Ok(user),
        // token outlived its user
        Err(RepoError::NotFound(_)) => Err(ApiError::Unauthorized),
        Err(e) => Err(e.into()),
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let state = app_state(&req)?;
            let token = token_from_request(&req, &state.config.auth_token_name)
                .ok_or(ApiError::Unauthorized)?;
            let username = state.tokens.verify(&token)?;
            load_user(&state, &username).await.map(AuthenticatedUser)
        })
    }
}

impl FromRequest for MaybeUser {
    type Error = ApiError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let state = app_state(&req)?;
            let token = match token_from_request(&req, &state.config.auth_token_name) {
                Some(token) => token,
                None => return Ok(MaybeUser(None)),
            };
            let username = match state.tokens.verify(&token) {
                Ok(username) => username,
                Err(TokenError::Malformed) => return Ok(MaybeUser(None)),
                Err(e) => return Err(e.into()),
            };
            load_user(&state, &username).await.map(|user| MaybeUser(Some(user)))
        })
    }
}

/// The cookie never outlives the token it carries, so browsers drop it
/// before the feed page would start rejecting it.
fn auth_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let max_age = state
        .config
        .cookie_max_age_seconds
        .min(state.config.auth_token_duration_seconds);
    Cookie::build(state.config.auth_token_name.clone(), token)
        .path("/")
        .http_only(true)
        .max_age(CookieDuration::seconds(max_age))
        .finish()
}

#[post("/login")]
pub async fn login_user(
    state: web::Data<AppState>,
    creds: web::Json<UserIn>,
) -> Result<HttpResponse, ApiError> {
    let stored = state.repo.user_password(&creds.username).await?;
    let valid = stored
        .map(|hash| verify_password(&creds.password, &hash))
        .unwrap_or(false);
    if !valid {
        warn!(username = %creds.username, "login rejected");
        return Err(ApiError::Unauthorized);
    }

    let user = state.repo.get_user(&creds.username).await?;
    let token = state.tokens.issue(&user.username)?;
    info!(username = %user.username, "user logged in");

    Ok(HttpResponse::Ok()
        .cookie(auth_cookie(&state, token))
        .json(state.links.user_out(&user)))
}

#[get("/logout")]
pub async fn logout_user(state: web::Data<AppState>) -> HttpResponse {
    let mut cookie = Cookie::build(state.config.auth_token_name.clone(), "")
        .path("/")
        .finish();
    cookie.make_removal();

    HttpResponse::Ok().cookie(cookie).json(Message {
        message: "Logged out successfully".to_string(),
    })
}
