use actix_web::{get, post, web, HttpResponse};
use tracing::info;

use crate::core::errors::ApiError;
use crate::core::helpers::{hash_password, validate_credentials};
use crate::models::models::{UserIn, UserOut};
use crate::AppState;

#[post("/users")]
pub async fn create_user(
    state: web::Data<AppState>,
    body: web::Json<UserIn>,
) -> Result<HttpResponse, ApiError> {
    let new_user = body.into_inner();
    validate_credentials(&new_user.username, &new_user.password)?;

    let record = state
        .repo
        .create_user(&new_user.username, &hash_password(&new_user.password)?)
        .await?;
    info!(username = %record.username, "user registered");

    Ok(HttpResponse::Created().json(state.links.user_out(&record)))
}

#[get("/users")]
pub async fn list_users(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let users: Vec<UserOut> = state
        .repo
        .list_users()
        .await?
        .iter()
        .map(|u| state.links.user_out(u))
        .collect();
    Ok(HttpResponse::Ok().json(users))
}

#[get("/users/{username}")]
pub async fn get_user(
    state: web::Data<AppState>,
    username: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let record = state.repo.get_user(&username).await?;
    Ok(HttpResponse::Ok().json(state.links.user_out(&record)))
}
