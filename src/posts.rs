use actix_web::{get, post, web, HttpResponse};
use tracing::info;

use crate::auth::AuthenticatedUser;
use crate::core::errors::ApiError;
use crate::core::helpers::clean_content;
use crate::models::models::{PostIn, PostOut};
use crate::AppState;

#[post("/posts")]
pub async fn create_post(
    state: web::Data<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    body: web::Json<PostIn>,
) -> Result<HttpResponse, ApiError> {
    let content = clean_content(&body.content)?;
    let post = state.repo.create_post(&user.username, &content).await?;
    info!(post = %post.uuid, author = %user.username, "post created");

    Ok(HttpResponse::Created().json(state.links.post_out(&post)))
}

/// Newest first.
#[get("/posts")]
pub async fn list_posts(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let posts: Vec<PostOut> = state
        .repo
        .list_posts()
        .await?
        .iter()
        .map(|p| state.links.post_out(p))
        .collect();
    Ok(HttpResponse::Ok().json(posts))
}

#[get("/posts/{id}")]
pub async fn get_post(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let post = state.repo.get_post(&id).await?;
    Ok(HttpResponse::Ok().json(state.links.post_out(&post)))
}
