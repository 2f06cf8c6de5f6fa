use actix_web::{get, post, web, HttpResponse};
use tracing::info;

use crate::auth::AuthenticatedUser;
use crate::core::errors::ApiError;
use crate::core::helpers::clean_content;
use crate::models::models::{CommentIn, CommentOut, CommentRecord};
use crate::AppState;

fn to_resources(state: &AppState, comments: &[CommentRecord]) -> Vec<CommentOut> {
    comments.iter().map(|c| state.links.comment_out(c)).collect()
}

#[post("/posts/{id}/comments")]
pub async fn create_comment(
    state: web::Data<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    post_id: web::Path<String>,
    body: web::Json<CommentIn>,
) -> Result<HttpResponse, ApiError> {
    let content = clean_content(&body.content)?;
    let comment = state
        .repo
        .create_comment(&user.username, &post_id, &content)
        .await?;
    info!(comment = %comment.uuid, post = %comment.post, author = %user.username, "comment created");

    Ok(HttpResponse::Created().json(state.links.comment_out(&comment)))
}

/// Oldest first.
#[get("/posts/{id}/comments")]
pub async fn list_post_comments(
    state: web::Data<AppState>,
    post_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let comments = state.repo.list_comments_for_post(&post_id).await?;
    Ok(HttpResponse::Ok().json(to_resources(&state, &comments)))
}

/// Oldest first, same as the per-post listing.
#[get("/comments")]
pub async fn list_comments(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let comments = state.repo.list_comments().await?;
    Ok(HttpResponse::Ok().json(to_resources(&state, &comments)))
}

#[get("/comments/{id}")]
pub async fn get_comment(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let comment = state.repo.get_comment(&id).await?;
    Ok(HttpResponse::Ok().json(state.links.comment_out(&comment)))
}
