use actix_web::{web, Scope};

use crate::{auth, comments, posts, users};

/// Every JSON endpoint, mounted under the configured URL prefix.
pub fn api_scope(prefix: &str) -> Scope {
    web::scope(prefix)
        .service(users::create_user)
        .service(users::list_users)
        .service(users::get_user)
        .service(auth::login_user)
        .service(auth::logout_user)
        .service(posts::create_post)
        .service(posts::list_posts)
        .service(posts::get_post)
        .service(comments::create_comment)
        .service(comments::list_post_comments)
        .service(comments::list_comments)
        .service(comments::get_comment)
}
