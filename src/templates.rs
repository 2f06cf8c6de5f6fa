use actix_web::{get, web, HttpResponse};
use chrono::{DateTime, Utc};
use html_escape::{decode_html_entities, encode_double_quoted_attribute, encode_text};
use lru::LruCache;
use regex::Regex;
use rust_embed::RustEmbed;
use std::num::NonZeroUsize;
use std::sync::OnceLock;

use crate::auth::MaybeUser;
use crate::config::AUTHOR_CACHE_CAPACITY;
use crate::core::db::{RepoResult, Repository};
use crate::core::errors::ApiError;
use crate::models::models::{CommentRecord, PostRecord, UserRecord};
use crate::AppState;

#[derive(RustEmbed)]
#[folder = "templates"]
struct Templates;

fn load_template(name: &str) -> Result<String, ApiError> {
    let file = Templates::get(name)
        .ok_or_else(|| anyhow::anyhow!("template {} not found", name))?;
    Ok(String::from_utf8(file.data.into_owned()).map_err(anyhow::Error::from)?)
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

/// Author lookups for one page render. Several posts and comments usually
/// share authors, so each user is fetched at most once per render.
pub struct AuthorCache<'a> {
    repo: &'a dyn Repository,
    users: LruCache<String, UserRecord>,
}

impl<'a> AuthorCache<'a> {
    pub fn new(repo: &'a dyn Repository, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { repo, users: LruCache::new(capacity) }
    }

    pub async fn get(&mut self, username: &str) -> RepoResult<UserRecord> {
        if let Some(user) = self.users.get(username) {
            return Ok(user.clone());
        }
        let user = self.repo.get_user(username).await?;
        self.users.put(username.to_string(), user.clone());
        Ok(user)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn clear(&mut self) {
        self.users.clear();
    }
}

fn url_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"https?://[^\s<]+").expect("Regex should compile")
    })
}

/// Content is stored tag-free and entity-escaped, so it is emitted as is;
/// only bare URLs are turned into links.
fn render_content(content: &str) -> String {
    url_regex().replace_all(content, |caps: &regex::Captures| {
        let url = &caps[0];
        let href = encode_double_quoted_attribute(&decode_html_entities(url)).to_string();
        format!(r#"<a href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#, href, url)
    }).to_string()
}

fn format_date(timestamp_millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_millis)
        .map(|d| d.format("%d/%m/%Y %H:%M:%S UTC").to_string())
        .unwrap_or_default()
}

fn render_comment(comment: &CommentRecord) -> String {
    format!(
        r#"<li class="comment"><span class="comment-author">{}</span> <span class="comment-date">{}</span><div class="comment-content">{}</div></li>"#,
        encode_text(&comment.author),
        format_date(comment.timestamp),
        render_content(&comment.content),
    )
}

fn render_post(
    post: &PostRecord,
    author: &UserRecord,
    comments: &[CommentRecord],
    logged_in: bool,
) -> String {
    let comment_items: String = comments.iter().map(render_comment).collect();
    let comment_form = if logged_in {
        format!(
            r#"<form class="comment-form" data-post="{}"><input name="content" placeholder="Write a comment" required><button type="submit">Comment</button></form>"#,
            encode_double_quoted_attribute(&post.uuid),
        )
    } else {
        String::new()
    };

    format!(
        r#"<article class="post" id="post-{uuid}">
    <header><span class="post-author">{author}</span> <span class="post-count">({count} posts)</span> <span class="post-date">{date}</span></header>
    <div class="post-content">{content}</div>
    <ul class="comments">{comments}</ul>
    {form}
</article>
"#,
        uuid = encode_double_quoted_attribute(&post.uuid),
        author = encode_text(&author.username),
        count = author.posts.len(),
        date = format_date(post.timestamp),
        content = render_content(&post.content),
        comments = comment_items,
        form = comment_form,
    )
}

fn render_session(viewer: Option<&UserRecord>) -> String {
    match viewer {
        Some(user) => format!(
            r##"<span>Logged in as <strong>{}</strong></span> <a href="#" id="logout">Log out</a>
<form id="post-form"><textarea name="content" placeholder="What's on your mind?" required></textarea><button type="submit">Post</button></form>"##,
            encode_text(&user.username)
        ),
        None => r#"<a href="/login">Log in</a> or <a href="/register">register</a> to join the conversation."#.to_string(),
    }
}

#[get("/")]
pub async fn index_page(
    state: web::Data<AppState>,
    MaybeUser(viewer): MaybeUser,
) -> Result<HttpResponse, ApiError> {
    let posts = state.repo.list_posts().await?;
    let mut authors = AuthorCache::new(state.repo.as_ref(), AUTHOR_CACHE_CAPACITY);

    let mut items = String::new();
    for post in &posts {
        let author = authors.get(&post.author).await?;
        let comments = state.repo.list_comments_for_post(&post.uuid).await?;
        items.push_str(&render_post(post, &author, &comments, viewer.is_some()));
    }
    authors.clear();

    if items.is_empty() {
        items = r#"<p class="empty">Nothing here yet.</p>"#.to_string();
    }

    // posts are filled in first; the session slot precedes them in the page
    let page = load_template("index.html")?
        .replace("API_PREFIX", &encode_double_quoted_attribute(&state.config.api_url_prefix))
        .replacen("PAGE_POSTS", &items, 1)
        .replacen("PAGE_SESSION", &render_session(viewer.as_ref()), 1);
    Ok(html(page))
}

async fn static_page(state: &AppState, name: &str) -> Result<HttpResponse, ApiError> {
    let page = load_template(name)?
        .replace("API_PREFIX", &encode_double_quoted_attribute(&state.config.api_url_prefix));
    Ok(html(page))
}

#[get("/login")]
pub async fn login_page(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    static_page(&state, "login.html").await
}

#[get("/register")]
pub async fn register_page(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    static_page(&state, "register.html").await
}
