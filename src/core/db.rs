use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::config::{Config, DbBackend};
use crate::core::graph_memory::MemoryGraph;
use crate::core::graph_neo4j::Neo4jGraph;
use crate::core::helpers::hash_password;
use crate::models::models::{CommentRecord, PostRecord, UserRecord};

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} already exists")]
    DuplicateKey(String),
    #[error("graph backend error: {0}")]
    Backend(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence port for users, posts and comments.
///
/// Comments are `Commented` edges between a user and a post, so every
/// comment operation resolves both endpoints. Listings of edges are ordered
/// by timestamp.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Idempotent schema setup (uniqueness constraints).
    async fn ensure_constraints(&self) -> RepoResult<()>;

    async fn create_user(&self, username: &str, password_hash: &str) -> RepoResult<UserRecord>;
    async fn get_user(&self, username: &str) -> RepoResult<UserRecord>;
    /// Stored password hash, `None` when the user does not exist.
    async fn user_password(&self, username: &str) -> RepoResult<Option<String>>;
    async fn list_users(&self) -> RepoResult<Vec<UserRecord>>;

    async fn create_post(&self, author: &str, content: &str) -> RepoResult<PostRecord>;
    async fn get_post(&self, id: &str) -> RepoResult<PostRecord>;
    /// Newest first.
    async fn list_posts(&self) -> RepoResult<Vec<PostRecord>>;

    async fn create_comment(&self, author: &str, post_id: &str, content: &str) -> RepoResult<CommentRecord>;
    async fn get_comment(&self, id: &str) -> RepoResult<CommentRecord>;
    /// Oldest first.
    async fn list_comments(&self) -> RepoResult<Vec<CommentRecord>>;
    /// Oldest first; `NotFound` when the post does not exist.
    async fn list_comments_for_post(&self, post_id: &str) -> RepoResult<Vec<CommentRecord>>;
}

/// Builds the configured adapter and prepares its schema.
pub async fn connect(config: &Config) -> anyhow::Result<Arc<dyn Repository>> {
    let repo: Arc<dyn Repository> = match config.db_backend {
        DbBackend::Neo4j => {
            info!(uri = %config.db_uri(), "connecting to neo4j");
            Arc::new(Neo4jGraph::connect(config).await?)
        }
        DbBackend::Memory => {
            info!("using in-memory graph");
            Arc::new(MemoryGraph::new())
        }
    };
    repo.ensure_constraints().await?;
    Ok(repo)
}

/// Demo accounts, each with the password equal to the username.
const DEMO_USERS: &[(&str, &[&str])] = &[
    ("test", &["This is my first post on Trellis!"]),
    (
        "alice",
        &[
            "Welcome to my board! Excited to share thoughts here.",
            "Just finished an amazing project. Feeling productive today!",
        ],
    ),
    ("bob", &["Hey everyone! Just joined Trellis, looking forward to connecting with you all."]),
];

/// Creates the demo accounts that are missing. Users that already exist are
/// left untouched, so restarting with seeding enabled does not duplicate posts.
pub async fn seed_demo_data(repo: &dyn Repository) -> anyhow::Result<()> {
    let mut first_post = None;

    for (username, posts) in DEMO_USERS {
        match repo.create_user(username, &hash_password(username)?).await {
            Ok(_) => {}
            Err(RepoError::DuplicateKey(_)) => continue,
            Err(e) => return Err(e.into()),
        }
        for content in posts.iter() {
            let post = repo.create_post(username, content).await?;
            first_post.get_or_insert(post.uuid);
        }
        info!(username, "seeded demo user");
    }

    if let Some(post_id) = first_post {
        repo.create_comment("bob", &post_id, "Welcome aboard!").await?;
    }

    Ok(())
}
