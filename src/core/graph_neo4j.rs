use async_trait::async_trait;
use neo4rs::{query, ConfigBuilder, Graph, Query};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::core::db::{RepoError, RepoResult, Repository};
use crate::core::helpers::{new_uuid, now_millis};
use crate::models::models::{CommentRecord, PostRecord, UserRecord};

const CONSTRAINTS: &[&str] = &[
    "CREATE CONSTRAINT unique_username IF NOT EXISTS FOR (u:User) REQUIRE u.username IS UNIQUE",
    "CREATE CONSTRAINT unique_post_uuid IF NOT EXISTS FOR (p:Post) REQUIRE p.uuid IS UNIQUE",
];

const CONSTRAINT_VIOLATION: &str = "Neo.ClientError.Schema.ConstraintValidationFailed";

// The pattern is shared by get_user and list_users; the WITH/ORDER BY pairs
// make collect() keep edges in timestamp order.
const USER_PROJECTION: &str = "
    OPTIONAL MATCH (u)-[:Posted]->(p:Post)
    WITH u, p ORDER BY p.timestamp
    WITH u, collect(p.uuid) AS posts
    OPTIONAL MATCH (u)-[c:Commented]->(:Post)
    WITH u, posts, c ORDER BY c.timestamp
    RETURN u.username AS username, posts, collect(c.uuid) AS comments";

const POST_PROJECTION: &str = "
    OPTIONAL MATCH (:User)-[c:Commented]->(p)
    WITH a, p, c ORDER BY c.timestamp
    RETURN p.uuid AS uuid, p.content AS content, p.timestamp AS timestamp,
           a.username AS author, collect(c.uuid) AS comments";

const COMMENT_PROJECTION: &str = "
    RETURN c.uuid AS uuid, c.content AS content, c.timestamp AS timestamp,
           u.username AS author, p.uuid AS post";

#[derive(Deserialize)]
struct UuidRow {
    uuid: String,
}

#[derive(Deserialize)]
struct PasswordRow {
    password: String,
}

fn backend<E: std::fmt::Display>(err: E) -> RepoError {
    RepoError::Backend(err.to_string())
}

fn is_constraint_violation(err: &neo4rs::Error) -> bool {
    matches!(err, neo4rs::Error::Neo4j(e) if e.code() == CONSTRAINT_VIOLATION)
}

/// Neo4j adapter. Every call checks a connection out of the driver's pool
/// and returns it when the row stream is dropped.
pub struct Neo4jGraph {
    graph: Graph,
}

impl Neo4jGraph {
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let driver_config = ConfigBuilder::default()
            .uri(config.db_uri())
            .user(config.db_username.as_str())
            .password(config.db_password.as_str())
            .max_connections(config.db_max_connections)
            .build()?;
        let graph = Graph::connect(driver_config).await?;
        Ok(Self { graph })
    }

    async fn fetch_all<T>(&self, q: Query) -> RepoResult<Vec<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut rows = self.graph.execute(q).await.map_err(backend)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(backend)? {
            out.push(row.to::<T>().map_err(backend)?);
        }
        Ok(out)
    }

    async fn fetch_one<T>(&self, q: Query) -> RepoResult<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        Ok(self.fetch_all(q).await?.into_iter().next())
    }

    /// Runs a CREATE that reports DuplicateKey either through an empty result
    /// (guarded create) or through the uniqueness constraint.
    async fn fetch_created<T>(&self, q: Query, what: &str) -> RepoResult<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut rows = match self.graph.execute(q).await {
            Ok(rows) => rows,
            Err(e) if is_constraint_violation(&e) => return Err(RepoError::DuplicateKey(what.to_string())),
            Err(e) => return Err(backend(e)),
        };
        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row.to::<T>().map_err(backend)?)),
            Ok(None) => Ok(None),
            Err(e) if is_constraint_violation(&e) => Err(RepoError::DuplicateKey(what.to_string())),
            Err(e) => Err(backend(e)),
        }
    }
}

#[async_trait]
impl Repository for Neo4jGraph {
    async fn ensure_constraints(&self) -> RepoResult<()> {
        for statement in CONSTRAINTS {
            self.graph.run(query(statement)).await.map_err(backend)?;
        }
        debug!("constraints in place");
        Ok(())
    }

    #[instrument(skip(self, password_hash))]
    async fn create_user(&self, username: &str, password_hash: &str) -> RepoResult<UserRecord> {
        let q = query(
            "OPTIONAL MATCH (existing:User {username: $username})
             WITH existing WHERE existing IS NULL
             CREATE (u:User {username: $username, password: $password})
             RETURN u.username AS username, [] AS posts, [] AS comments",
        )
        .param("username", username)
        .param("password", password_hash);

        self.fetch_created::<UserRecord>(q, &format!("user {}", username))
            .await?
            .ok_or_else(|| RepoError::DuplicateKey(format!("user {}", username)))
    }

    #[instrument(skip(self))]
    async fn get_user(&self, username: &str) -> RepoResult<UserRecord> {
        let q = query(&format!("MATCH (u:User {{username: $username}}) {}", USER_PROJECTION))
            .param("username", username);
        self.fetch_one(q)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("user {}", username)))
    }

    #[instrument(skip(self))]
    async fn user_password(&self, username: &str) -> RepoResult<Option<String>> {
        let q = query("MATCH (u:User {username: $username}) RETURN u.password AS password")
            .param("username", username);
        Ok(self.fetch_one::<PasswordRow>(q).await?.map(|row| row.password))
    }

    #[instrument(skip(self))]
    async fn list_users(&self) -> RepoResult<Vec<UserRecord>> {
        let q = query(&format!(
            "MATCH (u:User) {} ORDER BY username",
            USER_PROJECTION
        ));
        self.fetch_all(q).await
    }

    #[instrument(skip(self, content))]
    async fn create_post(&self, author: &str, content: &str) -> RepoResult<PostRecord> {
        let uuid = new_uuid();
        let q = query(
            "MATCH (a:User {username: $author})
             CREATE (a)-[:Posted]->(p:Post {uuid: $uuid, content: $content, timestamp: $timestamp})
             RETURN p.uuid AS uuid",
        )
        .param("author", author)
        .param("uuid", uuid.as_str())
        .param("content", content)
        .param("timestamp", now_millis());

        self.fetch_created::<UuidRow>(q, &format!("post {}", uuid))
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("user {}", author)))?;
        self.get_post(&uuid).await
    }

    #[instrument(skip(self))]
    async fn get_post(&self, id: &str) -> RepoResult<PostRecord> {
        let q = query(&format!(
            "MATCH (a:User)-[:Posted]->(p:Post {{uuid: $uuid}}) {}",
            POST_PROJECTION
        ))
        .param("uuid", id);
        self.fetch_one(q)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("post {}", id)))
    }

    #[instrument(skip(self))]
    async fn list_posts(&self) -> RepoResult<Vec<PostRecord>> {
        let q = query(&format!(
            "MATCH (a:User)-[:Posted]->(p:Post) {} ORDER BY timestamp DESC",
            POST_PROJECTION
        ));
        self.fetch_all(q).await
    }

    #[instrument(skip(self, content))]
    async fn create_comment(&self, author: &str, post_id: &str, content: &str) -> RepoResult<CommentRecord> {
        let uuid = new_uuid();
        let q = query(&format!(
            "MATCH (p:Post {{uuid: $post}})
             MATCH (u:User {{username: $author}})
             WHERE NOT EXISTS {{ ()-[:Commented {{uuid: $uuid}}]->() }}
             CREATE (u)-[c:Commented {{uuid: $uuid, content: $content, timestamp: $timestamp}}]->(p)
             {}",
            COMMENT_PROJECTION
        ))
        .param("post", post_id)
        .param("author", author)
        .param("uuid", uuid.as_str())
        .param("content", content)
        .param("timestamp", now_millis());

        match self.fetch_created::<CommentRecord>(q, &format!("comment {}", uuid)).await? {
            Some(record) => Ok(record),
            None => {
                // Either endpoint is missing, or the generated uuid collided.
                self.get_post(post_id).await?;
                self.get_user(author).await?;
                Err(RepoError::DuplicateKey(format!("comment {}", uuid)))
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_comment(&self, id: &str) -> RepoResult<CommentRecord> {
        let q = query(&format!(
            "MATCH (u:User)-[c:Commented {{uuid: $uuid}}]->(p:Post) {}",
            COMMENT_PROJECTION
        ))
        .param("uuid", id);
        self.fetch_one(q)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("comment {}", id)))
    }

    #[instrument(skip(self))]
    async fn list_comments(&self) -> RepoResult<Vec<CommentRecord>> {
        let q = query(&format!(
            "MATCH (u:User)-[c:Commented]->(p:Post) {} ORDER BY timestamp",
            COMMENT_PROJECTION
        ));
        self.fetch_all(q).await
    }

    #[instrument(skip(self))]
    async fn list_comments_for_post(&self, post_id: &str) -> RepoResult<Vec<CommentRecord>> {
        let exists = query("MATCH (p:Post {uuid: $uuid}) RETURN p.uuid AS uuid").param("uuid", post_id);
        if self.fetch_one::<UuidRow>(exists).await?.is_none() {
            return Err(RepoError::NotFound(format!("post {}", post_id)));
        }

        let q = query(&format!(
            "MATCH (u:User)-[c:Commented]->(p:Post {{uuid: $uuid}}) {} ORDER BY timestamp",
            COMMENT_PROJECTION
        ))
        .param("uuid", post_id);
        self.fetch_all(q).await
    }
}
