use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::core::db::{RepoError, RepoResult, Repository};
use crate::core::helpers::{new_uuid, now_millis};
use crate::models::models::{CommentRecord, PostRecord, UserRecord};

struct UserNode {
    password: String,
}

struct PostNode {
    content: String,
    timestamp: i64,
    seq: u64,
}

/// `(User)-[Posted]->(Post)`
struct PostedEdge {
    author: String,
    post: String,
}

/// `(User)-[Commented {uuid, content, timestamp}]->(Post)`
struct CommentedEdge {
    uuid: String,
    content: String,
    timestamp: i64,
    seq: u64,
    author: String,
    post: String,
}

#[derive(Default)]
struct Graph {
    users: BTreeMap<String, UserNode>,
    posts: HashMap<String, PostNode>,
    posted: Vec<PostedEdge>,
    commented: Vec<CommentedEdge>,
    next_seq: u64,
}

impl Graph {
    fn seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn user_record(&self, username: &str) -> UserRecord {
        let mut posts: Vec<(&str, &PostNode)> = self
            .posted
            .iter()
            .filter(|e| e.author == username)
            .filter_map(|e| self.posts.get(&e.post).map(|p| (e.post.as_str(), p)))
            .collect();
        posts.sort_by_key(|(_, p)| (p.timestamp, p.seq));

        let mut comments: Vec<&CommentedEdge> =
            self.commented.iter().filter(|c| c.author == username).collect();
        comments.sort_by_key(|c| (c.timestamp, c.seq));

        UserRecord {
            username: username.to_string(),
            posts: posts.into_iter().map(|(id, _)| id.to_string()).collect(),
            comments: comments.into_iter().map(|c| c.uuid.clone()).collect(),
        }
    }

    fn post_record(&self, uuid: &str) -> Option<PostRecord> {
        let node = self.posts.get(uuid)?;
        let author = self.posted.iter().find(|e| e.post == uuid)?.author.clone();
        Some(PostRecord {
            uuid: uuid.to_string(),
            content: node.content.clone(),
            timestamp: node.timestamp,
            author,
            comments: self.sorted_comments(|c| c.post == uuid).into_iter().map(|c| c.uuid).collect(),
        })
    }

    fn sorted_comments<F>(&self, keep: F) -> Vec<CommentRecord>
    where
        F: Fn(&CommentedEdge) -> bool,
    {
        let mut edges: Vec<&CommentedEdge> = self.commented.iter().filter(|&c| keep(c)).collect();
        edges.sort_by_key(|c| (c.timestamp, c.seq));
        edges.into_iter().map(comment_record).collect()
    }
}

fn comment_record(edge: &CommentedEdge) -> CommentRecord {
    CommentRecord {
        uuid: edge.uuid.clone(),
        content: edge.content.clone(),
        timestamp: edge.timestamp,
        author: edge.author.clone(),
        post: edge.post.clone(),
    }
}

/// In-process graph used for local development and tests.
#[derive(Default)]
pub struct MemoryGraph {
    graph: RwLock<Graph>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryGraph {
    async fn ensure_constraints(&self) -> RepoResult<()> {
        // uniqueness is enforced by the map keys
        Ok(())
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> RepoResult<UserRecord> {
        let mut graph = self.graph.write();
        if graph.users.contains_key(username) {
            return Err(RepoError::DuplicateKey(format!("user {}", username)));
        }
        graph.users.insert(
            username.to_string(),
            UserNode { password: password_hash.to_string() },
        );
        debug!(username, "user created");
        Ok(graph.user_record(username))
    }

    async fn get_user(&self, username: &str) -> RepoResult<UserRecord> {
        let graph = self.graph.read();
        if !graph.users.contains_key(username) {
            return Err(RepoError::NotFound(format!("user {}", username)));
        }
        Ok(graph.user_record(username))
    }

    async fn user_password(&self, username: &str) -> RepoResult<Option<String>> {
        Ok(self.graph.read().users.get(username).map(|u| u.password.clone()))
    }

    async fn list_users(&self) -> RepoResult<Vec<UserRecord>> {
        let graph = self.graph.read();
        Ok(graph.users.keys().map(|name| graph.user_record(name)).collect())
    }

    async fn create_post(&self, author: &str, content: &str) -> RepoResult<PostRecord> {
        let mut graph = self.graph.write();
        if !graph.users.contains_key(author) {
            return Err(RepoError::NotFound(format!("user {}", author)));
        }
        let uuid = new_uuid();
        if graph.posts.contains_key(&uuid) {
            return Err(RepoError::DuplicateKey(format!("post {}", uuid)));
        }
        let seq = graph.seq();
        graph.posts.insert(
            uuid.clone(),
            PostNode { content: content.to_string(), timestamp: now_millis(), seq },
        );
        graph.posted.push(PostedEdge { author: author.to_string(), post: uuid.clone() });
        graph
            .post_record(&uuid)
            .ok_or_else(|| RepoError::Backend("post vanished after insert".to_string()))
    }

    async fn get_post(&self, id: &str) -> RepoResult<PostRecord> {
        self.graph
            .read()
            .post_record(id)
            .ok_or_else(|| RepoError::NotFound(format!("post {}", id)))
    }

    async fn list_posts(&self) -> RepoResult<Vec<PostRecord>> {
        let graph = self.graph.read();
        let mut ids: Vec<(&String, &PostNode)> = graph.posts.iter().collect();
        ids.sort_by_key(|(_, p)| std::cmp::Reverse((p.timestamp, p.seq)));
        Ok(ids.into_iter().filter_map(|(id, _)| graph.post_record(id)).collect())
    }

    async fn create_comment(&self, author: &str, post_id: &str, content: &str) -> RepoResult<CommentRecord> {
        let mut graph = self.graph.write();
        if !graph.posts.contains_key(post_id) {
            return Err(RepoError::NotFound(format!("post {}", post_id)));
        }
        if !graph.users.contains_key(author) {
            return Err(RepoError::NotFound(format!("user {}", author)));
        }
        let uuid = new_uuid();
        if graph.commented.iter().any(|c| c.uuid == uuid) {
            return Err(RepoError::DuplicateKey(format!("comment {}", uuid)));
        }
        let seq = graph.seq();
        let edge = CommentedEdge {
            uuid,
            content: content.to_string(),
            timestamp: now_millis(),
            seq,
            author: author.to_string(),
            post: post_id.to_string(),
        };
        let record = comment_record(&edge);
        graph.commented.push(edge);
        Ok(record)
    }

    async fn get_comment(&self, id: &str) -> RepoResult<CommentRecord> {
        self.graph
            .read()
            .commented
            .iter()
            .find(|c| c.uuid == id)
            .map(comment_record)
            .ok_or_else(|| RepoError::NotFound(format!("comment {}", id)))
    }

    async fn list_comments(&self) -> RepoResult<Vec<CommentRecord>> {
        Ok(self.graph.read().sorted_comments(|_| true))
    }

    async fn list_comments_for_post(&self, post_id: &str) -> RepoResult<Vec<CommentRecord>> {
        let graph = self.graph.read();
        if !graph.posts.contains_key(post_id) {
            return Err(RepoError::NotFound(format!("post {}", post_id)));
        }
        Ok(graph.sorted_comments(|c| c.post == post_id))
    }
}
