//! Turns graph records into API resources with hyperlinks to related
//! resources. Everything here is pure.

use crate::models::models::{CommentOut, CommentRecord, PostOut, PostRecord, UserOut, UserRecord};

#[derive(Debug, Clone)]
pub struct Links {
    prefix: String,
}

impl Links {
    pub fn new(prefix: &str) -> Self {
        Self { prefix: prefix.trim_end_matches('/').to_string() }
    }

    pub fn user(&self, username: &str) -> String {
        format!("{}/users/{}", self.prefix, urlencoding::encode(username))
    }

    pub fn post(&self, uuid: &str) -> String {
        format!("{}/posts/{}", self.prefix, urlencoding::encode(uuid))
    }

    pub fn comment(&self, uuid: &str) -> String {
        format!("{}/comments/{}", self.prefix, urlencoding::encode(uuid))
    }

    pub fn user_out(&self, record: &UserRecord) -> UserOut {
        UserOut {
            username: record.username.clone(),
            posts: record.posts.iter().map(|id| self.post(id)).collect(),
            comments: record.comments.iter().map(|id| self.comment(id)).collect(),
            url: self.user(&record.username),
        }
    }

    pub fn post_out(&self, record: &PostRecord) -> PostOut {
        PostOut {
            uuid: record.uuid.clone(),
            content: record.content.clone(),
            timestamp: record.timestamp,
            author: self.user(&record.author),
            comments: record.comments.iter().map(|id| self.comment(id)).collect(),
            url: self.post(&record.uuid),
        }
    }

    pub fn comment_out(&self, record: &CommentRecord) -> CommentOut {
        CommentOut {
            uuid: record.uuid.clone(),
            content: record.content.clone(),
            timestamp: record.timestamp,
            author: self.user(&record.author),
            post: self.post(&record.post),
            url: self.comment(&record.uuid),
        }
    }
}
