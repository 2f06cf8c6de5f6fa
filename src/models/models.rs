use serde::{Serialize, Deserialize};

/// A `User` node with the uuids of its outgoing edges, oldest first.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UserRecord {
    pub username: String,
    pub posts: Vec<String>,
    pub comments: Vec<String>,
}

/// A `Post` node joined with its author and its incoming `Commented` edges.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PostRecord {
    pub uuid: String,
    pub content: String,
    pub timestamp: i64,
    pub author: String,
    pub comments: Vec<String>,
}

/// A `Commented` edge with both endpoints resolved.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CommentRecord {
    pub uuid: String,
    pub content: String,
    pub timestamp: i64,
    pub author: String,
    pub post: String,
}

#[derive(Deserialize)]
pub struct UserIn {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct PostIn {
    pub content: String,
}

#[derive(Deserialize)]
pub struct CommentIn {
    pub content: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UserOut {
    pub username: String,
    pub posts: Vec<String>,
    pub comments: Vec<String>,
    pub url: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PostOut {
    pub uuid: String,
    pub content: String,
    pub timestamp: i64,
    pub author: String,
    pub comments: Vec<String>,
    pub url: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CommentOut {
    pub uuid: String,
    pub content: String,
    pub timestamp: i64,
    pub author: String,
    pub post: String,
    pub url: String,
}

#[derive(Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}
