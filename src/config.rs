use std::str::FromStr;

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 1;
pub const MAX_CONTENT_LENGTH: usize = 5000;
pub const AUTHOR_CACHE_CAPACITY: usize = 128;

/// Which repository adapter backs the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbBackend {
    Neo4j,
    Memory,
}

impl FromStr for DbBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "neo4j" => Ok(DbBackend::Neo4j),
            "memory" => Ok(DbBackend::Memory),
            other => Err(format!("unknown db backend: {}", other)),
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub api_url_prefix: String,
    pub db_backend: DbBackend,
    pub db_hostname: String,
    pub db_port: u16,
    pub db_username: String,
    pub db_password: String,
    pub db_max_connections: usize,
    pub auth_token_name: String,
    pub auth_token_duration_seconds: i64,
    pub cookie_max_age_seconds: i64,
    pub secret_key: String,
    pub seed_demo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            api_url_prefix: "/api".to_string(),
            db_backend: DbBackend::Neo4j,
            db_hostname: "localhost".to_string(),
            db_port: 7687,
            db_username: "neo4j".to_string(),
            db_password: "neo4j".to_string(),
            db_max_connections: 16,
            auth_token_name: "X-Token".to_string(),
            auth_token_duration_seconds: 60 * 60 * 24,
            cookie_max_age_seconds: 60 * 60 * 24,
            secret_key: "secret".to_string(),
            seed_demo: false,
        }
    }
}

impl Config {
    /// Every field can be overridden with a `TRELLIS_*` variable.
    /// Values that fail to parse keep the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Config::default();

        Config {
            bind_address: lookup("TRELLIS_BIND").unwrap_or(d.bind_address),
            api_url_prefix: lookup("TRELLIS_API_URL_PREFIX")
                .map(|p| p.trim_end_matches('/').to_string())
                .unwrap_or(d.api_url_prefix),
            db_backend: parse_var(&lookup, "TRELLIS_DB_BACKEND").unwrap_or(d.db_backend),
            db_hostname: lookup("TRELLIS_DB_HOSTNAME").unwrap_or(d.db_hostname),
            db_port: parse_var(&lookup, "TRELLIS_DB_PORT").unwrap_or(d.db_port),
            db_username: lookup("TRELLIS_DB_USERNAME").unwrap_or(d.db_username),
            db_password: lookup("TRELLIS_DB_PASSWORD").unwrap_or(d.db_password),
            db_max_connections: parse_var(&lookup, "TRELLIS_DB_MAX_CONNECTIONS")
                .unwrap_or(d.db_max_connections),
            auth_token_name: lookup("TRELLIS_AUTH_TOKEN_NAME").unwrap_or(d.auth_token_name),
            auth_token_duration_seconds: parse_var(&lookup, "TRELLIS_AUTH_TOKEN_DURATION_SECONDS")
                .unwrap_or(d.auth_token_duration_seconds),
            cookie_max_age_seconds: parse_var(&lookup, "TRELLIS_COOKIE_MAX_AGE_SECONDS")
                .unwrap_or(d.cookie_max_age_seconds),
            secret_key: lookup("TRELLIS_SECRET_KEY").unwrap_or(d.secret_key),
            seed_demo: parse_var(&lookup, "TRELLIS_SEED_DEMO").unwrap_or(d.seed_demo),
        }
    }

    /// True while the signing secret is still the built-in development one.
    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == Config::default().secret_key
    }

    pub fn db_uri(&self) -> String {
        format!("neo4j://{}:{}", self.db_hostname, self.db_port)
    }
}
