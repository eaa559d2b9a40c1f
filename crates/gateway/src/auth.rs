//! Bearer token sources for backend requests.
//!
//! Tokens are issued by an external identity provider. The gateway only asks
//! for the current one before each request.

use async_trait::async_trait;

#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current bearer token, or `None` to send the request unauthenticated.
    async fn token(&self) -> Option<String>;
}

/// Sends every request without an `Authorization` header.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoToken;

#[async_trait]
impl TokenProvider for NoToken {
    async fn token(&self) -> Option<String> {
        None
    }
}

/// A fixed token, typically a service credential from the environment.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}
