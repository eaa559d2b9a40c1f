//! Typed HTTP client for the Mosaico content backend.
//!
//! Provides the wire types of the generation, translation, export, upload,
//! refine and project endpoints, a [`MosaicoApi`] wrapper around them, and
//! the bearer-token seam used to authenticate requests.

pub mod api;
pub mod auth;
pub mod messages;

pub use api::{GatewayError, MosaicoApi};
pub use auth::{NoToken, StaticToken, TokenProvider};
