//! gameplan-core: client library for the gameplan service.
//!
//! The crate centers on session handling: a durable [`TokenStore`]
//! holding the access/refresh token pair, a [`TokenRefresher`] that
//! collapses concurrent refresh attempts into a single network call,
//! and a [`Gateway`] that attaches the bearer credential and drives the
//! one permitted authorization retry. [`ApiClient`] exposes the service
//! operations on top of those pieces.
//!
//! The composition root owns the store and passes it in, which keeps
//! sessions isolated in tests and lets several clients share one
//! session:
//!
//! ```no_run
//! use std::sync::Arc;
//! use gameplan_core::{ApiClient, Config, TokenStore};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env();
//! let store = Arc::new(TokenStore::open(config.data_dir()?)?);
//! let client = ApiClient::new(&config, store)?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, Gateway, Method, Payload, RequestDescriptor};
pub use auth::{StoreError, TokenRefresher, TokenStore, TokenUpdate};
pub use config::{Config, ConfigError};
