//! Session credential management.
//!
//! This module provides:
//! - `TokenStore`: durable storage for the access/refresh token pair
//! - `TokenRefresher`: the single-flight access token refresh protocol
//!
//! The store is the only shared mutable state in the crate. It is
//! mutated in exactly three situations: a login persists a full pair, a
//! successful refresh updates the access token (and the refresh token
//! when the server rotates it), and a logout or failed refresh clears
//! both.

pub mod credentials;
pub mod refresh;

pub use credentials::{StoreError, TokenStore, TokenUpdate};
pub use refresh::TokenRefresher;
