//! HTTP client for the gameplan API.
//!
//! [`Gateway`] owns the request mechanics: URL joining, header
//! assembly, payload encoding, and the automatic refresh-and-retry on
//! an authorization failure. [`ApiClient`] layers the typed endpoint
//! surface on top of it.

pub mod client;
pub mod error;
pub mod gateway;

pub use client::ApiClient;
pub use error::ApiError;
pub use gateway::{Gateway, Payload, RequestDescriptor};

/// Request methods are plain reqwest methods; callers building a
/// [`RequestDescriptor`] by hand use this alias.
pub use reqwest::Method;
