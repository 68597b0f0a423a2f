//! Data models for the gameplan API.
//!
//! These mirror the JSON the server sends. Parsing is tolerant where
//! the server is allowed to omit or empty a field, and strict where a
//! missing field would mean a broken response.

pub mod post;
pub mod profile;
pub mod user;

pub use post::{Author, Post};
pub use profile::{Profile, ProfileUpdate, Role};
pub use user::User;
