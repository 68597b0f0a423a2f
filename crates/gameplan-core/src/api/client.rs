//! Typed client for the gameplan REST API.
//!
//! This module provides the `ApiClient` struct: login, registration,
//! session management, and the profile/posts/follow endpoints, all
//! dispatched through the [`Gateway`](super::Gateway) so every call
//! gets the same header, payload, and refresh handling.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::error::ApiError;
use super::gateway::{Gateway, Payload, RequestDescriptor};
use crate::auth::{TokenRefresher, TokenStore, TokenUpdate};
use crate::config::Config;
use crate::models::{Post, Profile, ProfileUpdate, User};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// The API serves small JSON documents; anything slower is effectively down.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Exchanges a username and password for an access/refresh token pair.
const LOGIN_ENDPOINT: &str = "/auth/token/";

/// Creates a new account. Does not log in.
const REGISTER_ENDPOINT: &str = "/auth/register/";

/// Returns the account behind the presented access token.
const ME_ENDPOINT: &str = "/auth/me/";

/// Reads and updates the caller's own profile.
const PROFILE_ENDPOINT: &str = "/profile/me/";

/// The shared feed; also the target for creating posts.
const POSTS_ENDPOINT: &str = "/posts/";

/// The caller's own posts, newest first.
const MY_POSTS_ENDPOINT: &str = "/posts/my/";

/// User ids the caller follows.
const FOLLOWING_ENDPOINT: &str = "/profile/following/";

#[derive(Debug, Deserialize)]
struct TokenPairResponse {
    access: String,
    refresh: String,
}

#[derive(Debug, Deserialize)]
struct FollowingResponse {
    following_ids: Vec<i64>,
}

/// Client for the gameplan API.
/// Clone is cheap - the gateway shares its connection pool and the
/// credential store is reference-counted.
#[derive(Clone)]
pub struct ApiClient {
    gateway: Gateway,
    store: Arc<TokenStore>,
}

impl ApiClient {
    /// Create a client against the configured API base, sharing the
    /// given credential store.
    pub fn new(config: &Config, store: Arc<TokenStore>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let refresher = Arc::new(TokenRefresher::new(
            client.clone(),
            Arc::clone(&store),
            config.api_base.as_str(),
        ));
        let gateway = Gateway::new(
            client,
            config.api_base.as_str(),
            Arc::clone(&store),
            refresher,
        );

        Ok(Self { gateway, store })
    }

    /// Whether a session is present. Says nothing about whether the
    /// server still accepts it; the first authenticated request finds
    /// that out.
    pub fn is_authenticated(&self) -> bool {
        self.store.access().is_some()
    }

    /// Log in and store the returned token pair. Any rejection from the
    /// endpoint reads as bad credentials.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let request = RequestDescriptor::post(LOGIN_ENDPOINT)
            .payload(Payload::Json(json!({
                "username": username,
                "password": password,
            })))
            .unauthenticated();

        let response = self.gateway.send(&request).await?;
        if !response.status().is_success() {
            debug!(status = %response.status(), "login rejected");
            return Err(ApiError::InvalidCredentials);
        }

        let tokens: TokenPairResponse = parse_json(response).await?;
        self.store
            .set_tokens(TokenUpdate::pair(tokens.access, tokens.refresh))?;
        debug!(username = %username, "logged in");
        Ok(())
    }

    /// Create an account. On success the caller still has to log in;
    /// registration never starts a session.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        let request = RequestDescriptor::post(REGISTER_ENDPOINT)
            .payload(Payload::Json(json!({
                "username": username,
                "email": email,
                "password": password,
            })))
            .unauthenticated();

        let response = self.gateway.send(&request).await?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::registration_failed(&body));
        }
        debug!(username = %username, "registered");
        Ok(())
    }

    /// The account behind the current session.
    pub async fn me(&self) -> Result<User, ApiError> {
        let response = self
            .gateway
            .send(&RequestDescriptor::get(ME_ENDPOINT))
            .await?;
        let response = expect_success(response).await?;
        parse_json(response).await
    }

    /// Drop the stored session. Always succeeds: with no tokens on
    /// disk, subsequent requests simply go out unauthenticated.
    pub fn logout(&self) {
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "could not clear stored credentials");
        }
        debug!("logged out");
    }

    /// The caller's own profile.
    pub async fn profile(&self) -> Result<Profile, ApiError> {
        let response = self
            .gateway
            .send(&RequestDescriptor::get(PROFILE_ENDPOINT))
            .await?;
        let response = expect_success(response).await?;
        parse_json(response).await
    }

    /// Update the caller's profile. Only the fields set on `update` are
    /// sent; the rest stay as they are server-side.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile, ApiError> {
        let body = serde_json::to_value(update)?;
        let request = RequestDescriptor::put(PROFILE_ENDPOINT).payload(Payload::Json(body));
        let response = self.gateway.send(&request).await?;
        let response = expect_success(response).await?;
        parse_json(response).await
    }

    /// The shared feed, newest first.
    pub async fn feed(&self, limit: u32) -> Result<Vec<Post>, ApiError> {
        self.fetch_posts(POSTS_ENDPOINT, limit).await
    }

    /// The caller's own posts, newest first.
    pub async fn my_posts(&self, limit: u32) -> Result<Vec<Post>, ApiError> {
        self.fetch_posts(MY_POSTS_ENDPOINT, limit).await
    }

    /// Publish a post, optionally with an attached media URL.
    pub async fn create_post(&self, text: &str, media_url: Option<&str>) -> Result<Post, ApiError> {
        let body = match media_url {
            Some(media_url) => json!({ "text": text, "media_url": media_url }),
            None => json!({ "text": text }),
        };
        let request = RequestDescriptor::post(POSTS_ENDPOINT).payload(Payload::Json(body));
        let response = self.gateway.send(&request).await?;
        let response = expect_success(response).await?;
        parse_json(response).await
    }

    /// Ids of the users the caller follows.
    pub async fn following(&self) -> Result<Vec<i64>, ApiError> {
        let response = self
            .gateway
            .send(&RequestDescriptor::get(FOLLOWING_ENDPOINT))
            .await?;
        let response = expect_success(response).await?;
        let parsed: FollowingResponse = parse_json(response).await?;
        Ok(parsed.following_ids)
    }

    /// Follow a user.
    pub async fn follow(&self, user_id: i64) -> Result<(), ApiError> {
        let response = self
            .gateway
            .send(&RequestDescriptor::post(follow_path(user_id)))
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    /// Stop following a user.
    pub async fn unfollow(&self, user_id: i64) -> Result<(), ApiError> {
        let response = self
            .gateway
            .send(&RequestDescriptor::delete(follow_path(user_id)))
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    /// Issue a raw request through the gateway. The typed methods cover
    /// the known endpoints; this is the escape hatch for everything
    /// else, with the same header and refresh handling.
    pub async fn send(&self, request: &RequestDescriptor) -> Result<Response, ApiError> {
        self.gateway.send(request).await
    }

    async fn fetch_posts(&self, endpoint: &str, limit: u32) -> Result<Vec<Post>, ApiError> {
        let path = format!("{}?limit={}", endpoint, limit);
        let response = self.gateway.send(&RequestDescriptor::get(path)).await?;
        let response = expect_success(response).await?;
        parse_json(response).await
    }
}

fn follow_path(user_id: i64) -> String {
    format!("/profile/follow/{}/", user_id)
}

/// Turn a non-success response into the matching error, reading the
/// body for the message. A success response passes through untouched.
async fn expect_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::from_status(status, &body))
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}
