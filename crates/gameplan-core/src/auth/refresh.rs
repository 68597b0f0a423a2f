//! Single-flight refresh of the access token.
//!
//! Any number of requests can hit an authorization failure at the same
//! time. `TokenRefresher` guarantees they produce exactly one call to
//! the refresh endpoint: the first caller starts the exchange and
//! installs a shared handle, every later caller joins that handle, and
//! all of them observe the same outcome - the same fresh token, or the
//! same `None`.
//!
//! There is no timeout of its own here. How long an exchange (and
//! everyone waiting on it) can hang is bounded by the request timeout
//! on the `reqwest::Client` passed in.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{TokenStore, TokenUpdate};

/// Path of the refresh endpoint, relative to the API base
const REFRESH_ENDPOINT: &str = "/auth/token/refresh/";

/// One in-flight refresh exchange, shareable by any number of waiters.
type Flight = Shared<BoxFuture<'static, Option<String>>>;

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

/// The server may rotate the refresh token; when it does, the response
/// carries the replacement alongside the new access token.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

pub struct TokenRefresher {
    client: Client,
    store: Arc<TokenStore>,
    refresh_url: String,
    in_flight: Mutex<Option<Flight>>,
}

impl TokenRefresher {
    pub fn new(client: Client, store: Arc<TokenStore>, api_base: &str) -> Self {
        Self {
            client,
            store,
            refresh_url: format!("{}{}", api_base.trim_end_matches('/'), REFRESH_ENDPOINT),
            in_flight: Mutex::new(None),
        }
    }

    /// Obtain a fresh access token, or `None` if the session cannot be
    /// renewed.
    ///
    /// If an exchange is already in flight the call joins it instead of
    /// starting another, and resolves to the same outcome. With no
    /// stored refresh token this returns `None` without touching the
    /// network. On success the new tokens are persisted before any
    /// waiter observes the result; on failure no store mutation happens
    /// here - deciding to end the session is the caller's job.
    pub async fn refresh(&self) -> Option<String> {
        let flight = self.join_or_start()?;

        let outcome = flight.clone().await;

        // Release the slot so the next authorization failure starts a
        // fresh exchange. Every waiter that completes runs this; the
        // identity check keeps a newer flight installed by a later
        // failure intact. A waiter cancelled mid-await leaves the slot
        // occupied, but the flight is still joinable and drivable by
        // whoever comes next, so nothing wedges.
        {
            let mut slot = self.lock_slot();
            if slot.as_ref().is_some_and(|current| current.ptr_eq(&flight)) {
                *slot = None;
            }
        }

        outcome
    }

    /// Join the exchange in progress, or start one. `None` means there
    /// is no refresh token to exchange. Checking the slot and installing
    /// into it happen under a single lock acquisition, so two racing
    /// callers can never both start an exchange.
    fn join_or_start(&self) -> Option<Flight> {
        let mut slot = self.lock_slot();
        if let Some(flight) = slot.as_ref() {
            debug!("joining refresh already in flight");
            return Some(flight.clone());
        }

        let refresh_token = self.store.refresh_token()?;
        let flight = self.start_flight(refresh_token);
        *slot = Some(flight.clone());
        Some(flight)
    }

    fn start_flight(&self, refresh_token: String) -> Flight {
        let client = self.client.clone();
        let store = Arc::clone(&self.store);
        let url = self.refresh_url.clone();

        async move {
            match exchange(&client, &url, &refresh_token).await {
                Ok(tokens) => {
                    debug!(rotated = tokens.refresh.is_some(), "access token refreshed");
                    let update = TokenUpdate {
                        access: Some(tokens.access.clone()),
                        refresh: tokens.refresh,
                    };
                    if let Err(err) = store.set_tokens(update) {
                        warn!(error = %err, "refreshed tokens could not be persisted");
                    }
                    Some(tokens.access)
                }
                Err(err) => {
                    warn!(error = %err, "token refresh failed");
                    None
                }
            }
        }
        .boxed()
        .shared()
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<Flight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exchange the refresh token for a new access token. Any non-success
/// status is an error; the caller does not distinguish why.
async fn exchange(
    client: &Client,
    url: &str,
    refresh_token: &str,
) -> Result<RefreshResponse, reqwest::Error> {
    let response = client
        .post(url)
        .json(&RefreshRequest {
            refresh: refresh_token,
        })
        .send()
        .await?
        .error_for_status()?;

    response.json().await
}
