/// Consumer-side HTTP client with refresh coalescing.
///
/// When concurrent requests all fail with 401 because the access credential
/// expired, exactly one of them (the leader) performs the refresh; the rest
/// park in a FIFO queue and are replayed once the refresh completes. Without
/// this, every parked request would race its own refresh and all but the
/// first would present a superseded credential, tripping server-side reuse
/// detection and killing the session.
///
/// The in-progress flag is always released, whatever the refresh outcome.
/// A failed refresh fails every parked request with a terminal auth error;
/// nothing retries.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use reqwest::{Request, Response, StatusCode};
use tokio::sync::{oneshot, Mutex};

#[derive(Debug)]
pub enum ClientError {
    /// The session cannot be repaired; the user must sign in again.
    AuthenticationRequired,
    Transport(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::AuthenticationRequired => write!(f, "Authentication required"),
            ClientError::Transport(msg) => write!(f, "Transport error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

struct Waiter {
    request: Request,
    respond_to: oneshot::Sender<Result<Response, ClientError>>,
}

struct RefreshState {
    refreshing: bool,
    waiters: VecDeque<Waiter>,
}

#[derive(Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: String,
    state: Arc<Mutex<RefreshState>>,
}

impl ApiClient {
    /// # Errors
    /// Fails if the underlying HTTP client cannot be constructed.
    pub fn new(base_url: String) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            state: Arc::new(Mutex::new(RefreshState {
                refreshing: false,
                waiters: VecDeque::new(),
            })),
        })
    }

    /// Number of requests currently parked on an in-flight refresh.
    pub async fn parked_requests(&self) -> usize {
        self.state.lock().await.waiters.len()
    }

    /// Sign in with email and password. Credential cookies land in the
    /// client's jar; the response is returned as-is.
    pub async fn login(&self, email: &str, password: &str) -> Result<Response, ClientError> {
        self.http_client
            .post(format!("{}/auth/login", self.base_url))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    /// Sign out, revoking the session server-side and dropping both cookies.
    pub async fn logout(&self) -> Result<Response, ClientError> {
        self.http_client
            .post(format!("{}/auth/logout", self.base_url))
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    /// GET with refresh coalescing.
    pub async fn get(&self, path: &str) -> Result<Response, ClientError> {
        let request = self
            .http_client
            .get(format!("{}{}", self.base_url, path))
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        self.execute(request).await
    }

    /// Send a request; on 401, coalesce into the current refresh wave and
    /// replay once. Requests to `/auth/` paths are never coalesced, so a
    /// failed login or refresh cannot trigger another refresh.
    pub async fn execute(&self, request: Request) -> Result<Response, ClientError> {
        let coalesce = is_coalesced_path(request.url().path());
        let replay = request.try_clone();

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if response.status() != StatusCode::UNAUTHORIZED || !coalesce {
            return Ok(response);
        }

        let Some(replay) = replay else {
            // Streaming bodies cannot be replayed.
            tracing::debug!("Unreplayable request rejected with 401");
            return Err(ClientError::AuthenticationRequired);
        };

        // Leader election. Whoever finds the flag clear refreshes; everyone
        // else parks.
        {
            let mut state = self.state.lock().await;
            if state.refreshing {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(Waiter {
                    request: replay,
                    respond_to: tx,
                });
                drop(state);

                return match rx.await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ClientError::Transport(
                        "refresh leader dropped".to_string(),
                    )),
                };
            }
            state.refreshing = true;
        }

        // No early return between here and the release below.
        let refresh_result = self.refresh_session().await;

        let waiters = {
            let mut state = self.state.lock().await;
            state.refreshing = false;
            std::mem::take(&mut state.waiters)
        };

        match refresh_result {
            Ok(()) => {
                tracing::debug!(waiters = waiters.len(), "Session refreshed, replaying queue");
                for waiter in waiters {
                    let outcome = self.replay(waiter.request).await;
                    let _ = waiter.respond_to.send(outcome);
                }
                self.replay(replay).await
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session refresh failed, failing parked requests");
                for waiter in waiters {
                    let _ = waiter
                        .respond_to
                        .send(Err(ClientError::AuthenticationRequired));
                }
                Err(ClientError::AuthenticationRequired)
            }
        }
    }

    async fn refresh_session(&self) -> Result<(), ClientError> {
        let response = self
            .http_client
            .post(format!("{}/auth/refresh", self.base_url))
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::AuthenticationRequired)
        }
    }

    /// One replay, no second refresh. A 401 here is terminal.
    async fn replay(&self, request: Request) -> Result<Response, ClientError> {
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ClientError::AuthenticationRequired);
        }
        Ok(response)
    }
}

fn is_coalesced_path(path: &str) -> bool {
    !path.starts_with("/auth/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_paths_are_never_coalesced() {
        assert!(!is_coalesced_path("/auth/login"));
        assert!(!is_coalesced_path("/auth/refresh"));
        assert!(!is_coalesced_path("/auth/logout"));
    }

    #[test]
    fn test_protected_paths_are_coalesced() {
        assert!(is_coalesced_path("/api/me"));
        assert!(is_coalesced_path("/api/resource"));
        assert!(is_coalesced_path("/health_check"));
    }
}
