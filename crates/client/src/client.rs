//! Authenticated admin API client
//!
//! Every outbound call goes through [`AdminClient::request`], which makes sure
//! a fresh access token is attached, refreshes it when needed, and replays a
//! request once after an unexpected `401`.

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::freshness::is_token_expired;
use crate::redirect::{LogRedirect, LoginRedirect};
use crate::refresh::{RefreshCoordinator, RefreshTicket, wait_for_outcome};
use crate::token_store::TokenStore;
use crate::types::{ApiEnvelope, RefreshTokenRequest, TokenPair};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder, Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub(crate) const LOGIN_PATH: &str = "/admin/auth/login";
pub(crate) const REFRESH_PATH: &str = "/admin/auth/refresh-token";
pub(crate) const LOGOUT_PATH: &str = "/admin/auth/logout";

const USER_AGENT: &str = concat!("keystone-admin-client/", env!("CARGO_PKG_VERSION"));

/// A replayable API request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    target: String,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl ApiRequest {
    /// Request for `target`, either a path under the API base URL or an
    /// absolute `http(s)://` URL
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::POST, target)
    }

    pub fn put(target: impl Into<String>) -> Self {
        Self::new(Method::PUT, target)
    }

    pub fn patch(target: impl Into<String>) -> Self {
        Self::new(Method::PATCH, target)
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(Method::DELETE, target)
    }

    /// Add a caller header. `Authorization` is always overwritten on send.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Serialize `body` as the JSON request body
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    /// Raw request body
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

/// Why a refresh was requested
#[derive(Clone, Copy)]
enum Renewal<'a> {
    /// Always rotate the tokens
    Forced,
    /// The caller found this access token missing, expired or rejected.
    /// A fresh token stored since then by another leader is reused without a
    /// second refresh call.
    Stale(Option<&'a str>),
}

struct ClientInner {
    http: Client,
    base_url: String,
    login_path: String,
    store: Arc<TokenStore>,
    redirect: Arc<dyn LoginRedirect>,
    refresh: RefreshCoordinator,
}

/// Admin API client with transparent token refresh.
///
/// Cheap to clone; clones share the token store and the refresh state.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<ClientInner>,
}

impl AdminClient {
    /// Create a client from configuration and a token store
    pub fn new(config: ClientConfig, store: Arc<TokenStore>) -> Result<Self, ClientError> {
        Self::builder().config(config).token_store(store).build()
    }

    /// Create a new client builder
    pub fn builder() -> AdminClientBuilder {
        AdminClientBuilder::default()
    }

    /// API origin without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Login entry point used for redirects
    pub fn login_path(&self) -> &str {
        &self.inner.login_path
    }

    /// The credential store this client reads and writes
    pub fn token_store(&self) -> &TokenStore {
        &self.inner.store
    }

    /// Absolute URL for a path or URL target
    pub fn endpoint(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else if target.starts_with('/') {
            format!("{}{}", self.inner.base_url, target)
        } else {
            format!("{}/{}", self.inner.base_url, target)
        }
    }

    pub(crate) fn http(&self) -> &Client {
        &self.inner.http
    }

    /// Send an authenticated request.
    ///
    /// A missing or expired access token is refreshed first; if no token can
    /// be obtained the call fails without touching the network. A `401` is
    /// answered with one refresh and one replay. Whatever comes back after
    /// that is returned as-is, including a second `401`.
    pub async fn request(&self, request: ApiRequest) -> Result<Response, ClientError> {
        let token = match self.inner.store.access_token() {
            Some(token) if !is_token_expired(&token) => token,
            stale => self
                .renew(Renewal::Stale(stale.as_deref()))
                .await
                .ok_or_else(|| {
                    ClientError::AuthenticationFailed("no valid access token".to_string())
                })?,
        };

        let mut response = self.send(&request, &token).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!(
                method = %request.method,
                target = %request.target,
                "Request unauthorized, refreshing token and retrying once"
            );
            if let Some(token) = self.renew(Renewal::Stale(Some(&token))).await {
                response = self.send(&request, &token).await?;
            }
        }

        Ok(response)
    }

    async fn send(&self, request: &ApiRequest, token: &str) -> Result<Response, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.extend(request.headers.clone());

        let mut bearer = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            ClientError::AuthenticationFailed("access token is not a valid header value".into())
        })?;
        bearer.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, bearer);

        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), self.endpoint(&request.target))
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        Ok(builder.send().await?)
    }

    /// Obtain a new access token.
    ///
    /// Only one refresh call is in flight at a time; concurrent callers wait
    /// for it and observe the same result. Returns `None` when the session
    /// cannot be renewed, in which case credentials have been cleared and
    /// the login redirect fired.
    pub async fn refresh(&self) -> Option<String> {
        self.renew(Renewal::Forced).await
    }

    async fn renew(&self, renewal: Renewal<'_>) -> Option<String> {
        let guard = match self.inner.refresh.begin() {
            RefreshTicket::Leader(guard) => guard,
            RefreshTicket::Follower(rx) => {
                debug!("Token refresh already in flight, waiting for it");
                return wait_for_outcome(rx).await;
            }
        };

        // Reads below happen only while this caller holds the refresh flag
        if let Renewal::Stale(seen) = renewal {
            if let Some(current) = self.inner.store.access_token() {
                if seen != Some(current.as_str()) && !is_token_expired(&current) {
                    debug!("Access token already refreshed by another caller");
                    guard.complete(Some(current.clone()));
                    return Some(current);
                }
            }
        }

        let Some(refresh_token) = self.inner.store.refresh_token() else {
            debug!("No refresh token stored");
            self.end_session();
            guard.complete(None);
            return None;
        };

        debug!("Refreshing access token");
        let outcome = match self.rotate_tokens(&refresh_token).await {
            Ok(tokens) => {
                let remember = self.inner.store.is_remembered();
                match self.inner.store.save_tokens(&tokens, remember) {
                    Ok(()) => {
                        debug!(remember, "Access token refreshed");
                        Some(tokens.access_token)
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to persist refreshed tokens");
                        None
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                None
            }
        };

        if outcome.is_none() {
            self.end_session();
        }
        guard.complete(outcome.clone());
        outcome
    }

    async fn rotate_tokens(&self, refresh_token: &str) -> Result<TokenPair, ClientError> {
        let response = self
            .inner
            .http
            .post(self.endpoint(REFRESH_PATH))
            .json(&RefreshTokenRequest { refresh_token })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::from_status(status, error_message(&body, status)));
        }

        let envelope: ApiEnvelope<TokenPair> = serde_json::from_str(&body)?;
        envelope.into_result()
    }

    /// Drop credentials and send the user back to login
    pub(crate) fn end_session(&self) {
        self.inner.store.clear_tokens();
        self.inner.redirect.redirect_to_login(&self.inner.login_path);
    }

    /// Execute an authenticated request and decode the response envelope
    pub async fn execute_envelope<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<ApiEnvelope<T>, ClientError> {
        let response = self.request(request).await?;
        let status = response.status();

        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ClientError::from_status(status, error_message(&body, status)))
        }
    }

    /// Execute an authenticated request and return the envelope's `data`
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        self.execute_envelope(request).await?.into_result()
    }
}

/// Best human-readable message in an error body: the JSON `message` field,
/// else the raw text, else the status reason
pub(crate) fn error_message(body: &str, status: StatusCode) -> String {
    #[derive(serde::Deserialize)]
    struct MessageBody {
        message: Option<String>,
    }

    if let Ok(MessageBody {
        message: Some(message),
    }) = serde_json::from_str::<MessageBody>(body)
    {
        return message;
    }

    if body.trim().is_empty() {
        status.to_string()
    } else {
        body.to_string()
    }
}

/// Builder for [`AdminClient`]
#[derive(Default)]
pub struct AdminClientBuilder {
    config: Option<ClientConfig>,
    store: Option<Arc<TokenStore>>,
    redirect: Option<Arc<dyn LoginRedirect>>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl AdminClientBuilder {
    /// Set the configuration (base URL, login path, timeout)
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Shorthand for a configuration with just a base URL
    #[must_use]
    pub fn base_url(self, url: impl Into<String>) -> Self {
        self.config(ClientConfig::new(url))
    }

    /// Set the credential store (defaults to an in-memory store)
    #[must_use]
    pub fn token_store(mut self, store: Arc<TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the login redirect hook (defaults to [`LogRedirect`])
    #[must_use]
    pub fn redirect(mut self, redirect: Arc<dyn LoginRedirect>) -> Self {
        self.redirect = Some(redirect);
        self
    }

    /// Override the configured request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    ///
    /// Fails with [`ClientError::Configuration`] when no valid API base URL
    /// is configured.
    pub fn build(self) -> Result<AdminClient, ClientError> {
        let config = self.config.unwrap_or_default();
        let base_url = config
            .api_base_url()?
            .as_str()
            .trim_end_matches('/')
            .to_string();

        let mut client_builder = ClientBuilder::new()
            .user_agent(self.user_agent.unwrap_or_else(|| USER_AGENT.to_string()));
        if let Some(timeout) = self.timeout.or_else(|| config.request_timeout()) {
            client_builder = client_builder.timeout(timeout);
        }

        Ok(AdminClient {
            inner: Arc::new(ClientInner {
                http: client_builder.build()?,
                base_url,
                login_path: config.login_path,
                store: self
                    .store
                    .unwrap_or_else(|| Arc::new(TokenStore::in_memory())),
                redirect: self.redirect.unwrap_or_else(|| Arc::new(LogRedirect)),
                refresh: RefreshCoordinator::new(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AdminClient {
        AdminClient::builder()
            .base_url("https://api.example.com/")
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_base_url() {
        let result = AdminClient::builder().build();
        assert!(matches!(result, Err(ClientError::Configuration(_))));
    }

    #[test]
    fn test_endpoint_resolution() {
        let client = client();
        assert_eq!(client.base_url(), "https://api.example.com");
        assert_eq!(
            client.endpoint("/admin/users"),
            "https://api.example.com/admin/users"
        );
        assert_eq!(
            client.endpoint("admin/users"),
            "https://api.example.com/admin/users"
        );
        assert_eq!(
            client.endpoint("https://other.example.com/x"),
            "https://other.example.com/x"
        );
    }

    #[test]
    fn test_error_message_prefers_json_message() {
        assert_eq!(
            error_message(r#"{"success":false,"message":"Nope"}"#, StatusCode::BAD_REQUEST),
            "Nope"
        );
        assert_eq!(error_message("plain", StatusCode::BAD_REQUEST), "plain");
        assert_eq!(
            error_message("", StatusCode::BAD_GATEWAY),
            StatusCode::BAD_GATEWAY.to_string()
        );
    }

    #[tokio::test]
    async fn test_request_without_credentials_fails_before_network() {
        let redirects = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = redirects.clone();
        // Port 9 (discard) is never contacted: no token means no request
        let client = AdminClient::builder()
            .base_url("http://127.0.0.1:9")
            .redirect(Arc::new(move |_: &str| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }))
            .build()
            .unwrap();

        let result = client.request(ApiRequest::get("/admin/users")).await;
        assert!(matches!(result, Err(ClientError::AuthenticationFailed(_))));
        assert_eq!(redirects.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
