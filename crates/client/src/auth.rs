//! Login, logout and session checks

use crate::client::{AdminClient, ApiRequest, LOGIN_PATH, LOGOUT_PATH, error_message};
use crate::error::ClientError;
use crate::types::{ApiEnvelope, LoginForm, LogoutRequest, TokenPair};
use tracing::{debug, info, warn};

impl AdminClient {
    /// Sign in with email and password.
    ///
    /// On success the issued pair is stored in the durable tier when
    /// `remember` is set, in the session tier otherwise.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> Result<TokenPair, ClientError> {
        let response = self
            .http()
            .post(self.endpoint(LOGIN_PATH))
            .form(&LoginForm { email, password })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let envelope = match serde_json::from_str::<ApiEnvelope<TokenPair>>(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ClientError::LoginRejected(error_message(&body, status)));
            }
            Err(e) => return Err(e.into()),
        };

        if !status.is_success() || !envelope.success {
            return Err(ClientError::LoginRejected(
                envelope
                    .message
                    .unwrap_or_else(|| "Login failed".to_string()),
            ));
        }

        let tokens = envelope.into_result()?;
        self.token_store().save_tokens(&tokens, remember)?;
        info!(remember, "Signed in");
        Ok(tokens)
    }

    /// Sign out.
    ///
    /// The server-side logout is best effort: failures are logged and
    /// ignored. Local credentials are always cleared and the login redirect
    /// always fires.
    pub async fn logout(&self, logout_from_all_devices: bool) {
        let request = ApiRequest::post(LOGOUT_PATH).json(&LogoutRequest {
            logout_from_all_devices,
        });

        match request {
            Ok(request) => match self.request(request).await {
                Ok(response) if response.status().is_success() => {
                    debug!(logout_from_all_devices, "Server-side logout acknowledged");
                }
                Ok(response) => {
                    warn!(status = %response.status(), "Server-side logout rejected");
                }
                Err(e) => warn!(error = %e, "Server-side logout failed"),
            },
            Err(e) => warn!(error = %e, "Failed to encode logout request"),
        }

        self.end_session();
        info!("Signed out");
    }

    /// Whether an access token is stored in either tier
    pub fn is_authenticated(&self) -> bool {
        self.token_store().access_token().is_some()
    }
}
