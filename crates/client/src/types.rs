//! Wire types shared by the auth and admin endpoints

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Access/refresh token pair issued by login and by refresh
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Signed, self-describing token carrying an `exp` claim
    pub access_token: String,
    /// Opaque credential accepted only by the refresh endpoint
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Standard response envelope: `{ success, message, data, meta }`
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

impl<T> ApiEnvelope<T> {
    /// Turn the envelope into a tagged result
    pub fn into_result(self) -> Result<T, ClientError> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(ClientError::Api(
                self.message
                    .unwrap_or_else(|| "response carried no data".to_string()),
            )),
            (false, _) => Err(ClientError::Api(
                self.message.unwrap_or_else(|| "request failed".to_string()),
            )),
        }
    }
}

/// Pagination block attached to list responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Login form body (sent form-urlencoded)
#[derive(Serialize)]
pub struct LoginForm<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Refresh request body
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

/// Logout request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub logout_from_all_devices: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_success_yields_data() {
        let envelope: ApiEnvelope<TokenPair> = serde_json::from_value(json!({
            "success": true,
            "data": { "accessToken": "at", "refreshToken": "rt" }
        }))
        .unwrap();

        let pair = envelope.into_result().unwrap();
        assert_eq!(pair, TokenPair::new("at", "rt"));
    }

    #[test]
    fn test_envelope_failure_carries_message() {
        let envelope: ApiEnvelope<TokenPair> = serde_json::from_value(json!({
            "success": false,
            "message": "Invalid credentials"
        }))
        .unwrap();

        match envelope.into_result() {
            Err(ClientError::Api(message)) => assert_eq!(message, "Invalid credentials"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_envelope_success_without_data_is_error() {
        let envelope: ApiEnvelope<TokenPair> =
            serde_json::from_value(json!({ "success": true })).unwrap();
        assert!(matches!(envelope.into_result(), Err(ClientError::Api(_))));
    }

    #[test]
    fn test_token_pair_debug_is_redacted() {
        let pair = TokenPair::new("secret-access", "secret-refresh");
        let debug = format!("{pair:?}");
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_logout_request_wire_name() {
        let body = serde_json::to_value(LogoutRequest {
            logout_from_all_devices: true,
        })
        .unwrap();
        assert_eq!(body, json!({ "logoutFromAllDevices": true }));
    }
}
