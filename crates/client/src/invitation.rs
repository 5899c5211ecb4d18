//! Invitation (referral) code endpoints

use crate::client::{AdminClient, ApiRequest, error_message};
use crate::error::ClientError;
use crate::types::{ApiEnvelope, PageMeta};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

const LIST_CODES_PATH: &str = "/admin/invitation/get-codes";
const GENERATE_CODE_PATH: &str = "/admin/invitation/generate-code";

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// User who redeemed a code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeOwner {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// An invitation code as listed by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationCode {
    pub id: String,
    pub code: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "userId")]
    pub owner: Option<CodeOwner>,
    pub created_at: String,
    pub is_used: bool,
    #[serde(default)]
    pub used_at: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

impl InvitationCode {
    /// Whole days until the code expires, rounded up.
    ///
    /// `None` when the code has no expiry or it cannot be parsed; negative
    /// once the expiry has passed.
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> Option<i64> {
        let expires_at = DateTime::parse_from_rfc3339(self.expires_at.as_deref()?).ok()?;
        let millis = (expires_at.with_timezone(&Utc) - now).num_milliseconds();
        // Integer division truncates toward zero, which is already the
        // ceiling for negative values
        let days = millis / MILLIS_PER_DAY;
        Some(if millis % MILLIS_PER_DAY > 0 { days + 1 } else { days })
    }
}

/// One page of invitation codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationCodePage {
    pub codes: Vec<InvitationCode>,
    pub meta: Option<PageMeta>,
}

impl InvitationCodePage {
    /// Total number of codes across all pages
    pub fn total(&self) -> u64 {
        self.meta
            .as_ref()
            .map_or(self.codes.len() as u64, |meta| meta.total)
    }
}

impl AdminClient {
    /// List invitation codes, one page at a time (pages start at 1)
    pub async fn list_invitation_codes(
        &self,
        page: u32,
        limit: u32,
    ) -> Result<InvitationCodePage, ClientError> {
        let request = ApiRequest::get(format!("{LIST_CODES_PATH}?page={page}&limit={limit}"));
        let mut envelope: ApiEnvelope<Vec<InvitationCode>> = self.execute_envelope(request).await?;

        let meta = envelope.meta.take();
        let codes = envelope.into_result()?;
        debug!(page, limit, count = codes.len(), "Fetched invitation codes");

        Ok(InvitationCodePage { codes, meta })
    }

    /// Ask the backend to issue a new invitation code
    pub async fn generate_invitation_code(&self) -> Result<(), ClientError> {
        let request = ApiRequest::post(GENERATE_CODE_PATH).json(&serde_json::json!({}))?;
        let response = self.request(request).await?;
        let status = response.status();

        if matches!(status, StatusCode::CREATED | StatusCode::NO_CONTENT) {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ClientError::from_status(status, error_message(&body, status)));
        }

        // A 2xx body that is not an envelope still means the code was issued
        match serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body) {
            Ok(envelope) if !envelope.success => Err(ClientError::Api(
                envelope
                    .message
                    .unwrap_or_else(|| "Failed to generate code".to_string()),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn code(expires_at: Option<&str>) -> InvitationCode {
        InvitationCode {
            id: "c1".to_string(),
            code: "KEY-123".to_string(),
            email: None,
            owner: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            is_used: false,
            used_at: None,
            expires_at: expires_at.map(str::to_string),
        }
    }

    #[test]
    fn test_days_until_expiry_rounds_up() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(
            code(Some("2026-01-03T00:00:00Z")).days_until_expiry(now),
            Some(2)
        );
        assert_eq!(
            code(Some("2026-01-02T12:00:00Z")).days_until_expiry(now),
            Some(1)
        );
        assert_eq!(
            code(Some("2025-12-31T00:00:00Z")).days_until_expiry(now),
            Some(-1)
        );
    }

    #[test]
    fn test_days_until_expiry_without_expiry() {
        let now = Utc::now();
        assert_eq!(code(None).days_until_expiry(now), None);
        assert_eq!(code(Some("someday")).days_until_expiry(now), None);
    }

    #[test]
    fn test_code_wire_format() {
        let parsed: InvitationCode = serde_json::from_value(json!({
            "id": "c1",
            "code": "KEY-123",
            "email": "invitee@example.com",
            "userId": {
                "id": "u1",
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": "ada@example.com"
            },
            "createdAt": "2026-01-01T00:00:00Z",
            "isUsed": true,
            "usedAt": "2026-01-02T00:00:00Z",
            "expiresAt": null
        }))
        .unwrap();

        assert_eq!(parsed.owner.unwrap().first_name, "Ada");
        assert!(parsed.is_used);
        assert_eq!(parsed.expires_at, None);
    }

    #[test]
    fn test_page_total_falls_back_to_len() {
        let page = InvitationCodePage {
            codes: vec![code(None), code(None)],
            meta: None,
        };
        assert_eq!(page.total(), 2);
    }
}
