//! Local access-token expiry check
//!
//! The access token is a JWT. Only the `exp` claim of the payload segment is
//! read; the signature is the server's business. Anything that cannot be
//! decoded counts as expired.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use chrono::Utc;
use serde::Deserialize;

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: f64,
}

/// Seconds-since-epoch expiry carried by the token, if it can be read
pub fn token_expiry(token: &str) -> Option<f64> {
    let payload = token.split('.').nth(1)?;
    let payload = payload.trim_end_matches('=');

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .ok()?;

    let claim: ExpiryClaim = serde_json::from_slice(&bytes).ok()?;
    claim.exp.is_finite().then_some(claim.exp)
}

/// Whether the token is expired at `now_millis` (milliseconds since epoch)
#[allow(clippy::cast_precision_loss)]
pub fn is_token_expired_at(token: &str, now_millis: i64) -> bool {
    token_expiry(token).is_none_or(|exp| now_millis as f64 >= exp * 1000.0)
}

/// Whether the token is expired now; undecodable tokens are expired
pub fn is_token_expired(token: &str) -> bool {
    is_token_expired_at(token, Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Unsigned JWT-shaped token with the given payload
    fn token_with_payload(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.signature")
    }

    fn token_expiring_in(secs: i64) -> String {
        token_with_payload(&json!({ "sub": "admin", "exp": Utc::now().timestamp() + secs }))
    }

    #[test]
    fn test_future_expiry_is_fresh() {
        assert!(!is_token_expired(&token_expiring_in(3600)));
    }

    #[test]
    fn test_past_expiry_is_expired() {
        assert!(is_token_expired(&token_expiring_in(-10)));
    }

    #[test]
    fn test_expiry_boundary_is_expired() {
        let token = token_with_payload(&json!({ "exp": 1_700_000_000 }));
        assert!(is_token_expired_at(&token, 1_700_000_000_000));
        assert!(!is_token_expired_at(&token, 1_699_999_999_999));
    }

    #[test]
    fn test_fractional_expiry() {
        let token = token_with_payload(&json!({ "exp": 1_700_000_000.5 }));
        assert!(!is_token_expired_at(&token, 1_700_000_000_400));
        assert!(is_token_expired_at(&token, 1_700_000_000_500));
    }

    #[test]
    fn test_malformed_tokens_are_expired() {
        let missing_exp = token_with_payload(&json!({ "sub": "admin" }));
        let string_exp = token_with_payload(&json!({ "exp": "tomorrow" }));
        let not_json = format!("h.{}.s", URL_SAFE_NO_PAD.encode("not json"));

        for token in [
            "",
            "no-dots-at-all",
            "header.%%%not-base64%%%.sig",
            not_json.as_str(),
            missing_exp.as_str(),
            string_exp.as_str(),
        ] {
            assert!(is_token_expired(token), "expected expired: {token:?}");
        }
    }

    #[test]
    fn test_padded_and_standard_alphabet_payloads_decode() {
        use base64::engine::general_purpose::STANDARD;

        let exp = Utc::now().timestamp() + 600;
        let payload = json!({ "exp": exp, "name": "??>>" }).to_string();
        let token = format!("h.{}.s", STANDARD.encode(payload));
        assert!(!is_token_expired(&token));
        assert_eq!(token_expiry(&token), Some(exp as f64));
    }
}
