//! HS256 access tokens.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub company_id: i64,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct JwtConfig {
    secret: String,
    pub expires_in: Duration,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>, expires_in: Duration) -> Self {
        Self {
            secret: secret.into(),
            expires_in,
        }
    }

    pub fn issue(&self, user_id: i64, email: &str, company_id: i64) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            company_id,
            iat: now,
            exp: now + self.expires_in.as_secs() as i64,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )?;
        Ok(data.claims)
    }
}

/// Parse `3600`, `45s`, `30m`, `12h` or `1d` into a duration.
pub fn parse_expires_in(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let (digits, unit) = match value.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((idx, _)) => value.split_at(idx),
        None => (value, "s"),
    };
    let amount: u64 = digits.parse().ok()?;
    let multiplier = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return None,
    };
    amount.checked_mul(multiplier).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let jwt = JwtConfig::new("test-secret", Duration::from_secs(60));
        let token = jwt.issue(7, "admin@admin.com", 1).unwrap();
        let claims = jwt.verify(&token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.email, "admin@admin.com");
        assert_eq!(claims.company_id, 1);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = JwtConfig::new("a", Duration::from_secs(60))
            .issue(1, "x@y.z", 1)
            .unwrap();
        let err = JwtConfig::new("b", Duration::from_secs(60))
            .verify(&token)
            .unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let jwt = JwtConfig::new("secret", Duration::from_secs(0));
        let claims = Claims {
            sub: 1,
            email: "x@y.z".into(),
            company_id: 1,
            iat: Utc::now().timestamp() - 120,
            exp: Utc::now().timestamp() - 60,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(matches!(jwt.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_parse_expires_in() {
        assert_eq!(parse_expires_in("1d"), Some(Duration::from_secs(86_400)));
        assert_eq!(parse_expires_in("12h"), Some(Duration::from_secs(43_200)));
        assert_eq!(parse_expires_in("30m"), Some(Duration::from_secs(1_800)));
        assert_eq!(parse_expires_in("3600"), Some(Duration::from_secs(3_600)));
        assert_eq!(parse_expires_in("1w"), None);
        assert_eq!(parse_expires_in(""), None);
    }
}
