//! Signed access tokens (HS256 JWT).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use emporium_core::UserId;

use super::AuthError;
use crate::config::{AuthConfig, MAX_TOKEN_TTL_HOURS};

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id, as a decimal string.
    pub sub: String,
    /// Role code at the time of issue.
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if `sub` is not a user id.
    pub fn user_id(&self) -> Result<UserId, AuthError> {
        self.sub
            .parse::<i32>()
            .map(UserId::new)
            .map_err(|_| AuthError::InvalidToken("subject is not a user id".to_string()))
    }
}

/// Issues and verifies access tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::hours(config.token_ttl_hours.clamp(1, MAX_TOKEN_TTL_HOURS)),
        }
    }

    /// Sign a token for `user_id` valid from `now`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenEncoding` if signing fails.
    pub fn issue(
        &self,
        user_id: UserId,
        role: &str,
        now: DateTime<Utc>,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok((token, expires_at))
    }

    /// Check a token's signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is malformed, forged or expired.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(&AuthConfig {
            jwt_secret: SecretString::from(secret.to_string()),
            token_ttl_hours: 2,
        })
    }

    #[test]
    fn test_issue_then_verify() {
        let tokens = service("kQ8#vL2!pZ6@wR9$eT4^yU1&iO5*aS3%");
        let now = Utc::now();
        let (token, expires_at) = tokens.issue(UserId::new(42), "customer", now).unwrap();

        assert_eq!(expires_at, now + Duration::hours(2));
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), UserId::new(42));
        assert_eq!(claims.role, "customer");
    }

    #[test]
    fn test_oversized_ttl_is_capped() {
        let tokens = TokenService::new(&AuthConfig {
            jwt_secret: SecretString::from("kQ8#vL2!pZ6@wR9$eT4^yU1&iO5*aS3%".to_string()),
            token_ttl_hours: i64::MAX,
        });
        let now = Utc::now();
        let (_, expires_at) = tokens.issue(UserId::new(7), "customer", now).unwrap();
        assert_eq!(expires_at, now + Duration::hours(MAX_TOKEN_TTL_HOURS));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let tokens = service("kQ8#vL2!pZ6@wR9$eT4^yU1&iO5*aS3%");
        let (token, _) = tokens
            .issue(UserId::new(1), "customer", Utc::now() - Duration::hours(3))
            .unwrap();
        assert!(matches!(tokens.verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let (token, _) = service("kQ8#vL2!pZ6@wR9$eT4^yU1&iO5*aS3%")
            .issue(UserId::new(1), "customer", Utc::now())
            .unwrap();
        let other = service("Zx7&Nm3!Qw8@Lp2#Vb6$Hj9^Ty4*Rc1%");
        assert!(matches!(other.verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let tokens = service("kQ8#vL2!pZ6@wR9$eT4^yU1&iO5*aS3%");
        assert!(tokens.verify("not-a-token").is_err());
    }

    #[test]
    fn test_non_numeric_subject() {
        let claims = Claims {
            sub: "admin".to_string(),
            role: "super_admin".to_string(),
            iat: 0,
            exp: 0,
        };
        assert!(claims.user_id().is_err());
    }
}
