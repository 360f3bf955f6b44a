//! services/api/src/web/tokens.rs
//!
//! Stateless minting and verification of the two session tokens. The access
//! and refresh tokens are signed with distinct secrets and carry distinct
//! claim sets: access claims include the user's roles, refresh claims never
//! do (roles must be re-read from the store on refresh).

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

type TokenResult<T> = Result<T, jsonwebtoken::errors::Error>;

/// Claims carried by the short-lived access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Username.
    pub sub: String,
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Claims carried by the refresh token. Username only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenService {
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_ttl_secs: i64,
        refresh_ttl_secs: i64,
    ) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl_secs
    }

    pub fn mint_access_token(&self, username: &str, roles: &[String]) -> TokenResult<String> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: username.to_string(),
            roles: roles.to_vec(),
            iat: now,
            exp: now + self.access_ttl_secs,
        };
        encode(&Header::default(), &claims, &self.access_encoding)
    }

    pub fn verify_access_token(&self, token: &str) -> TokenResult<AccessClaims> {
        let data = decode::<AccessClaims>(token, &self.access_decoding, &Validation::default())?;
        Ok(data.claims)
    }

    pub fn mint_refresh_token(&self, username: &str) -> TokenResult<String> {
        let now = Utc::now().timestamp();
        let claims = RefreshClaims {
            sub: username.to_string(),
            iat: now,
            exp: now + self.refresh_ttl_secs,
        };
        encode(&Header::default(), &claims, &self.refresh_encoding)
    }

    pub fn verify_refresh_token(&self, token: &str) -> TokenResult<RefreshClaims> {
        let data = decode::<RefreshClaims>(token, &self.refresh_decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("access-secret", "refresh-secret", 600, 86_400)
    }

    #[test]
    fn access_token_round_trip() {
        let svc = service();
        let roles = vec!["Employee".to_string(), "Admin".to_string()];
        let token = svc.mint_access_token("hank", &roles).unwrap();
        let claims = svc.verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, "hank");
        assert_eq!(claims.roles, roles);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn refresh_token_round_trip_carries_username_only() {
        let svc = service();
        let token = svc.mint_refresh_token("hank").unwrap();
        let claims = svc.verify_refresh_token(&token).unwrap();
        assert_eq!(claims.sub, "hank");
    }

    #[test]
    fn access_token_rejected_by_refresh_verifier() {
        let svc = service();
        let token = svc.mint_access_token("hank", &["Employee".to_string()]).unwrap();
        assert!(svc.verify_refresh_token(&token).is_err());
    }

    #[test]
    fn refresh_token_rejected_by_access_verifier() {
        let svc = service();
        let token = svc.mint_refresh_token("hank").unwrap();
        assert!(svc.verify_access_token(&token).is_err());
    }

    #[test]
    fn wrong_secret_fails() {
        let svc = service();
        let other = TokenService::new("other-access", "other-refresh", 600, 86_400);
        let token = svc.mint_access_token("hank", &[]).unwrap();
        assert!(other.verify_access_token(&token).is_err());
    }

    #[test]
    fn expired_token_fails() {
        // Mint with a TTL far enough in the past to clear the default leeway.
        let svc = TokenService::new("access-secret", "refresh-secret", -300, -300);
        let token = svc.mint_access_token("hank", &[]).unwrap();
        assert!(svc.verify_access_token(&token).is_err());
        let refresh = svc.mint_refresh_token("hank").unwrap();
        assert!(svc.verify_refresh_token(&refresh).is_err());
    }

    #[test]
    fn tampered_token_fails() {
        let svc = service();
        let mut token = svc.mint_refresh_token("hank").unwrap();
        token.push('x');
        assert!(svc.verify_refresh_token(&token).is_err());
    }
}
