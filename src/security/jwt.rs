/// JWT token issuance and verification using HS256.
///
/// The signing secret and token lifetime are injected at construction time;
/// there is no process-global key state. Expiry is enforced at verification,
/// not by any background sweep.
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by an access token. `sub` holds the user's email.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub id: Uuid,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: i64,
}

impl JwtService {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    /// Issue a signed token for the given identity.
    pub fn issue(&self, email: &str, user_id: Uuid) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let expiry = now + Duration::seconds(self.ttl_secs);

        let claims = Claims {
            sub: email.to_string(),
            id: user_id,
            iat: now.timestamp(),
            exp: expiry.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// Decode and check signature and expiry. Fails on a bad signature, a
    /// malformed or expired token, and on payloads missing `sub` or `id`.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new("test-secret", 1800)
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let svc = service();
        let user_id = Uuid::new_v4();

        let token = svc.issue("test@example.com", user_id).unwrap();
        // JWT tokens have 3 parts separated by dots
        assert_eq!(token.matches('.').count(), 2);

        let claims = svc.verify(&token).unwrap();
        assert_eq!(claims.sub, "test@example.com");
        assert_eq!(claims.id, user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_expiry_is_ttl_from_now() {
        let svc = service();
        let token = svc.issue("test@example.com", Uuid::new_v4()).unwrap();
        let claims = svc.verify(&token).unwrap();

        let expected = Utc::now().timestamp() + 1800;
        // Allow 2 seconds tolerance for execution time
        assert!(claims.exp >= expected - 2);
        assert!(claims.exp <= expected + 2);
    }

    #[test]
    fn test_expired_token_rejected() {
        let svc = JwtService::new("test-secret", -60);
        let token = svc.issue("test@example.com", Uuid::new_v4()).unwrap();
        assert!(svc.verify(&token).is_err());
    }

    #[test]
    fn test_malformed_token_rejected() {
        assert!(service().verify("not.a.token").is_err());
        assert!(service().verify("").is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = service().issue("test@example.com", Uuid::new_v4()).unwrap();
        let other = JwtService::new("another-secret", 1800);
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_missing_claims_rejected() {
        // A token signed with the right key but without `id` must not verify.
        #[derive(Serialize)]
        struct Partial {
            sub: String,
            iat: i64,
            exp: i64,
        }

        let now = Utc::now().timestamp();
        let token = encode(
            &Header::default(),
            &Partial {
                sub: "test@example.com".to_string(),
                iat: now,
                exp: now + 600,
            },
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(service().verify(&token).is_err());
    }
}
