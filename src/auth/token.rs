//! Opaque bearer tokens resolving to participant uuids.
//!
//! A token is issued when a participant joins a room over HTTP and presented
//! as a query parameter when the WebSocket connects. HS256-signed JWT with
//! `{user_uuid, exp}` claims; validation failure is fatal at connect time.

use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GatewayError;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    user_uuid: Uuid,
    exp: i64,
}

/// Issues and validates participant session tokens.
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
    /// Creates a service signing with `secret` and issuing tokens valid
    /// for `ttl`.
    #[must_use]
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Issues a token for the participant uuid.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if signing fails.
    pub fn issue(&self, user_uuid: Uuid) -> Result<String, GatewayError> {
        let ttl = i64::try_from(self.ttl.as_secs())
            .map_err(|e| GatewayError::Internal(e.to_string()))?;
        let claims = Claims {
            user_uuid,
            exp: chrono::Utc::now().timestamp() + ttl,
        };
        self.encode_claims(&claims)
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String, GatewayError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| GatewayError::Internal(e.to_string()))
    }

    /// Decodes a token back to the participant uuid.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ExpiredToken`] past expiry and
    /// [`GatewayError::InvalidToken`] for any other validation failure.
    pub fn decode(&self, token: &str) -> Result<Uuid, GatewayError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => GatewayError::ExpiredToken,
                _ => GatewayError::InvalidToken,
            },
        )?;
        Ok(data.claims.user_uuid)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret", Duration::from_secs(3600))
    }

    #[test]
    fn issue_then_decode_round_trips() {
        let service = service();
        let uuid = Uuid::new_v4();

        let token = service.issue(uuid);
        let Ok(token) = token else {
            panic!("issue failed");
        };
        assert_eq!(service.decode(&token).ok(), Some(uuid));
    }

    #[test]
    fn garbage_token_is_invalid() {
        let service = service();
        assert!(matches!(
            service.decode("not-a-token"),
            Err(GatewayError::InvalidToken)
        ));
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let issuer = TokenService::new("other-secret", Duration::from_secs(3600));
        let token = issuer.issue(Uuid::new_v4()).unwrap_or_default();

        assert!(matches!(
            service().decode(&token),
            Err(GatewayError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let service = service();
        let claims = Claims {
            user_uuid: Uuid::new_v4(),
            exp: chrono::Utc::now().timestamp() - 60,
        };
        let token = service.encode_claims(&claims).unwrap_or_default();

        assert!(matches!(
            service.decode(&token),
            Err(GatewayError::ExpiredToken)
        ));
    }
}
