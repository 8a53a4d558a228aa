//! Auth collaborator: bearer token verification.
//!
//! Credential issuance lives outside this service. The gateway only needs
//! the opaque contract `verify(token) -> {user_id, username, role}`, which
//! [`TokenVerifier`] captures. [`JwtVerifier`] is the production
//! implementation (HS256). Verification happens once per WebSocket
//! handshake and on every privileged REST call.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::UserId;
use crate::error::ArenaError;

/// Role claimed by a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular participant.
    Player,
    /// Administrator; may join the admin namespace and drive rounds.
    Admin,
}

impl Role {
    /// Returns `true` for the admin role.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Identity resolved from a bearer token at connection time.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Verified user identifier.
    pub user_id: UserId,
    /// Display name carried in the token.
    pub username: String,
    /// Verified role.
    pub role: Role,
}

/// JWT claims expected in a bearer token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(rename = "userId")]
    user_id: uuid::Uuid,
    username: String,
    role: Role,
    exp: usize,
}

/// Verifies bearer tokens into an [`AuthContext`].
pub trait TokenVerifier: Send + Sync + std::fmt::Debug {
    /// Verifies the token and returns the resolved identity.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Unauthorized`] for a missing, malformed, or
    /// expired token.
    fn verify(&self, token: &str) -> Result<AuthContext, ArenaError>;
}

/// HS256 JWT verifier backed by a shared secret.
pub struct JwtVerifier {
    key: DecodingKey,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier").finish_non_exhaustive()
    }
}

impl JwtVerifier {
    /// Creates a verifier from the shared HMAC secret.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<AuthContext, ArenaError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = jsonwebtoken::decode::<Claims>(token, &self.key, &validation)
            .map_err(|e| ArenaError::Unauthorized(e.to_string()))?;

        Ok(AuthContext {
            user_id: UserId::from_uuid(data.claims.user_id),
            username: data.claims.username,
            role: data.claims.role,
        })
    }
}

/// Extracts a bearer token from an `Authorization` header value.
///
/// # Errors
///
/// Returns [`ArenaError::Unauthorized`] when the header is absent or not
/// of the `Bearer <token>` form.
pub fn bearer_token(header: Option<&str>) -> Result<&str, ArenaError> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ArenaError::Unauthorized("missing bearer token".to_string()))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header};

    fn sign(secret: &str, claims: &Claims) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap_or_default()
    }

    fn future_exp() -> usize {
        usize::try_from(chrono::Utc::now().timestamp() + 3600).unwrap_or(usize::MAX)
    }

    #[test]
    fn verifies_valid_token() {
        let verifier = JwtVerifier::new("secret");
        let user_id = uuid::Uuid::new_v4();
        let token = sign(
            "secret",
            &Claims {
                user_id,
                username: "ayse".to_string(),
                role: Role::Player,
                exp: future_exp(),
            },
        );

        let ctx = verifier.verify(&token);
        let Ok(ctx) = ctx else {
            panic!("expected valid token");
        };
        assert_eq!(*ctx.user_id.as_uuid(), user_id);
        assert_eq!(ctx.username, "ayse");
        assert!(!ctx.role.is_admin());
    }

    #[test]
    fn rejects_wrong_secret() {
        let verifier = JwtVerifier::new("secret");
        let token = sign(
            "other-secret",
            &Claims {
                user_id: uuid::Uuid::new_v4(),
                username: "mallory".to_string(),
                role: Role::Admin,
                exp: future_exp(),
            },
        );
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let verifier = JwtVerifier::new("secret");
        let token = sign(
            "secret",
            &Claims {
                user_id: uuid::Uuid::new_v4(),
                username: "late".to_string(),
                role: Role::Player,
                exp: 1,
            },
        );
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn bearer_token_strips_prefix() {
        let token = bearer_token(Some("Bearer abc.def.ghi"));
        let Ok(token) = token else {
            panic!("expected token");
        };
        assert_eq!(token, "abc.def.ghi");
    }

    #[test]
    fn bearer_token_rejects_missing() {
        assert!(bearer_token(None).is_err());
        assert!(bearer_token(Some("Basic foo")).is_err());
        assert!(bearer_token(Some("Bearer ")).is_err());
    }
}
