use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::principal::{Principal, Role};

/// Session tokens are valid for 24 hours from issuance.
const TOKEN_TTL_HOURS: i64 = 24;

/// JWT claims carried by a session token. `sub` holds the account id; the
/// remaining identity fields mirror [`Principal`].
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    email: String,
    role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assigned_agents: Option<Vec<Uuid>>,
    iat: i64,
    exp: i64,
}

/// Issues and verifies signed session tokens (HS256 over a server-held
/// secret). Cheap to clone; both key halves are derived from the secret once.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenSigner {
    pub fn new(secret: &[u8]) -> Self {
        TokenSigner {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Mint a token for `principal`, valid for 24 hours.
    pub fn issue(&self, principal: &Principal) -> Result<String, Error> {
        self.issue_at(principal, Utc::now())
    }

    fn issue_at(&self, principal: &Principal, issued_at: DateTime<Utc>) -> Result<String, Error> {
        let claims = Claims {
            sub: principal.id,
            email: principal.email.clone(),
            role: principal.role,
            name: principal.name.clone(),
            assigned_agents: principal.assigned_agents.clone(),
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Unexpected(format!("Failed to sign token: {e}")))
    }

    /// Verify a token and recover its principal. Expired, malformed, and
    /// signature-mismatched tokens all yield `None`; callers treat that as
    /// "no principal", never as an error.
    pub fn verify(&self, token: &str) -> Option<Principal> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256)).ok()?;
        let claims = data.claims;
        Some(Principal {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
            name: claims.name,
            assigned_agents: claims.assigned_agents,
        })
    }
}
