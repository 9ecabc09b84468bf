//! Stateless session tokens: HS256 JWTs whose subject is the phone number.
//!
//! Validity is signature plus expiry only. There is no revocation list, so a
//! token stays valid until `exp` even if the identity changes.

use chrono::{DateTime, Duration, Utc};
use hamkor_core::phone;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
  /// Canonical phone of the bearer.
  pub sub: String,
  pub iat: i64,
  pub exp: i64,
}

/// Mints and checks session tokens with a shared secret.
#[derive(Clone)]
pub struct SessionTokens {
  encoding: EncodingKey,
  decoding: DecodingKey,
  ttl:      Duration,
}

impl SessionTokens {
  pub fn new(secret: &str, ttl: Duration) -> Self {
    Self {
      encoding: EncodingKey::from_secret(secret.as_bytes()),
      decoding: DecodingKey::from_secret(secret.as_bytes()),
      ttl,
    }
  }

  /// Token for `phone`, valid for the configured lifetime from now.
  pub fn mint(&self, phone: &str) -> Result<String> { self.mint_at(phone, Utc::now()) }

  /// Like [`Self::mint`] with an explicit issue time.
  pub fn mint_at(&self, phone: &str, issued_at: DateTime<Utc>) -> Result<String> {
    let claims = Claims {
      sub: phone::normalize(phone),
      iat: issued_at.timestamp(),
      exp: (issued_at + self.ttl).timestamp(),
    };
    encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(Error::Token)
  }

  /// Verify `token` and return the canonical phone it was issued for.
  pub fn authenticate(&self, token: &str) -> Result<String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
      debug!(error = %e, "rejected session token");
      Error::InvalidToken
    })?;

    let phone = phone::normalize(&data.claims.sub);
    if phone.is_empty() {
      return Err(Error::InvalidToken);
    }
    Ok(phone)
  }
}
