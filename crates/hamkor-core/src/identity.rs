//! Identity: the durable user record keyed by phone number.
//!
//! A pending one-time code lives on the identity as a single optional value
//! object, so a code can never exist without its issue timestamp.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{Error, Result};

/// External chat-account identifier (a Telegram user id).
pub type ChatAccountId = i64;

// ─── Role ────────────────────────────────────────────────────────────────────

/// What a user does on the marketplace. Flat; no hierarchy.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  AsRefStr,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  #[default]
  Customer,
  /// Service specialist. Older clients send `pro`.
  #[serde(alias = "pro")]
  #[strum(to_string = "specialist", serialize = "pro")]
  Specialist,
  Supplier,
  Admin,
}

impl Role {
  /// Parse the stored discriminant.
  pub fn parse(s: &str) -> Result<Self> {
    Self::from_str(s).map_err(|_| Error::UnknownRole(s.to_owned()))
  }
}

// ─── Pending OTP ─────────────────────────────────────────────────────────────

/// A one-time code waiting to be verified, together with its issue time.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingOtp {
  pub code:      String,
  pub issued_at: DateTime<Utc>,
}

impl PendingOtp {
  /// `issued_at` is truncated to microseconds, the precision of the store.
  pub fn new(code: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
    Self { code: code.into(), issued_at: issued_at.trunc_subsecs(6) }
  }

  /// Exact string comparison; the submitted code is not normalised.
  pub fn matches(&self, submitted: &str) -> bool { self.code == submitted }

  pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
    now - self.issued_at > ttl
  }
}

impl fmt::Debug for PendingOtp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PendingOtp")
      .field("code", &"<redacted>")
      .field("issued_at", &self.issued_at)
      .finish()
  }
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// One row per real-world user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
  #[serde(rename = "id")]
  pub identity_id:     Uuid,
  /// Canonical phone number; see [`crate::phone::normalize`].
  pub phone:           String,
  pub chat_binding_id: Option<ChatAccountId>,
  pub role:            Role,
  #[serde(skip)]
  pub pending_otp:     Option<PendingOtp>,
  /// Average of received review stars, `0.0` without reviews.
  pub rating:          f64,
  pub created_at:      DateTime<Utc>,
}

impl Identity {
  pub fn is_bound(&self) -> bool { self.chat_binding_id.is_some() }
}

/// Result of [`crate::store::MarketStore::bind_chat`].
#[derive(Debug, Clone)]
pub struct ChatBinding {
  pub identity: Identity,
  /// `true` when the identity did not exist before the binding.
  pub created:  bool,
}
