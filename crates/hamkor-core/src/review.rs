//! Reviews left by one identity about another.

use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Accepted star values.
pub const STARS: RangeInclusive<u8> = 1..=5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
  #[serde(rename = "id")]
  pub review_id:  Uuid,
  pub from_id:    Uuid,
  pub to_id:      Uuid,
  pub stars:      u8,
  pub text:       Option<String>,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::MarketStore::add_review`].
#[derive(Debug, Clone)]
pub struct NewReview {
  pub from_id: Uuid,
  pub to_id:   Uuid,
  pub stars:   u8,
  pub text:    Option<String>,
}
