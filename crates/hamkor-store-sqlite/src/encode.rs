//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed microsecond width
//! and a `Z` suffix, so lexicographic order equals chronological order and
//! range queries can compare strings directly. UUIDs are stored as hyphenated
//! lowercase strings.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use hamkor_core::{
  identity::{Identity, PendingOtp, Role},
  message::{ChatPeer, ChatSummary, Message},
  review::Review,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Role ─────────────────────────────────────────────────────────────────────

pub fn encode_role(role: Role) -> &'static str { role.into() }

pub fn decode_role(s: &str) -> Result<Role> { Ok(Role::parse(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`read_identity`].
pub const IDENTITY_COLUMNS: &str = "identity_id, phone, chat_binding_id, role, \
                                    otp_code, otp_issued_at, rating, created_at";

/// Raw values read directly from an `identities` row.
pub struct RawIdentity {
  pub identity_id:     String,
  pub phone:           String,
  pub chat_binding_id: Option<i64>,
  pub role:            String,
  pub otp_code:        Option<String>,
  pub otp_issued_at:   Option<String>,
  pub rating:          f64,
  pub created_at:      String,
}

pub fn read_identity(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawIdentity> {
  Ok(RawIdentity {
    identity_id:     row.get(0)?,
    phone:           row.get(1)?,
    chat_binding_id: row.get(2)?,
    role:            row.get(3)?,
    otp_code:        row.get(4)?,
    otp_issued_at:   row.get(5)?,
    rating:          row.get(6)?,
    created_at:      row.get(7)?,
  })
}

impl RawIdentity {
  pub fn into_identity(self) -> Result<Identity> {
    // The CHECK constraint keeps the pair consistent; a half-written pair
    // would be a schema violation, so treat it as "no pending code".
    let pending_otp = match (self.otp_code, self.otp_issued_at) {
      (Some(code), Some(at)) => Some(PendingOtp::new(code, decode_dt(&at)?)),
      _ => None,
    };

    Ok(Identity {
      identity_id: decode_uuid(&self.identity_id)?,
      phone: self.phone,
      chat_binding_id: self.chat_binding_id,
      role: decode_role(&self.role)?,
      pending_otp,
      rating: self.rating,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Column list matching [`read_message`].
pub const MESSAGE_COLUMNS: &str =
  "message_id, sender_id, receiver_id, content, image_url, is_read, created_at";

/// Raw values read directly from a `messages` row.
pub struct RawMessage {
  pub message_id:  String,
  pub sender_id:   String,
  pub receiver_id: String,
  pub content:     Option<String>,
  pub image_url:   Option<String>,
  pub is_read:     bool,
  pub created_at:  String,
}

pub fn read_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawMessage> {
  Ok(RawMessage {
    message_id:  row.get(0)?,
    sender_id:   row.get(1)?,
    receiver_id: row.get(2)?,
    content:     row.get(3)?,
    image_url:   row.get(4)?,
    is_read:     row.get(5)?,
    created_at:  row.get(6)?,
  })
}

impl RawMessage {
  pub fn into_message(self) -> Result<Message> {
    Ok(Message {
      message_id:  decode_uuid(&self.message_id)?,
      sender_id:   decode_uuid(&self.sender_id)?,
      receiver_id: decode_uuid(&self.receiver_id)?,
      content:     self.content,
      image_url:   self.image_url,
      is_read:     self.is_read,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Column list matching [`read_review`].
pub const REVIEW_COLUMNS: &str = "review_id, from_id, to_id, stars, text, created_at";

pub struct RawReview {
  pub review_id:  String,
  pub from_id:    String,
  pub to_id:      String,
  pub stars:      u8,
  pub text:       Option<String>,
  pub created_at: String,
}

pub fn read_review(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawReview> {
  Ok(RawReview {
    review_id:  row.get(0)?,
    from_id:    row.get(1)?,
    to_id:      row.get(2)?,
    stars:      row.get(3)?,
    text:       row.get(4)?,
    created_at: row.get(5)?,
  })
}

impl RawReview {
  pub fn into_review(self) -> Result<Review> {
    Ok(Review {
      review_id:  decode_uuid(&self.review_id)?,
      from_id:    decode_uuid(&self.from_id)?,
      to_id:      decode_uuid(&self.to_id)?,
      stars:      self.stars,
      text:       self.text,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// One message involving the requesting user, joined with the other party.
pub struct RawChatRow {
  pub peer_id:    String,
  pub peer_phone: String,
  pub sender_id:  String,
  pub content:    Option<String>,
  pub is_read:    bool,
  pub created_at: String,
}

/// Fold chat rows (oldest first) into one summary per peer.
///
/// A message counts as unread for `me` only when the peer sent it.
pub fn fold_chat_rows(me: Uuid, rows: Vec<RawChatRow>) -> Result<Vec<ChatSummary>> {
  let me_str = encode_uuid(me);
  let mut by_peer: HashMap<Uuid, ChatSummary> = HashMap::new();

  for row in rows {
    let peer_id = decode_uuid(&row.peer_id)?;
    let created_at = decode_dt(&row.created_at)?;
    let incoming_unread = row.sender_id != me_str && !row.is_read;

    let entry = by_peer.entry(peer_id).or_insert_with(|| ChatSummary {
      peer:              ChatPeer { id: peer_id, phone: row.peer_phone.clone() },
      last_message:      None,
      last_message_time: None,
      unread_count:      0,
    });

    entry.last_message = row.content;
    entry.last_message_time = Some(created_at);
    if incoming_unread {
      entry.unread_count += 1;
    }
  }

  Ok(by_peer.into_values().collect())
}
