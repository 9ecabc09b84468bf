//! Direct messages between identities and the chat-list read model.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Message ─────────────────────────────────────────────────────────────────

/// A persisted direct message. Only `is_read` ever changes after creation,
/// and only from `false` to `true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
  #[serde(rename = "id")]
  pub message_id:  Uuid,
  pub sender_id:   Uuid,
  pub receiver_id: Uuid,
  pub content:     Option<String>,
  pub image_url:   Option<String>,
  pub is_read:     bool,
  pub created_at:  DateTime<Utc>,
}

impl Message {
  pub fn has_image(&self) -> bool { self.image_url.is_some() }
}

/// Input to [`crate::store::MarketStore::record_message`].
#[derive(Debug, Clone)]
pub struct NewMessage {
  pub sender_id:   Uuid,
  pub receiver_id: Uuid,
  pub content:     Option<String>,
  pub image_url:   Option<String>,
}

impl NewMessage {
  pub fn has_image(&self) -> bool { self.image_url.is_some() }

  pub fn is_empty(&self) -> bool {
    self.content.is_none() && self.image_url.is_none()
  }
}

/// Outcome of a rate-limited insert.
#[derive(Debug, Clone)]
pub enum Admission {
  Recorded(Message),
  /// The sender already sent `sent_today` image messages this UTC day.
  RateLimited { sent_today: u32 },
}

// ─── Chat list ───────────────────────────────────────────────────────────────

/// The other party of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatPeer {
  pub id:    Uuid,
  pub phone: String,
}

/// One entry of a user's chat list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
  pub peer:              ChatPeer,
  pub last_message:      Option<String>,
  pub last_message_time: Option<DateTime<Utc>>,
  pub unread_count:      u32,
}

/// Newest conversation first; entries without any message go last.
pub fn sort_chats(chats: &mut [ChatSummary]) {
  // `None < Some(_)`, so a descending sort leaves empty entries at the end.
  chats.sort_by(|a, b| b.last_message_time.cmp(&a.last_message_time));
}

/// Midnight UTC of the calendar day containing `now`.
pub fn utc_day_start(now: DateTime<Utc>) -> DateTime<Utc> {
  now.date_naive().and_time(NaiveTime::MIN).and_utc()
}
