//! Bot API payloads, limited to the fields this bot reads or writes.

use serde::{Deserialize, Serialize};

// ─── Envelope ────────────────────────────────────────────────────────────────

/// Every Bot API response: `{ok, result}` or `{ok: false, description}`.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
  pub ok:          bool,
  pub result:      Option<T>,
  pub description: Option<String>,
}

// ─── Inbound ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
  pub update_id:      i64,
  pub message:        Option<Message>,
  pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
  pub message_id: i64,
  pub chat:       Chat,
  pub from:       Option<User>,
  pub text:       Option<String>,
  pub contact:    Option<Contact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
  pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
  pub id:         i64,
  pub first_name: String,
  pub last_name:  Option<String>,
  pub username:   Option<String>,
}

impl User {
  pub fn full_name(&self) -> String {
    match &self.last_name {
      Some(last) => format!("{} {last}", self.first_name),
      None => self.first_name.clone(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
  pub phone_number: String,
  /// Telegram id of the contact's owner, absent for address-book entries.
  pub user_id:      Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
  pub id:   String,
  pub from: User,
  pub data: Option<String>,
}

// ─── Outbound ────────────────────────────────────────────────────────────────

/// A private chat id or a public `@channel` name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChatId {
  Account(i64),
  Channel(String),
}

#[derive(Debug, Serialize)]
pub struct GetUpdates {
  pub offset:          i64,
  pub timeout:         u64,
  pub allowed_updates: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct SendMessage<'a> {
  pub chat_id:      &'a ChatId,
  pub text:         &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reply_markup: Option<&'a ReplyMarkup>,
}

#[derive(Debug, Serialize)]
pub struct SendPhoto<'a> {
  pub chat_id: i64,
  pub photo:   &'a str,
  pub caption: &'a str,
}

#[derive(Debug, Serialize)]
pub struct AnswerCallbackQuery<'a> {
  pub callback_query_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
  Keyboard {
    keyboard:          Vec<Vec<KeyboardButton>>,
    resize_keyboard:   bool,
    one_time_keyboard: bool,
  },
  Inline {
    inline_keyboard: Vec<Vec<InlineButton>>,
  },
  Remove {
    remove_keyboard: bool,
  },
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyboardButton {
  pub text:            &'static str,
  #[serde(skip_serializing_if = "std::ops::Not::not")]
  pub request_contact: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineButton {
  pub text:          &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub callback_data: Option<&'static str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub url:           Option<&'static str>,
}
