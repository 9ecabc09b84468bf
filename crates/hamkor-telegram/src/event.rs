//! Inbound updates reduced to the events the bot reacts to.

use hamkor_core::identity::ChatAccountId;

use crate::wire::{Update, User};

/// Who sent an update, as needed for binding and support reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
  pub id:        ChatAccountId,
  pub full_name: String,
  pub username:  Option<String>,
}

impl From<&User> for Sender {
  fn from(user: &User) -> Self {
    Self { id: user.id, full_name: user.full_name(), username: user.username.clone() }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
  Start { chat: i64 },
  Help { chat: i64 },
  /// A contact card; `owner` is the Telegram id of the person on the card.
  ContactShared {
    chat:   i64,
    sender: Sender,
    owner:  Option<ChatAccountId>,
    phone:  String,
  },
  Text { chat: i64, sender: Sender, text: String },
  Callback { query_id: String, sender: Sender, data: String },
  Ignored,
}

impl InboundEvent {
  /// The account whose updates must be handled in order, if any.
  pub fn account(&self) -> Option<ChatAccountId> {
    match self {
      Self::Start { chat } | Self::Help { chat } => Some(*chat),
      Self::ContactShared { sender, .. }
      | Self::Text { sender, .. }
      | Self::Callback { sender, .. } => Some(sender.id),
      Self::Ignored => None,
    }
  }
}

impl From<Update> for InboundEvent {
  fn from(update: Update) -> Self {
    if let Some(query) = update.callback_query {
      return Self::Callback {
        sender:   Sender::from(&query.from),
        query_id: query.id,
        data:     query.data.unwrap_or_default(),
      };
    }

    let Some(message) = update.message else {
      return Self::Ignored;
    };
    let Some(sender) = message.from.as_ref().map(Sender::from) else {
      return Self::Ignored;
    };
    let chat = message.chat.id;

    if let Some(contact) = message.contact {
      return Self::ContactShared {
        chat,
        sender,
        owner: contact.user_id,
        phone: contact.phone_number,
      };
    }

    match message.text {
      Some(text) => match command(&text) {
        Some("start") => Self::Start { chat },
        Some("help") => Self::Help { chat },
        Some(_) => Self::Ignored,
        None => Self::Text { chat, sender, text },
      },
      None => Self::Ignored,
    }
  }
}

/// `/start@HamkorBot payload` → `start`.
fn command(text: &str) -> Option<&str> {
  let word = text.strip_prefix('/')?.split_whitespace().next()?;
  Some(word.split('@').next().unwrap_or(word))
}
