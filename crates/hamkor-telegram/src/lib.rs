//! Telegram side of the Hamkor backend.
//!
//! [`TelegramClient`] is the outbound chat channel used to deliver codes and
//! message notifications. [`Bot`] long-polls the Bot API, turns updates into
//! [`InboundEvent`] values and handles contact shares (chat binding), the
//! menu keyboards and the support conversation.

pub mod bot;
pub mod client;
pub mod conversation;
pub mod error;
pub mod event;
pub mod texts;
pub mod wire;

pub use bot::{Bot, BotSettings};
pub use client::TelegramClient;
pub use error::{Error, Result};
pub use event::InboundEvent;

#[cfg(test)]
mod fake;
