//! Linking a chat account to an identity when the user shares a contact.

use std::sync::Arc;

use hamkor_core::{
  dispatch::ChatDispatch,
  identity::{ChatAccountId, Identity},
  phone,
  store::MarketStore,
};
use tracing::info;

use crate::{deliver::best_effort, notice, Error, Result, ServiceSettings};

/// What [`ChatBinder::link_contact`] did.
#[derive(Debug, Clone)]
pub struct BindOutcome {
  pub identity:    Identity,
  /// The identity did not exist and was created by this contact share.
  pub created:     bool,
  /// A pending code was found and one relay attempt was made.
  pub relayed_otp: bool,
}

pub struct ChatBinder<S, D> {
  store:    Arc<S>,
  chat:     Arc<D>,
  settings: ServiceSettings,
}

impl<S, D> Clone for ChatBinder<S, D> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      chat:     Arc::clone(&self.chat),
      settings: self.settings.clone(),
    }
  }
}

impl<S: MarketStore, D: ChatDispatch> ChatBinder<S, D> {
  pub fn new(store: Arc<S>, chat: Arc<D>, settings: ServiceSettings) -> Self {
    Self { store, chat, settings }
  }

  /// Bind `account` to the identity owning `raw_phone`, creating the identity
  /// when it does not exist yet. A code issued before the binding is relayed
  /// to the account straight away.
  pub async fn link_contact(&self, raw_phone: &str, account: ChatAccountId) -> Result<BindOutcome> {
    let phone = phone::normalize(raw_phone);
    if phone.is_empty() {
      return Err(Error::InvalidPhone);
    }

    let binding = self
      .store
      .bind_chat(&phone, account)
      .await
      .map_err(Error::store)?;
    let identity = binding.identity;
    info!(identity = %identity.identity_id, account, created = binding.created, "bound chat account");

    // The pending code is relayed as stored; verify decides about expiry.
    let relayed_otp = match (&identity.pending_otp, binding.created) {
      (Some(otp), false) => {
        best_effort(
          self.settings.dispatch_timeout(),
          "otp relay",
          account,
          self.chat.send_text(account, notice::otp_code(&otp.code)),
        )
        .await;
        true
      }
      _ => false,
    };

    Ok(BindOutcome { identity, created: binding.created, relayed_otp })
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use hamkor_core::identity::{PendingOtp, Role};
  use hamkor_store_sqlite::SqliteStore;

  use super::*;
  use crate::testing::{self, RecordingChat, Sent};

  async fn binder() -> (ChatBinder<SqliteStore, RecordingChat>, Arc<SqliteStore>, Arc<RecordingChat>) {
    let store = testing::store().await;
    let chat = Arc::new(RecordingChat::default());
    (ChatBinder::new(store.clone(), chat.clone(), testing::settings()), store, chat)
  }

  #[tokio::test]
  async fn unknown_phone_creates_bound_identity() {
    let (b, store, chat) = binder().await;

    let outcome = b.link_contact("998901234567", 42).await.unwrap();
    assert!(outcome.created);
    assert!(!outcome.relayed_otp);
    assert_eq!(outcome.identity.role, Role::Customer);

    let stored = store.identity_by_phone("+998901234567").await.unwrap().unwrap();
    assert_eq!(stored.chat_binding_id, Some(42));
    assert!(chat.sent().is_empty());
  }

  #[tokio::test]
  async fn pending_code_is_relayed_exactly_once() {
    let (b, store, chat) = binder().await;
    let id = store.upsert_login("+1", None).await.unwrap().identity_id;
    store
      .set_pending_otp(id, PendingOtp::new("314159", Utc::now()))
      .await
      .unwrap();

    let outcome = b.link_contact("+1", 9).await.unwrap();
    assert!(outcome.relayed_otp);
    assert!(!outcome.created);

    let sent = chat.sent();
    assert_eq!(sent.len(), 1);
    assert!(matches!(&sent[0], Sent::Text { account: 9, text } if text.contains("314159")));
  }

  #[tokio::test]
  async fn no_pending_code_no_relay() {
    let (b, store, chat) = binder().await;
    store.upsert_login("+1", None).await.unwrap();

    let outcome = b.link_contact("+1", 9).await.unwrap();
    assert!(!outcome.relayed_otp);
    assert!(chat.sent().is_empty());
  }

  #[tokio::test]
  async fn rebinding_moves_account() {
    let (b, store, _) = binder().await;
    let first = b.link_contact("+1", 9).await.unwrap().identity;
    b.link_contact("+2", 9).await.unwrap();

    let first = store.identity(first.identity_id).await.unwrap().unwrap();
    assert!(first.chat_binding_id.is_none());
    let second = store.identity_by_phone("+2").await.unwrap().unwrap();
    assert_eq!(second.chat_binding_id, Some(9));
  }

  #[tokio::test]
  async fn empty_phone_is_rejected() {
    let (b, ..) = binder().await;
    assert!(matches!(b.link_contact("", 9).await, Err(Error::InvalidPhone)));
  }
}
