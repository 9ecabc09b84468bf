//! Direct messaging between identities, with a daily image quota and a
//! best-effort chat notification to the receiver.

use std::sync::Arc;

use chrono::Utc;
use hamkor_core::{
  dispatch::ChatDispatch,
  identity::Identity,
  message::{sort_chats, utc_day_start, Admission, ChatSummary, Message, NewMessage},
  store::MarketStore,
};
use tracing::info;
use uuid::Uuid;

use crate::{deliver::best_effort, notice, Error, Result, ServiceSettings};

pub struct MessageRelay<S, D> {
  store:    Arc<S>,
  chat:     Arc<D>,
  settings: ServiceSettings,
}

impl<S, D> Clone for MessageRelay<S, D> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      chat:     Arc::clone(&self.chat),
      settings: self.settings.clone(),
    }
  }
}

impl<S: MarketStore, D: ChatDispatch> MessageRelay<S, D> {
  pub fn new(store: Arc<S>, chat: Arc<D>, settings: ServiceSettings) -> Self {
    Self { store, chat, settings }
  }

  /// Persist a message from `sender` and notify the receiver over chat.
  ///
  /// Blank text counts as no text. Image-bearing messages are subject to the
  /// daily quota; the quota check and the insert are one store operation.
  pub async fn send(
    &self,
    sender: &Identity,
    receiver_id: Uuid,
    content: Option<String>,
    image_url: Option<String>,
  ) -> Result<Message> {
    let input = NewMessage {
      sender_id: sender.identity_id,
      receiver_id,
      content: content.filter(|c| !c.trim().is_empty()),
      image_url,
    };
    if input.is_empty() {
      return Err(Error::EmptyMessage);
    }

    let receiver = self
      .store
      .identity(receiver_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound("receiver"))?;

    let limit = self.settings.daily_image_limit;
    let admission = self
      .store
      .record_message(input, limit, Utc::now())
      .await
      .map_err(Error::store)?;

    let message = match admission {
      Admission::Recorded(message) => message,
      Admission::RateLimited { sent_today } => {
        info!(sender = %sender.identity_id, sent_today, "image quota exhausted");
        return Err(Error::RateLimited { limit });
      }
    };

    if receiver.identity_id != sender.identity_id {
      self.notify(&receiver, &message).await;
    }
    Ok(message)
  }

  /// Fail with [`Error::RateLimited`] if `sender` may not send another image
  /// today. Lets callers refuse before doing the upload.
  pub async fn ensure_image_quota(&self, sender: Uuid) -> Result<()> {
    let limit = self.settings.daily_image_limit;
    let sent_today = self
      .store
      .image_messages_since(sender, utc_day_start(Utc::now()))
      .await
      .map_err(Error::store)?;
    if sent_today >= limit {
      return Err(Error::RateLimited { limit });
    }
    Ok(())
  }

  /// Messages between `me` and `peer`, oldest first.
  pub async fn conversation(&self, me: Uuid, peer: Uuid) -> Result<Vec<Message>> {
    self.require(peer).await?;
    self.store.conversation(me, peer).await.map_err(Error::store)
  }

  /// Mark what `peer` sent to `me` as read. Returns how many changed.
  pub async fn mark_read(&self, me: Uuid, peer: Uuid) -> Result<u64> {
    self.require(peer).await?;
    self.store.mark_read(me, peer).await.map_err(Error::store)
  }

  /// The chat list of `me`, newest conversation first.
  pub async fn chats(&self, me: Uuid) -> Result<Vec<ChatSummary>> {
    let mut chats = self.store.chat_summaries(me).await.map_err(Error::store)?;
    sort_chats(&mut chats);
    Ok(chats)
  }

  async fn require(&self, id: Uuid) -> Result<()> {
    match self.store.identity(id).await.map_err(Error::store)? {
      Some(_) => Ok(()),
      None => Err(Error::NotFound("user")),
    }
  }

  async fn notify(&self, receiver: &Identity, message: &Message) {
    let Some(account) = receiver.chat_binding_id else {
      return;
    };
    let timeout = self.settings.dispatch_timeout();
    let preview = self.settings.preview_chars;

    match (&message.image_url, &message.content) {
      (Some(url), content) => {
        let caption = notice::new_image(content.as_deref(), preview);
        best_effort(timeout, "image notice", account, self.chat.send_photo(account, url.clone(), caption))
          .await;
      }
      (None, Some(text)) => {
        let text = notice::new_message(text, preview);
        best_effort(timeout, "message notice", account, self.chat.send_text(account, text)).await;
      }
      (None, None) => {}
    }
  }
}
