//! The polling bot: contact shares, menus and the support conversation.

use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};

use hamkor_core::{identity::ChatAccountId, store::MarketStore};
use hamkor_service::binder::ChatBinder;
use serde::Deserialize;
use tokio::{
  sync::oneshot::{self, error::TryRecvError},
  task::JoinSet,
};
use tracing::{debug, info, warn};

use crate::{
  conversation::{Conversations, SupportState},
  event::{InboundEvent, Sender},
  texts,
  wire::{ChatId, ReplyMarkup},
  Error, Result, TelegramClient,
};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Deserialised from the `[bot]` table of the server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotSettings {
  /// Chat id or `@channel` receiving support reports.
  pub support_channel:       Option<String>,
  pub poll_timeout_secs:     u64,
  pub conversation_ttl_secs: u64,
  /// Upper bound on one outbound Bot API call made while handling an update.
  pub send_timeout_ms:       u64,
}

impl Default for BotSettings {
  fn default() -> Self {
    Self {
      support_channel:       None,
      poll_timeout_secs:     30,
      conversation_ttl_secs: 30 * 60,
      send_timeout_ms:       5_000,
    }
  }
}

pub struct Bot<S> {
  client:        Arc<TelegramClient>,
  binder:        ChatBinder<S, TelegramClient>,
  conversations: Conversations,
  settings:      BotSettings,
}

impl<S: MarketStore> Bot<S> {
  pub fn new(
    client: Arc<TelegramClient>,
    binder: ChatBinder<S, TelegramClient>,
    settings: BotSettings,
  ) -> Self {
    let ttl = Duration::from_secs(settings.conversation_ttl_secs);
    Self { client, binder, conversations: Conversations::new(ttl), settings }
  }

  /// Long-poll until `shutdown` resolves. Errors from the Bot API back off
  /// exponentially; errors while handling one update are logged and skipped.
  ///
  /// Every update is handled on its own task. Updates of one account still
  /// run in arrival order: each task waits for the previous task of the same
  /// account to finish. In-flight tasks are drained before returning.
  pub async fn run(self: Arc<Self>, shutdown: impl Future<Output = ()>)
  where
    S: 'static,
  {
    tokio::pin!(shutdown);
    let mut offset = 0;
    let mut backoff = INITIAL_BACKOFF;
    let mut tasks = JoinSet::new();
    let mut lanes: HashMap<ChatAccountId, oneshot::Receiver<()>> = HashMap::new();
    info!("bot polling started");

    loop {
      tokio::select! {
        _ = &mut shutdown => break,
        polled = self.client.get_updates(offset, self.settings.poll_timeout_secs) => match polled {
          Ok(updates) => {
            backoff = INITIAL_BACKOFF;
            for update in updates {
              offset = offset.max(update.update_id + 1);
              let event = InboundEvent::from(update);
              let Some(account) = event.account() else { continue };

              let (done, next) = oneshot::channel::<()>();
              let previous = lanes.insert(account, next);
              let bot = Arc::clone(&self);
              tasks.spawn(async move {
                if let Some(previous) = previous {
                  // Resolves when the previous task drops its sender.
                  let _ = previous.await;
                }
                if let Err(e) = bot.handle(event).await {
                  warn!(account, error = %e, "failed to handle update");
                }
                drop(done);
              });
            }

            lanes.retain(|_, lane| matches!(lane.try_recv(), Err(TryRecvError::Empty)));
            while let Some(joined) = tasks.try_join_next() {
              if let Err(e) = joined {
                warn!(error = %e, "update task panicked");
              }
            }
            let evicted = self.conversations.evict_stale();
            if evicted > 0 {
              debug!(evicted, "dropped stale support conversations");
            }
          }
          Err(e) => {
            warn!(error = %e, ?backoff, "getUpdates failed");
            tokio::select! {
              _ = &mut shutdown => break,
              _ = tokio::time::sleep(backoff) => {}
            }
            backoff = (backoff * 2).min(MAX_BACKOFF);
          }
        },
      }
    }

    debug!(in_flight = tasks.len(), "draining update tasks");
    while tasks.join_next().await.is_some() {}
    info!("bot polling stopped");
  }

  pub async fn handle(&self, event: InboundEvent) -> Result<()> {
    match event {
      InboundEvent::Start { chat } => {
        self.conversations.finish(chat);
        self.reply(chat, texts::WELCOME, Some(texts::main_keyboard())).await
      }
      InboundEvent::Help { chat } => {
        self.reply(chat, texts::HELP, Some(texts::help_keyboard())).await
      }
      InboundEvent::ContactShared { chat, sender, owner, phone } => {
        if let Some(SupportState::AwaitingPhone { message }) = self.conversations.get(sender.id) {
          return self.forward_report(chat, &sender, &phone, &message).await;
        }
        self.on_contact(chat, &sender, owner, &phone).await
      }
      InboundEvent::Text { chat, sender, text } => match self.conversations.get(sender.id) {
        Some(SupportState::AwaitingMessage) => {
          self.conversations.set(sender.id, SupportState::AwaitingPhone { message: text });
          self.reply(chat, texts::ASK_PHONE, Some(texts::send_phone_keyboard())).await
        }
        Some(SupportState::AwaitingPhone { message }) => {
          self.forward_report(chat, &sender, text.trim(), &message).await
        }
        None => match text.as_str() {
          texts::ADS_BUTTON => self.reply(chat, texts::ADS_INFO, None).await,
          texts::ADMIN_BUTTON => self.begin_support(chat, sender.id).await,
          _ => Ok(()),
        },
      },
      InboundEvent::Callback { query_id, sender, data } => {
        let answered = self
          .bounded("answerCallbackQuery", self.client.answer_callback(&query_id))
          .await;
        if let Err(e) = answered {
          debug!(error = %e, "answerCallbackQuery failed");
        }
        match data.as_str() {
          texts::CB_CONTACT_ADMIN => self.begin_support(sender.id, sender.id).await,
          texts::CB_ADS_PRICES => self.reply(sender.id, texts::ADS_PRICES, None).await,
          texts::CB_FAQ => self.reply(sender.id, texts::FAQ, None).await,
          other => {
            debug!(data = other, "unknown callback");
            Ok(())
          }
        }
      }
      InboundEvent::Ignored => Ok(()),
    }
  }

  async fn on_contact(
    &self,
    chat: i64,
    sender: &Sender,
    owner: Option<i64>,
    phone: &str,
  ) -> Result<()> {
    if owner != Some(sender.id) {
      info!(account = sender.id, "refused foreign contact");
      return self.reply(chat, texts::NOT_OWN_CONTACT, None).await;
    }

    match self.binder.link_contact(phone, sender.id).await {
      Ok(outcome) => {
        let text = if outcome.created { texts::REGISTERED } else { texts::LINKED };
        self.reply(chat, text, Some(texts::remove_keyboard())).await
      }
      Err(e) => {
        self.reply(chat, texts::FAILURE, None).await?;
        Err(e.into())
      }
    }
  }

  async fn begin_support(&self, chat: i64, account: i64) -> Result<()> {
    self.conversations.set(account, SupportState::AwaitingMessage);
    self.reply(chat, texts::ASK_MESSAGE, None).await
  }

  async fn forward_report(
    &self,
    chat: i64,
    sender: &Sender,
    phone: &str,
    message: &str,
  ) -> Result<()> {
    self.conversations.finish(sender.id);
    let report = texts::support_report(&sender.full_name, sender.username.as_deref(), phone, message);

    let delivered = match &self.settings.support_channel {
      Some(channel) => {
        let target = match channel.parse::<i64>() {
          Ok(id) => ChatId::Account(id),
          Err(_) => ChatId::Channel(channel.clone()),
        };
        self
          .bounded("sendMessage", self.client.send_message(&target, &report, None))
          .await
      }
      None => Err(Error::NoSupportChannel),
    };

    match delivered {
      Ok(()) => {
        info!(account = sender.id, "forwarded support request");
        self.reply(chat, texts::REPORT_SENT, Some(texts::remove_keyboard())).await
      }
      Err(e) => {
        warn!(account = sender.id, error = %e, "could not forward support request");
        self.reply(chat, texts::FAILURE, Some(texts::remove_keyboard())).await
      }
    }
  }

  async fn reply(&self, chat: i64, text: &str, markup: Option<ReplyMarkup>) -> Result<()> {
    let target = ChatId::Account(chat);
    self
      .bounded("sendMessage", self.client.send_message(&target, text, markup.as_ref()))
      .await
  }

  /// Give up on `call` after `send_timeout_ms`.
  async fn bounded<T>(
    &self,
    method: &'static str,
    call: impl Future<Output = Result<T>>,
  ) -> Result<T> {
    let limit = Duration::from_millis(self.settings.send_timeout_ms);
    tokio::time::timeout(limit, call)
      .await
      .map_err(|_| Error::TimedOut { method })?
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use hamkor_core::identity::PendingOtp;
  use hamkor_service::ServiceSettings;
  use hamkor_store_sqlite::SqliteStore;
  use std::time::Instant;

  use serde_json::{json, Value};

  use super::*;
  use crate::fake::FakeBotApi;

  async fn bot(api: &FakeBotApi, settings: BotSettings) -> (Bot<SqliteStore>, Arc<SqliteStore>) {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let client = Arc::new(api.client());
    let binder = ChatBinder::new(store.clone(), client.clone(), ServiceSettings::default());
    (Bot::new(client, binder, settings), store)
  }

  fn sender(id: i64) -> Sender {
    Sender { id, full_name: "Ali Valiyev".into(), username: Some("ali".into()) }
  }

  fn contact(id: i64, owner: Option<i64>, phone: &str) -> InboundEvent {
    InboundEvent::ContactShared { chat: id, sender: sender(id), owner, phone: phone.into() }
  }

  fn text(id: i64, body: &str) -> InboundEvent {
    InboundEvent::Text { chat: id, sender: sender(id), text: body.into() }
  }

  #[tokio::test]
  async fn start_shows_main_keyboard() {
    let api = FakeBotApi::start().await;
    let (bot, _) = bot(&api, BotSettings::default()).await;

    bot.handle(InboundEvent::Start { chat: 5 }).await.unwrap();

    let sent = api.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].body["reply_markup"]["keyboard"][0][0]["request_contact"], true);
  }

  #[tokio::test]
  async fn own_contact_binds_and_relays_code() {
    let api = FakeBotApi::start().await;
    let (bot, store) = bot(&api, BotSettings::default()).await;
    let id = store.upsert_login("+998901234567", None).await.unwrap().identity_id;
    store
      .set_pending_otp(id, PendingOtp::new("271828", Utc::now()))
      .await
      .unwrap();

    bot.handle(contact(5, Some(5), "998901234567")).await.unwrap();

    let stored = store.identity(id).await.unwrap().unwrap();
    assert_eq!(stored.chat_binding_id, Some(5));

    let sent = api.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].body["text"].as_str().unwrap().contains("271828"));
    assert_eq!(sent[1].body["text"], texts::LINKED);
  }

  #[tokio::test]
  async fn new_phone_is_registered() {
    let api = FakeBotApi::start().await;
    let (bot, store) = bot(&api, BotSettings::default()).await;

    bot.handle(contact(5, Some(5), "+7001")).await.unwrap();

    assert!(store.identity_by_phone("+7001").await.unwrap().is_some());
    assert_eq!(api.sent()[0].body["text"], texts::REGISTERED);
  }

  #[tokio::test]
  async fn foreign_contact_is_refused() {
    let api = FakeBotApi::start().await;
    let (bot, store) = bot(&api, BotSettings::default()).await;

    bot.handle(contact(5, Some(6), "+7001")).await.unwrap();
    bot.handle(contact(5, None, "+7002")).await.unwrap();

    assert!(store.identity_by_phone("+7001").await.unwrap().is_none());
    assert!(store.identity_by_phone("+7002").await.unwrap().is_none());
    assert!(api.sent().iter().all(|c| c.body["text"] == texts::NOT_OWN_CONTACT));
  }

  #[tokio::test]
  async fn support_conversation_reaches_channel() {
    let api = FakeBotApi::start().await;
    let settings = BotSettings { support_channel: Some("@hamkor_support".into()), ..BotSettings::default() };
    let (bot, _) = bot(&api, settings).await;

    bot
      .handle(InboundEvent::Callback {
        query_id: "q".into(),
        sender:   sender(5),
        data:     texts::CB_CONTACT_ADMIN.into(),
      })
      .await
      .unwrap();
    bot.handle(text(5, "Narxlar haqida savol")).await.unwrap();
    bot.handle(text(5, "+998901112233")).await.unwrap();

    let sent = api.sent();
    let methods: Vec<_> = sent.iter().map(|c| c.method.as_str()).collect();
    assert_eq!(
      methods,
      ["answerCallbackQuery", "sendMessage", "sendMessage", "sendMessage", "sendMessage"]
    );

    let report = &sent[3].body;
    assert_eq!(report["chat_id"], "@hamkor_support");
    let body = report["text"].as_str().unwrap();
    assert!(body.contains("+998901112233"));
    assert!(body.contains("Narxlar haqida savol"));
    assert!(body.contains("@ali"));
    assert_eq!(sent[4].body["text"], texts::REPORT_SENT);

    // Conversation is over; plain text is ignored again.
    bot.handle(text(5, "hello?")).await.unwrap();
    assert_eq!(api.sent().len(), 5);
  }

  #[tokio::test]
  async fn support_phone_may_be_a_contact() {
    let api = FakeBotApi::start().await;
    let settings = BotSettings { support_channel: Some("-100123".into()), ..BotSettings::default() };
    let (bot, store) = bot(&api, settings).await;

    bot.handle(text(5, texts::ADMIN_BUTTON)).await.unwrap();
    bot.handle(text(5, "Savol")).await.unwrap();
    bot.handle(contact(5, Some(5), "998900000000")).await.unwrap();

    let sent = api.sent();
    assert_eq!(sent[2].body["chat_id"], -100123);
    // The contact answered the support question; it did not bind.
    assert!(store.identity_by_phone("+998900000000").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn missing_channel_tells_user() {
    let api = FakeBotApi::start().await;
    let (bot, _) = bot(&api, BotSettings::default()).await;

    bot.handle(text(5, texts::ADMIN_BUTTON)).await.unwrap();
    bot.handle(text(5, "Savol")).await.unwrap();
    bot.handle(text(5, "+998900000000")).await.unwrap();

    let last = api.sent().pop().unwrap();
    assert_eq!(last.body["text"], texts::FAILURE);
  }

  #[tokio::test]
  async fn run_consumes_updates_until_shutdown() {
    let update = json!({
      "update_id": 100,
      "message": {
        "message_id": 1,
        "chat": {"id": 9},
        "from": {"id": 9, "first_name": "Ali"},
        "contact": {"phone_number": "998907654321", "user_id": 9}
      }
    });
    let api = FakeBotApi::with_updates(vec![update]).await;
    let (bot, store) = bot(&api, BotSettings { poll_timeout_secs: 0, ..BotSettings::default() }).await;

    Arc::new(bot).run(tokio::time::sleep(Duration::from_millis(300))).await;

    let bound = store.identity_by_phone("+998907654321").await.unwrap().unwrap();
    assert_eq!(bound.chat_binding_id, Some(9));

    let polls: Vec<_> = api.calls().into_iter().filter(|c| c.method == "getUpdates").collect();
    assert!(polls.len() >= 2);
    assert_eq!(polls[1].body["offset"], 101);
  }

  fn raw_message(update_id: i64, from: i64, body: Value) -> Value {
    let mut message = json!({
      "message_id": update_id,
      "chat": {"id": from},
      "from": {"id": from, "first_name": "Ali"},
    });
    if let (Some(message), Some(extra)) = (message.as_object_mut(), body.as_object()) {
      message.extend(extra.clone());
    }
    json!({ "update_id": update_id, "message": message })
  }

  #[tokio::test]
  async fn slow_reply_does_not_hold_up_other_accounts() {
    let updates = vec![
      raw_message(1, 1, json!({ "text": "/start" })),
      raw_message(2, 2, json!({ "contact": {"phone_number": "998901110022", "user_id": 2} })),
    ];
    let api = FakeBotApi::with_slow_replies(updates, Duration::from_secs(3)).await;
    let settings =
      BotSettings { poll_timeout_secs: 0, send_timeout_ms: 1_000, ..BotSettings::default() };
    let (bot, store) = bot(&api, settings).await;

    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let running = tokio::spawn(Arc::new(bot).run(async move {
      let _ = stopped.await;
    }));

    let started = Instant::now();
    let bound = loop {
      if let Some(id) = store.identity_by_phone("+998901110022").await.unwrap() {
        break id;
      }
      assert!(started.elapsed() < Duration::from_millis(800), "contact share waited on another reply");
      tokio::time::sleep(Duration::from_millis(10)).await;
    };
    assert_eq!(bound.chat_binding_id, Some(2));

    // Stalled replies are abandoned after the send timeout, so shutdown drains quickly.
    let _ = stop.send(());
    tokio::time::timeout(Duration::from_secs(3), running).await.unwrap().unwrap();
  }

  #[tokio::test]
  async fn updates_of_one_account_keep_their_order() {
    let updates = vec![
      raw_message(1, 5, json!({ "text": texts::ADMIN_BUTTON })),
      raw_message(2, 5, json!({ "text": "Savol" })),
      raw_message(3, 5, json!({ "text": "+998900000000" })),
    ];
    let api = FakeBotApi::with_updates(updates).await;
    let settings = BotSettings {
      support_channel: Some("@hamkor_support".into()),
      poll_timeout_secs: 0,
      ..BotSettings::default()
    };
    let (bot, _) = bot(&api, settings).await;

    Arc::new(bot).run(tokio::time::sleep(Duration::from_millis(300))).await;

    let sent = api.sent();
    let report = sent
      .iter()
      .find(|c| c.body["chat_id"] == "@hamkor_support")
      .expect("support report forwarded");
    assert!(report.body["text"].as_str().unwrap().contains("Savol"));
    assert_eq!(sent.last().unwrap().body["text"], texts::REPORT_SENT);
  }

  #[tokio::test]
  async fn stalled_send_times_out() {
    let api = FakeBotApi::with_slow_replies(Vec::new(), Duration::from_secs(3)).await;
    let settings = BotSettings { send_timeout_ms: 200, ..BotSettings::default() };
    let (bot, _) = bot(&api, settings).await;

    let started = Instant::now();
    let err = bot.handle(InboundEvent::Start { chat: 5 }).await.unwrap_err();
    assert!(matches!(err, Error::TimedOut { method: "sendMessage" }));
    assert!(started.elapsed() < Duration::from_secs(2));
  }
}
