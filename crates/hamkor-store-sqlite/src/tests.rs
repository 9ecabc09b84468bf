//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use hamkor_core::{
  identity::{PendingOtp, Role},
  message::{utc_day_start, Admission, NewMessage},
  review::NewReview,
  store::MarketStore,
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn text(from: Uuid, to: Uuid, body: &str) -> NewMessage {
  NewMessage {
    sender_id:   from,
    receiver_id: to,
    content:     Some(body.into()),
    image_url:   None,
  }
}

fn image(from: Uuid, to: Uuid) -> NewMessage {
  NewMessage {
    sender_id:   from,
    receiver_id: to,
    content:     None,
    image_url:   Some("https://img.example/a.jpg".into()),
  }
}

async fn record(s: &SqliteStore, input: NewMessage) -> hamkor_core::message::Message {
  match s.record_message(input, 5, Utc::now()).await.unwrap() {
    Admission::Recorded(m) => m,
    other => panic!("expected a recorded message, got {other:?}"),
  }
}

// ─── Identities ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_login_creates_with_default_role() {
  let s = store().await;

  let id = s.upsert_login("+998901234567", None).await.unwrap();
  assert_eq!(id.phone, "+998901234567");
  assert_eq!(id.role, Role::Customer);
  assert!(id.chat_binding_id.is_none());
  assert!(id.pending_otp.is_none());

  let again = s.upsert_login("+998901234567", None).await.unwrap();
  assert_eq!(again.identity_id, id.identity_id);
}

#[tokio::test]
async fn upsert_login_overwrites_role_only_when_given() {
  let s = store().await;

  let id = s.upsert_login("+1", Some(Role::Supplier)).await.unwrap();
  assert_eq!(id.role, Role::Supplier);

  let kept = s.upsert_login("+1", None).await.unwrap();
  assert_eq!(kept.role, Role::Supplier);

  let changed = s.upsert_login("+1", Some(Role::Specialist)).await.unwrap();
  assert_eq!(changed.role, Role::Specialist);
  assert_eq!(changed.identity_id, id.identity_id);
}

#[tokio::test]
async fn lookups_by_id_and_phone() {
  let s = store().await;
  let id = s.upsert_login("+42", None).await.unwrap();

  let by_id = s.identity(id.identity_id).await.unwrap().unwrap();
  assert_eq!(by_id.phone, "+42");

  let by_phone = s.identity_by_phone("+42").await.unwrap().unwrap();
  assert_eq!(by_phone.identity_id, id.identity_id);

  assert!(s.identity(Uuid::new_v4()).await.unwrap().is_none());
  assert!(s.identity_by_phone("+43").await.unwrap().is_none());
}

#[tokio::test]
async fn set_role_unknown_identity() {
  let s = store().await;
  let missing = Uuid::new_v4();
  let err = s.set_role(missing, Role::Admin).await.unwrap_err();
  assert!(matches!(err, Error::IdentityNotFound(id) if id == missing));
}

// ─── Chat binding ────────────────────────────────────────────────────────────

#[tokio::test]
async fn bind_chat_creates_missing_identity() {
  let s = store().await;

  let binding = s.bind_chat("+7", 1001).await.unwrap();
  assert!(binding.created);
  assert_eq!(binding.identity.chat_binding_id, Some(1001));
  assert_eq!(binding.identity.role, Role::Customer);
}

#[tokio::test]
async fn bind_chat_updates_existing_identity() {
  let s = store().await;
  let id = s.upsert_login("+7", Some(Role::Admin)).await.unwrap();

  let binding = s.bind_chat("+7", 1001).await.unwrap();
  assert!(!binding.created);
  assert_eq!(binding.identity.identity_id, id.identity_id);
  assert_eq!(binding.identity.role, Role::Admin);
  assert_eq!(binding.identity.chat_binding_id, Some(1001));
}

#[tokio::test]
async fn bind_chat_moves_account_between_phones() {
  let s = store().await;
  let first = s.bind_chat("+1", 555).await.unwrap().identity;
  let second = s.bind_chat("+2", 555).await.unwrap().identity;

  assert_eq!(second.chat_binding_id, Some(555));
  let first = s.identity(first.identity_id).await.unwrap().unwrap();
  assert_eq!(first.chat_binding_id, None);
}

// ─── One-time codes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn pending_otp_round_trips() {
  let s = store().await;
  let id = s.upsert_login("+1", None).await.unwrap();
  let otp = PendingOtp::new("123456", Utc::now());

  s.set_pending_otp(id.identity_id, otp.clone()).await.unwrap();
  let stored = s.identity(id.identity_id).await.unwrap().unwrap();
  assert_eq!(stored.pending_otp, Some(otp));
}

#[tokio::test]
async fn set_pending_otp_replaces_previous() {
  let s = store().await;
  let id = s.upsert_login("+1", None).await.unwrap();

  let old = PendingOtp::new("111111", Utc::now() - Duration::minutes(1));
  let new = PendingOtp::new("222222", Utc::now());
  s.set_pending_otp(id.identity_id, old.clone()).await.unwrap();
  s.set_pending_otp(id.identity_id, new.clone()).await.unwrap();

  assert!(!s.take_pending_otp(id.identity_id, &old).await.unwrap());
  assert!(s.take_pending_otp(id.identity_id, &new).await.unwrap());
}

#[tokio::test]
async fn take_pending_otp_succeeds_once() {
  let s = store().await;
  let id = s.upsert_login("+1", None).await.unwrap();
  let otp = PendingOtp::new("123456", Utc::now());
  s.set_pending_otp(id.identity_id, otp.clone()).await.unwrap();

  assert!(s.take_pending_otp(id.identity_id, &otp).await.unwrap());
  assert!(!s.take_pending_otp(id.identity_id, &otp).await.unwrap());

  let stored = s.identity(id.identity_id).await.unwrap().unwrap();
  assert!(stored.pending_otp.is_none());
}

#[tokio::test]
async fn set_pending_otp_unknown_identity() {
  let s = store().await;
  let err = s
    .set_pending_otp(Uuid::new_v4(), PendingOtp::new("1", Utc::now()))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::IdentityNotFound(_)));
}

// ─── Messages ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn image_limit_is_enforced_at_insert() {
  let s = store().await;
  let a = s.upsert_login("+1", None).await.unwrap().identity_id;
  let b = s.upsert_login("+2", None).await.unwrap().identity_id;
  let now = Utc::now();
  let today = utc_day_start(now);

  for _ in 0..5 {
    let outcome = s.record_message(image(a, b), 5, now).await.unwrap();
    assert!(matches!(outcome, Admission::Recorded(_)));
  }
  let sixth = s.record_message(image(a, b), 5, now).await.unwrap();
  assert!(matches!(sixth, Admission::RateLimited { sent_today: 5 }));

  // Text is never limited.
  let txt = s.record_message(text(a, b, "still here"), 5, now).await.unwrap();
  assert!(matches!(txt, Admission::Recorded(_)));

  assert_eq!(s.image_messages_since(a, today).await.unwrap(), 5);
  assert_eq!(s.image_messages_since(b, today).await.unwrap(), 0);
}

#[tokio::test]
async fn image_count_respects_window_start() {
  let s = store().await;
  let a = s.upsert_login("+1", None).await.unwrap().identity_id;
  let b = s.upsert_login("+2", None).await.unwrap().identity_id;

  record(&s, image(a, b)).await;

  let later = Utc::now() + Duration::hours(1);
  assert_eq!(s.image_messages_since(a, later).await.unwrap(), 0);
  let tomorrow = Utc::now() + Duration::days(1);
  let outcome = s.record_message(image(a, b), 1, tomorrow).await.unwrap();
  assert!(matches!(outcome, Admission::Recorded(_)));
}

#[tokio::test]
async fn image_in_use_matches_stored_urls() {
  let s = store().await;
  let a = s.upsert_login("+1", None).await.unwrap().identity_id;
  let b = s.upsert_login("+2", None).await.unwrap().identity_id;

  assert!(!s.image_in_use("https://img.example/a.jpg".into()).await.unwrap());
  record(&s, image(a, b)).await;
  assert!(s.image_in_use("https://img.example/a.jpg".into()).await.unwrap());
  assert!(!s.image_in_use("https://img.example/b.jpg".into()).await.unwrap());
}

#[tokio::test]
async fn image_window_follows_the_message_timestamp() {
  let s = store().await;
  let a = s.upsert_login("+1", None).await.unwrap().identity_id;
  let b = s.upsert_login("+2", None).await.unwrap().identity_id;
  let midnight = utc_day_start(Utc::now());
  let before = midnight - Duration::seconds(1);
  let after = midnight + Duration::milliseconds(1);

  for _ in 0..5 {
    let outcome = s.record_message(image(a, b), 5, before).await.unwrap();
    assert!(matches!(outcome, Admission::Recorded(_)));
  }
  let refused = s.record_message(image(a, b), 5, before).await.unwrap();
  assert!(matches!(refused, Admission::RateLimited { sent_today: 5 }));

  // Just past midnight the previous day's images no longer count.
  match s.record_message(image(a, b), 5, after).await.unwrap() {
    Admission::Recorded(m) => assert_eq!(m.created_at, after),
    other => panic!("expected a recorded message, got {other:?}"),
  }
}

#[tokio::test]
async fn conversation_is_oldest_first_and_scoped() {
  let s = store().await;
  let a = s.upsert_login("+1", None).await.unwrap().identity_id;
  let b = s.upsert_login("+2", None).await.unwrap().identity_id;
  let c = s.upsert_login("+3", None).await.unwrap().identity_id;

  record(&s, text(a, b, "one")).await;
  record(&s, text(b, a, "two")).await;
  record(&s, text(a, c, "elsewhere")).await;
  record(&s, text(a, b, "three")).await;

  let thread = s.conversation(b, a).await.unwrap();
  let bodies: Vec<_> = thread.iter().filter_map(|m| m.content.as_deref()).collect();
  assert_eq!(bodies, ["one", "two", "three"]);
}

#[tokio::test]
async fn mark_read_only_touches_messages_from_peer() {
  let s = store().await;
  let a = s.upsert_login("+1", None).await.unwrap().identity_id;
  let b = s.upsert_login("+2", None).await.unwrap().identity_id;
  let c = s.upsert_login("+3", None).await.unwrap().identity_id;

  record(&s, text(b, a, "from b")).await;
  record(&s, text(b, a, "from b again")).await;
  record(&s, text(c, a, "from c")).await;
  record(&s, text(a, b, "to b")).await;

  assert_eq!(s.mark_read(a, b).await.unwrap(), 2);
  assert_eq!(s.mark_read(a, b).await.unwrap(), 0);

  let with_c = s.conversation(a, c).await.unwrap();
  assert!(!with_c[0].is_read);
  let with_b = s.conversation(a, b).await.unwrap();
  let mine = with_b.iter().find(|m| m.sender_id == a).unwrap();
  assert!(!mine.is_read);
}

#[tokio::test]
async fn chat_summaries_fold_per_peer() {
  let s = store().await;
  let me = s.upsert_login("+1", None).await.unwrap().identity_id;
  let b = s.upsert_login("+2", None).await.unwrap().identity_id;
  let c = s.upsert_login("+3", None).await.unwrap().identity_id;

  record(&s, text(b, me, "hi from b")).await;
  record(&s, text(me, b, "reply to b")).await;
  record(&s, text(c, me, "hi from c")).await;
  record(&s, text(c, me, "are you there")).await;

  let mut chats = s.chat_summaries(me).await.unwrap();
  chats.sort_by(|x, y| x.peer.phone.cmp(&y.peer.phone));
  assert_eq!(chats.len(), 2);

  assert_eq!(chats[0].peer.id, b);
  assert_eq!(chats[0].last_message.as_deref(), Some("reply to b"));
  assert_eq!(chats[0].unread_count, 1);

  assert_eq!(chats[1].peer.phone, "+3");
  assert_eq!(chats[1].last_message.as_deref(), Some("are you there"));
  assert_eq!(chats[1].unread_count, 2);
}

#[tokio::test]
async fn chat_summaries_empty_without_messages() {
  let s = store().await;
  let me = s.upsert_login("+1", None).await.unwrap().identity_id;
  assert!(s.chat_summaries(me).await.unwrap().is_empty());
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_review_recomputes_rating() {
  let s = store().await;
  let a = s.upsert_login("+1", None).await.unwrap().identity_id;
  let b = s.upsert_login("+2", None).await.unwrap().identity_id;
  let c = s.upsert_login("+3", None).await.unwrap().identity_id;

  s.add_review(NewReview { from_id: a, to_id: c, stars: 5, text: None })
    .await
    .unwrap();
  s.add_review(NewReview { from_id: b, to_id: c, stars: 2, text: Some("late".into()) })
    .await
    .unwrap();

  let target = s.identity(c).await.unwrap().unwrap();
  assert!((target.rating - 3.5).abs() < f64::EPSILON);

  let reviews = s.reviews_for(c).await.unwrap();
  assert_eq!(reviews.len(), 2);
  assert_eq!(reviews[0].text.as_deref(), Some("late"));

  let untouched = s.identity(a).await.unwrap().unwrap();
  assert_eq!(untouched.rating, 0.0);
}
