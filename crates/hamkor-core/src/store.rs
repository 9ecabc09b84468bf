//! The `MarketStore` trait.
//!
//! Implemented by storage backends (e.g. `hamkor-store-sqlite`). The services
//! and the HTTP layer depend on this abstraction, not on a concrete backend.
//!
//! Operations that read and then write (login upsert, chat binding, OTP
//! compare-and-clear, rate-limited message insert, review + rating) must be
//! atomic with respect to each other in every implementation.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  identity::{ChatAccountId, ChatBinding, Identity, PendingOtp, Role},
  message::{Admission, ChatSummary, Message, NewMessage},
  review::{NewReview, Review},
};

/// Abstraction over the relational store.
///
/// Phone arguments are expected to be normalised already.
pub trait MarketStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Identities ────────────────────────────────────────────────────────

  /// Retrieve an identity by id. Returns `None` if not found.
  fn identity(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  /// Retrieve an identity by its canonical phone.
  fn identity_by_phone<'a>(
    &'a self,
    phone: &'a str,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  /// Create the identity for `phone` if it does not exist, otherwise return
  /// it. A `role` overwrites the stored role of an existing identity and is
  /// used as the initial role of a new one (default role when `None`).
  fn upsert_login<'a>(
    &'a self,
    phone: &'a str,
    role: Option<Role>,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + 'a;

  /// Overwrite the role of an existing identity.
  fn set_role(
    &self,
    id: Uuid,
    role: Role,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

  /// Bind `account` to the identity owning `phone`, creating the identity if
  /// needed. The account is removed from any other identity first.
  fn bind_chat<'a>(
    &'a self,
    phone: &'a str,
    account: ChatAccountId,
  ) -> impl Future<Output = Result<ChatBinding, Self::Error>> + Send + 'a;

  // ── One-time codes ────────────────────────────────────────────────────

  /// Store `otp` as the only pending code of identity `id`, replacing any
  /// previous one. Both fields are written in one statement.
  fn set_pending_otp(
    &self,
    id: Uuid,
    otp: PendingOtp,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Clear the pending code of `id` only if it still equals `expected`.
  ///
  /// Returns `true` if this call cleared it, `false` if the code was already
  /// consumed or replaced.
  fn take_pending_otp<'a>(
    &'a self,
    id: Uuid,
    expected: &'a PendingOtp,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Messages ──────────────────────────────────────────────────────────

  /// Number of image-bearing messages sent by `sender` at or after `since`.
  fn image_messages_since(
    &self,
    sender: Uuid,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<u32, Self::Error>> + Send + '_;

  /// Persist a message created at `now`. Image-bearing messages are refused
  /// with [`Admission::RateLimited`] when the sender already sent
  /// `image_limit` image messages during the UTC day containing `now`; the
  /// count and the insert are atomic.
  fn record_message(
    &self,
    input: NewMessage,
    image_limit: u32,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Admission, Self::Error>> + Send + '_;

  /// Whether any stored message carries `image_url`.
  fn image_in_use(
    &self,
    image_url: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// All messages between `a` and `b`, oldest first.
  fn conversation(
    &self,
    a: Uuid,
    b: Uuid,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + '_;

  /// Mark every unread message from `sender` to `receiver` as read.
  /// Returns the number of messages changed.
  fn mark_read(
    &self,
    receiver: Uuid,
    sender: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// One summary per peer `me` has exchanged messages with, in no particular
  /// order.
  fn chat_summaries(
    &self,
    me: Uuid,
  ) -> impl Future<Output = Result<Vec<ChatSummary>, Self::Error>> + Send + '_;

  // ── Reviews ───────────────────────────────────────────────────────────

  /// Persist a review and recompute the target's rating in one transaction.
  fn add_review(
    &self,
    input: NewReview,
  ) -> impl Future<Output = Result<Review, Self::Error>> + Send + '_;

  /// Reviews received by `to`, newest first.
  fn reviews_for(
    &self,
    to: Uuid,
  ) -> impl Future<Output = Result<Vec<Review>, Self::Error>> + Send + '_;
}
