//! Per-account state of the support conversation.
//!
//! Entries are process-local and expire after a period of inactivity, so an
//! abandoned conversation does not capture the user's next message.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use hamkor_core::identity::ChatAccountId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupportState {
  /// Asked for the message to forward.
  AwaitingMessage,
  /// Have the message, asked for a phone number to call back.
  AwaitingPhone { message: String },
}

#[derive(Debug)]
struct Entry {
  state:   SupportState,
  touched: Instant,
}

#[derive(Debug)]
pub struct Conversations {
  entries: DashMap<ChatAccountId, Entry>,
  ttl:     Duration,
}

impl Conversations {
  pub fn new(ttl: Duration) -> Self { Self { entries: DashMap::new(), ttl } }

  /// Current state of `account`, or `None` if there is none or it expired.
  pub fn get(&self, account: ChatAccountId) -> Option<SupportState> {
    self.get_at(account, Instant::now())
  }

  pub fn set(&self, account: ChatAccountId, state: SupportState) {
    self.set_at(account, state, Instant::now());
  }

  /// Drop the state of `account`, returning it if it was live.
  pub fn finish(&self, account: ChatAccountId) -> Option<SupportState> {
    let (_, entry) = self.entries.remove(&account)?;
    (entry.touched.elapsed() <= self.ttl).then_some(entry.state)
  }

  /// Remove every expired entry. Returns how many were removed.
  pub fn evict_stale(&self) -> usize { self.evict_stale_at(Instant::now()) }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  fn get_at(&self, account: ChatAccountId, now: Instant) -> Option<SupportState> {
    // Evict inside `remove_if` so a concurrent `set` is not lost.
    let removed = self
      .entries
      .remove_if(&account, |_, entry| now.saturating_duration_since(entry.touched) > self.ttl);
    if removed.is_some() {
      return None;
    }
    self.entries.get(&account).map(|entry| entry.state.clone())
  }

  fn set_at(&self, account: ChatAccountId, state: SupportState, now: Instant) {
    self.entries.insert(account, Entry { state, touched: now });
  }

  fn evict_stale_at(&self, now: Instant) -> usize {
    let before = self.entries.len();
    self
      .entries
      .retain(|_, entry| now.saturating_duration_since(entry.touched) <= self.ttl);
    before.saturating_sub(self.entries.len())
  }
}
