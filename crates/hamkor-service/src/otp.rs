//! One-time codes: issuing on login, verifying into a session token.
//!
//! A code is persisted before any delivery attempt, so an identity without a
//! chat binding can still receive it later when the contact is shared.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hamkor_core::{
  dispatch::ChatDispatch,
  identity::{Identity, PendingOtp, Role},
  phone,
  store::MarketStore,
};
use rand_core::{OsRng, RngCore};
use tracing::{debug, info};

use crate::{deliver::best_effort, notice, session::SessionTokens, Error, Result, ServiceSettings};

/// Largest multiple of ten representable in a `u32`; draws at or above it are
/// rejected so every digit is equally likely.
const DIGIT_ZONE: u32 = u32::MAX - u32::MAX % 10;

/// Generate a numeric code of `len` digits from the OS random source.
pub fn generate_code(len: usize) -> String {
  let mut rng = OsRng;
  (0..len)
    .map(|_| loop {
      let draw = rng.next_u32();
      if draw < DIGIT_ZONE {
        break char::from(b'0' + (draw % 10) as u8);
      }
    })
    .collect()
}

/// A freshly issued code together with the identity it belongs to.
#[derive(Debug, Clone)]
pub struct Issued {
  pub identity:  Identity,
  pub code:      String,
  /// Whether the chat channel accepted the code.
  pub delivered: bool,
}

pub struct OtpService<S, D> {
  store:    Arc<S>,
  chat:     Arc<D>,
  tokens:   SessionTokens,
  settings: ServiceSettings,
}

impl<S, D> Clone for OtpService<S, D> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      chat:     Arc::clone(&self.chat),
      tokens:   self.tokens.clone(),
      settings: self.settings.clone(),
    }
  }
}

impl<S: MarketStore, D: ChatDispatch> OtpService<S, D> {
  pub fn new(store: Arc<S>, chat: Arc<D>, tokens: SessionTokens, settings: ServiceSettings) -> Self {
    Self { store, chat, tokens, settings }
  }

  /// Find or create the identity for `raw_phone`, apply `role` if given, and
  /// issue a new code, replacing any pending one.
  pub async fn login(&self, raw_phone: &str, role: Option<Role>) -> Result<Issued> {
    let phone = phone::normalize(raw_phone);
    if phone.is_empty() {
      return Err(Error::InvalidPhone);
    }

    let identity = self
      .store
      .upsert_login(&phone, role)
      .await
      .map_err(Error::store)?;

    let otp = PendingOtp::new(generate_code(self.settings.otp_length), Utc::now());
    self
      .store
      .set_pending_otp(identity.identity_id, otp.clone())
      .await
      .map_err(Error::store)?;
    info!(identity = %identity.identity_id, "issued one-time code");

    let delivered = match identity.chat_binding_id {
      Some(account) => {
        best_effort(
          self.settings.dispatch_timeout(),
          "otp",
          account,
          self.chat.send_text(account, notice::otp_code(&otp.code)),
        )
        .await
      }
      None => {
        debug!(identity = %identity.identity_id, "no chat binding, code awaits contact share");
        false
      }
    };

    Ok(Issued { identity, code: otp.code, delivered })
  }

  /// Issue a code for `raw_phone` without touching the role.
  pub async fn issue(&self, raw_phone: &str) -> Result<String> {
    Ok(self.login(raw_phone, None).await?.code)
  }

  /// Exchange a pending code for a session token.
  pub async fn verify(&self, raw_phone: &str, submitted: &str) -> Result<String> {
    self.verify_at(raw_phone, submitted, Utc::now()).await
  }

  pub async fn verify_at(
    &self,
    raw_phone: &str,
    submitted: &str,
    now: DateTime<Utc>,
  ) -> Result<String> {
    let phone = phone::normalize(raw_phone);
    let identity = self
      .store
      .identity_by_phone(&phone)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound("identity"))?;
    let id = identity.identity_id;
    let pending = identity.pending_otp.ok_or(Error::NotFound("pending code"))?;

    if !pending.matches(submitted) {
      debug!(identity = %id, "wrong verification code");
      return Err(Error::InvalidCode);
    }

    if pending.is_expired(now, self.settings.otp_ttl()) {
      self
        .store
        .take_pending_otp(id, &pending)
        .await
        .map_err(Error::store)?;
      info!(identity = %id, "discarded expired code");
      return Err(Error::Expired);
    }

    // Only the caller that clears the code gets a token.
    let cleared = self
      .store
      .take_pending_otp(id, &pending)
      .await
      .map_err(Error::store)?;
    if !cleared {
      return Err(Error::NotFound("pending code"));
    }

    info!(identity = %id, "verified one-time code");
    self.tokens.mint(&identity.phone)
  }
}
