//! Tunables shared by the services.

use serde::Deserialize;

/// Deserialised from the `[service]` table of the server configuration.
/// Every field has a default, so the table may be omitted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
  /// Number of digits in a one-time code.
  pub otp_length:          usize,
  pub otp_ttl_secs:        i64,
  pub token_ttl_secs:      i64,
  /// Image-bearing messages a sender may send per UTC day.
  pub daily_image_limit:   u32,
  /// Upper bound on a single outbound chat call.
  pub dispatch_timeout_ms: u64,
  /// Characters of message text quoted in a chat notification.
  pub preview_chars:       usize,
}

impl Default for ServiceSettings {
  fn default() -> Self {
    Self {
      otp_length:          6,
      otp_ttl_secs:        10 * 60,
      token_ttl_secs:      7 * 24 * 60 * 60,
      daily_image_limit:   5,
      dispatch_timeout_ms: 5_000,
      preview_chars:       100,
    }
  }
}

impl ServiceSettings {
  pub fn otp_ttl(&self) -> chrono::Duration { chrono::Duration::seconds(self.otp_ttl_secs) }

  pub fn token_ttl(&self) -> chrono::Duration { chrono::Duration::seconds(self.token_ttl_secs) }

  pub fn dispatch_timeout(&self) -> std::time::Duration {
    std::time::Duration::from_millis(self.dispatch_timeout_ms)
  }
}
