//! Best-effort outbound chat calls.

use std::{future::Future, time::Duration};

use hamkor_core::{dispatch::DispatchError, identity::ChatAccountId};
use tracing::{debug, warn};

/// Await `send` for at most `limit`. Failures are logged and reported as
/// `false`; they never propagate.
pub(crate) async fn best_effort<F>(
  limit: Duration,
  what: &'static str,
  account: ChatAccountId,
  send: F,
) -> bool
where
  F: Future<Output = Result<(), DispatchError>>,
{
  let error = match tokio::time::timeout(limit, send).await {
    Ok(Ok(())) => {
      debug!(account, what, "chat notification delivered");
      return true;
    }
    Ok(Err(e)) => e,
    Err(_) => DispatchError::TimedOut,
  };
  warn!(account, what, %error, "chat notification failed");
  false
}
