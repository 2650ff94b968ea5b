//! Cancellable handles for trigger subscriptions.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::BlockError;
use crate::outputs::Outputs;

/// Callback a trigger invokes once per event.
pub type FireFn = Arc<dyn Fn(Outputs) + Send + Sync>;

/// A live subscription to a trigger's event source.
///
/// Cancelling (or dropping) the handle stops future firings. Work already
/// started from an earlier firing is not interrupted.
pub struct Subscription {
  cancel: CancellationToken,
  handle: Option<JoinHandle<()>>,
}

impl Subscription {
  /// Spawn the subscription loop on the current tokio runtime.
  ///
  /// The loop receives a token that is cancelled when the subscription is.
  /// Outside a runtime nothing is spawned and the trigger cannot attach.
  pub fn spawn<F, Fut>(task: F) -> Result<Self, BlockError>
  where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
  {
    let runtime = Handle::try_current()
      .map_err(|_| BlockError::MissingCapability("tokio runtime".to_string()))?;
    let cancel = CancellationToken::new();
    let handle = runtime.spawn(task(cancel.clone()));
    Ok(Self {
      cancel,
      handle: Some(handle),
    })
  }

  /// Wrap a token owned by an event source that runs elsewhere.
  pub fn from_token(cancel: CancellationToken) -> Self {
    Self {
      cancel,
      handle: None,
    }
  }

  pub fn is_cancelled(&self) -> bool {
    self.cancel.is_cancelled()
  }

  pub fn cancel(&self) {
    self.cancel.cancel();
  }

  /// Cancel and wait for the subscription loop to exit.
  pub async fn shutdown(mut self) {
    self.cancel.cancel();
    if let Some(handle) = self.handle.take() {
      let _ = handle.await;
    }
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    self.cancel.cancel();
  }
}

impl fmt::Debug for Subscription {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Subscription")
      .field("cancelled", &self.cancel.is_cancelled())
      .field("spawned", &self.handle.is_some())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::time::Duration;

  use super::*;

  #[tokio::test]
  async fn test_cancel_stops_loop() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = ticks.clone();

    let subscription = Subscription::spawn(move |cancel| async move {
      loop {
        tokio::select! {
          _ = cancel.cancelled() => break,
          _ = tokio::time::sleep(Duration::from_millis(5)) => {
            counter.fetch_add(1, Ordering::SeqCst);
          }
        }
      }
    })
    .unwrap();

    tokio::time::sleep(Duration::from_millis(30)).await;
    subscription.shutdown().await;

    let after_shutdown = ticks.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), after_shutdown);
  }

  #[test]
  fn test_spawn_outside_runtime_is_missing_capability() {
    let err = Subscription::spawn(|cancel| async move { cancel.cancelled().await }).unwrap_err();
    assert!(matches!(err, BlockError::MissingCapability(_)));
  }

  #[tokio::test]
  async fn test_drop_cancels_token() {
    let token = CancellationToken::new();
    let subscription = Subscription::from_token(token.clone());
    assert!(!token.is_cancelled());

    drop(subscription);
    assert!(token.is_cancelled());
  }
}
