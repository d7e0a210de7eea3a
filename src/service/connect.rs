//! Retry loop around [`ServiceLocator::locate`] that runs until the service
//! shows up or the user cancels.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::i18n;

use super::locator::{ServiceEndpoint, ServiceLocator};

/// Receives user-visible status lines.
pub trait StatusSink {
    fn set_status(&self, status: &str);
}

/// Sending half of a cancellation signal. Cancelling is sticky.
#[derive(Debug)]
pub struct Canceller {
    tx: watch::Sender<bool>,
}

impl Canceller {
    pub fn cancel(&self) {
        // send_replace stores the value even when no receiver is alive.
        self.tx.send_replace(true);
    }
}

/// Receiving half of a cancellation signal, observed cooperatively.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. Never resolves if every [`Canceller`] is
    /// dropped without cancelling.
    pub async fn cancelled(&mut self) {
        let closed = self.rx.wait_for(|c| *c).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

/// Create a linked canceller / signal pair.
pub fn cancel_pair() -> (Canceller, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (Canceller { tx }, CancelSignal { rx })
}

/// Result of [`connect_with_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected(ServiceEndpoint),
    Cancelled,
}

/// Probe until connected or cancelled. There is no retry limit.
///
/// Cancellation is checked before each pass and during the pause between
/// passes; an in-flight pass always runs to completion.
pub async fn connect_with_retry(
    locator: &mut ServiceLocator,
    cancel: &mut CancelSignal,
    status: &dyn StatusSink,
    retry_delay: Duration,
) -> ConnectOutcome {
    let mut attempt: u32 = 0;

    while !locator.is_connected() {
        if cancel.is_cancelled() {
            info!(attempt, "Connection cancelled");
            return ConnectOutcome::Cancelled;
        }

        attempt += 1;
        status.set_status(i18n::status_looking_for_service());

        if locator.locate().await.is_none() {
            debug!(attempt, delay_ms = retry_delay.as_millis() as u64, "Service not found, retrying");
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(attempt, "Connection cancelled");
                    return ConnectOutcome::Cancelled;
                }
                _ = sleep(retry_delay) => {}
            }
        }
    }

    let endpoint = locator.endpoint();
    status.set_status(&i18n::status_ready_on_port(endpoint.port));
    ConnectOutcome::Connected(endpoint)
}
