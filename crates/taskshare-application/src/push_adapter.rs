//! Push channel adapter.
//!
//! Opens one transport connection per session and forwards every inbound
//! message, parsed into a [`ChangeEvent`], to the reconciler. Garbled
//! messages are logged and skipped. A transport failure is logged and marks
//! the channel `Degraded`; the session itself stays usable (local mutations
//! keep working without live updates).

use crate::reconciler::ChangeReconciler;
use crate::session::SessionTicket;
use futures::StreamExt;
use std::sync::Arc;
use strum::Display;
use taskshare_core::error::{Result, TaskShareError};
use taskshare_core::{ChangeEvent, PushStream, PushTransport};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Connection state of a push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ChannelStatus {
    Open,
    /// The transport failed or the server closed the connection.
    Degraded,
    /// Closed locally (logout).
    Closed,
}

/// Handle to a running push channel.
#[derive(Debug)]
pub struct PushChannelHandle {
    cancel: CancellationToken,
    status: watch::Receiver<ChannelStatus>,
    task: JoinHandle<()>,
}

impl PushChannelHandle {
    pub fn status(&self) -> ChannelStatus {
        *self.status.borrow()
    }

    /// A receiver that observes status changes.
    pub fn subscribe(&self) -> watch::Receiver<ChannelStatus> {
        self.status.clone()
    }

    /// Stops delivery.
    ///
    /// Events whose session write has not started yet are dropped. One write
    /// already holding the session may still finish; [`shutdown`](Self::shutdown)
    /// waits for the receive loop to exit.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Closes the channel and waits for the receive loop to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!("[PushChannel] Receive loop ended abnormally: {}", e);
        }
    }
}

pub struct PushChannelAdapter {
    transport: Arc<dyn PushTransport>,
    reconciler: ChangeReconciler,
}

impl PushChannelAdapter {
    pub fn new(transport: Arc<dyn PushTransport>, reconciler: ChangeReconciler) -> Self {
        Self {
            transport,
            reconciler,
        }
    }

    /// Connects with the ticket's token and starts forwarding events.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the connection cannot be opened.
    pub async fn open(&self, ticket: SessionTicket) -> Result<PushChannelHandle> {
        let stream = self.transport.connect(&ticket.token).await?;
        tracing::info!("[PushChannel] Connected for '{}'", ticket.user);

        let cancel = CancellationToken::new();
        let (status_tx, status) = watch::channel(ChannelStatus::Open);
        let task = tokio::spawn(receive_loop(
            stream,
            self.reconciler.clone(),
            ticket,
            cancel.clone(),
            status_tx,
        ));

        Ok(PushChannelHandle {
            cancel,
            status,
            task,
        })
    }
}

async fn receive_loop(
    mut stream: PushStream,
    reconciler: ChangeReconciler,
    ticket: SessionTicket,
    cancel: CancellationToken,
    status: watch::Sender<ChannelStatus>,
) {
    let final_status = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break ChannelStatus::Closed,
            next = stream.next() => next,
        };

        let raw = match next {
            Some(Ok(raw)) => raw,
            Some(Err(e)) => {
                tracing::error!("[PushChannel] Transport error, live updates stopped: {}", e);
                break ChannelStatus::Degraded;
            }
            None => {
                tracing::warn!("[PushChannel] Connection closed by server");
                break ChannelStatus::Degraded;
            }
        };

        let event = match ChangeEvent::parse(&raw) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("[PushChannel] Ignoring unreadable message: {}", e);
                continue;
            }
        };

        match reconciler
            .apply_event_unless_cancelled(&ticket, event, &cancel)
            .await
        {
            Ok(true) => {}
            Ok(false) => break ChannelStatus::Closed,
            Err(TaskShareError::StaleSession) => break ChannelStatus::Closed,
            Err(e) => tracing::warn!("[PushChannel] Failed to apply event: {}", e),
        }
    };

    tracing::debug!("[PushChannel] Receive loop finished: {}", final_status);
    let _ = status.send(final_status);
}
