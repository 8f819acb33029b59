use crate::metrics_defs::{QUEUE_DEPTH, TASKS_ENQUEUED, TASKS_PROCESSED};
use crate::platform::{ChatPlatform, Delivery, DeliveryError};
use crate::task::{LogMessage, NotificationTask};
use shared::{counter, gauge};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RelayError {
    #[error("notification relay is shut down")]
    Closed,
}

/// Producer side of the relay. Cloning is cheap and enqueueing never blocks,
/// so handles can be used from request handlers and plain threads alike.
#[derive(Clone, Debug)]
pub struct RelayHandle {
    tx: mpsc::UnboundedSender<NotificationTask>,
}

impl RelayHandle {
    pub fn enqueue(&self, task: NotificationTask) -> Result<(), RelayError> {
        let kind = task.kind();
        self.tx.send(task).map_err(|_| RelayError::Closed)?;
        counter!(TASKS_ENQUEUED, "kind" => kind).increment(1);
        Ok(())
    }

    /// Queues the notifications for a completed verification: the log
    /// message first, then the role grant.
    pub fn enqueue_visit(
        &self,
        message: Option<LogMessage>,
        user_id: Option<String>,
    ) -> Result<(), RelayError> {
        if let Some(message) = message {
            self.enqueue(NotificationTask::SendLog(message))?;
        }
        if let Some(user_id) = user_id {
            self.enqueue(NotificationTask::AssignRole { user_id })?;
        }
        Ok(())
    }

    /// Like [`enqueue_visit`](Self::enqueue_visit), but when `access_token`
    /// is given the guild join is queued ahead of the role grant. A role can
    /// only be assigned to a user who is already a member.
    pub fn enqueue_verification(
        &self,
        message: LogMessage,
        user_id: String,
        access_token: Option<String>,
    ) -> Result<(), RelayError> {
        self.enqueue(NotificationTask::SendLog(message))?;
        if let Some(access_token) = access_token {
            self.enqueue(NotificationTask::JoinGuild {
                user_id: user_id.clone(),
                access_token,
            })?;
        }
        self.enqueue(NotificationTask::AssignRole { user_id })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Owns the consumer task that delivers queued notifications one at a time.
pub struct NotificationRelay {
    handle: RelayHandle,
    consumer: JoinHandle<()>,
    shutdown_tx: oneshot::Sender<()>,
}

impl NotificationRelay {
    /// Starts the consumer on the current runtime.
    pub fn spawn(platform: Arc<dyn ChatPlatform>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let consumer = tokio::spawn(consume(platform, rx, shutdown_rx));

        NotificationRelay {
            handle: RelayHandle { tx },
            consumer,
            shutdown_tx,
        }
    }

    pub fn handle(&self) -> RelayHandle {
        self.handle.clone()
    }

    /// Stops accepting tasks, delivers what is already queued, and waits for
    /// the consumer to exit.
    pub async fn shutdown(self) {
        let NotificationRelay {
            handle,
            consumer,
            shutdown_tx,
        } = self;
        drop(handle);

        // The consumer may already be gone if every sender was dropped.
        let _ = shutdown_tx.send(());

        if let Err(e) = consumer.await {
            tracing::error!("Relay consumer panicked: {}", e);
        }
    }
}

async fn consume(
    platform: Arc<dyn ChatPlatform>,
    mut rx: mpsc::UnboundedReceiver<NotificationTask>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    tracing::info!("Notification relay started");

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown_rx => {
                rx.close();
                break;
            }
            task = rx.recv() => match task {
                Some(task) => dispatch(&platform, &rx, task).await,
                None => {
                    tracing::info!("Notification relay stopped");
                    return;
                }
            }
        }
    }

    let pending = rx.len();
    if pending > 0 {
        tracing::info!(pending, "Draining notification queue");
    }
    while let Some(task) = rx.recv().await {
        dispatch(&platform, &rx, task).await;
    }
    tracing::info!("Notification relay stopped");
}

async fn dispatch(
    platform: &Arc<dyn ChatPlatform>,
    rx: &mpsc::UnboundedReceiver<NotificationTask>,
    task: NotificationTask,
) {
    gauge!(QUEUE_DEPTH).set(rx.len() as f64);
    let kind = task.kind();

    // Run each delivery in its own task so a panicking platform cannot take
    // the consumer down with it.
    let platform = platform.clone();
    let outcome = match tokio::spawn(async move { deliver(platform.as_ref(), task).await }).await
    {
        Ok(Ok(Delivery::Sent)) => {
            tracing::debug!(kind, "Delivered notification");
            "sent"
        }
        Ok(Ok(Delivery::Skipped(reason))) => {
            tracing::warn!(kind, reason, "Skipped notification");
            "skipped"
        }
        Ok(Err(e)) => {
            tracing::error!(kind, error = %e, "Failed to deliver notification");
            "failed"
        }
        Err(e) => {
            tracing::error!(kind, "Task panicked: {}", e);
            "panicked"
        }
    };

    counter!(TASKS_PROCESSED, "kind" => kind, "outcome" => outcome).increment(1);
}

/// Performs a single task against the platform.
pub async fn deliver(
    platform: &dyn ChatPlatform,
    task: NotificationTask,
) -> Result<Delivery, DeliveryError> {
    match task {
        NotificationTask::SendLog(message) => platform.send_log(&message).await,
        NotificationTask::AssignRole { user_id } => platform.assign_role(&user_id).await,
        NotificationTask::JoinGuild {
            user_id,
            access_token,
        } => platform.join_guild(&user_id, &access_token).await,
    }
}
