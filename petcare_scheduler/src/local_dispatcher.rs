use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use tokio::{
    sync::{RwLock, mpsc},
    task::{self, JoinHandle},
};
use tokio_util::sync::CancellationToken;

use crate::{
    clock::Clock,
    dispatcher::{NotificationDispatcher, NotificationHandle, NotificationRequest},
};

#[derive(Debug, Clone)]
pub struct FiredNotification {
    pub handle: NotificationHandle,
    pub request: NotificationRequest,
}

struct PendingNotification {
    task: JoinHandle<()>,
    cancellation_token: CancellationToken,
}

type PendingStore = RwLock<HashMap<NotificationHandle, PendingNotification>>;

/// Keeps notifications in-process: one timer task per notification, and
/// fired ones are handed back over a channel.
pub struct LocalNotificationDispatcher {
    pending: Arc<PendingStore>,
    clock: Arc<dyn Clock>,
    fired_tx: mpsc::UnboundedSender<FiredNotification>,
    next_id: AtomicU64,
    shutdown: CancellationToken,
}

impl LocalNotificationDispatcher {
    pub fn new(clock: Arc<dyn Clock>) -> (Self, mpsc::UnboundedReceiver<FiredNotification>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            pending: Arc::new(RwLock::new(HashMap::new())),
            clock,
            fired_tx,
            next_id: AtomicU64::new(1),
            shutdown: CancellationToken::new(),
        };

        (dispatcher, fired_rx)
    }

    fn next_handle(&self) -> NotificationHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        NotificationHandle::new(format!("local-{id}"))
    }
}

impl Drop for LocalNotificationDispatcher {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[async_trait]
impl NotificationDispatcher for LocalNotificationDispatcher {
    async fn schedule(&self, request: NotificationRequest) -> anyhow::Result<NotificationHandle> {
        let now = self.clock.now();
        let delay = (request.trigger_at - now).to_std().map_err(|_| {
            anyhow::anyhow!(
                "Trigger time {} is not in the future (now = {now})",
                request.trigger_at
            )
        })?;

        let handle = self.next_handle();
        let cancellation_token = self.shutdown.child_token();
        let task_token = cancellation_token.clone();
        let pending = Arc::clone(&self.pending);
        let fired_tx = self.fired_tx.clone();
        let task_handle = handle.clone();

        // Registered before the task can look itself up after firing.
        let mut store = self.pending.write().await;
        let task = task::spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => {
                    log::debug!("Notification timer stopped. [handle = {task_handle}]");
                }
                _ = tokio::time::sleep(delay) => {
                    pending.write().await.remove(&task_handle);
                    log::info!("Notification fired. [handle = {task_handle}, title = {}]", request.title);
                    let fired = FiredNotification { handle: task_handle, request };
                    if fired_tx.send(fired).is_err() {
                        log::warn!("Nobody is listening for fired notifications");
                    }
                }
            }
        });

        store.insert(
            handle.clone(),
            PendingNotification {
                task,
                cancellation_token,
            },
        );

        log::debug!("Notification timer started. [handle = {handle}, delay = {delay:?}]");
        Ok(handle)
    }

    async fn cancel(&self, handle: &NotificationHandle) -> anyhow::Result<()> {
        let Some(notification) = self.pending.write().await.remove(handle) else {
            anyhow::bail!("No pending notification {handle}");
        };

        notification.cancellation_token.cancel();
        let _ = notification.task.await;

        Ok(())
    }

    async fn list_scheduled(&self) -> anyhow::Result<HashSet<NotificationHandle>> {
        Ok(self.pending.read().await.keys().cloned().collect())
    }
}
