use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tokio_stream::{StreamExt, wrappers::BroadcastStream};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, info, warn};

use crate::{
    application::services::registry::SenderRegistry,
    domain::{
        errors::DomainError,
        models::{Message, NewHistoryRecord},
        repositories::HistoryRepository,
    },
};

pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Routes messages to their sender and records every attempt.
///
/// Synchronous messages are delivered on a tracked task the caller awaits, so
/// a caller that goes away does not abandon the attempt. Asynchronous ones go
/// through a bounded queue drained by [`DispatchWorker`].
pub struct DispatchEngine {
    registry: Arc<SenderRegistry>,
    history: Arc<dyn HistoryRepository>,
    queue: mpsc::Sender<Message>,
    reconcile: mpsc::Sender<()>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

/// Receiving half of the engine's channels; owns the control loop.
pub struct DispatchWorker {
    queue: mpsc::Receiver<Message>,
    reconcile: mpsc::Receiver<()>,
}

impl DispatchEngine {
    pub fn new(
        registry: Arc<SenderRegistry>,
        history: Arc<dyn HistoryRepository>,
        queue_capacity: usize,
    ) -> (Arc<Self>, DispatchWorker) {
        let (queue_tx, queue_rx) = mpsc::channel(queue_capacity.max(1));
        let (reconcile_tx, reconcile_rx) = mpsc::channel(1);

        let engine = Arc::new(Self {
            registry,
            history,
            queue: queue_tx,
            reconcile: reconcile_tx,
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        });
        let worker = DispatchWorker {
            queue: queue_rx,
            reconcile: reconcile_rx,
        };
        (engine, worker)
    }

    pub fn registry(&self) -> &Arc<SenderRegistry> {
        &self.registry
    }

    /// Delivers inline when the message is synchronous, otherwise enqueues it,
    /// waiting for room when the queue is full.
    pub async fn submit(self: &Arc<Self>, message: Message) -> Result<(), DomainError> {
        if message.synchronous {
            let engine = Arc::clone(self);
            return self
                .tracker
                .spawn(async move { engine.deliver(message).await })
                .await
                .unwrap_or_else(|err| Err(DomainError::InternalFault(err.to_string())));
        }
        if self.shutdown.is_cancelled() {
            return Err(DomainError::ShuttingDown);
        }
        self.queue
            .send(message)
            .await
            .map_err(|_| DomainError::ShuttingDown)
    }

    /// Asks the control loop to reconcile the registry. Requests made while
    /// one is already pending collapse into it.
    pub fn request_reconcile(&self) {
        match self.reconcile.try_send(()) {
            Ok(()) => debug!("reconcile requested"),
            Err(mpsc::error::TrySendError::Full(())) => debug!("reconcile already pending"),
            Err(mpsc::error::TrySendError::Closed(())) => warn!("dispatch loop is gone"),
        }
    }

    /// Turns configuration change notifications into reconcile requests.
    pub fn watch_config_changes(
        self: &Arc<Self>,
        changes: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        self.tracker.spawn(async move {
            let mut changes = BroadcastStream::new(changes);
            loop {
                tokio::select! {
                    _ = engine.shutdown.cancelled() => break,
                    change = changes.next() => match change {
                        // A lagged receiver still means something changed.
                        Some(_) => engine.request_reconcile(),
                        None => break,
                    },
                }
            }
            debug!("config change watcher stopped");
        })
    }

    /// One delivery attempt followed by its history record.
    pub async fn deliver(&self, mut message: Message) -> Result<(), DomainError> {
        let result = self.attempt(&mut message).await;
        if let Err(err) = &result {
            message.delivery_error.get_or_insert_with(|| err.to_string());
        }

        match &result {
            Ok(()) => debug!(sender = %message.sender, "message delivered"),
            Err(err) => warn!(sender = %message.sender, error = %err, "message delivery failed"),
        }

        if let Err(err) = self.history.insert(NewHistoryRecord::from(&message)).await {
            error!(sender = %message.sender, error = %err, "failed to record history");
        }
        result
    }

    async fn attempt(&self, message: &mut Message) -> Result<(), DomainError> {
        let sender = self
            .registry
            .get(&message.sender)
            .await
            .ok_or_else(|| DomainError::UnknownSender(message.sender.clone()))?;

        AssertUnwindSafe(sender.send(message))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(DomainError::InternalFault(panic_message(panic))))
    }

    /// Cancels the control loop and the change watcher, then waits for them
    /// and for every in-flight delivery.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!("dispatch engine stopped");
    }
}

impl DispatchWorker {
    /// Runs the loop on the engine's tracker so shutdown waits for it.
    pub fn spawn(self, engine: Arc<DispatchEngine>) -> JoinHandle<()> {
        let tracker = engine.tracker.clone();
        tracker.spawn(self.run(engine))
    }

    async fn run(mut self, engine: Arc<DispatchEngine>) {
        info!("dispatch loop started");
        loop {
            tokio::select! {
                biased;
                _ = engine.shutdown.cancelled() => break,
                Some(()) = self.reconcile.recv() => engine.registry.reconcile().await,
                next = self.queue.recv() => {
                    let Some(message) = next else { break };
                    // Pick up a configuration change that raced the dequeue.
                    if self.reconcile.try_recv().is_ok() {
                        engine.registry.reconcile().await;
                    }
                    let delivery = Arc::clone(&engine);
                    engine.tracker.spawn(async move {
                        let _ = delivery.deliver(message).await;
                    });
                }
            }
        }
        info!("dispatch loop stopped");
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "sender panicked".to_string()
    }
}
