/***************************************/
/*        3rd party libraries          */
/***************************************/
use async_trait::async_trait;
use crossbeam_channel as cbc;
use futures::future::join_all;
use log::{info, warn};
use parking_lot::RwLock;
use std::sync::Arc;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::DispatchEvent;

/***************************************/
/*             Public API              */
/***************************************/
#[async_trait]
pub trait DispatchObserver: Send + Sync {
    async fn notify(&self, event: &DispatchEvent) -> anyhow::Result<()>;
}

/**
 * Fans dispatch events out to every subscribed observer.
 *
 * Each observer runs on its own task and `emit` waits for all of them. An
 * observer that fails or panics is logged and otherwise ignored.
 */
#[derive(Default)]
pub struct Notifier {
    observers: RwLock<Vec<Arc<dyn DispatchObserver>>>,
}

impl Notifier {
    pub fn new() -> Notifier {
        Notifier::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn DispatchObserver>) {
        self.observers.write().push(observer);
    }

    pub async fn emit(&self, event: DispatchEvent) {
        let observers = self.observers.read().clone();
        if observers.is_empty() {
            return;
        }

        let tasks = observers.into_iter().map(|observer| {
            let event = event.clone();
            tokio::spawn(async move { observer.notify(&event).await })
        });

        for result in join_all(tasks).await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Observer failed to handle {:?}: {:#}", event, e),
                Err(e) => warn!("Observer task for {:?} did not complete: {}", event, e),
            }
        }
    }
}

/// Writes every event to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

#[async_trait]
impl DispatchObserver for LogObserver {
    async fn notify(&self, event: &DispatchEvent) -> anyhow::Result<()> {
        info!("{}", event);
        Ok(())
    }
}

/// Forwards events to a crossbeam channel, for consumers running on plain threads.
#[derive(Clone)]
pub struct ChannelObserver {
    event_tx: cbc::Sender<DispatchEvent>,
}

impl ChannelObserver {
    pub fn new(event_tx: cbc::Sender<DispatchEvent>) -> ChannelObserver {
        ChannelObserver { event_tx }
    }
}

#[async_trait]
impl DispatchObserver for ChannelObserver {
    async fn notify(&self, event: &DispatchEvent) -> anyhow::Result<()> {
        self.event_tx
            .send(event.clone())
            .map_err(|_| anyhow::anyhow!("event channel disconnected"))
    }
}
