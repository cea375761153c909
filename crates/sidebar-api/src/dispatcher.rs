use std::sync::Arc;

use tokio::sync::broadcast;

use sidebar_types::events::SidebarEvent;

/// Fans widget events out to every subscriber.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<SidebarEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner { broadcast_tx }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SidebarEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Publish an event. Events sent while nobody listens are dropped.
    pub fn broadcast(&self, event: SidebarEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
