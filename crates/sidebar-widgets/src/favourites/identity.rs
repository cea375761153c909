use std::future::Future;
use std::sync::{Arc, OnceLock};

use tokio::sync::{Mutex, broadcast, oneshot};
use tracing::{debug, info};

use sidebar_types::models::SessionInfo;

use super::FavouritesError;

/// Source of the session's backend identity.
pub trait SessionProvider: Send + Sync + 'static {
    fn session_info(&self) -> impl Future<Output = anyhow::Result<SessionInfo>> + Send;
}

/// Fired by the host application when the user logs out.
#[derive(Debug, Clone)]
pub struct LogoutSignal {
    tx: broadcast::Sender<()>,
}

impl LogoutSignal {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(4);
        Self { tx }
    }

    pub fn notify(&self) {
        let _ = self.tx.send(());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }
}

impl Default for LogoutSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Backend id of the current session, resolved on first use and kept until
/// logout.
pub struct IdentityCache<S> {
    session: S,
    value: Arc<Mutex<Option<String>>>,
    logout: LogoutSignal,
    /// Dropping the cache drops this sender, which stops the logout listener.
    listener: OnceLock<oneshot::Sender<()>>,
}

impl<S: SessionProvider> IdentityCache<S> {
    pub fn new(session: S, logout: LogoutSignal) -> Self {
        Self {
            session,
            value: Arc::new(Mutex::new(None)),
            logout,
            listener: OnceLock::new(),
        }
    }

    /// The cached backend id, asking the session provider if there is none.
    /// Concurrent callers wait on a single resolution.
    pub async fn resolve(&self) -> Result<String, FavouritesError> {
        let mut value = self.value.lock().await;
        if let Some(backend_id) = value.as_ref() {
            return Ok(backend_id.clone());
        }

        self.listen_for_logout();
        let info = self
            .session
            .session_info()
            .await
            .map_err(FavouritesError::Session)?;
        debug!(backend_id = %info.backend_id, "Resolved session identity");
        *value = Some(info.backend_id.clone());
        Ok(info.backend_id)
    }

    /// Forget the cached id; the next `resolve` asks the session provider again.
    pub async fn invalidate(&self) {
        self.value.lock().await.take();
    }

    fn listen_for_logout(&self) {
        self.listener.get_or_init(|| {
            let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
            let mut rx = self.logout.subscribe();
            let value = Arc::downgrade(&self.value);
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = &mut stop_rx => break,
                        event = rx.recv() => match event {
                            Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                                let Some(value) = value.upgrade() else { break };
                                value.lock().await.take();
                                info!("Session identity cleared on logout");
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        },
                    }
                }
            });
            stop_tx
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingSession {
        calls: AtomicUsize,
    }

    impl CountingSession {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SessionProvider for Arc<CountingSession> {
        async fn session_info(&self) -> anyhow::Result<SessionInfo> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(SessionInfo {
                backend_id: format!("backend-{}", n),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_once_for_concurrent_callers() {
        let session = CountingSession::new();
        let cache = IdentityCache::new(session.clone(), LogoutSignal::new());

        let (a, b) = tokio::join!(cache.resolve(), cache.resolve());
        assert_eq!(a.unwrap(), "backend-1");
        assert_eq!(b.unwrap(), "backend-1");
        assert_eq!(cache.resolve().await.unwrap(), "backend-1");
        assert_eq!(session.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn logout_forces_re_resolution() {
        let session = CountingSession::new();
        let logout = LogoutSignal::new();
        let cache = IdentityCache::new(session.clone(), logout.clone());

        assert_eq!(cache.resolve().await.unwrap(), "backend-1");
        logout.notify();
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(cache.resolve().await.unwrap(), "backend-2");
        assert_eq!(session.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_invalidate() {
        let session = CountingSession::new();
        let cache = IdentityCache::new(session.clone(), LogoutSignal::new());

        cache.resolve().await.unwrap();
        cache.invalidate().await;
        assert_eq!(cache.resolve().await.unwrap(), "backend-2");
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_cache_stops_listening() {
        let logout = LogoutSignal::new();
        let cache = IdentityCache::new(CountingSession::new(), logout.clone());
        cache.resolve().await.unwrap();
        cache.resolve().await.unwrap();
        assert_eq!(logout.tx.receiver_count(), 1);

        drop(cache);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(logout.tx.receiver_count(), 0);
    }

    struct BrokenSession;

    impl SessionProvider for BrokenSession {
        async fn session_info(&self) -> anyhow::Result<SessionInfo> {
            anyhow::bail!("not logged in")
        }
    }

    #[tokio::test]
    async fn session_errors_propagate() {
        let cache = IdentityCache::new(BrokenSession, LogoutSignal::new());
        let err = cache.resolve().await.unwrap_err();
        assert!(matches!(err, FavouritesError::Session(_)));
    }
}
