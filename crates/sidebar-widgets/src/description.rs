//! Auto-saving description field.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use sidebar_types::models::Description;

/// Quiet period before the description is saved.
pub const DESCRIPTION_DEBOUNCE: Duration = Duration::from_millis(200);

pub trait DescriptionSource: Send + Sync + 'static {
    fn get_description(
        &self,
        path: &str,
    ) -> impl Future<Output = anyhow::Result<Option<Description>>> + Send;

    fn update_description(
        &self,
        path: &str,
        text: &str,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

impl<T: DescriptionSource> DescriptionSource for Arc<T> {
    fn get_description(
        &self,
        path: &str,
    ) -> impl Future<Output = anyhow::Result<Option<Description>>> + Send {
        (**self).get_description(path)
    }

    fn update_description(
        &self,
        path: &str,
        text: &str,
    ) -> impl Future<Output = anyhow::Result<()>> + Send {
        (**self).update_description(path, text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    Saving,
    Failed,
}

/// Description editor of one path. Cloning shares the editor.
pub struct DescriptionEditor<S> {
    inner: Arc<EditorInner<S>>,
}

impl<S> Clone for DescriptionEditor<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct EditorInner<S> {
    source: S,
    path: String,
    debounce: Duration,
    saves: Mutex<Saves>,
    status_tx: watch::Sender<SaveStatus>,
}

#[derive(Default)]
struct Saves {
    generation: u64,
    timer: Option<JoinHandle<()>>,
    in_flight: usize,
}

impl<S: DescriptionSource> DescriptionEditor<S> {
    pub fn new(source: S, path: impl Into<String>) -> Self {
        Self::with_debounce(source, path, DESCRIPTION_DEBOUNCE)
    }

    pub fn with_debounce(source: S, path: impl Into<String>, debounce: Duration) -> Self {
        let (status_tx, _) = watch::channel(SaveStatus::Idle);
        Self {
            inner: Arc::new(EditorInner {
                source,
                path: path.into(),
                debounce,
                saves: Mutex::new(Saves::default()),
                status_tx,
            }),
        }
    }

    pub fn path(&self) -> &str {
        &self.inner.path
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.inner.status_tx.subscribe()
    }

    pub fn status(&self) -> SaveStatus {
        *self.inner.status_tx.borrow()
    }

    /// Current text of the description; empty when none has been written.
    pub async fn load(&self) -> anyhow::Result<String> {
        let description = self.inner.source.get_description(&self.inner.path).await?;
        Ok(description.map(|d| d.text).unwrap_or_default())
    }

    /// The text changed. Restarts the quiet period; the text is saved once it
    /// elapses.
    pub fn on_input(&self, text: &str) {
        let mut saves = self.inner.lock();
        saves.generation += 1;
        if let Some(timer) = saves.timer.take() {
            timer.abort();
        }

        let inner = Arc::clone(&self.inner);
        let generation = saves.generation;
        let text = text.to_string();
        saves.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            inner.save(generation, text).await;
        }));
    }
}

impl<S: DescriptionSource> EditorInner<S> {
    fn lock(&self) -> MutexGuard<'_, Saves> {
        self.saves.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn save(&self, generation: u64, text: String) {
        {
            let mut saves = self.lock();
            // A keystroke landed between the timer firing and this lock; its
            // own timer saves the newer text and this task is being aborted.
            if saves.generation != generation {
                return;
            }
            // Detach from the timer slot so a later keystroke cannot abort this save.
            saves.timer = None;
            saves.in_flight += 1;
            self.status_tx.send_replace(SaveStatus::Saving);
        }

        debug!(path = %self.path, len = text.len(), "Saving description");
        let result = self.source.update_description(&self.path, &text).await;

        let mut saves = self.lock();
        saves.in_flight -= 1;
        match result {
            Ok(()) if saves.in_flight == 0 => {
                self.status_tx.send_replace(SaveStatus::Idle);
            }
            Ok(()) => {}
            Err(e) => {
                warn!("Saving description of {} failed: {:#}", self.path, e);
                self.status_tx.send_replace(SaveStatus::Failed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MemorySource {
        saved: Mutex<Vec<(String, String)>>,
        delay: Duration,
        fail: bool,
    }

    impl MemorySource {
        fn saved(&self) -> Vec<(String, String)> {
            self.saved.lock().unwrap().clone()
        }
    }

    impl DescriptionSource for MemorySource {
        async fn get_description(&self, path: &str) -> anyhow::Result<Option<Description>> {
            Ok(self
                .saved()
                .into_iter()
                .rev()
                .find(|(p, _)| p == path)
                .map(|(path, text)| Description { path, text }))
        }

        async fn update_description(&self, path: &str, text: &str) -> anyhow::Result<()> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                anyhow::bail!("backend unavailable");
            }
            self.saved
                .lock()
                .unwrap()
                .push((path.to_string(), text.to_string()));
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_saves_last_text_once() {
        let source = Arc::new(MemorySource::default());
        let editor = DescriptionEditor::new(source.clone(), "/docs/");

        for text in ["d", "dr", "dra", "draft"] {
            editor.on_input(text);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(source.saved().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(source.saved(), [("/docs/".to_string(), "draft".to_string())]);
        assert_eq!(editor.load().await.unwrap(), "draft");
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_save_is_not_cancelled() {
        let source = Arc::new(MemorySource {
            delay: Duration::from_millis(500),
            ..Default::default()
        });
        let editor = DescriptionEditor::new(source.clone(), "/a");
        let status = editor.subscribe();

        editor.on_input("first");
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(*status.borrow(), SaveStatus::Saving);

        editor.on_input("second");
        tokio::time::sleep(Duration::from_secs(1)).await;

        let texts: Vec<_> = source.saved().into_iter().map(|(_, t)| t).collect();
        assert_eq!(texts, ["first", "second"]);
        assert_eq!(editor.status(), SaveStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_is_reported() {
        let source = Arc::new(MemorySource {
            fail: true,
            ..Default::default()
        });
        let editor = DescriptionEditor::new(source.clone(), "/a");

        editor.on_input("lost");
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(editor.status(), SaveStatus::Failed);
        assert!(source.saved().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn typing_through_the_timer_never_sticks_at_saving() {
        for _ in 0..50 {
            let source = Arc::new(MemorySource::default());
            let editor =
                DescriptionEditor::with_debounce(source.clone(), "/a", Duration::from_micros(1));

            let started = std::time::Instant::now();
            let mut n = 0;
            while started.elapsed() < Duration::from_millis(5) {
                editor.on_input(&format!("text {}", n));
                n += 1;
                tokio::task::yield_now().await;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;

            assert_eq!(editor.status(), SaveStatus::Idle);
            let last = format!("text {}", n - 1);
            assert!(source.saved().iter().any(|(_, text)| *text == last));
        }
    }

    #[tokio::test]
    async fn missing_description_loads_empty() {
        let editor = DescriptionEditor::new(MemorySource::default(), "/nothing");
        assert_eq!(editor.load().await.unwrap(), "");
    }
}
