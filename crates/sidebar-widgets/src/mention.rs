//! `@mention` autocomplete for the chat input.
//!
//! Keystrokes drive a small state machine (`Idle`, `QueryPending`,
//! `SuggestionsVisible`). A query is only sent to the [`UserDirectory`] once
//! the input has been quiet for the debounce interval, and every keystroke
//! bumps a generation counter so that a response can only be applied while
//! the query it answers is still the current one.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use sidebar_types::models::UserSuggestion;

/// Quiet period before a mention query is dispatched.
pub const MENTION_DEBOUNCE: Duration = Duration::from_millis(150);

/// User lookup used to fill the suggestion list.
pub trait UserDirectory: Send + Sync + 'static {
    fn search_users(
        &self,
        query: &str,
    ) -> impl Future<Output = anyhow::Result<Vec<UserSuggestion>>> + Send;
}

impl<T: UserDirectory> UserDirectory for Arc<T> {
    fn search_users(
        &self,
        query: &str,
    ) -> impl Future<Output = anyhow::Result<Vec<UserSuggestion>>> + Send {
        (**self).search_users(query)
    }
}

/// Byte offset of the `caret`-th character, clamped to the end of `text`.
fn byte_offset(text: &str, caret: usize) -> usize {
    text.char_indices()
        .nth(caret)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

/// The partial handle typed after an `@`, if the caret sits inside a mention.
///
/// `caret` counts characters. The `@` must start the text or follow a plain
/// space, and the token between `@` and the caret may not contain a space.
pub fn extract_mention_query(text: &str, caret: usize) -> Option<&str> {
    let before = &text[..byte_offset(text, caret)];
    let at = before.rfind('@')?;
    if let Some(prev) = before[..at].chars().next_back() {
        if prev != ' ' {
            return None;
        }
    }
    let query = &before[at + 1..];
    if query.contains(' ') {
        return None;
    }
    Some(query)
}

/// Input text and caret after a suggestion was picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionEdit {
    pub text: String,
    pub caret: usize,
}

/// Replace the `@query` span that ends at the caret with `@handle `.
///
/// Text after the caret is kept verbatim and the caret lands right after the
/// inserted space. Returns `None` when there is no `@` before the caret.
pub fn apply_pick(text: &str, caret: usize, handle: &str) -> Option<MentionEdit> {
    let split = byte_offset(text, caret);
    let (before, after) = text.split_at(split);
    let at = before.rfind('@')?;

    let mut out = String::with_capacity(text.len() + handle.len() + 2);
    out.push_str(&before[..at]);
    out.push('@');
    out.push_str(handle);
    out.push(' ');
    let caret = out.chars().count();
    out.push_str(after);

    Some(MentionEdit { text: out, caret })
}

/// What the suggestion list currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MentionState {
    #[default]
    Idle,
    /// Waiting for the debounce timer or the directory response.
    QueryPending { query: String },
    SuggestionsVisible {
        query: String,
        suggestions: Vec<UserSuggestion>,
        active: Option<usize>,
    },
}

impl MentionState {
    pub fn is_visible(&self) -> bool {
        matches!(self, Self::SuggestionsVisible { .. })
    }

    pub fn suggestions(&self) -> &[UserSuggestion] {
        match self {
            Self::SuggestionsVisible { suggestions, .. } => suggestions,
            _ => &[],
        }
    }

    pub fn active(&self) -> Option<usize> {
        match self {
            Self::SuggestionsVisible { active, .. } => *active,
            _ => None,
        }
    }
}

/// Keys the resolver reacts to while suggestions are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionKey {
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
    Other,
}

/// Result of a keydown. When `prevent_default` is set the input must not
/// apply its own handling (caret movement, form submission).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyOutcome {
    pub prevent_default: bool,
    pub edit: Option<MentionEdit>,
}

impl KeyOutcome {
    fn suppressed() -> Self {
        Self {
            prevent_default: true,
            edit: None,
        }
    }
}

/// Drives the mention suggestion list of one text input.
///
/// Must be used from within a Tokio runtime: debounce timers and directory
/// lookups run as spawned tasks.
pub struct MentionResolver<D> {
    inner: Arc<ResolverInner<D>>,
}

impl<D> Clone for MentionResolver<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ResolverInner<D> {
    directory: D,
    debounce: Duration,
    machine: Mutex<Machine>,
    state_tx: watch::Sender<MentionState>,
}

#[derive(Default)]
struct Machine {
    /// Bumped by every input event and every hide; a lookup result is only
    /// applied if it still carries the current value.
    generation: u64,
    /// Debounce timer of the latest query, cleared once the lookup is dispatched.
    pending: Option<JoinHandle<()>>,
}

impl<D: UserDirectory> MentionResolver<D> {
    pub fn new(directory: D) -> Self {
        Self::with_debounce(directory, MENTION_DEBOUNCE)
    }

    pub fn with_debounce(directory: D, debounce: Duration) -> Self {
        let (state_tx, _) = watch::channel(MentionState::Idle);
        Self {
            inner: Arc::new(ResolverInner {
                directory,
                debounce,
                machine: Mutex::new(Machine::default()),
                state_tx,
            }),
        }
    }

    /// Subscribe to the visible state.
    pub fn subscribe(&self) -> watch::Receiver<MentionState> {
        self.inner.state_tx.subscribe()
    }

    pub fn state(&self) -> MentionState {
        self.inner.state_tx.borrow().clone()
    }

    /// Handle an input-change event.
    pub fn on_input(&self, text: &str, caret: usize) {
        let query = extract_mention_query(text, caret).map(str::to_owned);
        let mut machine = self.inner.lock();
        machine.generation += 1;
        if let Some(timer) = machine.pending.take() {
            timer.abort();
        }

        let Some(query) = query else {
            self.inner.state_tx.send_replace(MentionState::Idle);
            return;
        };

        let generation = machine.generation;
        // A visible list keeps its items and active index until the answer to
        // the new query replaces it.
        if !self.inner.state_tx.borrow().is_visible() {
            self.inner
                .state_tx
                .send_replace(MentionState::QueryPending { query: query.clone() });
        }

        let inner = Arc::clone(&self.inner);
        machine.pending = Some(tokio::spawn(async move {
            inner.dispatch(generation, query).await;
        }));
    }

    /// Handle a keydown. Keys are only intercepted while suggestions are visible.
    pub fn on_key(&self, key: MentionKey, text: &str, caret: usize) -> KeyOutcome {
        let mut machine = self.inner.lock();
        let (count, active, active_handle) = match &*self.inner.state_tx.borrow() {
            MentionState::SuggestionsVisible {
                suggestions,
                active,
                ..
            } => (
                suggestions.len(),
                *active,
                active.and_then(|i| suggestions.get(i)).map(UserSuggestion::handle),
            ),
            _ => return KeyOutcome::default(),
        };

        match key {
            MentionKey::ArrowDown => {
                self.inner.set_active(active.map_or(0, |i| (i + 1) % count));
                KeyOutcome::suppressed()
            }
            MentionKey::ArrowUp => {
                self.inner
                    .set_active(active.map_or(count - 1, |i| (i + count - 1) % count));
                KeyOutcome::suppressed()
            }
            MentionKey::Enter => match active_handle {
                Some(handle) => {
                    let edit = apply_pick(text, caret, &handle);
                    self.inner.hide(&mut machine);
                    KeyOutcome {
                        prevent_default: true,
                        edit,
                    }
                }
                None => KeyOutcome::default(),
            },
            MentionKey::Escape => {
                self.inner.hide(&mut machine);
                KeyOutcome::default()
            }
            MentionKey::Other => KeyOutcome::default(),
        }
    }

    /// Pick the suggestion at `index` (pointer selection).
    pub fn pick(&self, index: usize, text: &str, caret: usize) -> Option<MentionEdit> {
        let mut machine = self.inner.lock();
        let handle = self.inner.state_tx.borrow().suggestions().get(index)?.handle();
        let edit = apply_pick(text, caret, &handle);
        self.inner.hide(&mut machine);
        edit
    }

    /// The input lost focus.
    pub fn on_blur(&self) {
        let mut machine = self.inner.lock();
        self.inner.hide(&mut machine);
    }
}

impl<D: UserDirectory> ResolverInner<D> {
    fn lock(&self) -> MutexGuard<'_, Machine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn hide(&self, machine: &mut Machine) {
        machine.generation += 1;
        if let Some(timer) = machine.pending.take() {
            timer.abort();
        }
        self.state_tx.send_replace(MentionState::Idle);
    }

    fn set_active(&self, index: usize) {
        self.state_tx.send_modify(|state| {
            if let MentionState::SuggestionsVisible { active, .. } = state {
                *active = Some(index);
            }
        });
    }

    async fn dispatch(&self, generation: u64, query: String) {
        tokio::time::sleep(self.debounce).await;

        {
            let mut machine = self.lock();
            if machine.generation != generation {
                return;
            }
            // The timer fired; from here on the lookup is only superseded, never aborted.
            machine.pending = None;
        }

        debug!(query = %query, generation, "Dispatching mention lookup");
        let suggestions = match self.directory.search_users(&query).await {
            Ok(suggestions) => suggestions,
            Err(e) => {
                debug!("Mention lookup for {:?} failed: {:#}", query, e);
                Vec::new()
            }
        };

        let machine = self.lock();
        if machine.generation != generation {
            debug!(query = %query, "Discarding stale mention lookup");
            return;
        }

        let next = if suggestions.is_empty() {
            MentionState::Idle
        } else {
            MentionState::SuggestionsVisible {
                query,
                suggestions,
                active: None,
            }
        };
        self.state_tx.send_replace(next);
        drop(machine);
    }
}
