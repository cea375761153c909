use std::sync::{Arc, PoisonError, RwLock};

/// Read access to the current navigation context.
pub trait NavigationContext: Send + Sync + 'static {
    /// Share id of the current page, `""` outside of a shared link.
    fn current_share_id(&self) -> String;
}

impl<F> NavigationContext for F
where
    F: Fn() -> String + Send + Sync + 'static,
{
    fn current_share_id(&self) -> String {
        self()
    }
}

/// The `share` query parameter of the page, updated by the router on navigation.
#[derive(Debug, Clone, Default)]
pub struct ShareContext {
    share: Arc<RwLock<String>>,
}

impl ShareContext {
    pub fn new(share: impl Into<String>) -> Self {
        Self {
            share: Arc::new(RwLock::new(share.into())),
        }
    }

    pub fn set(&self, share: impl Into<String>) {
        *self.share.write().unwrap_or_else(PoisonError::into_inner) = share.into();
    }
}

impl NavigationContext for ShareContext {
    fn current_share_id(&self) -> String {
        self.share
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_context_is_shared_between_clones() {
        let ctx = ShareContext::default();
        let other = ctx.clone();
        assert_eq!(ctx.current_share_id(), "");

        other.set("abc");
        assert_eq!(ctx.current_share_id(), "abc");
    }

    #[test]
    fn closures_are_navigation_contexts() {
        let ctx = || "s1".to_string();
        assert_eq!(ctx.current_share_id(), "s1");
    }
}
