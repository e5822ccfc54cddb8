//! Navigation hook invoked on unrecoverable authentication failure

/// Collaborator notified when the session is gone and the user must
/// re-authenticate.
///
/// The client calls [`redirect_to_login`](Navigator::redirect_to_login)
/// exactly once per failed refresh episode, after clearing the credential
/// store. What "redirecting" means is up to the embedder: a desktop app
/// swaps views, the CLI prints a hint, a daemon might emit an event.
pub trait Navigator: Send + Sync {
    /// Sends the user to the unauthenticated entry point.
    fn redirect_to_login(&self);
}

/// Navigator that does nothing.
///
/// For embedders that act on the returned errors alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn redirect_to_login(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_noop_navigator_usable_as_trait_object() {
        let navigator: Arc<dyn Navigator> = Arc::new(NoopNavigator);
        navigator.redirect_to_login();
    }
}
