//! Single-flight coordination of credential refresh
//!
//! When several in-flight requests all come back 401 at once, only one of
//! them may exchange the refresh token: most refresh-token schemes rotate
//! the token on use, so a second concurrent exchange would invalidate the
//! first one's new pair and cascade into spurious logouts. This module
//! makes the exchange a critical section with wait/notify release.
//!
//! The first caller to arrive becomes the *leader* and receives a
//! [`RefreshPermit`]; everyone arriving while the refresh is in flight
//! becomes a *follower* and suspends on a oneshot receiver. The leader
//! performs the network exchange, persists the new pair, and then
//! completes the permit, which delivers the outcome to every follower in
//! arrival order and resets the coordinator to idle.
//!
//! Queued followers are released only after the new credentials are
//! persisted, so no replayed request can race ahead of the store update.

use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;

use crate::error::AuthRelayError;

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// Why a refresh episode failed.
///
/// Cloneable so one failure can fan out to every queued waiter; each
/// waiter converts it into its own [`AuthRelayError`] via
/// [`into_error`](RefreshFailure::into_error).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshFailure {
    /// No refresh token was stored when the episode began.
    MissingToken,

    /// The refresh endpoint rejected the exchange, could not be reached,
    /// or the leader was dropped before delivering an outcome.
    Rejected(String),
}

impl RefreshFailure {
    /// Converts the failure into the error surfaced to callers.
    pub fn into_error(self) -> AuthRelayError {
        match self {
            RefreshFailure::MissingToken => AuthRelayError::NoRefreshToken,
            RefreshFailure::Rejected(message) => AuthRelayError::RefreshExhausted(message),
        }
    }
}

/// What a refresh episode produced: the new access token, or the failure
/// shared by everyone who waited on it.
pub type RefreshOutcome = std::result::Result<String, RefreshFailure>;

// ---------------------------------------------------------------------------
// RefreshCoordinator
// ---------------------------------------------------------------------------

struct RefreshState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Arbiter ensuring at most one credential refresh is in flight.
///
/// One coordinator exists per client session, owned by the client and
/// never shared globally. The waiter queue is non-empty only while a
/// refresh is in flight, and both flag and queue are reset at the end of
/// every episode regardless of outcome.
///
/// # Examples
///
/// ```
/// use authrelay::auth::coordinator::{RefreshCoordinator, RefreshRole};
///
/// let coordinator = RefreshCoordinator::new();
///
/// // The first caller becomes the leader and must deliver the outcome.
/// let RefreshRole::Leader(permit) = coordinator.begin_or_wait() else {
///     unreachable!()
/// };
/// assert!(coordinator.refresh_in_flight());
///
/// // Callers arriving during the episode wait for the leader's outcome.
/// let RefreshRole::Follower(mut waiter) = coordinator.begin_or_wait() else {
///     unreachable!()
/// };
///
/// permit.complete(Ok("fresh_access".to_string()));
/// assert_eq!(waiter.try_recv().unwrap(), Ok("fresh_access".to_string()));
/// assert!(!coordinator.refresh_in_flight());
/// ```
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

/// The role handed to a caller that hit an expired credential.
pub enum RefreshRole<'a> {
    /// This caller starts the refresh and must complete the permit.
    Leader(RefreshPermit<'a>),

    /// A refresh is already in flight; await the receiver for its outcome.
    Follower(oneshot::Receiver<RefreshOutcome>),
}

impl RefreshCoordinator {
    /// Creates an idle coordinator.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RefreshState {
                in_flight: false,
                waiters: Vec::new(),
            }),
        }
    }

    /// Joins the current refresh episode, starting one if none is active.
    ///
    /// The single mutual-exclusion point of the protocol: exactly one
    /// caller per episode observes `in_flight == false` and flips it.
    ///
    /// # Returns
    ///
    /// [`RefreshRole::Leader`] if this caller must perform the refresh,
    /// [`RefreshRole::Follower`] with a receiver otherwise.
    ///
    /// # Examples
    ///
    /// A follower awaits the leader's outcome:
    ///
    /// ```
    /// # use authrelay::auth::coordinator::{RefreshCoordinator, RefreshRole};
    /// # tokio_test::block_on(async {
    /// let coordinator = RefreshCoordinator::new();
    /// let RefreshRole::Leader(permit) = coordinator.begin_or_wait() else {
    ///     unreachable!()
    /// };
    /// let RefreshRole::Follower(waiter) = coordinator.begin_or_wait() else {
    ///     unreachable!()
    /// };
    ///
    /// permit.complete(Ok("fresh".to_string()));
    /// assert_eq!(waiter.await.unwrap(), Ok("fresh".to_string()));
    /// # });
    /// ```
    pub fn begin_or_wait(&self) -> RefreshRole<'_> {
        let mut state = self.lock_state();
        if state.in_flight {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            tracing::debug!(
                queued = state.waiters.len(),
                "refresh already in flight, queueing request"
            );
            RefreshRole::Follower(rx)
        } else {
            state.in_flight = true;
            RefreshRole::Leader(RefreshPermit {
                coordinator: self,
                delivered: false,
            })
        }
    }

    /// Whether a refresh episode is currently active.
    pub fn refresh_in_flight(&self) -> bool {
        self.lock_state().in_flight
    }

    /// Delivers the outcome to every waiter in arrival order and returns
    /// the coordinator to idle. Runs exactly once per episode.
    fn finish(&self, outcome: RefreshOutcome) {
        let mut state = self.lock_state();
        let released = state.waiters.len();
        for waiter in state.waiters.drain(..) {
            // A waiter whose task has gone away simply misses the outcome.
            let _ = waiter.send(outcome.clone());
        }
        state.in_flight = false;

        match &outcome {
            Ok(_) => tracing::info!(released, "refresh succeeded, queued requests released"),
            Err(failure) => {
                tracing::warn!(released, ?failure, "refresh failed, queued requests rejected")
            }
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RefreshState> {
        // A poisoned lock still holds consistent state: the critical
        // sections never unwind between the flag and queue updates.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// RefreshPermit
// ---------------------------------------------------------------------------

/// Exclusive right to perform the in-flight refresh.
///
/// The episode terminates when [`complete`](RefreshPermit::complete) is
/// called. If the permit is dropped without completing (the leader's task
/// failed or was cancelled mid-exchange), every waiter is failed and the
/// coordinator returns to idle rather than staying wedged with the flag
/// set.
pub struct RefreshPermit<'a> {
    coordinator: &'a RefreshCoordinator,
    delivered: bool,
}

impl RefreshPermit<'_> {
    /// Delivers the episode's outcome to all waiters and ends the episode.
    pub fn complete(mut self, outcome: RefreshOutcome) {
        self.delivered = true;
        self.coordinator.finish(outcome);
    }
}

impl Drop for RefreshPermit<'_> {
    fn drop(&mut self) {
        if !self.delivered {
            tracing::warn!("refresh abandoned before completion, failing queued requests");
            self.coordinator.finish(Err(RefreshFailure::Rejected(
                "refresh abandoned before completion".to_string(),
            )));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
