//! Single-flight coordination of token refreshes
//!
//! At most one refresh request is in flight. The first caller becomes the
//! leader and performs the network call; callers arriving meanwhile queue a
//! oneshot sender and wait for the leader's outcome. The leader's guard resets
//! the flag and drains the queue when it is dropped, which covers success,
//! failure, panics and a cancelled leader future alike.

use std::sync::{Mutex, PoisonError};
use tokio::sync::oneshot;

/// Outcome of a refresh: the new access token, or `None` on failure
pub(crate) type RefreshOutcome = Option<String>;

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    pending: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Refresh flag plus queue of waiting callers.
///
/// The mutex is only held for flag and queue bookkeeping, never across an
/// `.await`.
#[derive(Default)]
pub(crate) struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

/// Role handed to a caller of [`RefreshCoordinator::begin`]
pub(crate) enum RefreshTicket<'a> {
    /// Caller must perform the refresh and report through the guard
    Leader(RefreshGuard<'a>),
    /// A refresh is already running; await its outcome
    Follower(oneshot::Receiver<RefreshOutcome>),
}

impl RefreshCoordinator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Join the in-flight refresh or start a new one
    pub(crate) fn begin(&self) -> RefreshTicket<'_> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.pending.push(tx);
            RefreshTicket::Follower(rx)
        } else {
            state.refreshing = true;
            RefreshTicket::Leader(RefreshGuard {
                coordinator: self,
                outcome: None,
            })
        }
    }

    #[cfg(test)]
    pub(crate) fn is_refreshing(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .refreshing
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len()
    }
}

/// Held by the leader for the duration of the refresh
pub(crate) struct RefreshGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    outcome: RefreshOutcome,
}

impl RefreshGuard<'_> {
    /// Publish the outcome to every waiter and return to idle
    pub(crate) fn complete(mut self, outcome: RefreshOutcome) {
        self.outcome = outcome;
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        let waiters = {
            let mut state = self
                .coordinator
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            state.refreshing = false;
            std::mem::take(&mut state.pending)
        };

        for waiter in waiters {
            // A waiter that gave up has dropped its receiver
            let _ = waiter.send(self.outcome.clone());
        }
    }
}

/// Await a follower ticket; a vanished leader counts as failure
pub(crate) async fn wait_for_outcome(rx: oneshot::Receiver<RefreshOutcome>) -> RefreshOutcome {
    rx.await.unwrap_or(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leader(coordinator: &RefreshCoordinator) -> RefreshGuard<'_> {
        match coordinator.begin() {
            RefreshTicket::Leader(guard) => guard,
            RefreshTicket::Follower(_) => panic!("expected to lead"),
        }
    }

    fn follower(coordinator: &RefreshCoordinator) -> oneshot::Receiver<RefreshOutcome> {
        match coordinator.begin() {
            RefreshTicket::Follower(rx) => rx,
            RefreshTicket::Leader(_) => panic!("expected to follow"),
        }
    }

    #[tokio::test]
    async fn test_followers_receive_leader_token() {
        let coordinator = RefreshCoordinator::new();
        let guard = leader(&coordinator);
        let first = follower(&coordinator);
        let second = follower(&coordinator);
        assert_eq!(coordinator.pending_len(), 2);

        guard.complete(Some("new-token".to_string()));

        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.pending_len(), 0);
        assert_eq!(wait_for_outcome(first).await.as_deref(), Some("new-token"));
        assert_eq!(wait_for_outcome(second).await.as_deref(), Some("new-token"));
    }

    #[tokio::test]
    async fn test_failure_releases_followers() {
        let coordinator = RefreshCoordinator::new();
        let guard = leader(&coordinator);
        let waiter = follower(&coordinator);

        guard.complete(None);

        assert_eq!(wait_for_outcome(waiter).await, None);
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_dropped_leader_releases_followers() {
        let coordinator = RefreshCoordinator::new();
        let guard = leader(&coordinator);
        let waiter = follower(&coordinator);

        drop(guard);

        assert_eq!(wait_for_outcome(waiter).await, None);
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_new_refresh_after_completion() {
        let coordinator = RefreshCoordinator::new();
        leader(&coordinator).complete(Some("one".to_string()));

        let guard = leader(&coordinator);
        assert!(coordinator.is_refreshing());
        guard.complete(Some("two".to_string()));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_abandoned_follower_does_not_block_drain() {
        let coordinator = RefreshCoordinator::new();
        let guard = leader(&coordinator);
        drop(follower(&coordinator));
        let kept = follower(&coordinator);

        guard.complete(Some("token".to_string()));
        assert_eq!(wait_for_outcome(kept).await.as_deref(), Some("token"));
    }
}
