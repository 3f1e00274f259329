//! Runs a [`RouteGuard`] against a live [`SessionStore`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::SessionError;
use crate::guard::{GuardAction, GuardPaths, GuardState, RouteGuard, RouteKind, ValidationOutcome};
use crate::store::SessionStore;

/// Drives the guard for one mounted page.
///
/// Each navigation schedules at most one delayed validation. Navigating
/// again or unmounting cancels it, and any outcome it still produces is
/// dropped.
pub struct GuardDriver {
    store: Arc<SessionStore>,
    guard: Arc<Mutex<RouteGuard>>,
    /// Bumped under the guard lock whenever a scheduled validation is cancelled.
    generation: Arc<AtomicU64>,
    delay: Duration,
    states: Arc<watch::Sender<GuardState>>,
    pending: Option<JoinHandle<()>>,
}

fn lock(guard: &Mutex<RouteGuard>) -> MutexGuard<'_, RouteGuard> {
    guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl GuardDriver {
    pub fn new(
        store: Arc<SessionStore>,
        paths: GuardPaths,
        delay: Duration,
        max_attempts: u8,
    ) -> Self {
        let (states, _) = watch::channel(GuardState::Loading);
        Self {
            store,
            guard: Arc::new(Mutex::new(RouteGuard::new(
                RouteKind::Open,
                paths,
                max_attempts,
            ))),
            generation: Arc::new(AtomicU64::new(0)),
            delay,
            states: Arc::new(states),
            pending: None,
        }
    }

    /// Watch guard state changes.
    pub fn subscribe(&self) -> watch::Receiver<GuardState> {
        self.states.subscribe()
    }

    pub fn state(&self) -> GuardState {
        lock(&self.guard).state().clone()
    }

    /// Validation calls made since the last navigation.
    pub fn attempts(&self) -> u8 {
        lock(&self.guard).attempts()
    }

    /// Mount the guard on a new route.
    pub async fn navigate(&mut self, route: RouteKind) -> GuardAction {
        self.cancel();
        let has_token = self.store.has_token().await;

        let action = {
            let mut guard = lock(&self.guard);
            let action = guard.mount(route, has_token);
            self.states.send_replace(guard.state().clone());
            action
        };

        if action == GuardAction::Validate {
            self.schedule();
        }
        action
    }

    /// Ask for another validation; coalesced with one already running.
    pub fn revalidate(&mut self) -> GuardAction {
        let action = {
            let mut guard = lock(&self.guard);
            let action = guard.request_validation();
            self.states.send_replace(guard.state().clone());
            action
        };

        if action == GuardAction::Validate {
            self.schedule();
        }
        action
    }

    /// The page is going away.
    pub fn unmount(&mut self) {
        self.cancel();
    }

    /// Report that the redirect asked for has been followed.
    pub fn redirect_completed(&self) {
        let mut guard = lock(&self.guard);
        guard.redirect_completed();
        self.states.send_replace(guard.state().clone());
    }

    fn schedule(&mut self) {
        let store = self.store.clone();
        let guard = self.guard.clone();
        let generation = self.generation.clone();
        let scheduled = generation.load(Ordering::SeqCst);
        let states = self.states.clone();
        let delay = self.delay;

        self.pending = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(delay).await;

                let outcome = match store.validate().await {
                    Ok(_) => ValidationOutcome::Valid,
                    Err(SessionError::SessionInvalid | SessionError::NotAuthenticated) => {
                        ValidationOutcome::Invalid
                    }
                    Err(e) => {
                        warn!("Session validation failed: {}", e);
                        ValidationOutcome::Unavailable
                    }
                };
                debug!(?outcome, "Session validated");

                match apply_outcome(&guard, &generation, scheduled, &states, outcome) {
                    Some(GuardAction::Validate) => {}
                    _ => break,
                }
            }
        }));
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            let mut guard = lock(&self.guard);
            self.generation.fetch_add(1, Ordering::SeqCst);
            if !handle.is_finished() {
                debug!("Cancelling scheduled validation");
                handle.abort();
                guard.validation_cancelled();
            }
        }
    }
}

/// Feed an outcome to the guard unless its validation was cancelled.
///
/// Returns `None` for outcomes of an older mount.
fn apply_outcome(
    guard: &Mutex<RouteGuard>,
    generation: &AtomicU64,
    scheduled: u64,
    states: &watch::Sender<GuardState>,
    outcome: ValidationOutcome,
) -> Option<GuardAction> {
    let mut guard = lock(guard);
    if generation.load(Ordering::SeqCst) != scheduled {
        debug!(?outcome, "Dropping outcome of a cancelled validation");
        return None;
    }
    let action = guard.validation_finished(outcome);
    states.send_replace(guard.state().clone());
    Some(action)
}

impl Drop for GuardDriver {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiClient;
    use crate::persistence::MemorySessionPersistence;
    use crate::types::{StoredSession, UserProfile};

    async fn signed_in_driver(delay: Duration) -> GuardDriver {
        let session = StoredSession {
            token: "token-1".to_string(),
            user: UserProfile {
                id: "user-1".to_string(),
                company_id: "company-1".to_string(),
                name: "Dr. Lima".to_string(),
                email: "lima@clinic.com".to_string(),
                role: "ADMIN".to_string(),
                profession: "PHYSICIAN".to_string(),
                registration_number: None,
            },
        };
        let store = Arc::new(SessionStore::new(
            ApiClient::new("http://127.0.0.1:9").unwrap(),
            Arc::new(MemorySessionPersistence::with_session(session)),
        ));
        assert!(store.restore().await.unwrap());
        GuardDriver::new(store, GuardPaths::default(), delay, 3)
    }

    #[tokio::test]
    async fn test_outcome_from_previous_mount_is_dropped() {
        let mut driver = signed_in_driver(Duration::from_secs(3600)).await;

        assert_eq!(driver.navigate(RouteKind::Protected).await, GuardAction::Validate);
        let first_mount = driver.generation.load(Ordering::SeqCst);

        assert_eq!(driver.navigate(RouteKind::PublicOnly).await, GuardAction::Validate);
        assert_eq!(driver.state(), GuardState::Validating);

        // A result for the protected page lands after the navigation.
        let applied = apply_outcome(
            &driver.guard,
            &driver.generation,
            first_mount,
            &driver.states,
            ValidationOutcome::Invalid,
        );
        assert_eq!(applied, None);
        assert_eq!(driver.state(), GuardState::Validating);
        assert!(lock(&driver.guard).is_validating());
        assert_eq!(driver.attempts(), 1);

        // The current mount still accepts its own result.
        let current = driver.generation.load(Ordering::SeqCst);
        let applied = apply_outcome(
            &driver.guard,
            &driver.generation,
            current,
            &driver.states,
            ValidationOutcome::Valid,
        );
        assert_eq!(applied, Some(GuardAction::Redirect("/".to_string())));
        assert_eq!(
            driver.state(),
            GuardState::RedirectPending {
                target: "/".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unmount_drops_late_outcome() {
        let mut driver = signed_in_driver(Duration::from_secs(3600)).await;
        driver.navigate(RouteKind::Protected).await;
        let scheduled = driver.generation.load(Ordering::SeqCst);

        driver.unmount();
        assert!(!lock(&driver.guard).is_validating());

        let applied = apply_outcome(
            &driver.guard,
            &driver.generation,
            scheduled,
            &driver.states,
            ValidationOutcome::Invalid,
        );
        assert_eq!(applied, None);
        assert_eq!(driver.state(), GuardState::Validating);
    }
}
