//! Route guard state machine.
//!
//! The guard decides whether a page may render, must redirect, or has to wait
//! for token validation. It performs no I/O; [`GuardDriver`](crate::GuardDriver)
//! runs the validation calls it asks for.

/// Access rule of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Renders for everyone.
    Open,
    /// Login, registration and password pages; signed-in users are sent home.
    PublicOnly,
    /// Requires a valid session.
    Protected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Loading,
    Validating,
    /// Navigation to `target` must happen before anything renders.
    RedirectPending { target: String },
    /// The page may render.
    Settled,
}

/// What the caller should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardAction {
    /// Call the validation endpoint and report back.
    Validate,
    Redirect(String),
    Render,
    /// Nothing to do; a validation is already in flight or the guard is settled.
    Wait,
}

/// Result of one validation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    /// The server rejected the token.
    Invalid,
    /// The server could not answer.
    Unavailable,
}

/// Paths the guard redirects to.
#[derive(Debug, Clone)]
pub struct GuardPaths {
    pub login: String,
    pub home: String,
}

impl Default for GuardPaths {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            home: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    route: RouteKind,
    paths: GuardPaths,
    max_attempts: u8,
    attempts: u8,
    in_flight: bool,
    state: GuardState,
}

impl RouteGuard {
    pub fn new(route: RouteKind, paths: GuardPaths, max_attempts: u8) -> Self {
        Self {
            route,
            paths,
            max_attempts: max_attempts.max(1),
            attempts: 0,
            in_flight: false,
            state: GuardState::Loading,
        }
    }

    pub fn state(&self) -> &GuardState {
        &self.state
    }

    pub fn route(&self) -> RouteKind {
        self.route
    }

    /// Validation calls made since the last mount.
    pub fn attempts(&self) -> u8 {
        self.attempts
    }

    pub fn is_validating(&self) -> bool {
        self.in_flight
    }

    /// Start guarding a route. Resets the attempt budget.
    pub fn mount(&mut self, route: RouteKind, has_token: bool) -> GuardAction {
        self.route = route;
        self.attempts = 0;
        self.in_flight = false;
        self.state = GuardState::Loading;

        if !has_token {
            return self.settle_unauthenticated();
        }
        if route == RouteKind::Open {
            return self.settle();
        }
        self.request_validation()
    }

    /// Ask for a validation call.
    ///
    /// Requests made while one is in flight are coalesced into it. Once the
    /// attempt budget is spent the guard settles as unauthenticated.
    pub fn request_validation(&mut self) -> GuardAction {
        if self.in_flight {
            return GuardAction::Wait;
        }
        if self.attempts >= self.max_attempts {
            return self.settle_unauthenticated();
        }

        self.attempts += 1;
        self.in_flight = true;
        self.state = GuardState::Validating;
        GuardAction::Validate
    }

    /// Feed the result of the validation call.
    pub fn validation_finished(&mut self, outcome: ValidationOutcome) -> GuardAction {
        if !self.in_flight {
            return GuardAction::Wait;
        }
        self.in_flight = false;

        match outcome {
            ValidationOutcome::Valid => match self.route {
                RouteKind::PublicOnly => self.redirect(self.paths.home.clone()),
                RouteKind::Open | RouteKind::Protected => self.settle(),
            },
            ValidationOutcome::Invalid => self.settle_unauthenticated(),
            ValidationOutcome::Unavailable => self.request_validation(),
        }
    }

    /// Forget a validation whose result will never arrive.
    pub fn validation_cancelled(&mut self) {
        self.in_flight = false;
    }

    /// The redirect asked for has happened.
    pub fn redirect_completed(&mut self) {
        if matches!(self.state, GuardState::RedirectPending { .. }) {
            self.state = GuardState::Settled;
        }
    }

    fn settle(&mut self) -> GuardAction {
        self.state = GuardState::Settled;
        GuardAction::Render
    }

    fn redirect(&mut self, target: String) -> GuardAction {
        self.state = GuardState::RedirectPending {
            target: target.clone(),
        };
        GuardAction::Redirect(target)
    }

    fn settle_unauthenticated(&mut self) -> GuardAction {
        match self.route {
            RouteKind::Protected => self.redirect(self.paths.login.clone()),
            RouteKind::Open | RouteKind::PublicOnly => self.settle(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> RouteGuard {
        RouteGuard::new(RouteKind::Protected, GuardPaths::default(), 3)
    }

    #[test]
    fn test_protected_without_token_redirects_to_login() {
        let mut guard = guard();
        let action = guard.mount(RouteKind::Protected, false);
        assert_eq!(action, GuardAction::Redirect("/login".to_string()));
        assert_eq!(
            guard.state(),
            &GuardState::RedirectPending {
                target: "/login".to_string()
            }
        );

        guard.redirect_completed();
        assert_eq!(guard.state(), &GuardState::Settled);
        assert_eq!(guard.attempts(), 0);
    }

    #[test]
    fn test_public_only_with_valid_session_redirects_home() {
        let mut guard = guard();
        assert_eq!(guard.mount(RouteKind::PublicOnly, true), GuardAction::Validate);
        assert_eq!(guard.state(), &GuardState::Validating);

        let action = guard.validation_finished(ValidationOutcome::Valid);
        assert_eq!(action, GuardAction::Redirect("/".to_string()));
    }

    #[test]
    fn test_public_only_without_token_renders() {
        let mut guard = guard();
        assert_eq!(guard.mount(RouteKind::PublicOnly, false), GuardAction::Render);
        assert_eq!(guard.mount(RouteKind::Open, true), GuardAction::Render);
        assert_eq!(guard.attempts(), 0);
    }

    #[test]
    fn test_invalid_token_on_protected_route() {
        let mut guard = guard();
        guard.mount(RouteKind::Protected, true);
        let action = guard.validation_finished(ValidationOutcome::Invalid);
        assert_eq!(action, GuardAction::Redirect("/login".to_string()));
    }

    #[test]
    fn test_validation_requests_are_coalesced() {
        let mut guard = guard();
        assert_eq!(guard.mount(RouteKind::Protected, true), GuardAction::Validate);
        assert_eq!(guard.request_validation(), GuardAction::Wait);
        assert_eq!(guard.request_validation(), GuardAction::Wait);
        assert_eq!(guard.attempts(), 1);

        assert_eq!(guard.validation_finished(ValidationOutcome::Valid), GuardAction::Render);
        assert_eq!(guard.validation_finished(ValidationOutcome::Invalid), GuardAction::Wait);
        assert_eq!(guard.state(), &GuardState::Settled);
    }

    #[test]
    fn test_attempts_are_capped_per_mount() {
        let mut guard = guard();
        assert_eq!(guard.mount(RouteKind::Protected, true), GuardAction::Validate);
        assert_eq!(
            guard.validation_finished(ValidationOutcome::Unavailable),
            GuardAction::Validate
        );
        assert_eq!(
            guard.validation_finished(ValidationOutcome::Unavailable),
            GuardAction::Validate
        );
        assert_eq!(guard.attempts(), 3);

        let action = guard.validation_finished(ValidationOutcome::Unavailable);
        assert_eq!(action, GuardAction::Redirect("/login".to_string()));
        assert_eq!(guard.request_validation(), GuardAction::Redirect("/login".to_string()));
        assert_eq!(guard.attempts(), 3);

        // A new mount gets a fresh budget.
        assert_eq!(guard.mount(RouteKind::Protected, true), GuardAction::Validate);
        assert_eq!(guard.attempts(), 1);
    }
}
