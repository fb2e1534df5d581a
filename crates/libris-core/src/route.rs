//! Route guarding.

use crate::session::SessionState;

/// Access class of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAccess {
    /// Renders regardless of session state (login, register)
    Public,
    /// Requires an authenticated session (catalog, borrows, recommendations)
    Protected,
}

/// Outcome of a navigation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// The requested view may render
    Render,
    /// The requested view is protected and no session exists
    RedirectToLogin,
}

/// Decides whether a view may render.
///
/// A pure function of the session state and the view's access class,
/// applied synchronously on every navigation. There is no asynchronous
/// check against the server; the session state machine is the single
/// source of truth.
pub fn authorize(state: &SessionState, access: ViewAccess) -> RouteDecision {
    match (access, state) {
        (ViewAccess::Public, _) => RouteDecision::Render,
        (ViewAccess::Protected, SessionState::Authenticated(_)) => RouteDecision::Render,
        (ViewAccess::Protected, SessionState::Anonymous) => RouteDecision::RedirectToLogin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::User;

    #[test]
    fn test_protected_requires_authentication() {
        assert_eq!(
            authorize(&SessionState::Anonymous, ViewAccess::Protected),
            RouteDecision::RedirectToLogin
        );
        assert_eq!(
            authorize(
                &SessionState::Authenticated(User::new("alice")),
                ViewAccess::Protected
            ),
            RouteDecision::Render
        );
    }

    #[test]
    fn test_public_always_renders() {
        assert_eq!(
            authorize(&SessionState::Anonymous, ViewAccess::Public),
            RouteDecision::Render
        );
        assert_eq!(
            authorize(
                &SessionState::Authenticated(User::new("alice")),
                ViewAccess::Public
            ),
            RouteDecision::Render
        );
    }
}
