//! crates/labsync_core/src/guard.rs
//!
//! Gates a view behind a minimum role.

use crate::domain::Role;
use crate::session::SessionSnapshot;

pub const LOGIN_PATH: &str = "/login";

/// What a guarded view should show for a given session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The session has not resolved yet. Show a neutral spinner, never a refusal.
    Loading,
    Denied { required: Role, login_path: &'static str },
    Allowed,
}

/// The rendered result of a guard: either a placeholder state or the protected content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome<T> {
    Loading,
    Denied { required: Role, login_path: &'static str },
    Content(T),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteGuard {
    pub required: Role,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self {
            required: Role::Assistant,
        }
    }
}

impl RouteGuard {
    pub fn new(required: Role) -> Self {
        Self { required }
    }

    pub fn evaluate(&self, session: &SessionSnapshot) -> GuardDecision {
        if session.loading {
            GuardDecision::Loading
        } else if session.has_role(self.required) {
            GuardDecision::Allowed
        } else {
            GuardDecision::Denied {
                required: self.required,
                login_path: LOGIN_PATH,
            }
        }
    }

    /// Builds the protected subtree only when access is allowed.
    pub fn render<T>(&self, session: &SessionSnapshot, subtree: impl FnOnce() -> T) -> GuardOutcome<T> {
        match self.evaluate(session) {
            GuardDecision::Loading => GuardOutcome::Loading,
            GuardDecision::Denied {
                required,
                login_path,
            } => GuardOutcome::Denied {
                required,
                login_path,
            },
            GuardDecision::Allowed => GuardOutcome::Content(subtree()),
        }
    }
}

impl GuardDecision {
    /// The access-restricted message shown on denial.
    pub fn denial_message(&self) -> Option<String> {
        match self {
            GuardDecision::Denied { required, .. } => Some(format!(
                "You need to be logged in as {} or higher to access this page.",
                required
            )),
            _ => None,
        }
    }
}
