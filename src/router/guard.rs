use std::sync::Arc;

use crate::auth::TokenStore;

use super::Route;

/// Outcome of one navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Permit,
    RedirectToLogin,
    RedirectToChat,
}

impl GuardDecision {
    /// Where the navigation is sent instead, if anywhere.
    pub fn redirect_target(self) -> Option<Route> {
        match self {
            Self::Permit => None,
            Self::RedirectToLogin => Some(Route::Login),
            Self::RedirectToChat => Some(Route::Chat),
        }
    }
}

/// Navigation interceptor deciding permit/redirect from token presence.
///
/// Presence is all it checks: a stale token passes here and is only caught
/// by the first real request that comes back `401`.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    tokens: Arc<TokenStore>,
}

impl RouteGuard {
    pub fn new(tokens: Arc<TokenStore>) -> Self {
        Self { tokens }
    }

    /// The decision table. Total and synchronous.
    pub fn decide(target: Route, is_authenticated: bool) -> GuardDecision {
        if target.requires_auth() && !is_authenticated {
            GuardDecision::RedirectToLogin
        } else if target == Route::Login && is_authenticated {
            GuardDecision::RedirectToChat
        } else {
            GuardDecision::Permit
        }
    }

    /// Decide for `target` against the current token store.
    pub fn check(&self, target: Route) -> GuardDecision {
        Self::decide(target, self.tokens.has_stored_token())
    }
}
