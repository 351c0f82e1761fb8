//! Client-side routes and the navigation guard.

pub mod guard;

pub use guard::{GuardDecision, RouteGuard};

use std::sync::Arc;

use parking_lot::RwLock;
use strum::{Display, EnumIter, IntoEnumIterator};
use tracing::{debug, warn};

use crate::auth::TokenStore;
use crate::client::Navigator;
use crate::error::{ClientError, Result};

/// Upper bound on redirects followed for one navigation.
const MAX_REDIRECTS: usize = 4;

/// The application's views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Route {
    Root,
    Login,
    Chat,
    Terms,
    Privacy,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Self::Root => "/",
            Self::Login => "/login",
            Self::Chat => "/chat",
            Self::Terms => "/terms",
            Self::Privacy => "/privacy",
        }
    }

    /// Static route metadata.
    pub fn requires_auth(self) -> bool {
        matches!(self, Self::Chat)
    }

    /// Unconditional route-level redirect, applied before the guard.
    pub fn redirect(self) -> Option<Route> {
        match self {
            Self::Root => Some(Self::Login),
            _ => None,
        }
    }

    /// Match a location, ignoring query, fragment and a trailing slash.
    pub fn from_path(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        Route::iter().find(|route| route.path() == normalized)
    }
}

/// Result of a navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    pub requested: Route,
    pub resolved: Route,
}

impl Navigation {
    pub fn redirected(&self) -> bool {
        self.requested != self.resolved
    }
}

/// Tracks the current view and runs every transition through the guard.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use aichat::auth::TokenStore;
/// use aichat::router::{Route, Router};
///
/// let router = Router::new(Arc::new(TokenStore::in_memory()));
/// let nav = router.navigate("/chat")?;
/// assert_eq!(nav.resolved, Route::Login);
/// # Ok::<(), aichat::error::ClientError>(())
/// ```
#[derive(Debug)]
pub struct Router {
    guard: RouteGuard,
    current: RwLock<Route>,
}

impl Router {
    /// A router resting where `/` resolves: the login view when anonymous.
    pub fn new(tokens: Arc<TokenStore>) -> Self {
        let guard = RouteGuard::new(tokens);
        let start = Self::resolve(&guard, Route::Root);
        Self {
            guard,
            current: RwLock::new(start),
        }
    }

    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }

    pub fn current(&self) -> Route {
        *self.current.read()
    }

    /// Navigate to a path. Unknown paths leave the location unchanged.
    pub fn navigate(&self, path: &str) -> Result<Navigation> {
        let route = Route::from_path(path).ok_or_else(|| ClientError::RouteNotFound(path.to_string()))?;
        Ok(self.navigate_to(route))
    }

    pub fn navigate_to(&self, requested: Route) -> Navigation {
        let resolved = Self::resolve(&self.guard, requested);
        *self.current.write() = resolved;
        debug!(requested = %requested, resolved = %resolved, "navigated");
        Navigation {
            requested,
            resolved,
        }
    }

    fn resolve(guard: &RouteGuard, requested: Route) -> Route {
        let mut resolved = requested;
        for _ in 0..MAX_REDIRECTS {
            let next = resolved
                .redirect()
                .or_else(|| guard.check(resolved).redirect_target());
            match next {
                Some(target) => resolved = target,
                None => break,
            }
        }
        resolved
    }
}

impl Navigator for Router {
    fn current_path(&self) -> String {
        self.current().path().to_string()
    }

    fn redirect(&self, path: &str) {
        if let Err(err) = self.navigate(path) {
            warn!(path, error = %err, "redirect failed");
        }
    }
}
