//! Client-side routes and the admin route guard.
//!
//! The guard is a UX gate only. It reads the locally stored session and never
//! talks to the backend, so every admin-mutating endpoint must still enforce
//! authorization server-side.

use serde::{Deserialize, Serialize};

use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Home,
    Projects,
    Blog,
    Memes,
    Auth,
    Contact,
    Admin,
    AdminLogin,
    NotFound,
}

impl Route {
    pub const ALL: [Route; 8] = [
        Route::Home,
        Route::Projects,
        Route::Blog,
        Route::Memes,
        Route::Auth,
        Route::Contact,
        Route::Admin,
        Route::AdminLogin,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Projects => "/projects",
            Route::Blog => "/blog",
            Route::Memes => "/memes",
            Route::Auth => "/auth",
            Route::Contact => "/contact",
            Route::Admin => "/admin",
            Route::AdminLogin => "/admin/login",
            Route::NotFound => "*",
        }
    }

    /// Match a path against the routing table; unknown paths resolve to `NotFound`.
    pub fn from_path(path: &str) -> Route {
        let trimmed = path.trim();
        let normalized = if trimmed.len() > 1 {
            trimmed.trim_end_matches('/')
        } else {
            trimmed
        };

        Route::ALL
            .iter()
            .copied()
            .find(|route| route.path() == normalized)
            .unwrap_or(Route::NotFound)
    }

    pub fn requires_admin(&self) -> bool {
        matches!(self, Route::Admin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "route", rename_all = "snake_case")]
pub enum GuardDecision {
    Render,
    Redirect(Route),
}

/// Gate in front of the admin area: presence of an access token plus the admin flag.
pub struct AdminGuard;

impl AdminGuard {
    /// No network, no expiry check, no token validation.
    pub fn check(session: &Session) -> GuardDecision {
        if session.is_authenticated() && session.is_admin() {
            GuardDecision::Render
        } else {
            GuardDecision::Redirect(Route::AdminLogin)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "route", rename_all = "snake_case")]
pub enum Navigation {
    Render(Route),
    Redirect(Route),
}

impl Navigation {
    pub fn route(&self) -> Route {
        match self {
            Navigation::Render(route) | Navigation::Redirect(route) => *route,
        }
    }
}

/// Resolve `path` and apply the admin guard when the target needs it.
pub fn navigate(path: &str, session: &Session) -> Navigation {
    let route = Route::from_path(path);

    if !route.requires_admin() {
        return Navigation::Render(route);
    }

    match AdminGuard::check(session) {
        GuardDecision::Render => Navigation::Render(route),
        GuardDecision::Redirect(target) => {
            tracing::debug!(path, "admin route blocked, redirecting to {}", target.path());
            Navigation::Redirect(target)
        }
    }
}
