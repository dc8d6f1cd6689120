//! Navigation guard and the console's route table.
//!
//! The guard only looks at whether a token is present; it never validates the
//! token itself (that is the session probe's job).

pub const HOME_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const APP_NAME: &str = "Jing Admin";

/// Per-destination flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub title: Option<&'static str>,
    pub requires_auth: bool,
    pub requires_guest: bool,
}

impl RouteMeta {
    pub const fn protected(title: &'static str) -> Self {
        Self {
            title: Some(title),
            requires_auth: true,
            requires_guest: false,
        }
    }

    pub const fn guest(title: &'static str) -> Self {
        Self {
            title: Some(title),
            requires_auth: false,
            requires_guest: true,
        }
    }

    pub const fn public(title: &'static str) -> Self {
        Self {
            title: Some(title),
            requires_auth: false,
            requires_guest: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    Proceed,
    Redirect(&'static str),
}

/// Decide whether a navigation may proceed.
pub fn guard(meta: &RouteMeta, is_authenticated: bool) -> NavigationDecision {
    if meta.requires_guest && is_authenticated {
        return NavigationDecision::Redirect(HOME_PATH);
    }
    if meta.requires_auth && !is_authenticated {
        return NavigationDecision::Redirect(LOGIN_PATH);
    }
    NavigationDecision::Proceed
}

/// Window title for a destination.
pub fn document_title(meta: &RouteMeta) -> String {
    match meta.title {
        Some(title) => format!("{title} - {APP_NAME}"),
        None => APP_NAME.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub name: &'static str,
    pub meta: RouteMeta,
}

const CONSOLE_ROUTES: &[Route] = &[
    Route { path: "/", name: "home", meta: RouteMeta::protected("Dashboard") },
    Route { path: "/about", name: "about", meta: RouteMeta::public("About") },
    Route { path: "/profile", name: "profile", meta: RouteMeta::protected("Profile") },
    Route { path: "/users", name: "user-list", meta: RouteMeta::protected("Users") },
    Route { path: "/users/roles", name: "roles", meta: RouteMeta::protected("Roles") },
    Route { path: "/users/permissions", name: "permissions", meta: RouteMeta::protected("Permissions") },
    Route { path: "/system/config", name: "system-config", meta: RouteMeta::protected("System Settings") },
    Route { path: "/system/logs", name: "operation-logs", meta: RouteMeta::protected("Operation Logs") },
    Route { path: "/system/backup", name: "data-backup", meta: RouteMeta::protected("Data Backup") },
    Route { path: "/analytics", name: "analytics", meta: RouteMeta::protected("Analytics") },
    Route { path: "/login", name: "login", meta: RouteMeta::guest("Sign In") },
];

const NOT_FOUND: Route = Route {
    path: "*",
    name: "not-found",
    meta: RouteMeta::public("Page Not Found"),
};

/// Static route table of the console.
#[derive(Debug, Clone, Copy)]
pub struct RouteTable {
    routes: &'static [Route],
}

impl RouteTable {
    pub const fn console() -> Self {
        Self {
            routes: CONSOLE_ROUTES,
        }
    }

    pub fn routes(&self) -> &'static [Route] {
        self.routes
    }

    /// Resolve a path (query string and trailing slash ignored); unknown
    /// paths resolve to the not-found page.
    pub fn resolve(&self, path: &str) -> &'static Route {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        self.routes
            .iter()
            .find(|route| route.path == path)
            .unwrap_or(&NOT_FOUND)
    }

    /// Resolve and guard in one step.
    pub fn navigate(&self, path: &str, is_authenticated: bool) -> NavigationDecision {
        let route = self.resolve(path);
        let decision = guard(&route.meta, is_authenticated);
        tracing::debug!(path, route = route.name, is_authenticated, ?decision, "route guard");
        decision
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::console()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guest_pages_bounce_signed_in_users_home() {
        let meta = RouteMeta::guest("Sign In");
        assert_eq!(guard(&meta, true), NavigationDecision::Redirect(HOME_PATH));
        assert_eq!(guard(&meta, false), NavigationDecision::Proceed);
    }

    #[test]
    fn protected_pages_require_a_token() {
        let meta = RouteMeta::protected("Users");
        assert_eq!(guard(&meta, false), NavigationDecision::Redirect(LOGIN_PATH));
        assert_eq!(guard(&meta, true), NavigationDecision::Proceed);
    }

    #[test]
    fn public_pages_always_proceed() {
        let meta = RouteMeta::default();
        assert_eq!(guard(&meta, false), NavigationDecision::Proceed);
        assert_eq!(guard(&meta, true), NavigationDecision::Proceed);
    }

    #[test]
    fn resolves_paths() {
        let table = RouteTable::console();
        assert_eq!(table.resolve("/users/roles/").name, "roles");
        assert_eq!(table.resolve("/users?page=2").name, "user-list");
        assert_eq!(table.resolve("").name, "home");
        assert_eq!(table.resolve("/nope").name, "not-found");
    }

    #[test]
    fn navigate_applies_guard() {
        let table = RouteTable::console();
        assert_eq!(
            table.navigate("/system/logs", false),
            NavigationDecision::Redirect(LOGIN_PATH)
        );
        assert_eq!(table.navigate("/login", true), NavigationDecision::Redirect(HOME_PATH));
        assert_eq!(table.navigate("/missing", false), NavigationDecision::Proceed);
    }

    #[test]
    fn titles() {
        assert_eq!(document_title(&RouteMeta::protected("Users")), "Users - Jing Admin");
        assert_eq!(document_title(&RouteMeta::default()), "Jing Admin");
    }
}
