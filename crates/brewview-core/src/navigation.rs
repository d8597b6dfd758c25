//! Authorization checks for console views.
//!
//! Views are identified by [`View`]; each carries the permissions that let a
//! user enter it. [`NavigationGate::check`] is consulted on every navigation.

use tracing::debug;

use crate::auth::{Session, WILDCARD_PERMISSION};
use crate::catalog::SystemCatalog;
use crate::models::{System, User};

/// Permissions a caller needs; any one of them is enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Required<'a> {
    One(&'a str),
    Any(&'a [&'a str]),
}

impl<'a> Required<'a> {
    fn contains(&self, permission: &str) -> bool {
        match self {
            Required::One(p) => *p == permission,
            Required::Any(ps) => ps.iter().any(|p| *p == permission),
        }
    }
}

impl<'a> From<&'a str> for Required<'a> {
    fn from(permission: &'a str) -> Self {
        Required::One(permission)
    }
}

impl<'a> From<&'a [&'a str]> for Required<'a> {
    fn from(permissions: &'a [&'a str]) -> Self {
        Required::Any(permissions)
    }
}

impl<'a, const N: usize> From<&'a [&'a str; N]> for Required<'a> {
    fn from(permissions: &'a [&'a str; N]) -> Self {
        Required::Any(permissions.as_slice())
    }
}

/// Whether `user` holds any of `required`.
///
/// With authorization disabled everyone passes; with it enabled a missing
/// user never does, and `bg-all` grants everything.
pub fn has_permission<'a>(auth_enabled: bool, user: Option<&User>, required: impl Into<Required<'a>>) -> bool {
    if !auth_enabled {
        return true;
    }
    let Some(user) = user else {
        return false;
    };
    if user.permissions.contains(WILDCARD_PERMISSION) {
        return true;
    }
    let required = required.into();
    user.permissions.iter().any(|p| required.contains(p))
}

/// Console views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Landing,
    Login,
    About,
    Systems,
    /// Looks a system up by id, then shows it like [`View::System`].
    SystemById,
    System,
    Command,
    Commands,
    Jobs,
    JobCreate,
    Job,
    Requests,
    Request,
    Queues,
    SystemAdmin,
    UserAdmin,
    RoleAdmin,
    RoleCreate,
    Role,
}

impl View {
    pub const ALL: [View; 19] = [
        View::Landing,
        View::Login,
        View::About,
        View::Systems,
        View::SystemById,
        View::System,
        View::Command,
        View::Commands,
        View::Jobs,
        View::JobCreate,
        View::Job,
        View::Requests,
        View::Request,
        View::Queues,
        View::SystemAdmin,
        View::UserAdmin,
        View::RoleAdmin,
        View::RoleCreate,
        View::Role,
    ];

    /// Route pattern, relative to the namespace for namespaced views.
    pub fn path(&self) -> &'static str {
        match self {
            View::Landing => "/",
            View::Login => "/login",
            View::About => "/about",
            View::Systems => "/systems",
            View::SystemById => "/systems/:id",
            View::System => "/systems/:systemName/:systemVersion",
            View::Command => "/systems/:systemName/:systemVersion/commands/:commandName",
            View::Commands => "/commands",
            View::Jobs => "/jobs",
            View::JobCreate => "/jobs/create",
            View::Job => "/jobs/:id",
            View::Requests => "/requests",
            View::Request => "/requests/:requestId",
            View::Queues => "/admin/queues",
            View::SystemAdmin => "/admin/systems",
            View::UserAdmin => "/admin/users",
            View::RoleAdmin => "/admin/roles",
            View::RoleCreate => "/admin/roles/add",
            View::Role => "/admin/roles/:name",
        }
    }

    /// Views that live under `/<namespace>`. Login, landing and the user and
    /// role admin pages do not.
    pub fn is_namespaced(&self) -> bool {
        !matches!(
            self,
            View::Landing | View::Login | View::UserAdmin | View::RoleAdmin | View::RoleCreate | View::Role
        )
    }

    /// Empty means the view is public.
    pub fn required_permissions(&self) -> &'static [&'static str] {
        match self {
            View::Landing | View::Login | View::About => &[],
            View::Systems | View::SystemById | View::System => &["bg-system-read"],
            View::Command | View::Commands => &["bg-command-read"],
            View::Jobs | View::Job => &["bg-job-read"],
            View::JobCreate => &["bg-job-create"],
            View::Requests | View::Request => &["bg-request-read"],
            View::Queues => &["bg-queue-read"],
            View::SystemAdmin => &["bg-system-update", "bg-instance-update"],
            View::UserAdmin => &["bg-user-read"],
            View::RoleAdmin | View::Role => &["bg-role-read"],
            View::RoleCreate => &["bg-role-create"],
        }
    }

    pub fn is_public(&self) -> bool {
        self.required_permissions().is_empty()
    }

    /// Resolve a path given relative to the namespace (e.g. `/jobs/42`),
    /// ignoring whether the view is namespaced. Use [`Route::resolve`] for
    /// full console paths.
    pub fn from_path(path: &str) -> Option<View> {
        best_match(&segments(path), View::ALL.iter().copied()).map(|(view, _)| view)
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Literal segments matched and captured parameters, if `pattern` fits.
fn match_pattern(pattern: &str, path: &[&str]) -> Option<(usize, Vec<(String, String)>)> {
    let pattern = segments(pattern);
    if pattern.len() != path.len() {
        return None;
    }
    let mut literals = 0;
    let mut params = Vec::new();
    for (p, s) in pattern.iter().zip(path) {
        if let Some(name) = p.strip_prefix(':') {
            params.push((name.to_string(), s.to_string()));
        } else if p == s {
            literals += 1;
        } else {
            return None;
        }
    }
    Some((literals, params))
}

/// Literal segments win over parameters, so `/jobs/create` is
/// [`View::JobCreate`] and not a job with id `create`.
fn best_match(
    path: &[&str],
    views: impl Iterator<Item = View>,
) -> Option<(View, Vec<(String, String)>)> {
    let mut best: Option<(View, usize, Vec<(String, String)>)> = None;
    for view in views {
        if let Some((literals, params)) = match_pattern(view.path(), path) {
            if best.as_ref().map(|(_, n, _)| literals > *n).unwrap_or(true) {
                best = Some((view, literals, params));
            }
        }
    }
    best.map(|(view, _, params)| (view, params))
}

/// A console path resolved to its view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub view: View,
    pub namespace: Option<String>,
    params: Vec<(String, String)>,
}

impl Route {
    /// Resolve a full console path such as `/default/systems/echo/1.0.0`.
    ///
    /// Namespaced views need a leading segment naming one of `namespaces`;
    /// `/<namespace>` alone is the landing page. Unknown namespaces resolve to
    /// nothing.
    pub fn resolve(path: &str, namespaces: &[String]) -> Option<Route> {
        let path = segments(path);

        let global = View::ALL.iter().copied().filter(|v| !v.is_namespaced());
        if let Some((view, params)) = best_match(&path, global) {
            return Some(Route {
                view,
                namespace: None,
                params,
            });
        }

        let (namespace, rest) = path.split_first()?;
        if !namespaces.iter().any(|n| n == namespace) {
            debug!(namespace = %namespace, "Unknown namespace in path");
            return None;
        }
        let namespace = Some(namespace.to_string());
        if rest.is_empty() {
            return Some(Route {
                view: View::Landing,
                namespace,
                params: Vec::new(),
            });
        }

        let scoped = View::ALL.iter().copied().filter(View::is_namespaced);
        best_match(rest, scoped).map(|(view, params)| Route {
            view,
            namespace,
            params,
        })
    }

    /// Value of a `:name` segment.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The system a system route points at, looked up in `catalog`.
    pub fn system<'c>(&self, catalog: &'c SystemCatalog) -> Option<&'c System> {
        match self.view {
            View::SystemById => catalog.find_by_id(self.param("id")?),
            View::System | View::Command => {
                catalog.find(self.param("systemName")?, self.param("systemVersion")?)
            }
            _ => None,
        }
    }
}

/// Outcome of a navigation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    RedirectToLogin,
    Forbidden,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NavigationGate;

impl NavigationGate {
    pub fn check(&self, view: View, session: &Session, auth_enabled: bool) -> Access {
        if !auth_enabled || view.is_public() {
            return Access::Allow;
        }
        if !session.is_authenticated {
            debug!(view = ?view, "Navigation needs login");
            return Access::RedirectToLogin;
        }
        if has_permission(auth_enabled, session.user(), view.required_permissions()) {
            Access::Allow
        } else {
            debug!(view = ?view, user = ?session.username(), "Navigation forbidden");
            Access::Forbidden
        }
    }
}
