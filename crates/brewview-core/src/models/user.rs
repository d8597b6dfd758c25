use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Username the server assigns to unauthenticated sessions.
pub const ANONYMOUS_USERNAME: &str = "anonymous";

/// Built-in administrator account.
pub const ADMIN_USERNAME: &str = "admin";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Preferences {
    #[serde(default)]
    pub theme: Option<String>,
}

/// A role grants permissions directly and through the roles nested under it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Role {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_roles(mut self, roles: Vec<Role>) -> Self {
        self.roles = roles;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct User {
    #[serde(default)]
    pub id: Option<String>,
    pub username: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Effective permissions, filled in from `roles` after the user loads.
    #[serde(skip)]
    pub permissions: BTreeSet<String>,
    #[serde(default)]
    pub preferences: Preferences,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.username == ANONYMOUS_USERNAME
    }

    /// Protected accounts cannot be edited or deleted from the console.
    pub fn is_protected(&self) -> bool {
        self.username == ADMIN_USERNAME || self.username == ANONYMOUS_USERNAME
    }

    pub fn theme(&self) -> Option<&str> {
        self.preferences.theme.as_deref()
    }
}

/// Result of a user load: the user plus whether a password change is pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct LoginPayload {
    pub user: User,
    #[serde(rename = "pwChangeRequired", default)]
    pub pw_change_required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenPair {
    pub token: String,
    #[serde(default)]
    pub refresh: Option<String>,
}
