use std::collections::BTreeSet;

use crate::models::Role;

/// Permission that grants everything. Honored by the authorization check,
/// never expanded here.
pub const WILDCARD_PERMISSION: &str = "bg-all";

/// Flatten a role hierarchy into `(role names, permissions)`.
///
/// Nested roles are walked depth-first; duplicates collapse. A role name seen
/// once is not expanded again, so a cyclic catalog still terminates.
pub fn coalesce_permissions(roles: &[Role]) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut role_names = BTreeSet::new();
    let mut permissions = BTreeSet::new();

    let mut stack: Vec<&Role> = roles.iter().rev().collect();
    while let Some(role) = stack.pop() {
        if !role_names.insert(role.name.clone()) {
            continue;
        }
        permissions.extend(role.permissions.iter().cloned());
        stack.extend(role.roles.iter().rev());
    }

    (role_names, permissions)
}
