use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

/// Module name constants.
///
/// Modules are the unit of permission granularity. They stay plain strings
/// (not an enum) because the matrix is edited at runtime per role x
/// module-name, and the row set must survive adding a module without a
/// schema change.
pub mod modules {
    pub const DASHBOARD: &str = "Dashboard";
    pub const DIVISIONS: &str = "Divisions";
    pub const USERS: &str = "Users";
    pub const PROKERS: &str = "Prokers";
    pub const MESSAGES: &str = "Messages";
    pub const TRANSACTIONS: &str = "Transactions";
    pub const SETTINGS: &str = "Settings";
    pub const PROFILE: &str = "Profile";

    pub const ALL: [&str; 8] = [
        DASHBOARD,
        DIVISIONS,
        USERS,
        PROKERS,
        MESSAGES,
        TRANSACTIONS,
        SETTINGS,
        PROFILE,
    ];
}

/// Action
///
/// The closed set of things a role can be granted on a module. An explicit
/// enum rather than a free string: a caller cannot ask the matrix about an
/// action that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
}

/// PermissionSet
///
/// One matrix cell: the four grant flags a role holds on a single module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PermissionSet {
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

impl PermissionSet {
    pub const NONE: PermissionSet = PermissionSet {
        can_view: false,
        can_create: false,
        can_edit: false,
        can_delete: false,
    };

    pub const FULL: PermissionSet = PermissionSet {
        can_view: true,
        can_create: true,
        can_edit: true,
        can_delete: true,
    };

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::View => self.can_view,
            Action::Create => self.can_create,
            Action::Edit => self.can_edit,
            Action::Delete => self.can_delete,
        }
    }
}

/// Pure read-side permission decision over a role's loaded matrix rows.
///
/// Returns false when no row exists for the module. Enforcement (returning
/// 403) is the caller's job; this only answers the yes/no question.
pub fn has_permission(
    rows: &[crate::models::RolePermission],
    module: &str,
    action: Action,
) -> bool {
    rows.iter()
        .find(|row| row.module_name == module)
        .map(|row| row.permissions().allows(action))
        .unwrap_or(false)
}
