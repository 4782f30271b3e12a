use serde::{Deserialize, Serialize};

/// Session role from `[session] role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Compare sources and read the checklist.
    Viewer,
    /// Viewer plus QC runs.
    Operator,
    /// Operator plus mother-DB candidate management.
    #[default]
    Engineer,
    /// Everything, including checklist edits and migrations.
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Viewer => write!(f, "viewer"),
            Role::Operator => write!(f, "operator"),
            Role::Engineer => write!(f, "engineer"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// What the current session may do. Resolved once at startup and handed to
/// each command explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionCapabilities {
    pub can_manage_mother_db: bool,
    pub can_run_qc: bool,
    pub can_edit_checklist: bool,
}

impl SessionCapabilities {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Viewer => Self::none(),
            Role::Operator => Self {
                can_run_qc: true,
                ..Self::none()
            },
            Role::Engineer => Self {
                can_manage_mother_db: true,
                can_run_qc: true,
                can_edit_checklist: false,
            },
            Role::Admin => Self::all(),
        }
    }

    pub fn none() -> Self {
        Self {
            can_manage_mother_db: false,
            can_run_qc: false,
            can_edit_checklist: false,
        }
    }

    pub fn all() -> Self {
        Self {
            can_manage_mother_db: true,
            can_run_qc: true,
            can_edit_checklist: true,
        }
    }
}
