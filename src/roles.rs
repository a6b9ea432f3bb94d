use std::fmt;

use crate::error::{QaError, QaResult};

pub const FALLBACK_DASHBOARD: &str = "/dashboard";
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    IqaLead,
    EqaAuditor,
    Trainer,
    Admin,
}

pub const ALL_ROLES: [Role; 4] = [Role::IqaLead, Role::EqaAuditor, Role::Trainer, Role::Admin];

const IQA_LEAD_PERMISSIONS: &[&str] = &[
    "view_dashboard",
    "view_assessments",
    "sample_assessments",
    "view_portfolios",
    "verify_portfolios",
    "comment_portfolios",
    "view_audit_trail",
    "view_metrics",
    "generate_reports",
];

const EQA_AUDITOR_PERMISSIONS: &[&str] = &[
    "view_dashboard",
    "view_assessments",
    "view_portfolios",
    "comment_portfolios",
    "view_audit_trail",
    "view_metrics",
    "schedule_audits",
    "generate_reports",
];

const ADMIN_PERMISSIONS: &[&str] = &[WILDCARD];

const TRAINER_PERMISSIONS: &[&str] = &[
    "view_dashboard",
    "view_assessments",
    "view_portfolios",
    "comment_portfolios",
];

impl Role {
    /// Resolves a role key such as `IQA_LEAD`. Case and surrounding whitespace are ignored.
    pub fn parse(key: &str) -> Option<Role> {
        let key = key.trim();
        ALL_ROLES
            .into_iter()
            .find(|role| role.key().eq_ignore_ascii_case(key))
    }

    pub fn key(&self) -> &'static str {
        match self {
            Role::IqaLead => "IQA_LEAD",
            Role::EqaAuditor => "EQA_AUDITOR",
            Role::Trainer => "TRAINER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn permissions(&self) -> &'static [&'static str] {
        match self {
            Role::IqaLead => IQA_LEAD_PERMISSIONS,
            Role::EqaAuditor => EQA_AUDITOR_PERMISSIONS,
            Role::Trainer => TRAINER_PERMISSIONS,
            Role::Admin => ADMIN_PERMISSIONS,
        }
    }

    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::IqaLead => "/iqa/dashboard",
            Role::EqaAuditor => "/eqa/dashboard",
            Role::Trainer => "/trainer/dashboard",
            Role::Admin => "/admin/dashboard",
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        let list = self.permissions();
        list.contains(&WILDCARD) || list.contains(&permission)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Unknown role keys hold no permissions.
pub fn has_permission(role_key: &str, permission: &str) -> bool {
    Role::parse(role_key)
        .map(|role| role.has_permission(permission))
        .unwrap_or(false)
}

pub fn dashboard_path(role_key: &str) -> &'static str {
    Role::parse(role_key)
        .map(|role| role.dashboard_path())
        .unwrap_or(FALLBACK_DASHBOARD)
}

/// Gates a command on `permission` when a role is configured; no role means no gate.
pub fn require(role_key: Option<&str>, permission: &str) -> QaResult<()> {
    match role_key {
        Some(key) if !has_permission(key, permission) => {
            tracing::warn!(role = key, permission, "permission denied");
            Err(QaError::PermissionDenied {
                role: key.to_string(),
                permission: permission.to_string(),
            })
        }
        _ => Ok(()),
    }
}
