//! Portal roster entries

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortalRole {
    Admin,
    User,
    Query,
}

impl PortalRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortalRole::Admin => "admin",
            PortalRole::User => "user",
            PortalRole::Query => "query",
        }
    }
}

/// One card on the portal grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalAccount {
    pub username: String,
    pub role: PortalRole,
    /// Landing page the card navigates to
    pub page: String,
    pub label: String,
    /// Department account a query account reports on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_user: Option<String>,
}

/// `?role=` filter on the roster; absent or `all` means every account
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleFilter {
    #[serde(default)]
    pub role: Option<String>,
}
