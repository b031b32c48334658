use serde::{Deserialize, Serialize};

/// User role, used for display only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Sales,
    Factory,
    Logistics,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Sales => "sales",
            Role::Factory => "factory",
            Role::Logistics => "logistics",
            Role::Viewer => "viewer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "sales" => Some(Role::Sales),
            "factory" => Some(Role::Factory),
            "logistics" => Some(Role::Logistics),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }
}

/// User profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Option<i64>,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub created_ts: i64,
    pub modified_ts: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_conversion() {
        for role in [Role::Admin, Role::Sales, Role::Factory, Role::Logistics, Role::Viewer] {
            assert_eq!(Role::from_str(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_str("owner"), None);
    }
}
