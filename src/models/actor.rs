use serde::{Deserialize, Serialize};

/// Platform-level role of the authenticated actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    #[default]
    Member,
    Admin,
}

impl ActorRole {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "member" | "user" | "" => Some(ActorRole::Member),
            "admin" | "super_admin" => Some(ActorRole::Admin),
            _ => None,
        }
    }
}

/// Who is acting, as supplied by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub role: ActorRole,
    /// Business currently selected in the client, if any.
    pub active_business: Option<String>,
}

impl Actor {
    pub fn member(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: ActorRole::Member,
            active_business: None,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: ActorRole::Admin,
            active_business: None,
        }
    }

    pub fn with_business(mut self, business_id: impl Into<String>) -> Self {
        self.active_business = Some(business_id.into());
        self
    }

    pub fn is_elevated(&self) -> bool {
        self.role == ActorRole::Admin
    }
}

/// Role inside one business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Worker,
    Manager,
    Owner,
}

impl MemberRole {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            MemberRole::Worker => "worker",
            MemberRole::Manager => "manager",
            MemberRole::Owner => "owner",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "worker" => Some(MemberRole::Worker),
            "manager" => Some(MemberRole::Manager),
            "owner" => Some(MemberRole::Owner),
            _ => None,
        }
    }

    pub fn can_manage(&self) -> bool {
        matches!(self, MemberRole::Manager | MemberRole::Owner)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub business_id: String,
    pub user_id: String,
    pub role: MemberRole,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub display_name: String,
}
