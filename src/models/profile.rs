use serde::{Deserialize, Serialize};

use super::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }
}

/// One profile per account; the document id is the account id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub last_active_at: Option<String>,
}

impl Record for Profile {
    const TABLE: &'static str = "profiles";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_teacher_or_above(&self) -> bool {
        matches!(self.role, Role::Teacher | Role::Admin)
    }

    /// Teachers manage their own courses; admins manage every course.
    pub fn can_manage(&self, teacher_id: &str) -> bool {
        self.is_admin() || (self.role == Role::Teacher && self.id == teacher_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}
