use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Roles known to the LMS
///
/// Role strings are matched exactly ("Student", not "student"), the same
/// literals the login flow writes into the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Student,
    Presenter,
    Mentor,
    Manager,
    Admin,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Student,
        Role::Presenter,
        Role::Mentor,
        Role::Manager,
        Role::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Presenter => "Presenter",
            Role::Mentor => "Mentor",
            Role::Manager => "Manager",
            Role::Admin => "Admin",
        }
    }

    /// Roles whose major operations are parked for review
    pub fn is_restricted(&self) -> bool {
        matches!(self, Role::Student | Role::Presenter | Role::Mentor)
    }

    /// Roles allowed to approve or reject pending requests
    pub fn can_review(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}
