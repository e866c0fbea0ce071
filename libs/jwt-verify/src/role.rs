use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User role carried in access-token claims and the `users.role` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Customer,
    Vendor,
    Admin,
}

impl Role {
    /// Canonical wire/storage form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "ROLE_CUSTOMER",
            Role::Vendor => "ROLE_VENDOR",
            Role::Admin => "ROLE_ADMIN",
        }
    }

    /// Parse a role name. Case-insensitive; the `ROLE_` prefix may be omitted.
    pub fn parse(s: &str) -> Option<Role> {
        let upper = s.trim().to_ascii_uppercase();
        let name = upper.strip_prefix("ROLE_").unwrap_or(&upper);
        match name {
            "CUSTOMER" => Some(Role::Customer),
            "VENDOR" => Some(Role::Vendor),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or(())
    }
}
