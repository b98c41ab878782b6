//! Authenticated caller identity.
//!
//! Registration, login, and credential checks happen upstream; by the
//! time a request reaches these services the edge has already resolved
//! the account and its role. This module only carries the result.

use serde::{Deserialize, Serialize};

use crate::ids::AccountId;

/// Role attached to an authenticated account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Back-office user; sees every order and every notification.
    Admin,
    /// Shop customer; scoped to their own orders and notifications.
    Customer,
}

impl Role {
    /// Parses a role name as sent by the edge, case-insensitively.
    pub fn parse(s: &str) -> Option<Role> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "customer" | "client" => Some(Role::Customer),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Customer => write!(f, "customer"),
        }
    }
}

/// An authenticated caller, as delivered by the upstream edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub account_id: AccountId,
    pub role: Role,
}

impl Identity {
    pub fn new(account_id: AccountId, role: Role) -> Self {
        Self { account_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
