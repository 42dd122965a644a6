use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::Id;

/// Role granted to every account that may own trackers
pub const ROLE_MANAGER: &str = "ROLE_MANAGER";

/// A persisted manager account. Trackers are attributed to managers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manager {
    pub id: Id,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub roles: Vec<String>,
}

impl Manager {
    /// Check a plain-text password against the stored hash
    pub fn verify_password(&self, password: &str) -> bool {
        self.password_hash == hash_password(&self.name, password)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Manager attributes before the store assigns an identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewManager {
    pub name: String,
    pub password: String,
    pub roles: Vec<String>,
}

impl NewManager {
    pub fn new(name: impl Into<String>, password: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            roles,
        }
    }

    /// Manager with the single `ROLE_MANAGER` role
    pub fn with_manager_role(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(name, password, vec![ROLE_MANAGER.to_string()])
    }

    /// Hash of the plain-text password, salted with the login
    pub fn password_hash(&self) -> String {
        hash_password(&self.name, &self.password)
    }
}

/// SHA-256 over `name:password`, hex encoded
pub fn hash_password(name: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Owner reference carried by a tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerRef {
    pub id: Id,
    pub name: String,
}

impl From<&Manager> for ManagerRef {
    fn from(manager: &Manager) -> Self {
        Self {
            id: manager.id,
            name: manager.name.clone(),
        }
    }
}
