use serde::{Deserialize, Serialize};

use crate::model::Manager;

/// Credential stamped on impersonated identities. It is never checked.
pub const PLACEHOLDER_CREDENTIAL: &str = "doesn't matter";

/// The principal on whose behalf a store write is performed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActingIdentity {
    pub login: String,
    #[serde(skip_serializing, default)]
    pub credential: String,
    pub roles: Vec<String>,
}

impl ActingIdentity {
    pub fn new(login: impl Into<String>, credential: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            login: login.into(),
            credential: credential.into(),
            roles,
        }
    }

    /// Act as `manager` without re-authenticating
    pub fn impersonate(manager: &Manager) -> Self {
        Self::new(
            manager.name.clone(),
            PLACEHOLDER_CREDENTIAL,
            manager.roles.clone(),
        )
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Holder for the identity a caller is currently acting as.
///
/// Each owner keeps its own context and hands `current()` to the store
/// explicitly; nothing here is shared between callers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecurityContext {
    identity: Option<ActingIdentity>,
}

impl SecurityContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an acting identity, replacing any previous one
    pub fn set(&mut self, login: impl Into<String>, credential: impl Into<String>, roles: Vec<String>) {
        self.set_identity(ActingIdentity::new(login, credential, roles));
    }

    pub fn set_identity(&mut self, identity: ActingIdentity) {
        self.identity = Some(identity);
    }

    /// Reset to "no authenticated principal"
    pub fn clear(&mut self) {
        self.identity = None;
    }

    pub fn current(&self) -> Option<&ActingIdentity> {
        self.identity.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{hash_password, ROLE_MANAGER};

    #[test]
    fn test_impersonate_uses_placeholder_credential() {
        let manager = Manager {
            id: 3,
            name: "bharat".to_string(),
            password_hash: hash_password("bharat", "bharat"),
            roles: vec![ROLE_MANAGER.to_string()],
        };

        let identity = ActingIdentity::impersonate(&manager);

        assert_eq!(identity.login, "bharat");
        assert_eq!(identity.credential, PLACEHOLDER_CREDENTIAL);
        assert!(identity.has_role(ROLE_MANAGER));
    }

    #[test]
    fn test_security_context_set_and_clear() {
        let mut ctx = SecurityContext::new();
        assert!(!ctx.is_authenticated());

        ctx.set("test", PLACEHOLDER_CREDENTIAL, vec![ROLE_MANAGER.to_string()]);
        assert_eq!(ctx.current().map(|i| i.login.as_str()), Some("test"));

        ctx.set("baig", PLACEHOLDER_CREDENTIAL, vec![ROLE_MANAGER.to_string()]);
        assert_eq!(ctx.current().map(|i| i.login.as_str()), Some("baig"));

        ctx.clear();
        assert!(ctx.current().is_none());
    }
}
