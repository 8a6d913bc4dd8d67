//! Acting-user providers for audit fields.

/// Environment variable read by [`EnvIdentity`].
pub const USER_ENV_VAR: &str = "INSPECTION_LINEAGE_USER";

/// Supplies the id of the user performing an operation.
pub trait IdentityProvider: Send + Sync {
    /// `None` when nobody is signed in.
    fn current_user_id(&self) -> Option<String>;
}

/// A fixed acting user, or nobody.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<String>);

impl StaticIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self(Some(user_id.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Reads the acting user from `INSPECTION_LINEAGE_USER` on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvIdentity;

impl IdentityProvider for EnvIdentity {
    fn current_user_id(&self) -> Option<String> {
        std::env::var(USER_ENV_VAR)
            .ok()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
    }
}
