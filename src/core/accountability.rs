//! Accountability
//!
//! Identity, role and permission-bypass flag attached to every operation.
//! A context is immutable once built; elevation produces a new value.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference to the authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl UserRef {
    /// Create a user reference with only an ID
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            email: None,
            first_name: None,
            last_name: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }
}

/// Reference to the role the user acts under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    pub id: Uuid,
    pub name: String,
}

impl RoleRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// Accountability context carried with each operation
///
/// Absence of `user` means the operation is unauthenticated. Handlers must
/// treat both `user` and `role` as optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accountability {
    #[serde(default)]
    user: Option<UserRef>,
    #[serde(default)]
    role: Option<RoleRef>,
    #[serde(default)]
    bypass_permissions: bool,
}

impl Accountability {
    /// Create a context for an (optionally) authenticated caller
    pub fn new(user: Option<UserRef>, role: Option<RoleRef>) -> Self {
        Self {
            user,
            role,
            bypass_permissions: false,
        }
    }

    /// Create a context for an authenticated user acting under a role
    pub fn authenticated(user: UserRef, role: RoleRef) -> Self {
        Self::new(Some(user), Some(role))
    }

    /// Create an unauthenticated context
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Create a context for internal, system-initiated calls
    pub fn system() -> Self {
        Self {
            user: None,
            role: None,
            bypass_permissions: true,
        }
    }

    /// Copy of this context with permission checks bypassed
    pub fn elevated(&self) -> Self {
        self.with_bypass(true)
    }

    /// Copy of this context with the bypass flag set explicitly
    pub fn with_bypass(&self, bypass_permissions: bool) -> Self {
        Self {
            bypass_permissions,
            ..self.clone()
        }
    }

    pub fn user(&self) -> Option<&UserRef> {
        self.user.as_ref()
    }

    pub fn role(&self) -> Option<&RoleRef> {
        self.role.as_ref()
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user.as_ref().map(|u| u.id)
    }

    pub fn role_name(&self) -> Option<&str> {
        self.role.as_ref().map(|r| r.name.as_str())
    }

    pub fn bypass_permissions(&self) -> bool {
        self.bypass_permissions
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Check whether the caller acts under the named role
    pub fn has_role(&self, name: &str) -> bool {
        self.role_name() == Some(name)
    }
}
