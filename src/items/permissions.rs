//! # Permissions
//!
//! Role-derived visibility filters. The items service asks the policy once
//! per operation; the policy never sees hook output and never touches storage.
//!
//! ## Invariants
//! - No silent bypass: only an explicit bypass flag skips the policy
//! - A returned filter is ANDed with the caller's filter, never ORed
//! - No matching grant is a denial, never an empty result

use serde::{Deserialize, Serialize};

use crate::core::{Accountability, CoreError, CoreResult, LifecycleEvent};
use crate::query::Filter;

/// Placeholder in rule filters replaced by the caller's user id
pub const CURRENT_USER: &str = "$CURRENT_USER";

/// Source of row-level visibility filters
pub trait PermissionPolicy: Send + Sync {
    /// Filter restricting which rows `accountability` may act on
    ///
    /// `Ok(None)` is unrestricted access. `Err(Unauthorized)` or
    /// `Err(PermissionDenied)` means no access at all.
    fn visibility_filter(
        &self,
        collection: &str,
        action: LifecycleEvent,
        accountability: &Accountability,
    ) -> CoreResult<Option<Filter>>;
}

/// Policy granting everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionPolicy for AllowAll {
    fn visibility_filter(
        &self,
        _collection: &str,
        _action: LifecycleEvent,
        _accountability: &Accountability,
    ) -> CoreResult<Option<Filter>> {
        Ok(None)
    }
}

/// One grant
///
/// A rule without a role is public and applies to every caller, anonymous
/// ones included. `collection: "*"` matches every collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRule {
    pub collection: String,

    #[serde(default)]
    pub role: Option<String>,

    /// Granted actions: `create`, `read`, `update`, `delete`
    pub actions: Vec<LifecycleEvent>,

    /// Row filter; absent means every row
    #[serde(default)]
    pub filter: Option<Filter>,
}

impl PermissionRule {
    pub fn new(collection: impl Into<String>, actions: impl IntoIterator<Item = LifecycleEvent>) -> Self {
        Self {
            collection: collection.into(),
            role: None,
            actions: actions.into_iter().collect(),
            filter: None,
        }
    }

    pub fn for_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    fn applies(&self, collection: &str, action: LifecycleEvent, accountability: &Accountability) -> bool {
        if self.collection != "*" && self.collection != collection {
            return false;
        }
        if !self.actions.contains(&action) {
            return false;
        }
        match &self.role {
            None => true,
            Some(role) => accountability.has_role(role),
        }
    }
}

/// Config-driven policy: an administrator role plus per-role grants
#[derive(Debug, Clone)]
pub struct RolePolicy {
    admin_role: String,
    rules: Vec<PermissionRule>,
}

impl RolePolicy {
    pub fn new(admin_role: impl Into<String>, rules: Vec<PermissionRule>) -> Self {
        Self {
            admin_role: admin_role.into(),
            rules,
        }
    }

    pub fn admin_role(&self) -> &str {
        &self.admin_role
    }

    pub fn rules(&self) -> &[PermissionRule] {
        &self.rules
    }
}

impl PermissionPolicy for RolePolicy {
    fn visibility_filter(
        &self,
        collection: &str,
        action: LifecycleEvent,
        accountability: &Accountability,
    ) -> CoreResult<Option<Filter>> {
        if accountability.has_role(&self.admin_role) {
            return Ok(None);
        }

        let matching: Vec<&PermissionRule> = self
            .rules
            .iter()
            .filter(|r| r.applies(collection, action, accountability))
            .collect();

        if matching.is_empty() {
            if !accountability.is_authenticated() {
                return Err(CoreError::Unauthorized);
            }
            return Err(CoreError::permission_denied(format!(
                "{} on {}",
                action.action(),
                collection
            )));
        }

        // any unfiltered grant opens every row
        if matching.iter().any(|r| r.filter.is_none()) {
            return Ok(None);
        }

        let user_id = accountability.user_id().map(|id| id.to_string());
        let filters = matching
            .iter()
            .filter_map(|r| r.filter.as_ref())
            .map(|f| f.resolve_placeholders(user_id.as_deref()))
            .collect();

        Ok(Filter::any(filters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RoleRef, UserRef};
    use serde_json::json;
    use uuid::Uuid;

    fn user(role: &str) -> Accountability {
        Accountability::authenticated(UserRef::new(Uuid::new_v4()), RoleRef::new(role))
    }

    fn policy() -> RolePolicy {
        RolePolicy::new(
            "administrator",
            vec![
                PermissionRule::new("posts", [LifecycleEvent::Read])
                    .with_filter(Filter::eq("status", "published")),
                PermissionRule::new("posts", [LifecycleEvent::Read, LifecycleEvent::Update])
                    .for_role("editor")
                    .with_filter(Filter::eq("author", CURRENT_USER)),
                PermissionRule::new("*", [LifecycleEvent::Read]).for_role("auditor"),
            ],
        )
    }

    #[test]
    fn test_admin_unrestricted() {
        let filter = policy()
            .visibility_filter("posts", LifecycleEvent::Delete, &user("administrator"))
            .unwrap();
        assert!(filter.is_none());
    }

    #[test]
    fn test_anonymous_without_grant_is_unauthorized() {
        let result = policy().visibility_filter("posts", LifecycleEvent::Create, &Accountability::anonymous());
        assert!(matches!(result, Err(CoreError::Unauthorized)));
    }

    #[test]
    fn test_authenticated_without_grant_is_denied() {
        let result = policy().visibility_filter("posts", LifecycleEvent::Delete, &user("editor"));
        assert!(matches!(result, Err(CoreError::PermissionDenied(_))));
    }

    #[test]
    fn test_public_rule_for_anonymous() {
        let filter = policy()
            .visibility_filter("posts", LifecycleEvent::Read, &Accountability::anonymous())
            .unwrap()
            .unwrap();
        assert_eq!(filter, Filter::eq("status", "published"));
    }

    #[test]
    fn test_filters_are_disjoined_and_resolved() {
        let acc = user("editor");
        let filter = policy()
            .visibility_filter("posts", LifecycleEvent::Read, &acc)
            .unwrap()
            .unwrap();

        let expected_user = acc.user_id().unwrap().to_string();
        assert_eq!(
            filter.into_value(),
            json!({"_or": [{"status": "published"}, {"author": expected_user}]})
        );
    }

    #[test]
    fn test_unfiltered_grant_wins() {
        let filter = policy()
            .visibility_filter("comments", LifecycleEvent::Read, &user("auditor"))
            .unwrap();
        assert!(filter.is_none());
    }

    #[test]
    fn test_rule_from_config() {
        let rule: PermissionRule = serde_json::from_value(json!({
            "collection": "posts",
            "role": "editor",
            "actions": ["read", "update"],
            "filter": "{\"author\":\"$CURRENT_USER\"}"
        }))
        .unwrap();

        assert_eq!(rule.actions, vec![LifecycleEvent::Read, LifecycleEvent::Update]);
        assert_eq!(rule.filter, Some(Filter::eq("author", CURRENT_USER)));
    }
}
