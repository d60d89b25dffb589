//! Configuration
//!
//! Loaded from a single JSON file. Every section is optional:
//!
//! ```json
//! {
//!   "server": { "host": "0.0.0.0", "port": 8056, "cors_origins": [] },
//!   "log_level": "info",
//!   "bulk": { "max_concurrency": 16 },
//!   "permissions": {
//!     "admin_role": "administrator",
//!     "rules": [{ "collection": "posts", "actions": ["read"],
//!                 "filter": { "status": "published" } }]
//!   },
//!   "tokens": [{ "token": "secret", "user": { "id": "…" }, "role": { "name": "editor" } }],
//!   "collections": [{ "name": "posts", "fields": ["title", "status"] }]
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bulk::coordinator::DEFAULT_MAX_CONCURRENCY;
use crate::core::{
    Accountability, CollectionSchema, CoreError, CoreResult, RoleRef, SchemaRegistry, UserRef,
};
use crate::http_server::{HttpServerConfig, StaticTokenResolver};
use crate::items::{PermissionRule, RolePolicy};
use crate::observability::Severity;

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: HttpServerConfig,

    /// Minimum severity written to the log (default: info)
    #[serde(default)]
    pub log_level: Severity,

    #[serde(default)]
    pub bulk: BulkConfig,

    #[serde(default)]
    pub permissions: PermissionsConfig,

    /// Static bearer tokens
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,

    /// Declared collections; undeclared ones accept any field
    #[serde(default)]
    pub collections: Vec<CollectionSchema>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkConfig {
    /// Item updates in flight across all bulk requests (default: 16)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionsConfig {
    /// Role with unrestricted access (default: "administrator")
    #[serde(default = "default_admin_role")]
    pub admin_role: String,

    #[serde(default)]
    pub rules: Vec<PermissionRule>,
}

fn default_admin_role() -> String {
    "administrator".to_string()
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            admin_role: default_admin_role(),
            rules: Vec::new(),
        }
    }
}

/// Role named by a token entry; the id is derived when omitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConfig {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
}

/// One bearer token and the caller it stands for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub token: String,
    pub user: UserRef,
    #[serde(default)]
    pub role: Option<RoleConfig>,
}

impl Config {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CoreError::configuration(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> CoreResult<Self> {
        let config: Config = serde_json::from_str(content)
            .map_err(|e| CoreError::configuration(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CoreResult<()> {
        self.server.bind_addr()?;

        if self.bulk.max_concurrency == 0 {
            return Err(CoreError::configuration("bulk.max_concurrency must be > 0"));
        }

        if self.permissions.admin_role.trim().is_empty() {
            return Err(CoreError::configuration("permissions.admin_role must not be empty"));
        }

        for rule in &self.permissions.rules {
            if rule.collection.trim().is_empty() {
                return Err(CoreError::configuration("permission rule without a collection"));
            }
            if rule.actions.is_empty() {
                return Err(CoreError::configuration(format!(
                    "permission rule for {} grants no actions",
                    rule.collection
                )));
            }
            if let Some(filter) = &rule.filter {
                filter
                    .validate()
                    .map_err(|e| CoreError::configuration(format!("{}: {}", rule.collection, e)))?;
            }
        }

        let mut seen = HashSet::new();
        for entry in &self.tokens {
            if entry.token.trim().is_empty() {
                return Err(CoreError::configuration("token must not be empty"));
            }
            if !seen.insert(entry.token.as_str()) {
                return Err(CoreError::configuration("token listed twice"));
            }
        }

        self.schema_registry()?;
        Ok(())
    }

    pub fn schema_registry(&self) -> CoreResult<SchemaRegistry> {
        SchemaRegistry::from_schemas(self.collections.iter().cloned())
    }

    pub fn policy(&self) -> RolePolicy {
        RolePolicy::new(
            self.permissions.admin_role.clone(),
            self.permissions.rules.clone(),
        )
    }

    /// Token table; roles named without an id share one generated id
    pub fn token_resolver(&self) -> StaticTokenResolver {
        let mut role_ids: HashMap<&str, Uuid> = HashMap::new();
        let mut resolver = StaticTokenResolver::new();

        for entry in &self.tokens {
            let role = entry.role.as_ref().map(|r| RoleRef {
                id: r
                    .id
                    .unwrap_or_else(|| *role_ids.entry(r.name.as_str()).or_insert_with(Uuid::new_v4)),
                name: r.name.clone(),
            });
            let accountability = Accountability::new(Some(entry.user.clone()), role);
            resolver = resolver.with_token(entry.token.clone(), accountability);
        }
        resolver
    }
}
