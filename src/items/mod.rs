//! # Items Module
//!
//! Accountability-aware CRUD over schema-described collections. The
//! `ItemsService` wraps every storage call in the hook pipeline and the
//! permission policy; nothing else in the crate talks to storage.

pub mod permissions;
pub mod service;
pub mod services;
pub mod storage;

pub use permissions::{AllowAll, PermissionPolicy, PermissionRule, RolePolicy, CURRENT_USER};
pub use service::{ItemsService, UpdateOptions};
pub use services::{ServiceOptions, Services};
pub use storage::{InMemoryStorage, StorageBackend, StorageError, StorageFuture, StorageResult};
