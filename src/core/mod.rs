//! # Core Module
//!
//! Data types shared by every layer: the accountability carried with each
//! call, the operation context threaded through hook pipelines, collection
//! schemas, and the unified error taxonomy.

pub mod accountability;
pub mod context;
pub mod error;
pub mod schema;

pub use accountability::{Accountability, RoleRef, UserRef};
pub use context::{ContextPatch, Data, Item, ItemId, LifecycleEvent, OperationContext};
pub use error::{CoreError, CoreResult};
pub use schema::{CollectionSchema, SchemaRef, SchemaRegistry};
