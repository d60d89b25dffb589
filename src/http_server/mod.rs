//! # HTTP Server Module
//!
//! The HTTP boundary: accountability resolution, JSON errors, generic item
//! routes and the listener.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/items/*` - Generic item CRUD
//! - extension routes mounted through the endpoint registrar

pub mod accountability;
pub mod config;
pub mod errors;
pub mod health_routes;
pub mod items_routes;
pub mod server;

pub use accountability::{
    resolve_accountability, AccountabilityResolver, RequestAccountability, StaticTokenResolver,
};
pub use config::HttpServerConfig;
pub use errors::{ApiError, ErrorResponse};
pub use health_routes::health_routes;
pub use items_routes::{items_routes, ItemsQueryParams};
pub use server::{cors_layer, HttpServer};
