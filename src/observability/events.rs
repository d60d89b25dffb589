//! Observable events
//!
//! Every log line the service emits names one of these.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Hook registry
    HookRegistered,
    HookUnregistered,
    RegistrySealed,

    // Pipeline
    /// A handler failed and the core operation was skipped
    PipelineAborted,
    /// A handler deliberately short-circuited the core operation
    PipelineVetoed,

    // Items
    /// Row-level check refused a write
    ItemWriteDenied,

    // Bulk
    BulkComplete,

    // Startup
    ConfigLoaded,
    ExtensionLoaded,
    RoutesMounted,
    ServerStart,
    ServerError,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::HookRegistered => "HOOK_REGISTERED",
            Event::HookUnregistered => "HOOK_UNREGISTERED",
            Event::RegistrySealed => "REGISTRY_SEALED",
            Event::PipelineAborted => "PIPELINE_ABORTED",
            Event::PipelineVetoed => "PIPELINE_VETOED",
            Event::ItemWriteDenied => "ITEM_WRITE_DENIED",
            Event::BulkComplete => "BULK_COMPLETE",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ExtensionLoaded => "EXTENSION_LOADED",
            Event::RoutesMounted => "ROUTES_MOUNTED",
            Event::ServerStart => "SERVER_START",
            Event::ServerError => "SERVER_ERROR",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::HookRegistered | Event::HookUnregistered => Severity::Trace,
            Event::PipelineAborted | Event::ItemWriteDenied => Severity::Warn,
            Event::ServerError => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
