//! hdx-core: transport-agnostic core of the HDX gateway.
//!
//! Holds the pieces every layer shares: the structured error type, the
//! configuration store, tenants and their cache, resource modules and their
//! registry, and the per-request connection context.

pub mod clock;
pub mod config;
pub mod context;
pub mod errors;
pub mod module;
pub mod registry;
pub mod request;
pub mod store;
pub mod tenant;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{HdxConfig, HdxConfigSnapshot};
pub use context::{ConnectionContext, Identity, ResponseBuffer};
pub use errors::{ErrorKind, HdxError, HdxResult};
pub use module::{ModuleCapabilities, Reply, ResourceModule, Verb};
pub use registry::ModuleRegistry;
pub use request::{route_from_path, GatewayRequest};
pub use store::{StoreError, StoreResult};
pub use tenant::{domain_from_host, Tenant, TenantResolver, TenantStore};
