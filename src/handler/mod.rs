//! Handler module - endpoint registration, resolution and invocation context.
//!
//! Provides:
//! - [`EndpointRegistry`] - the whitelist mapping operation names to endpoints
//! - [`resolve`] - finds the endpoint named by an event's operation
//! - [`InvocationContext`] - the per-call context bound to one endpoint call
//!
//! # Example
//!
//! ```
//! use lambda_dispatch::handler::{EndpointMetadata, EndpointRegistry, InvocationContext};
//!
//! struct Counter;
//!
//! let mut registry = EndpointRegistry::<Counter>::new();
//!
//! // Async endpoint with a typed payload
//! registry.register("double", EndpointMetadata::new(), |_ctx: InvocationContext<Counter>, n: i64| async move {
//!     Ok::<_, std::convert::Infallible>(n * 2)
//! });
//!
//! // Synchronous endpoint
//! registry.register_sync("name", EndpointMetadata::new(), |ctx: InvocationContext<Counter>, _: ()| {
//!     Ok::<_, std::convert::Infallible>(ctx.operation().to_string())
//! });
//!
//! assert_eq!(registry.len(), 2);
//! ```

mod context;
mod registry;
pub(crate) mod resolver;

pub use context::{ContextFields, InvocationContext};
pub use registry::{
    BoxFuture, Endpoint, EndpointMetadata, EndpointRegistry, OperationSchema, RawEndpoint,
    SyncEndpoint, TypedEndpoint,
};
pub use resolver::resolve;
