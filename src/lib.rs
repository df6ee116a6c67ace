//! # lambda-dispatch
//!
//! Operation dispatch core for serverless-style invocation handlers.
//!
//! An incoming event names an operation and carries a payload. The handler
//! resolves the operation against an explicit whitelist of registered
//! endpoints, builds a fresh invocation context, runs the endpoint, and
//! reports the outcome both through the returned future and through an
//! optional completion object.
//!
//! ## Architecture
//!
//! - **Registry** ([`handler::EndpointRegistry`]): operations are registered by
//!   name with metadata; nothing else is reachable
//! - **Resolver** ([`handler::resolve`]): operation value to endpoint
//! - **Context** ([`InvocationContext`]): per-call, optionally deep-frozen
//! - **Pipeline** ([`Handler::dispatch`]): the single entry point
//!
//! ## Example
//!
//! ```
//! use lambda_dispatch::{BoxError, Callbacks, Handler, InvocationContext};
//! use serde::Deserialize;
//! use serde_json::json;
//!
//! #[derive(Deserialize)]
//! struct Greet {
//!     name: String,
//! }
//!
//! struct Greeter;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), BoxError> {
//! let handler = Handler::builder(Greeter)
//!     .operation("greet", |ctx: InvocationContext<Greeter>, p: Greet| async move {
//!         Ok::<_, BoxError>(format!("{}: hi, {}", ctx.operation(), p.name))
//!     })
//!     .build();
//!
//! let completion = Callbacks::new().on_succeed(|v| eprintln!("succeeded with {v}"));
//! let result = handler
//!     .dispatch(
//!         json!({"operation": "greet", "payload": {"name": "Bond"}}),
//!         Some(completion.shared()),
//!     )
//!     .await?;
//!
//! assert_eq!(result, json!("greet: hi, Bond"));
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod completion;
pub mod config;
pub mod error;
pub mod handler;

mod dispatcher;

pub use completion::{Callbacks, Completion};
pub use config::HandlerOptions;
pub use dispatcher::{Handler, HandlerBuilder};
pub use error::{BoxError, DispatchError, Result};
pub use handler::{EndpointMetadata, InvocationContext};
