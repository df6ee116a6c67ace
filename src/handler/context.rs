//! Invocation context for endpoints.
//!
//! Every dispatch builds a fresh [`InvocationContext`] and moves it into the
//! endpoint. The context exposes the resolved operation, its metadata, the
//! source event and the optional completion object, and delegates to the
//! handler for its state and options.
//!
//! Fields are private and have no setters, so reassigning one is a compile
//! error:
//!
//! ```compile_fail
//! use lambda_dispatch::handler::InvocationContext;
//!
//! fn overwrite(ctx: &mut InvocationContext<()>) {
//!     ctx.event = serde_json::json!({});
//! }
//! ```
//!
//! The event may still be modified in place through
//! [`InvocationContext::event_mut`] unless the handler was built with
//! `deep_copy`, in which case every write fails with
//! [`DispatchError::Frozen`].
//!
//! # Example
//!
//! ```ignore
//! async fn greet(ctx: InvocationContext<Greeter>, name: String) -> Result<String, BoxError> {
//!     Ok(format!("{}: {}, {}", ctx.operation(), ctx.state().greeting, name))
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::EndpointMetadata;
use crate::completion::Completion;
use crate::config::HandlerOptions;
use crate::dispatcher::Handler;
use crate::error::{DispatchError, Result};

/// The per-call values a context is built from.
pub struct ContextFields {
    /// Resolved operation name.
    pub operation: String,
    /// Metadata of the resolved endpoint.
    pub metadata: EndpointMetadata,
    /// The full source event.
    pub event: Value,
    /// External completion object, if any.
    pub context: Option<Arc<dyn Completion>>,
}

/// Context bound to exactly one endpoint invocation.
///
/// # Isolation
///
/// Each dispatch constructs its own context, so concurrent dispatches against
/// the same handler never observe each other's writes. Cloning a context
/// shares the event until one clone writes to it (copy-on-write).
pub struct InvocationContext<S> {
    operation: Arc<str>,
    metadata: EndpointMetadata,
    event: Arc<Value>,
    context: Option<Arc<dyn Completion>>,
    frozen: bool,
    state: Arc<S>,
    options: Arc<HandlerOptions>,
}

impl<S> InvocationContext<S> {
    /// Build the context for one invocation against `handler`.
    ///
    /// With `deep_copy` enabled the whole event tree is frozen: no write
    /// anywhere in it succeeds. The completion object is kept by reference.
    pub fn build(handler: &Handler<S>, fields: ContextFields) -> Self {
        let frozen = handler.options().deep_copy;
        Self {
            operation: Arc::from(fields.operation),
            metadata: fields.metadata,
            event: Arc::new(fields.event),
            context: fields.context,
            frozen,
            state: handler.shared_state(),
            options: handler.shared_options(),
        }
    }

    /// The resolved operation name.
    #[inline]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Metadata registered with the endpoint.
    #[inline]
    pub fn metadata(&self) -> &EndpointMetadata {
        &self.metadata
    }

    /// The full source event.
    #[inline]
    pub fn event(&self) -> &Value {
        &self.event
    }

    /// The external completion object, if the caller supplied one.
    #[inline]
    pub fn context(&self) -> Option<&Arc<dyn Completion>> {
        self.context.as_ref()
    }

    /// The handler's state, giving access to its other methods.
    #[inline]
    pub fn state(&self) -> &S {
        &self.state
    }

    /// The handler's options.
    #[inline]
    pub fn options(&self) -> &HandlerOptions {
        &self.options
    }

    /// Whether the context is deep-frozen.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Mutable access to the event tree.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Frozen`] when the handler uses `deep_copy`.
    pub fn event_mut(&mut self) -> Result<&mut Value> {
        if self.frozen {
            return Err(DispatchError::Frozen { field: "event" });
        }
        Ok(Arc::make_mut(&mut self.event))
    }

    /// Mutable access to a field nested in the event, created as `null` if
    /// missing. The event must be an object.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Frozen`] when frozen, or
    /// [`DispatchError::InvalidType`] when the event is not an object.
    pub fn event_field_mut(&mut self, key: &str) -> Result<&mut Value> {
        match self.event_mut()? {
            Value::Object(map) => Ok(map.entry(key.to_string()).or_insert(Value::Null)),
            other => Err(DispatchError::invalid_type("event", "object", Some(&*other))),
        }
    }
}

impl<S> Clone for InvocationContext<S> {
    fn clone(&self) -> Self {
        Self {
            operation: self.operation.clone(),
            metadata: self.metadata.clone(),
            event: self.event.clone(),
            context: self.context.clone(),
            frozen: self.frozen,
            state: self.state.clone(),
            options: self.options.clone(),
        }
    }
}

impl<S> fmt::Debug for InvocationContext<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("operation", &self.operation)
            .field("metadata", &self.metadata)
            .field("event", &self.event)
            .field("context", &self.context.is_some())
            .field("frozen", &self.frozen)
            .finish()
    }
}
