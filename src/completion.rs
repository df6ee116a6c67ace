//! External completion collaborator.
//!
//! A dispatch can notify an external object when it settles, alongside the
//! returned future. Both capabilities are optional: the trait methods default
//! to no-ops, which is how an object "without" `succeed` or `fail` is expressed.
//!
//! # Example
//!
//! ```
//! use lambda_dispatch::Callbacks;
//!
//! let completion = Callbacks::new()
//!     .on_succeed(|value| eprintln!("done: {value}"))
//!     .on_fail(|err| eprintln!("failed: {err}"));
//! # let _ = completion;
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::DispatchError;

/// Side-channel notified once a dispatch settles.
///
/// At most one of the two methods is called, exactly once, per dispatch.
pub trait Completion: Send + Sync {
    /// Called with the endpoint's result before the dispatch resolves.
    fn succeed(&self, _value: &Value) {}

    /// Called with the error before the dispatch rejects with it.
    fn fail(&self, _error: &DispatchError) {}
}

type SucceedFn = Box<dyn Fn(&Value) + Send + Sync>;
type FailFn = Box<dyn Fn(&DispatchError) + Send + Sync>;

/// [`Completion`] assembled from optional closures.
#[derive(Default)]
pub struct Callbacks {
    succeed: Option<SucceedFn>,
    fail: Option<FailFn>,
}

impl Callbacks {
    /// Create a completion with neither capability.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the success notification.
    pub fn on_succeed<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.succeed = Some(Box::new(f));
        self
    }

    /// Set the failure notification.
    pub fn on_fail<F>(mut self, f: F) -> Self
    where
        F: Fn(&DispatchError) + Send + Sync + 'static,
    {
        self.fail = Some(Box::new(f));
        self
    }

    /// Wrap into the shared form accepted by `dispatch`.
    pub fn shared(self) -> Arc<dyn Completion> {
        Arc::new(self)
    }
}

impl Completion for Callbacks {
    fn succeed(&self, value: &Value) {
        if let Some(f) = &self.succeed {
            f(value);
        }
    }

    fn fail(&self, error: &DispatchError) {
        if let Some(f) = &self.fail {
            f(error);
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("succeed", &self.succeed.is_some())
            .field("fail", &self.fail.is_some())
            .finish()
    }
}
