//! Greeter - a handler with typed, synchronous and failing operations.
//!
//! This example demonstrates:
//! - Building a handler with the builder pattern
//! - Registering operations with and without metadata
//! - Calling the handler's own methods from an endpoint
//! - Observing outcomes through a completion object
//!
//! # Running
//!
//! ```sh
//! RUST_LOG=lambda_dispatch=debug cargo run --example greeter
//! ```

use lambda_dispatch::{
    BoxError, Callbacks, EndpointMetadata, Handler, HandlerOptions, InvocationContext,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// Input for the greet operation.
#[derive(Deserialize, Debug)]
struct GreetInput {
    name: String,
}

/// Output of the greet operation.
#[derive(Serialize, Debug)]
struct GreetOutput {
    message: String,
}

struct Greeter {
    greeting: String,
}

impl Greeter {
    // Not registered, so no event can reach it.
    fn format(&self, operation: &str, name: &str) -> String {
        format!("{}: {}, {}", operation, self.greeting, name)
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let handler = Handler::builder(Greeter {
        greeting: "hi".to_string(),
    })
    .options(HandlerOptions::new().deep_copy(true))
    .operation_with_metadata(
        "greet",
        EndpointMetadata::try_from(json!({"description": "Say hello"}))?,
        |ctx: InvocationContext<Greeter>, input: GreetInput| async move {
            let message = ctx.state().format(ctx.operation(), &input.name);
            Ok::<_, BoxError>(GreetOutput { message })
        },
    )
    .operation_sync("fail", |_ctx, _: serde_json::Value| -> Result<(), BoxError> {
        Err("this operation always fails".into())
    })
    .build();

    println!("{}", serde_json::to_string_pretty(&handler.schema())?);

    let completion = Callbacks::new()
        .on_succeed(|value| println!("succeed: {value}"))
        .on_fail(|err| println!("fail: {err}"))
        .shared();

    let events = [
        json!({"operation": "greet", "payload": {"name": "Bond"}}),
        json!({"operation": "fail"}),
        json!({"operation": "format", "payload": {"name": "Bond"}}),
        json!({"payload": {}}),
    ];

    for event in events {
        match handler.dispatch(event, Some(completion.clone())).await {
            Ok(value) => println!("  => {value}"),
            Err(err) => println!("  => error: {err}"),
        }
    }

    Ok(())
}
