//! Encoded events - dispatching raw JSON or MessagePack bytes.
//!
//! This example demonstrates:
//! - Custom operation/payload keys loaded from JSON configuration
//! - Dispatching from bytes with `dispatch_encoded`
//! - Raw endpoints receiving extra call arguments
//!
//! # Running
//!
//! ```sh
//! cargo run --example encoded
//! ```

use lambda_dispatch::codec::EventCodec;
use lambda_dispatch::{BoxError, EndpointMetadata, Handler, HandlerOptions, InvocationContext};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

struct Calculator;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let options = HandlerOptions::from_json(r#"{"operationKey": "action", "payloadKey": "args"}"#)?;

    let handler = Handler::builder(Calculator)
        .options(options)
        .operation_sync("sum", |_ctx, numbers: Vec<f64>| {
            Ok::<_, BoxError>(numbers.iter().sum::<f64>())
        })
        .operation_raw(
            "scale",
            EndpointMetadata::new(),
            |_ctx: InvocationContext<Calculator>, payload: Value, extra: Vec<Value>| async move {
                let factor = extra.first().and_then(Value::as_f64).unwrap_or(1.0);
                let value = payload.as_f64().ok_or("payload must be a number")?;
                Ok::<_, BoxError>(json!(value * factor))
            },
        )
        .build();

    let json_event = br#"{"action": "sum", "args": [1.5, 2.5, 3]}"#;
    let out = handler.dispatch_encoded(json_event, EventCodec::Json, None).await?;
    println!("json sum    => {}", String::from_utf8_lossy(&out));

    let msgpack_event = EventCodec::MsgPack.encode(&json!({"action": "sum", "args": [10, 20]}))?;
    let out = handler
        .dispatch_encoded(&msgpack_event, EventCodec::MsgPack, None)
        .await?;
    println!("msgpack sum => {}", EventCodec::MsgPack.decode(&out)?);

    let scaled = handler
        .dispatch_with_args(json!({"action": "scale", "args": 4}), None, vec![json!(2.5)])
        .await?;
    println!("scale       => {scaled}");

    Ok(())
}
