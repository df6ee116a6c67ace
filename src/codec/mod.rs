//! Codec module - decoding raw events and encoding results.
//!
//! Events usually arrive already parsed, but a host may hand over the raw
//! bytes instead. This module turns those bytes into an event value:
//!
//! - [`JsonCodec`] - JSON via `serde_json`
//! - [`MsgPackCodec`] - MessagePack using `rmp-serde` (`to_vec_named`, struct-as-map)
//!
//! [`EventCodec`] selects between them at runtime.
//!
//! # Example
//!
//! ```
//! use lambda_dispatch::codec::EventCodec;
//! use serde_json::json;
//!
//! let event = json!({"operation": "greet", "payload": {"name": "Bond"}});
//!
//! let bytes = EventCodec::MsgPack.encode(&event).unwrap();
//! assert_eq!(EventCodec::MsgPack.decode(&bytes).unwrap(), event);
//! ```

mod json;
mod msgpack;

pub use json::JsonCodec;
pub use msgpack::MsgPackCodec;

use bytes::Bytes;
use serde_json::Value;

use crate::error::Result;

/// Wire format of an encoded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventCodec {
    /// UTF-8 JSON.
    #[default]
    Json,
    /// MessagePack.
    MsgPack,
}

impl EventCodec {
    /// Decode event bytes into a JSON value.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not valid for this format.
    pub fn decode(self, bytes: &[u8]) -> Result<Value> {
        match self {
            EventCodec::Json => JsonCodec::decode(bytes),
            EventCodec::MsgPack => MsgPackCodec::decode(bytes),
        }
    }

    /// Encode a value in this format.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    pub fn encode(self, value: &Value) -> Result<Bytes> {
        let data = match self {
            EventCodec::Json => JsonCodec::encode(value)?,
            EventCodec::MsgPack => MsgPackCodec::encode(value)?,
        };
        Ok(Bytes::from(data))
    }
}
