//! MsgPack codec using `rmp-serde`.
//!
//! Always encodes with `to_vec_named`: structs become maps with field names,
//! which is what JavaScript hosts expect. `to_vec` would emit positional
//! arrays.
//!
//! # Example
//!
//! ```
//! use lambda_dispatch::codec::MsgPackCodec;
//! use serde_json::json;
//!
//! let event = json!({"operation": "greet", "payload": [1, 2, 3]});
//! let encoded = MsgPackCodec::encode(&event).unwrap();
//! let decoded: serde_json::Value = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, event);
//! ```

use crate::error::Result;

/// MessagePack codec for events and results.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes (struct-as-map).
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes cannot be deserialized to type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
