//! JSON interop: seeding and exporting trees, and typed access through serde.
//!
//! Trees convert to and from `serde_json::Value` with `From`. Bytes leave as
//! base64 strings and non-finite floats as null; neither comes back.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as Json;

use crate::{Error, Value};

/// Decode a typed value out of a tree.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, Error> {
    serde_json::from_value(value.into()).map_err(|e| Error::decode(e.to_string()))
}

/// Encode a typed value as a tree.
pub fn to_value<T: Serialize>(data: &T) -> Result<Value, Error> {
    serde_json::to_value(data)
        .map(Value::from)
        .map_err(|e| Error::encode(e.to_string()))
}

impl From<Value> for Json {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(b),
            Value::Integer(i) => Json::from(i),
            Value::Float(f) => Json::from(f),
            Value::String(s) => Json::String(s),
            Value::Bytes(bytes) => Json::String(STANDARD.encode(bytes)),
            Value::Array(items) => items.into_iter().collect(),
            Value::Map(map) => Json::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            // Integers outside i64 degrade to floats.
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => Value::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }
}
