//! Core PathState types: the value tree and the paths into it.
//!
//! - `Value`: dynamically-typed tree, maps and arrays as interior nodes
//! - `StorePath`: normalized slash-delimited path
//! - `Error`: errors shared by the store crates
//! - `json`: conversions to and from serde types
//!
//! # Example
//!
//! ```rust
//! use pathstate_core_store::{StorePath, Value};
//!
//! let mut tree = Value::map();
//! let path = StorePath::parse("/todos/0/");
//! let (last, parent) = path.split_last().unwrap();
//! tree.descend_mut(parent).set_child(last, Value::from("buy milk"));
//!
//! assert_eq!(tree.get(&StorePath::parse("todos/0")), Some(&Value::from("buy milk")));
//! ```

mod error;
pub mod json;
mod path;
mod value;

pub use error::Error;
pub use json::{from_value, to_value};
pub use path::{normalize, StorePath};
pub use value::Value;
