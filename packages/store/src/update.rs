//! Update descriptors accepted by `commit`.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

use futures::future::{FutureExt, LocalBoxFuture};

use pathstate_core_store::Value;

pub type DeriveFn = Box<dyn FnOnce(Option<Value>) -> Value + 'static>;
pub type DeriveAsyncFn = Box<dyn FnOnce(Option<Value>) -> LocalBoxFuture<'static, Value> + 'static>;

/// How a commit computes the new value at its path.
///
/// Derivations receive the current value at the path, or `None` if nothing
/// is stored there yet.
pub enum Update {
    /// Write the value as-is.
    Literal(Value),
    /// Compute the new value inline from the current one.
    Derive(DeriveFn),
    /// Compute the new value from the current one, eventually. The write and
    /// notification happen once the future resolves.
    DeriveAsync(DeriveAsyncFn),
}

impl Update {
    pub fn literal(value: impl Into<Value>) -> Self {
        Update::Literal(value.into())
    }

    /// Build a synchronous derivation.
    ///
    /// ```rust
    /// use pathstate_store::{Update, Value};
    ///
    /// let increment = Update::derive(|current| {
    ///     Value::from(current.and_then(|v| v.as_i64()).unwrap_or(0) + 1)
    /// });
    /// # let _ = increment;
    /// ```
    pub fn derive<F>(f: F) -> Self
    where
        F: FnOnce(Option<Value>) -> Value + 'static,
    {
        Update::Derive(Box::new(f))
    }

    /// Build an asynchronous derivation.
    pub fn derive_async<F, Fut>(f: F) -> Self
    where
        F: FnOnce(Option<Value>) -> Fut + 'static,
        Fut: Future<Output = Value> + 'static,
    {
        Update::DeriveAsync(Box::new(move |current| f(current).boxed_local()))
    }

    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Update::Literal(_) => "literal",
            Update::Derive(_) => "derive",
            Update::DeriveAsync(_) => "derive_async",
        }
    }
}

macro_rules! literal_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for Update {
                fn from(value: $source) -> Self {
                    Update::Literal(Value::from(value))
                }
            }
        )*
    };
}

literal_from!(
    Value,
    bool,
    i64,
    i32,
    f64,
    String,
    &str,
    Vec<u8>,
    Vec<Value>,
    BTreeMap<String, Value>,
    serde_json::Value,
);

impl fmt::Debug for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Update::Derive(_) => f.write_str("Derive(..)"),
            Update::DeriveAsync(_) => f.write_str("DeriveAsync(..)"),
        }
    }
}
