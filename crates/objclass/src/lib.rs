//! objclass is the seam between storage-node method handlers ("object
//! classes") and the host runtime which owns per-object state.
//!
//! A class registers named methods against a [`Registry`], each with a
//! capability descriptor saying whether it may mutate the object. Handlers
//! see one object at a time through [`MapContext`]: a keyed byte-value map
//! whose reads and writes are committed atomically by the host when the
//! method completes with a non-negative status, and discarded otherwise.

use std::collections::BTreeMap;

pub mod store;
pub use store::Store;

/// Required key absent. Callers distinguish this from protocol outcomes.
pub const NOT_FOUND: i32 = -2;
/// Host I/O failure or corrupt stored value.
pub const IO_ERROR: i32 = -5;
/// Request payload failed to decode.
pub const MALFORMED: i32 = -22;

/// Host-level failure of the object's key/value map.
#[derive(thiserror::Error, Debug)]
pub enum MapError {
    #[error("RocksDB error: {0}")]
    Rocks(#[from] rocksdb::Error),
}

/// MapContext is a method handler's view of one object's keyed state.
///
/// All mutations issued through a single invocation are staged by the host
/// and commit as one atomic batch, or not at all. Handlers must not retain
/// state across invocations.
pub trait MapContext {
    /// Read the value stored at `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, MapError>;
    /// Stage `value` to be stored at `key` when the invocation commits.
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), MapError>;
}

/// The error half of a method invocation. Class-defined protocol outcomes
/// are *not* errors; they return as non-negative status codes from the
/// handler. Each variant maps onto a stable negative code at dispatch.
#[derive(thiserror::Error, Debug)]
pub enum MethodError {
    /// A key the method requires is not present in the object's map.
    #[error("required key {0:?} is absent")]
    NotFound(&'static str),
    /// A stored value failed to decode. The object is corrupt.
    #[error("stored value at {0:?} is corrupt")]
    Corrupt(String),
    /// The request payload could not be decoded. The object is untouched.
    #[error("malformed request: {0}")]
    Malformed(anyhow::Error),
    /// Host-level map I/O failure.
    #[error(transparent)]
    Map(#[from] MapError),
}

impl MethodError {
    /// The stable negative status code reported to the caller.
    pub fn code(&self) -> i32 {
        match self {
            MethodError::NotFound(_) => NOT_FOUND,
            MethodError::Corrupt(_) => IO_ERROR,
            MethodError::Malformed(_) => MALFORMED,
            MethodError::Map(_) => IO_ERROR,
        }
    }

    /// True for corruption & substrate failures, which log at error level.
    /// Everything else is an expected, reportable outcome.
    pub fn is_fault(&self) -> bool {
        matches!(self, MethodError::Corrupt(_) | MethodError::Map(_))
    }
}

/// A registered method handler: `(object map, input payload, output buffer)`
/// to a non-negative class status, or a `MethodError`.
pub type Handler =
    fn(&mut dyn MapContext, &[u8], &mut Vec<u8>) -> Result<i32, MethodError>;

/// One registered method of a class.
pub struct Method {
    pub(crate) read_only: bool,
    pub(crate) handler: Handler,
}

/// The methods of one object class.
#[derive(Default)]
pub struct Class {
    methods: BTreeMap<&'static str, Method>,
}

impl Class {
    /// Register a method which only reads the object.
    pub fn read_only(&mut self, name: &'static str, handler: Handler) -> &mut Class {
        self.methods.insert(
            name,
            Method {
                read_only: true,
                handler,
            },
        );
        self
    }

    /// Register a method which may read and mutate the object.
    pub fn read_write(&mut self, name: &'static str, handler: Handler) -> &mut Class {
        self.methods.insert(
            name,
            Method {
                read_only: false,
                handler,
            },
        );
        self
    }
}

/// A dispatch target which isn't registered.
#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("no such class {0:?}")]
    UnknownClass(String),
    #[error("class {class:?} has no method {method:?}")]
    UnknownMethod { class: String, method: String },
}

/// Per-process registry of object classes, built by the embedding process at
/// load time and then passed by reference to dispatch. There is no global
/// mutable registration state.
#[derive(Default)]
pub struct Registry {
    classes: BTreeMap<&'static str, Class>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Fetch or create the named class, for method registration.
    pub fn class(&mut self, name: &'static str) -> &mut Class {
        self.classes.entry(name).or_default()
    }

    /// Look up a registered method for dispatch.
    pub fn resolve(&self, class: &str, method: &str) -> Result<&Method, ResolveError> {
        let entry = self
            .classes
            .get(class)
            .ok_or_else(|| ResolveError::UnknownClass(class.to_string()))?;
        entry
            .methods
            .get(method)
            .ok_or_else(|| ResolveError::UnknownMethod {
                class: class.to_string(),
                method: method.to_string(),
            })
    }
}
