//! Path-observable state container.
//!
//! An [`Observable`] owns an arbitrarily nested [`serde_json::Value`] (the
//! root state) and lets callers subscribe to changes either at an exact
//! dotted property path (`"foo.value"`) or at a wildcard subtree path
//! (`"foo.*"`). Application code reads and writes the state through
//! [`ObservedHandle`] wrapper handles obtained from [`Observable::proxy`];
//! every write is routed synchronously to exactly the matching observers.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use serde_json::json;
//! use statewatch::{ChangeEvent, Observable};
//!
//! let store = Observable::new(json!({"foo": {"value": 1}}));
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! store
//!     .add_observer("foo.value", move |event| {
//!         if let ChangeEvent::Property(change) = event {
//!             sink.borrow_mut().push(change.new_value.clone());
//!         }
//!     })
//!     .unwrap();
//!
//! let root = store.proxy();
//! let foo = root.child("foo").unwrap();
//! foo.set("value", json!(2)).unwrap();
//!
//! assert_eq!(*seen.borrow(), vec![Some(json!(2))]);
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;
use statewatch_path::{parse_path, validate_path, Path, PathError};
use thiserror::Error;

mod dispatch;
mod events;
mod handles;
mod registry;

pub use events::{ChangeEvent, PropertyChange, SubtreeChange};
pub use handles::ObservedHandle;
pub use registry::{ObserverId, PatternKind};

use handles::HandleInner;
use registry::{parse_pattern, ObserverRegistry};

#[derive(Debug, Error)]
pub enum ObservableError {
    #[error("pattern {0:?} contains an empty segment")]
    EmptySegment(String),
    #[error("pattern {0:?} uses * before the final segment")]
    WildcardNotLast(String),
    #[error("handle is detached from its store")]
    DetachedHandle,
    #[error("path does not point to object")]
    NotObject,
    #[error("path does not point to array")]
    NotArray,
    #[error(transparent)]
    Path(#[from] PathError),
}

/// Interior state shared between the store and its wrapper handles. Owned
/// exclusively by one engine instance; never a process-wide singleton.
pub(crate) struct StoreShared {
    pub(crate) data: RefCell<Value>,
    pub(crate) registry: RefCell<ObserverRegistry>,
    pub(crate) handles: RefCell<HashMap<Path, Rc<HandleInner>>>,
}

/// A path-observable state container.
///
/// Single-threaded and purely synchronous: a write fully dispatches all
/// resulting notifications before the triggering call returns. Observer
/// callbacks run inline on the caller's stack and may themselves mutate the
/// observed state, which re-enters the dispatcher recursively.
pub struct Observable {
    shared: Rc<StoreShared>,
}

impl Observable {
    /// Wraps `root` for observation. The store owns the value for its
    /// lifetime; all further access goes through [`Observable::proxy`].
    pub fn new(root: Value) -> Self {
        Self {
            shared: Rc::new(StoreShared {
                data: RefCell::new(root),
                registry: RefCell::new(ObserverRegistry::new()),
                handles: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// The root wrapper handle.
    pub fn proxy(&self) -> ObservedHandle {
        ObservedHandle::attach(&self.shared, Vec::new())
    }

    /// Snapshot of the underlying target value. Mutating the returned clone
    /// does not generate notifications.
    pub fn view(&self) -> Value {
        self.shared.data.borrow().clone()
    }

    /// Resolve a dotted path against the current root. Missing intermediate
    /// segments yield `None`.
    pub fn read(&self, path: &str) -> Option<Value> {
        let segments = parse_path(path);
        let data = self.shared.data.borrow();
        dispatch::resolve_observed(&data, &segments)
    }

    /// Registers `callback` for `pattern`, which is either an exact dotted
    /// path or a wildcard pattern ending in `*`. Returns the id used for
    /// removal.
    ///
    /// # Errors
    ///
    /// Malformed patterns (empty segments, `*` anywhere but last) are
    /// rejected here rather than silently creating a coverage gap.
    pub fn add_observer<F>(&self, pattern: &str, callback: F) -> Result<ObserverId, ObservableError>
    where
        F: Fn(&ChangeEvent) + 'static,
    {
        let (kind, segments) = parse_pattern(pattern)?;
        Ok(self
            .shared
            .registry
            .borrow_mut()
            .insert(kind, segments, Rc::new(callback)))
    }

    /// Makes the observer permanently inert. Unknown or already-removed ids
    /// are a no-op; returns whether a record was removed.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.shared.registry.borrow_mut().remove(id)
    }

    /// Clears every observer; subsequent mutations notify nobody.
    pub fn remove_all_observers(&self) {
        self.shared.registry.borrow_mut().clear();
    }
}

/// Writes `value` at the dotted `path` below `handle`, creating intermediate
/// containers as needed. Routes through the same change dispatch as direct
/// handle writes, so the two mutation interfaces are observably equivalent.
///
/// # Errors
///
/// Rejects empty paths/segments, writes through detached handles, and
/// non-index segments applied to arrays.
pub fn set_value_at_path(
    path: &str,
    handle: &ObservedHandle,
    value: Value,
) -> Result<(), ObservableError> {
    let segments = parse_path(path);
    validate_path(&segments)?;
    handle.set_at(&segments, value)
}
