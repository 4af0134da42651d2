//! The wrapping layer: identity-stable, lazily created wrapper handles
//! through which application code reads and writes the observed state.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use serde_json::Value;
use statewatch_path::{format_path, is_prefix, resolve, Path};

use crate::dispatch::{remove_property, resolve_observed, write_property};
use crate::{ObservableError, StoreShared};

/// Wrapper handle for one nested record or array of the observed state.
///
/// Handles are created on demand when a container child is first traversed
/// and cached per absolute path, so re-reading the same nested container
/// yields the same handle ([`ObservedHandle::ptr_eq`]). Primitives are never
/// wrapped. Every write through a handle is routed through the change
/// dispatcher.
///
/// A handle whose subtree has been replaced wholesale becomes detached: its
/// reads yield `None` and its writes fail with
/// [`ObservableError::DetachedHandle`]. Re-traverse from the live root to
/// obtain a handle for the replacement subtree.
#[derive(Clone)]
pub struct ObservedHandle {
    inner: Rc<HandleInner>,
}

pub(crate) struct HandleInner {
    store: Weak<StoreShared>,
    path: Path,
    detached: Cell<bool>,
}

impl ObservedHandle {
    pub(crate) fn attach(store: &Rc<StoreShared>, path: Path) -> ObservedHandle {
        let mut handles = store.handles.borrow_mut();
        let inner = handles.entry(path.clone()).or_insert_with(|| {
            Rc::new(HandleInner {
                store: Rc::downgrade(store),
                path,
                detached: Cell::new(false),
            })
        });
        ObservedHandle {
            inner: Rc::clone(inner),
        }
    }

    /// Identity comparison: true when both handles wrap the same live
    /// container.
    pub fn ptr_eq(a: &ObservedHandle, b: &ObservedHandle) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    /// Absolute path of the wrapped container.
    pub fn path(&self) -> &[String] {
        &self.inner.path
    }

    pub fn dotted_path(&self) -> String {
        format_path(&self.inner.path)
    }

    pub fn is_detached(&self) -> bool {
        self.inner.detached.get() || self.inner.store.strong_count() == 0
    }

    /// Clone of the child value at `key`, of any kind. A terminal `length`
    /// read against an array yields the array's length.
    pub fn get(&self, key: &str) -> Option<Value> {
        let store = self.live_store().ok()?;
        let path = self.child_path(key);
        let data = store.data.borrow();
        resolve_observed(&data, &path)
    }

    /// Wrapper handle for the container child at `key`; `None` for
    /// primitives and missing keys. Wrapping is lazy and identity-stable.
    pub fn child(&self, key: &str) -> Option<ObservedHandle> {
        let store = self.live_store().ok()?;
        let path = self.child_path(key);
        {
            let data = store.data.borrow();
            match resolve(&data, &path) {
                Some(Value::Object(_)) | Some(Value::Array(_)) => {}
                _ => return None,
            }
        }
        Some(ObservedHandle::attach(&store, path))
    }

    /// Clone of the handle's own subtree.
    pub fn view(&self) -> Option<Value> {
        let store = self.live_store().ok()?;
        let data = store.data.borrow();
        resolve(&data, &self.inner.path).cloned()
    }

    /// Length of the wrapped array, observable as the exact path
    /// `<path>.length`.
    pub fn len(&self) -> Option<usize> {
        let store = self.live_store().ok()?;
        let data = store.data.borrow();
        resolve(&data, &self.inner.path)?.as_array().map(Vec::len)
    }

    /// Property write at `<path>.key`. The old value is captured before the
    /// write and both are handed to the dispatcher; a write of an identical
    /// value is not suppressed.
    pub fn set(&self, key: &str, value: Value) -> Result<(), ObservableError> {
        self.set_at(&[key.to_owned()], value)
    }

    /// Array index write at `<path>.index`. Writing past the end pads with
    /// nulls and notifies `<path>.length`; an in-bounds write leaves length
    /// observers alone.
    pub fn set_index(&self, index: usize, value: Value) -> Result<(), ObservableError> {
        let store = self.live_store()?;
        self.require_array(&store)?;
        write_property(&store, &self.child_path(&index.to_string()), value)
    }

    /// Appends to the wrapped array, notifying index and length observers.
    pub fn push(&self, value: Value) -> Result<(), ObservableError> {
        let store = self.live_store()?;
        let index = self.require_array(&store)?;
        write_property(&store, &self.child_path(&index.to_string()), value)
    }

    /// Deletes the record key at `<path>.key`, dispatching `(path, None, old)`.
    pub fn remove(&self, key: &str) -> Result<(), ObservableError> {
        let store = self.live_store()?;
        remove_property(&store, &self.child_path(key))
    }

    /// Write at a relative segment path below this handle, creating
    /// intermediate containers as needed.
    pub(crate) fn set_at(&self, relative: &[String], value: Value) -> Result<(), ObservableError> {
        let store = self.live_store()?;
        let mut path = self.inner.path.clone();
        path.extend_from_slice(relative);
        write_property(&store, &path, value)
    }

    fn live_store(&self) -> Result<Rc<StoreShared>, ObservableError> {
        if self.inner.detached.get() {
            return Err(ObservableError::DetachedHandle);
        }
        self.inner
            .store
            .upgrade()
            .ok_or(ObservableError::DetachedHandle)
    }

    fn require_array(&self, store: &Rc<StoreShared>) -> Result<usize, ObservableError> {
        let data = store.data.borrow();
        resolve(&data, &self.inner.path)
            .and_then(Value::as_array)
            .map(Vec::len)
            .ok_or(ObservableError::NotArray)
    }

    fn child_path(&self, key: &str) -> Path {
        let mut path = self.inner.path.clone();
        path.push(key.to_owned());
        path
    }
}

/// Orphans every cached handle at `path` or below. Called for each write:
/// the container previously reachable there (if any) is no longer part of
/// the live state, and its handles must not keep routing to the dispatcher.
pub(crate) fn detach_subtree(store: &StoreShared, path: &[String]) {
    let mut handles = store.handles.borrow_mut();
    handles.retain(|handle_path, inner| {
        if is_prefix(path, handle_path) {
            inner.detached.set(true);
            false
        } else {
            true
        }
    });
}
