//! Change dispatch: routes every intercepted write to the matching exact and
//! wildcard observers.

use std::rc::Rc;

use serde_json::Value;
use statewatch_path::{format_path, resolve, resolve_mut, write_at_path, Path};

use crate::events::{ChangeEvent, PropertyChange, SubtreeChange};
use crate::handles::detach_subtree;
use crate::{ObservableError, StoreShared};

/// Resolution with the reference framework's synthetic `length`: a terminal
/// `length` segment applied to an array yields the array's length.
pub(crate) fn resolve_observed(value: &Value, path: &[String]) -> Option<Value> {
    if let Some((last, parent)) = path.split_last() {
        if last == "length" {
            if let Some(Value::Array(arr)) = resolve(value, parent) {
                return Some(Value::from(arr.len()));
            }
        }
    }
    resolve(value, path).cloned()
}

/// Performs the underlying write at `path` and drives the notification
/// algorithm. The old value is captured before the write; handles under the
/// written path are orphaned so they stop routing to the live dispatcher.
pub(crate) fn write_property(
    store: &Rc<StoreShared>,
    path: &Path,
    value: Value,
) -> Result<(), ObservableError> {
    let (old_value, lengths_before) = {
        let data = store.data.borrow();
        (resolve(&data, path).cloned(), array_lengths_along(&data, path))
    };
    {
        let mut data = store.data.borrow_mut();
        write_at_path(&mut data, path, value)?;
    }
    detach_subtree(store, path);
    let (new_value, lengths_after) = {
        let data = store.data.borrow();
        (resolve(&data, path).cloned(), array_lengths_along(&data, path))
    };
    dispatch(store, path, new_value.as_ref(), old_value.as_ref());

    // A write that lands inside or beyond an array extends it as a side
    // effect; every array along the written path whose length changed
    // notifies its length observers, innermost first. A plain in-bounds
    // write leaves lengths alone and must not notify them.
    for depth in (0..path.len()).rev() {
        if let (Some(before), Some(after)) = (lengths_before[depth], lengths_after[depth]) {
            if before != after {
                let mut len_path = path[..depth].to_vec();
                len_path.push("length".to_owned());
                notify_exact_direct(
                    store,
                    &len_path,
                    Some(&Value::from(after)),
                    Some(&Value::from(before)),
                );
            }
        }
    }
    Ok(())
}

/// Deletes the record key at `path` and dispatches `(path, None, old)`.
pub(crate) fn remove_property(store: &Rc<StoreShared>, path: &Path) -> Result<(), ObservableError> {
    let Some((last, parent)) = path.split_last() else {
        return Ok(());
    };
    let old_value = {
        let mut data = store.data.borrow_mut();
        match resolve_mut(&mut data, parent) {
            Some(Value::Object(map)) => map.shift_remove(last),
            Some(_) => return Err(ObservableError::NotObject),
            None => None,
        }
    };
    detach_subtree(store, path);
    dispatch(store, path, None, old_value.as_ref());
    Ok(())
}

/// The core notification algorithm, run once per intercepted write. Observer
/// callbacks run inline and may re-enter the store; every match set is
/// snapshotted and every interior borrow released before a callback is
/// invoked.
pub(crate) fn dispatch(
    store: &Rc<StoreShared>,
    path: &[String],
    new: Option<&Value>,
    old: Option<&Value>,
) {
    notify_exact_direct(store, path, new, old);

    let new_is_array = matches!(new, Some(Value::Array(_)));
    let old_is_array = matches!(old, Some(Value::Array(_)));
    let new_is_object = matches!(new, Some(Value::Object(_)));

    if new_is_array || (old_is_array && !new_is_object) {
        adapt_array(store, path, new, old);
    } else if new_is_object {
        fan_out(store, path, new, old);
    }

    notify_wildcards(store, path);
}

fn notify_exact_direct(
    store: &Rc<StoreShared>,
    path: &[String],
    new: Option<&Value>,
    old: Option<&Value>,
) {
    let callbacks = store.registry.borrow().match_exact(path);
    if callbacks.is_empty() {
        return;
    }
    let event = ChangeEvent::Property(PropertyChange {
        path: format_path(path),
        new_value: new.cloned(),
        old_value: old.cloned(),
    });
    for callback in callbacks {
        callback(&event);
    }
}

/// Subtree replacement fan-out: synthesizes per-leaf notifications for exact
/// observers registered at strict descendants of the replaced path. Only
/// registered descendant paths are visited, never the unregistered structure.
fn fan_out(store: &Rc<StoreShared>, path: &[String], new: Option<&Value>, old: Option<&Value>) {
    let matches = store.registry.borrow().match_exact_descendants_of(path);
    for (callback, suffix) in matches {
        let leaf_new = new.and_then(|v| resolve_observed(v, &suffix));
        let leaf_old = old.and_then(|v| resolve_observed(v, &suffix));
        let mut leaf_path = path.to_vec();
        leaf_path.extend(suffix);
        let event = ChangeEvent::Property(PropertyChange {
            path: format_path(&leaf_path),
            new_value: leaf_new,
            old_value: leaf_old,
        });
        callback(&event);
    }
}

/// Whole-array replacement: the dispatcher runs once per index present in
/// the old array, the new array, or both, then notifies the synthetic
/// `path.length` exact observers with the new and old lengths, even when
/// they are equal. The per-index recursion delivers every registered
/// descendant, so the record fan-out is not run for array-valued writes.
fn adapt_array(store: &Rc<StoreShared>, path: &[String], new: Option<&Value>, old: Option<&Value>) {
    let new_len = new.and_then(Value::as_array).map(Vec::len);
    let old_len = old.and_then(Value::as_array).map(Vec::len);
    let indexes = new_len.unwrap_or(0).max(old_len.unwrap_or(0));
    for i in 0..indexes {
        let child_new = new.and_then(Value::as_array).and_then(|a| a.get(i));
        let child_old = old.and_then(Value::as_array).and_then(|a| a.get(i));
        let mut child_path = path.to_vec();
        child_path.push(i.to_string());
        dispatch(store, &child_path, child_new, child_old);
    }
    let mut len_path = path.to_vec();
    len_path.push("length".to_owned());
    notify_exact_direct(
        store,
        &len_path,
        new_len.map(Value::from).as_ref(),
        old_len.map(Value::from).as_ref(),
    );
}

/// Wildcard resolution: each wildcard record whose root lies on the ancestor
/// chain of `path` is invoked exactly once. The effective path is the more
/// specific of the mutation path and the wildcard root; `value` and `base`
/// are read after the underlying write took effect.
fn notify_wildcards(store: &Rc<StoreShared>, path: &[String]) {
    let matches = store.registry.borrow().match_wildcards(path);
    for (callback, root) in matches {
        let effective: &[String] = if root.len() > path.len() { &root } else { path };
        let (value, base) = {
            let data = store.data.borrow();
            (
                resolve_observed(&data, effective),
                resolve_observed(&data, &root),
            )
        };
        let event = ChangeEvent::Subtree(SubtreeChange {
            path: format_path(effective),
            value,
            base,
        });
        callback(&event);
    }
}

/// Length of the array at every strict prefix of `path`, indexed by prefix
/// depth. `None` where the prefix does not resolve to an array.
fn array_lengths_along(data: &Value, path: &[String]) -> Vec<Option<usize>> {
    (0..path.len())
        .map(|depth| {
            resolve(data, &path[..depth])
                .and_then(Value::as_array)
                .map(Vec::len)
        })
        .collect()
}
