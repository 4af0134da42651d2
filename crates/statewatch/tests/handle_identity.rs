use serde_json::json;
use statewatch::{Observable, ObservableError, ObservedHandle};

#[test]
fn rereading_the_same_container_returns_the_same_handle() {
    let store = Observable::new(json!({"foo": {"value": 1}}));
    let root = store.proxy();

    let first = root.child("foo").unwrap();
    let second = root.child("foo").unwrap();
    assert!(ObservedHandle::ptr_eq(&first, &second));

    let root_again = store.proxy();
    assert!(ObservedHandle::ptr_eq(&root, &root_again));
}

#[test]
fn primitives_are_not_wrapped() {
    let store = Observable::new(json!({"foo": {"value": 1}, "name": "x"}));
    let root = store.proxy();

    assert!(root.child("name").is_none());
    assert!(root.child("missing").is_none());
    assert_eq!(root.get("name"), Some(json!("x")));

    let foo = root.child("foo").unwrap();
    assert!(foo.child("value").is_none());
    assert_eq!(foo.get("value"), Some(json!(1)));
}

#[test]
fn arrays_are_wrapped_and_expose_length() {
    let store = Observable::new(json!({"list": [1, 2, 3]}));
    let list = store.proxy().child("list").unwrap();

    assert_eq!(list.len(), Some(3));
    assert_eq!(list.get("1"), Some(json!(2)));
    assert_eq!(list.get("length"), Some(json!(3)));
    assert_eq!(list.dotted_path(), "list");
}

#[test]
fn replacing_a_subtree_orphans_its_handles() {
    let store = Observable::new(json!({"foo": {"value": 1}}));
    let root = store.proxy();
    let old_foo = root.child("foo").unwrap();

    root.set("foo", json!({"value": 2})).unwrap();

    assert!(old_foo.is_detached());
    assert_eq!(old_foo.view(), None);
    assert!(matches!(
        old_foo.set("value", json!(3)),
        Err(ObservableError::DetachedHandle)
    ));

    // A fresh traversal wraps the replacement object with a new identity.
    let new_foo = root.child("foo").unwrap();
    assert!(!ObservedHandle::ptr_eq(&old_foo, &new_foo));
    new_foo.set("value", json!(3)).unwrap();
    assert_eq!(store.read("foo.value"), Some(json!(3)));
}

#[test]
fn orphaned_writes_never_reach_live_observers() {
    let store = Observable::new(json!({"foo": {"value": 1}}));
    let old_foo = store.proxy().child("foo").unwrap();
    store.proxy().set("foo", json!({"value": 2})).unwrap();

    let fired = std::rc::Rc::new(std::cell::Cell::new(false));
    let sink = std::rc::Rc::clone(&fired);
    store
        .add_observer("foo.value", move |_| sink.set(true))
        .unwrap();

    assert!(old_foo.set("value", json!(9)).is_err());

    assert!(!fired.get());
    assert_eq!(store.read("foo.value"), Some(json!(2)));
}

#[test]
fn replacement_detaches_descendants_but_not_siblings_or_ancestors() {
    let store = Observable::new(json!({"foo": {"inner": {"x": 1}}, "bar": {"y": 2}}));
    let root = store.proxy();
    let foo = root.child("foo").unwrap();
    let inner = foo.child("inner").unwrap();
    let bar = root.child("bar").unwrap();

    root.set("foo", json!({"inner": {"x": 9}})).unwrap();

    assert!(foo.is_detached());
    assert!(inner.is_detached());
    assert!(!bar.is_detached());
    assert!(!root.is_detached());
    assert!(ObservedHandle::ptr_eq(&bar, &root.child("bar").unwrap()));
}

#[test]
fn leaf_writes_do_not_detach_the_enclosing_handle() {
    let store = Observable::new(json!({"foo": {"value": 1}}));
    let foo = store.proxy().child("foo").unwrap();

    foo.set("value", json!(2)).unwrap();

    assert!(!foo.is_detached());
    assert!(ObservedHandle::ptr_eq(
        &foo,
        &store.proxy().child("foo").unwrap()
    ));
}

#[test]
fn nested_handle_writes_dispatch_absolute_paths() {
    let store = Observable::new(json!({"a": {"b": {"c": 1}}}));
    let events = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = std::rc::Rc::clone(&events);
    store
        .add_observer("a.b.c", move |event| {
            if let statewatch::ChangeEvent::Property(change) = event {
                sink.borrow_mut().push(change.path.clone());
            }
        })
        .unwrap();

    let b = store.proxy().child("a").unwrap().child("b").unwrap();
    b.set("c", json!(2)).unwrap();

    assert_eq!(*events.borrow(), vec!["a.b.c".to_owned()]);
}

#[test]
fn handles_outlive_a_dropped_store_as_inert_objects() {
    let store = Observable::new(json!({"foo": {"value": 1}}));
    let foo = store.proxy().child("foo").unwrap();
    drop(store);

    assert!(foo.is_detached());
    assert_eq!(foo.view(), None);
    assert!(matches!(
        foo.set("value", json!(2)),
        Err(ObservableError::DetachedHandle)
    ));
}

#[test]
fn typed_array_operations_reject_records() {
    let store = Observable::new(json!({"foo": {"value": 1}}));
    let foo = store.proxy().child("foo").unwrap();

    assert_eq!(foo.len(), None);
    assert!(matches!(
        foo.push(json!(1)),
        Err(ObservableError::NotArray)
    ));
    assert!(matches!(
        foo.set_index(0, json!(1)),
        Err(ObservableError::NotArray)
    ));
}
