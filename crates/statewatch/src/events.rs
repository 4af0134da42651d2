use serde_json::Value;

/// Payload delivered to exact-path observers.
///
/// `None` stands for a missing value (a key that did not exist before the
/// write, or one that no longer exists after it).
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
    pub path: String,
    pub new_value: Option<Value>,
    pub old_value: Option<Value>,
}

/// Payload delivered to wildcard observers.
///
/// `path` and `value` reflect the more specific of the mutation path and the
/// wildcard root; `base` is the post-mutation value at the wildcard root.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtreeChange {
    pub path: String,
    pub value: Option<Value>,
    pub base: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Property(PropertyChange),
    Subtree(SubtreeChange),
}
