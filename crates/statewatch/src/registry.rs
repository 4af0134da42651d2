use std::collections::BTreeMap;
use std::rc::Rc;

use statewatch_path::{is_prefix, is_strict_prefix, parse_path, Path};

use crate::events::ChangeEvent;
use crate::ObservableError;

/// Handle for removing a registered observer. Unique for the lifetime of the
/// registry; never reused.
pub type ObserverId = u64;

pub(crate) type ObserverCallback = Rc<dyn Fn(&ChangeEvent)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Exact,
    Wildcard,
}

pub(crate) struct ObserverRecord {
    pub kind: PatternKind,
    /// The exact path, or the wildcard root for wildcard patterns.
    pub segments: Path,
    pub callback: ObserverCallback,
}

pub(crate) struct ObserverRegistry {
    next_id: ObserverId,
    records: BTreeMap<ObserverId, ObserverRecord>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            records: BTreeMap::new(),
        }
    }

    pub fn insert(
        &mut self,
        kind: PatternKind,
        segments: Path,
        callback: ObserverCallback,
    ) -> ObserverId {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.records.insert(
            id,
            ObserverRecord {
                kind,
                segments,
                callback,
            },
        );
        id
    }

    /// Idempotent: removing an unknown or already-removed id is a no-op.
    pub fn remove(&mut self, id: ObserverId) -> bool {
        self.records.remove(&id).is_some()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Exact records whose pattern equals `path`.
    ///
    /// The match operations return snapshot vectors so callers never hold a
    /// registry borrow while invoking callbacks.
    pub fn match_exact(&self, path: &[String]) -> Vec<ObserverCallback> {
        self.records
            .values()
            .filter(|r| r.kind == PatternKind::Exact && r.segments.as_slice() == path)
            .map(|r| Rc::clone(&r.callback))
            .collect()
    }

    /// Exact records registered at a strict descendant of `path`, paired with
    /// the relative suffix below `path`.
    pub fn match_exact_descendants_of(&self, path: &[String]) -> Vec<(ObserverCallback, Path)> {
        self.records
            .values()
            .filter(|r| r.kind == PatternKind::Exact && is_strict_prefix(path, &r.segments))
            .map(|r| (Rc::clone(&r.callback), r.segments[path.len()..].to_vec()))
            .collect()
    }

    /// Wildcard records whose root is an ancestor of, equal to, or a
    /// descendant of `path`, paired with the wildcard root.
    pub fn match_wildcards(&self, path: &[String]) -> Vec<(ObserverCallback, Path)> {
        self.records
            .values()
            .filter(|r| {
                r.kind == PatternKind::Wildcard
                    && (is_prefix(&r.segments, path) || is_prefix(path, &r.segments))
            })
            .map(|r| (Rc::clone(&r.callback), r.segments.clone()))
            .collect()
    }
}

/// Split a pattern string into its kind and segments, failing fast on
/// malformed input so a broken pattern never creates a silent gap in
/// notification coverage.
pub(crate) fn parse_pattern(pattern: &str) -> Result<(PatternKind, Path), ObservableError> {
    let mut segments = parse_path(pattern);
    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            return Err(ObservableError::EmptySegment(pattern.to_owned()));
        }
        if segment == "*" && i + 1 != segments.len() {
            return Err(ObservableError::WildcardNotLast(pattern.to_owned()));
        }
    }
    if segments.last().is_some_and(|s| s == "*") {
        segments.pop();
        Ok((PatternKind::Wildcard, segments))
    } else {
        Ok((PatternKind::Exact, segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact_pattern() {
        let (kind, segments) = parse_pattern("foo.value").unwrap();
        assert_eq!(kind, PatternKind::Exact);
        assert_eq!(segments, vec!["foo", "value"]);
    }

    #[test]
    fn test_parse_wildcard_pattern() {
        let (kind, segments) = parse_pattern("foo.*").unwrap();
        assert_eq!(kind, PatternKind::Wildcard);
        assert_eq!(segments, vec!["foo"]);
    }

    #[test]
    fn test_parse_bare_wildcard_observes_whole_tree() {
        let (kind, segments) = parse_pattern("*").unwrap();
        assert_eq!(kind, PatternKind::Wildcard);
        assert!(segments.is_empty());
    }

    #[test]
    fn test_parse_rejects_empty_segments() {
        assert!(matches!(
            parse_pattern(""),
            Err(ObservableError::EmptySegment(_))
        ));
        assert!(matches!(
            parse_pattern("a..b"),
            Err(ObservableError::EmptySegment(_))
        ));
        assert!(matches!(
            parse_pattern("a."),
            Err(ObservableError::EmptySegment(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_final_wildcard() {
        assert!(matches!(
            parse_pattern("*.a"),
            Err(ObservableError::WildcardNotLast(_))
        ));
        assert!(matches!(
            parse_pattern("a.*.b"),
            Err(ObservableError::WildcardNotLast(_))
        ));
    }

    #[test]
    fn test_ids_are_fresh_after_removal() {
        let mut registry = ObserverRegistry::new();
        let callback: ObserverCallback = Rc::new(|_| {});
        let first = registry.insert(PatternKind::Exact, vec!["a".into()], Rc::clone(&callback));
        assert!(registry.remove(first));
        assert!(!registry.remove(first));
        let second = registry.insert(PatternKind::Exact, vec!["a".into()], callback);
        assert_ne!(first, second);
    }

    #[test]
    fn test_match_exact_and_descendants() {
        let mut registry = ObserverRegistry::new();
        let callback: ObserverCallback = Rc::new(|_| {});
        registry.insert(
            PatternKind::Exact,
            vec!["foo".into()],
            Rc::clone(&callback),
        );
        registry.insert(
            PatternKind::Exact,
            vec!["foo".into(), "value".into()],
            Rc::clone(&callback),
        );
        registry.insert(PatternKind::Wildcard, vec!["foo".into()], callback);

        let foo = vec!["foo".to_string()];
        assert_eq!(registry.match_exact(&foo).len(), 1);
        let descendants = registry.match_exact_descendants_of(&foo);
        assert_eq!(descendants.len(), 1);
        assert_eq!(descendants[0].1, vec!["value"]);
    }

    #[test]
    fn test_match_wildcards_ancestor_chain() {
        let mut registry = ObserverRegistry::new();
        let callback: ObserverCallback = Rc::new(|_| {});
        registry.insert(
            PatternKind::Wildcard,
            vec!["foo".into()],
            Rc::clone(&callback),
        );
        registry.insert(PatternKind::Wildcard, vec!["bar".into()], callback);

        // Root "foo" is an ancestor of foo.value and a descendant of [].
        assert_eq!(
            registry
                .match_wildcards(&["foo".to_string(), "value".to_string()])
                .len(),
            1
        );
        assert_eq!(registry.match_wildcards(&[]).len(), 2);
        assert_eq!(registry.match_wildcards(&["baz".to_string()]).len(), 0);
    }
}
