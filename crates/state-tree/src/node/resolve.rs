//! Path resolution relative to a node.

use state_tree_path::{
    join_path, split_path, unescape_segment, validate_path, validate_segments, PARENT_SEGMENT,
    SELF_SEGMENT,
};

use super::{Member, Node};
use crate::error::{Result, StateTreeError};

impl Node {
    /// Resolves `path` relative to this node.
    ///
    /// An absolute path (`/a/b`) is a pointer: every segment, including
    /// `""`, `.` and `..`, names a child. A relative path (`./a`, `../a`)
    /// starts with a run of `.` (stay) and `..` (parent) segments; the
    /// segments after that run name children. Leaves can only be the last
    /// segment.
    ///
    /// # Errors
    ///
    /// [`StateTreeError::PathResolution`] naming the first segment that could
    /// not be followed, or [`crate::PathError`] for a malformed path.
    pub fn resolve(&self, path: &str) -> Result<Member> {
        validate_path(path)?;
        if !path.starts_with('.') {
            let segments = split_path(path);
            validate_segments(&segments)?;
            return self.resolve_segments(&segments);
        }
        let segments: Vec<String> = path.split('/').map(unescape_segment).collect();
        validate_segments(&segments)?;
        let steps = segments
            .iter()
            .take_while(|s| *s == SELF_SEGMENT || *s == PARENT_SEGMENT)
            .count();
        let mut start = self.clone();
        for (walked, segment) in segments[..steps].iter().enumerate() {
            if segment == PARENT_SEGMENT {
                start = start
                    .parent()
                    .ok_or_else(|| unresolved(segment, &segments[..walked]))?;
            }
        }
        start
            .resolve_segments(&segments[steps..])
            .map_err(|err| match err {
                StateTreeError::PathResolution { segment, path } => {
                    StateTreeError::PathResolution {
                        segment,
                        path: format!("{}{path}", segments[..steps].join("/")),
                    }
                }
                other => other,
            })
    }

    /// Like [`Node::resolve`] but yields `None` instead of an error.
    pub fn try_resolve(&self, path: &str) -> Option<Member> {
        self.resolve(path).ok()
    }

    /// Follows unescaped pointer segments down from this node.
    pub fn resolve_segments<S: AsRef<str>>(&self, segments: &[S]) -> Result<Member> {
        let mut current = Member::Node(self.clone());
        for (walked, segment) in segments.iter().enumerate() {
            let segment = segment.as_ref();
            let next = match &current {
                Member::Node(node) => node.get(segment),
                Member::Leaf(_) => None,
            };
            current = next.ok_or_else(|| unresolved(segment, &segments[..walked]))?;
        }
        Ok(current)
    }
}

fn unresolved<S: AsRef<str>>(segment: &str, walked: &[S]) -> StateTreeError {
    StateTreeError::PathResolution {
        segment: segment.to_string(),
        path: join_path(walked),
    }
}
