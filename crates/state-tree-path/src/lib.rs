//! Path addressing for state-tree nodes.
//!
//! Every live node in a state tree is addressed by a JSON-Pointer-like string
//! built from the path segments of its ancestors. This crate holds the codec
//! for those strings: segment escaping, joining, splitting, index parsing
//! and validation.
//!
//! Escaping follows [RFC 6901](https://tools.ietf.org/html/rfc6901): `~` is
//! written as `~0` and `/` as `~1`, so splitting a joined path always
//! reproduces the original segments.
//!
//! # Example
//!
//! ```
//! use state_tree_path::{join_path, split_path};
//!
//! let segments = vec!["todos".to_string(), "0".to_string(), "a/b".to_string()];
//! let path = join_path(&segments);
//! assert_eq!(path, "/todos/0/a~1b");
//! assert_eq!(split_path(&path), segments);
//! ```

pub mod validate;

pub use validate::{validate_path, validate_segments, PathError};

/// Leading segment of a relative path that refers to the starting node.
pub const SELF_SEGMENT: &str = ".";

/// Leading segment of a relative path that steps to the parent node.
pub const PARENT_SEGMENT: &str = "..";

/// Segment that refers to the position after the last array element.
pub const END_OF_ARRAY: &str = "-";

/// Unescapes a single path segment.
///
/// `~1` becomes `/` and `~0` becomes `~`.
///
/// # Example
///
/// ```
/// use state_tree_path::unescape_segment;
///
/// assert_eq!(unescape_segment("a~0b"), "a~b");
/// assert_eq!(unescape_segment("c~1d"), "c/d");
/// assert_eq!(unescape_segment("plain"), "plain");
/// ```
pub fn unescape_segment(segment: &str) -> String {
    if !segment.contains('~') {
        return segment.to_string();
    }
    // ~1 first, otherwise "~01" would decode to "/" instead of "~1"
    segment.replace("~1", "/").replace("~0", "~")
}

/// Escapes a single path segment.
///
/// `~` becomes `~0` and `/` becomes `~1`.
///
/// # Example
///
/// ```
/// use state_tree_path::escape_segment;
///
/// assert_eq!(escape_segment("a~b"), "a~0b");
/// assert_eq!(escape_segment("c/d"), "c~1d");
/// assert_eq!(escape_segment("plain"), "plain");
/// ```
pub fn escape_segment(segment: &str) -> String {
    if !segment.contains('/') && !segment.contains('~') {
        return segment.to_string();
    }
    segment.replace('~', "~0").replace('/', "~1")
}

/// Joins unescaped segments into a path string.
///
/// Returns an empty string for the root (no segments).
///
/// # Example
///
/// ```
/// use state_tree_path::join_path;
///
/// assert_eq!(join_path::<String>(&[]), "");
/// assert_eq!(join_path(&["a", "b"]), "/a/b");
/// assert_eq!(join_path(&[""]), "/");
/// ```
pub fn join_path<S: AsRef<str>>(segments: &[S]) -> String {
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        out.push_str(&escape_segment(segment.as_ref()));
    }
    out
}

/// Splits a path string into unescaped segments.
///
/// A single leading `/` is stripped, so `"/a/b"` and `"a/b"` both yield
/// `["a", "b"]`. The empty string yields no segments.
///
/// # Example
///
/// ```
/// use state_tree_path::split_path;
///
/// assert_eq!(split_path(""), Vec::<String>::new());
/// assert_eq!(split_path("/"), vec![""]);
/// assert_eq!(split_path("/a~0b/c~1d"), vec!["a~b", "c/d"]);
/// assert_eq!(split_path("../size"), vec!["..", "size"]);
/// ```
pub fn split_path(path: &str) -> Vec<String> {
    if path.is_empty() {
        return Vec::new();
    }
    let body = path.strip_prefix('/').unwrap_or(path);
    body.split('/').map(unescape_segment).collect()
}

/// Prepends an escaped segment to a path string.
///
/// Used when a patch or action path bubbles one level up the tree.
///
/// # Example
///
/// ```
/// use state_tree_path::prefix_path;
///
/// assert_eq!(prefix_path("todos", "/0/done"), "/todos/0/done");
/// assert_eq!(prefix_path("a/b", ""), "/a~1b");
/// ```
pub fn prefix_path(segment: &str, path: &str) -> String {
    let escaped = escape_segment(segment);
    let mut out = String::with_capacity(escaped.len() + path.len() + 1);
    out.push('/');
    out.push_str(&escaped);
    out.push_str(path);
    out
}

/// Checks whether a segment is a canonical non-negative array index.
///
/// # Example
///
/// ```
/// use state_tree_path::is_valid_index;
///
/// assert!(is_valid_index("0"));
/// assert!(is_valid_index("42"));
/// assert!(!is_valid_index("01"));
/// assert!(!is_valid_index("-1"));
/// assert!(!is_valid_index(""));
/// ```
pub fn is_valid_index(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    if bytes.is_empty() || (bytes.len() > 1 && bytes[0] == b'0') {
        return false;
    }
    bytes.iter().all(u8::is_ascii_digit)
}

/// Parses a segment as an array index.
pub fn parse_index(segment: &str) -> Option<usize> {
    if is_valid_index(segment) {
        segment.parse().ok()
    } else {
        None
    }
}
