use proptest::prelude::*;
use state_tree_path::{escape_segment, join_path, split_path, unescape_segment};

proptest! {
    #[test]
    fn escaped_segment_roundtrips(segment in ".*") {
        prop_assert_eq!(unescape_segment(&escape_segment(&segment)), segment);
    }

    #[test]
    fn escaped_segment_never_contains_slash(segment in ".*") {
        prop_assert!(!escape_segment(&segment).contains('/'));
    }

    #[test]
    fn joined_path_splits_back(segments in proptest::collection::vec("[a-z~/0-9]{0,6}", 0..6)) {
        prop_assert_eq!(split_path(&join_path(&segments)), segments);
    }
}

#[test]
fn tilde_and_slash_sequences_are_unambiguous() {
    // "~1" as a literal must not collapse to "/" after a round trip
    for segment in ["~1", "~0", "/~", "~/", "~~//"] {
        let path = join_path(&[segment]);
        assert_eq!(split_path(&path), vec![segment.to_string()], "{path}");
    }
}
